//! Typed events raised to host observers. Every position and length here is
//! in char (UTF-16 unit) coordinates.

/// A proposed insertion that handlers may rewrite before the engine applies it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertCheck {
    pub position: usize,
    pub text: String,
    /// Set by a handler to replace `text`. An empty string cancels the insertion.
    pub replacement: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextEdit {
    pub position: usize,
    pub length: usize,
    /// Inserted or deleted text. Empty for before-delete, where the engine does not send it.
    pub text: String,
    pub lines_added: isize,
    pub source: crate::enums::ModificationSource,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutoCompletion {
    pub position: Option<usize>,
    pub text: String,
    /// The character that triggered the completion, or 0.
    pub ch: i32,
    pub method: i32,
    pub list_type: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeEvent {
    InsertCheck(InsertCheck),
    BeforeInsert(TextEdit),
    BeforeDelete(TextEdit),
    Insert(TextEdit),
    Delete(TextEdit),
    TextChanged,
    ChangeAnnotation { line: usize, lines_added: isize },
    MarginClick { position: Option<usize>, margin: i32, modifiers: i32 },
    MarginRightClick { position: Option<usize>, margin: i32, modifiers: i32 },
    DwellStart { position: Option<usize>, x: i32, y: i32 },
    DwellEnd { position: Option<usize>, x: i32, y: i32 },
    AutoCSelection(AutoCompletion),
    AutoCSelectionChange(AutoCompletion),
    AutoCCancelled,
    AutoCCharDeleted,
    AutoCCompleted(AutoCompletion),
    HotspotClick { position: Option<usize>, modifiers: i32 },
    HotspotDoubleClick { position: Option<usize>, modifiers: i32 },
    HotspotReleaseClick { position: Option<usize>, modifiers: i32 },
    IndicatorClick { position: Option<usize>, modifiers: i32 },
    IndicatorRelease { position: Option<usize>, modifiers: i32 },
    CharAdded { ch: i32 },
    SavePointReached,
    SavePointLeft,
    ModifyAttemptReadOnly,
    UpdateUi { updated: i32 },
    StyleNeeded { position: Option<usize> },
    DoubleClick { position: Option<usize>, line: usize, modifiers: i32 },
    NeedShown { position: Option<usize>, length: usize },
    Painted,
    UserListSelection(AutoCompletion),
    CallTipClick { position: Option<usize> },
    Zoom,
    Key { ch: i32, modifiers: i32 },
    MacroRecord { message: i32, w_param: usize, l_param: isize },
    FocusIn,
    FocusOut,
    UriDropped { text: String },
}

/// Field-less mirror of [`BridgeEvent`], used to subscribe to one kind of event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    InsertCheck,
    BeforeInsert,
    BeforeDelete,
    Insert,
    Delete,
    TextChanged,
    ChangeAnnotation,
    MarginClick,
    MarginRightClick,
    DwellStart,
    DwellEnd,
    AutoCSelection,
    AutoCSelectionChange,
    AutoCCancelled,
    AutoCCharDeleted,
    AutoCCompleted,
    HotspotClick,
    HotspotDoubleClick,
    HotspotReleaseClick,
    IndicatorClick,
    IndicatorRelease,
    CharAdded,
    SavePointReached,
    SavePointLeft,
    ModifyAttemptReadOnly,
    UpdateUi,
    StyleNeeded,
    DoubleClick,
    NeedShown,
    Painted,
    UserListSelection,
    CallTipClick,
    Zoom,
    Key,
    MacroRecord,
    FocusIn,
    FocusOut,
    UriDropped,
}

impl BridgeEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            BridgeEvent::InsertCheck(_) => EventKind::InsertCheck,
            BridgeEvent::BeforeInsert(_) => EventKind::BeforeInsert,
            BridgeEvent::BeforeDelete(_) => EventKind::BeforeDelete,
            BridgeEvent::Insert(_) => EventKind::Insert,
            BridgeEvent::Delete(_) => EventKind::Delete,
            BridgeEvent::TextChanged => EventKind::TextChanged,
            BridgeEvent::ChangeAnnotation { .. } => EventKind::ChangeAnnotation,
            BridgeEvent::MarginClick { .. } => EventKind::MarginClick,
            BridgeEvent::MarginRightClick { .. } => EventKind::MarginRightClick,
            BridgeEvent::DwellStart { .. } => EventKind::DwellStart,
            BridgeEvent::DwellEnd { .. } => EventKind::DwellEnd,
            BridgeEvent::AutoCSelection(_) => EventKind::AutoCSelection,
            BridgeEvent::AutoCSelectionChange(_) => EventKind::AutoCSelectionChange,
            BridgeEvent::AutoCCancelled => EventKind::AutoCCancelled,
            BridgeEvent::AutoCCharDeleted => EventKind::AutoCCharDeleted,
            BridgeEvent::AutoCCompleted(_) => EventKind::AutoCCompleted,
            BridgeEvent::HotspotClick { .. } => EventKind::HotspotClick,
            BridgeEvent::HotspotDoubleClick { .. } => EventKind::HotspotDoubleClick,
            BridgeEvent::HotspotReleaseClick { .. } => EventKind::HotspotReleaseClick,
            BridgeEvent::IndicatorClick { .. } => EventKind::IndicatorClick,
            BridgeEvent::IndicatorRelease { .. } => EventKind::IndicatorRelease,
            BridgeEvent::CharAdded { .. } => EventKind::CharAdded,
            BridgeEvent::SavePointReached => EventKind::SavePointReached,
            BridgeEvent::SavePointLeft => EventKind::SavePointLeft,
            BridgeEvent::ModifyAttemptReadOnly => EventKind::ModifyAttemptReadOnly,
            BridgeEvent::UpdateUi { .. } => EventKind::UpdateUi,
            BridgeEvent::StyleNeeded { .. } => EventKind::StyleNeeded,
            BridgeEvent::DoubleClick { .. } => EventKind::DoubleClick,
            BridgeEvent::NeedShown { .. } => EventKind::NeedShown,
            BridgeEvent::Painted => EventKind::Painted,
            BridgeEvent::UserListSelection(_) => EventKind::UserListSelection,
            BridgeEvent::CallTipClick { .. } => EventKind::CallTipClick,
            BridgeEvent::Zoom => EventKind::Zoom,
            BridgeEvent::Key { .. } => EventKind::Key,
            BridgeEvent::MacroRecord { .. } => EventKind::MacroRecord,
            BridgeEvent::FocusIn => EventKind::FocusIn,
            BridgeEvent::FocusOut => EventKind::FocusOut,
            BridgeEvent::UriDropped { .. } => EventKind::UriDropped,
        }
    }

    /// True for the events raised while the engine is in the middle of an
    /// edit, before the buffer has changed.
    #[must_use]
    pub fn is_pre_edit(&self) -> bool {
        matches!(
            self,
            BridgeEvent::InsertCheck(_) | BridgeEvent::BeforeInsert(_) | BridgeEvent::BeforeDelete(_)
        )
    }
}
