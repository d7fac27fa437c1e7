//! Validated, owned copies of the engine's notification records.

/// The notification codes this bridge understands. Anything else is rejected
/// before a single payload field is looked at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotificationCode {
    StyleNeeded,
    CharAdded,
    SavePointReached,
    SavePointLeft,
    ModifyAttemptReadOnly,
    Key,
    DoubleClick,
    UpdateUi,
    Modified,
    MacroRecord,
    MarginClick,
    NeedShown,
    Painted,
    UserListSelection,
    UriDropped,
    DwellStart,
    DwellEnd,
    Zoom,
    HotspotClick,
    HotspotDoubleClick,
    CallTipClick,
    AutoCSelection,
    IndicatorClick,
    IndicatorRelease,
    AutoCCancelled,
    AutoCCharDeleted,
    HotspotReleaseClick,
    FocusIn,
    FocusOut,
    AutoCCompleted,
    MarginRightClick,
    AutoCSelectionChange,
}

impl TryFrom<u32> for NotificationCode {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        use crate::protocol as p;

        Ok(match code {
            p::SCN_STYLENEEDED => Self::StyleNeeded,
            p::SCN_CHARADDED => Self::CharAdded,
            p::SCN_SAVEPOINTREACHED => Self::SavePointReached,
            p::SCN_SAVEPOINTLEFT => Self::SavePointLeft,
            p::SCN_MODIFYATTEMPTRO => Self::ModifyAttemptReadOnly,
            p::SCN_KEY => Self::Key,
            p::SCN_DOUBLECLICK => Self::DoubleClick,
            p::SCN_UPDATEUI => Self::UpdateUi,
            p::SCN_MODIFIED => Self::Modified,
            p::SCN_MACRORECORD => Self::MacroRecord,
            p::SCN_MARGINCLICK => Self::MarginClick,
            p::SCN_NEEDSHOWN => Self::NeedShown,
            p::SCN_PAINTED => Self::Painted,
            p::SCN_USERLISTSELECTION => Self::UserListSelection,
            p::SCN_URIDROPPED => Self::UriDropped,
            p::SCN_DWELLSTART => Self::DwellStart,
            p::SCN_DWELLEND => Self::DwellEnd,
            p::SCN_ZOOM => Self::Zoom,
            p::SCN_HOTSPOTCLICK => Self::HotspotClick,
            p::SCN_HOTSPOTDOUBLECLICK => Self::HotspotDoubleClick,
            p::SCN_CALLTIPCLICK => Self::CallTipClick,
            p::SCN_AUTOCSELECTION => Self::AutoCSelection,
            p::SCN_INDICATORCLICK => Self::IndicatorClick,
            p::SCN_INDICATORRELEASE => Self::IndicatorRelease,
            p::SCN_AUTOCCANCELLED => Self::AutoCCancelled,
            p::SCN_AUTOCCHARDELETED => Self::AutoCCharDeleted,
            p::SCN_HOTSPOTRELEASECLICK => Self::HotspotReleaseClick,
            p::SCN_FOCUSIN => Self::FocusIn,
            p::SCN_FOCUSOUT => Self::FocusOut,
            p::SCN_AUTOCCOMPLETED => Self::AutoCCompleted,
            p::SCN_MARGINRIGHTCLICK => Self::MarginRightClick,
            p::SCN_AUTOCSELECTIONCHANGE => Self::AutoCSelectionChange,
            unknown => return Err(unknown),
        })
    }
}

impl NotificationCode {
    /// Codes whose `text` field is a NUL-terminated string.
    #[must_use]
    pub fn carries_c_string(self) -> bool {
        matches!(
            self,
            Self::UserListSelection
                | Self::UriDropped
                | Self::AutoCSelection
                | Self::AutoCCompleted
                | Self::AutoCSelectionChange
        )
    }
}

/// Modification sub-flags whose `text` field holds `length` bytes.
const TEXT_BEARING: i32 = crate::protocol::SC_MOD_INSERTTEXT
    | crate::protocol::SC_MOD_DELETETEXT
    | crate::protocol::SC_MOD_BEFOREINSERT
    | crate::protocol::SC_MOD_INSERTCHECK;

/// One decoded notification. Positions are engine byte positions; fields a
/// code does not use are zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub code: NotificationCode,
    /// `-1` from the engine (no position) decodes to `None`.
    pub position: Option<usize>,
    pub ch: i32,
    pub modifiers: i32,
    pub modification_type: i32,
    pub text: Option<Vec<u8>>,
    pub length: usize,
    pub lines_added: isize,
    pub message: i32,
    pub w_param: usize,
    pub l_param: isize,
    pub line: usize,
    pub margin: i32,
    pub list_type: i32,
    pub x: i32,
    pub y: i32,
    pub annotation_lines_added: isize,
    pub updated: i32,
    pub list_completion_method: i32,
}

impl Notification {
    #[must_use]
    pub fn new(code: NotificationCode) -> Self {
        Self {
            code,
            position: Some(0),
            ch: 0,
            modifiers: 0,
            modification_type: 0,
            text: None,
            length: 0,
            lines_added: 0,
            message: 0,
            w_param: 0,
            l_param: 0,
            line: 0,
            margin: 0,
            list_type: 0,
            x: 0,
            y: 0,
            annotation_lines_added: 0,
            updated: 0,
            list_completion_method: 0,
        }
    }

    /// An `SCN_MODIFIED` record; `length` is taken from `text`.
    #[must_use]
    pub fn modification(
        modification_type: i32,
        position: usize,
        text: Option<Vec<u8>>,
        lines_added: isize,
    ) -> Self {
        Self {
            position: Some(position),
            modification_type,
            length: text.as_ref().map_or(0, Vec::len),
            text,
            lines_added,
            ..Self::new(NotificationCode::Modified)
        }
    }

    /// Copies a raw record out of engine memory.
    ///
    /// # Errors
    ///
    /// Returns the raw code when it is not a known notification.
    ///
    /// # Safety
    ///
    /// When the code and modification flags say `text` is in use, it must be
    /// null or point at `length` readable bytes (modifications) or at a
    /// NUL-terminated string (list and URI notifications).
    pub unsafe fn decode(raw: &crate::protocol::ScNotification) -> Result<Self, u32> {
        let code = NotificationCode::try_from(raw.header.code)?;
        let length = crate::dispatch::from_word(raw.length);
        let modification_type = if code == NotificationCode::Modified {
            raw.modification_type
        } else {
            0
        };

        let text = if raw.text.is_null() {
            None
        } else if code == NotificationCode::Modified && modification_type & TEXT_BEARING != 0 {
            // SAFETY: the caller guarantees `length` readable bytes for text-bearing modifications.
            Some(unsafe { std::slice::from_raw_parts(raw.text.cast::<u8>(), length) }.to_vec())
        } else if code.carries_c_string() {
            // SAFETY: the caller guarantees a NUL-terminated string for these codes.
            Some(unsafe { std::ffi::CStr::from_ptr(raw.text) }.to_bytes().to_vec())
        } else {
            None
        };

        Ok(Self {
            code,
            position: usize::try_from(raw.position).ok(),
            ch: raw.ch,
            modifiers: raw.modifiers,
            modification_type,
            text,
            length,
            lines_added: raw.lines_added,
            message: raw.message,
            w_param: raw.w_param,
            l_param: raw.l_param,
            line: crate::dispatch::from_word(raw.line),
            margin: raw.margin,
            list_type: raw.list_type,
            x: raw.x,
            y: raw.y,
            annotation_lines_added: raw.annotation_lines_added,
            updated: raw.updated,
            list_completion_method: raw.list_completion_method,
        })
    }

    #[inline]
    #[must_use]
    pub fn has_flag(&self, flag: i32) -> bool {
        self.modification_type & flag != 0
    }

    #[inline]
    #[must_use]
    pub fn byte_position(&self) -> usize {
        self.position.unwrap_or(0)
    }

    #[must_use]
    pub fn text_lossy(&self) -> String {
        self.text
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }
}
