use std::cell::{Cell, RefCell};

/// What the decoder works against for one notification. Nothing in here is
/// borrowed while observers run, so handlers are free to query or edit.
pub struct DecodeContext<'a> {
    pub dispatch: &'a dyn crate::dispatch::Dispatch,
    pub index: &'a RefCell<crate::line_index::PositionIndex>,
    pub tracker: &'a crate::tracker::ModificationTracker,
    pub observers: &'a crate::observers::Observers,
}

/// A byte to char translation made early in an edit, valid until the edit completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CachedTranslation {
    byte_position: usize,
    char_position: usize,
}

/// Turns engine notifications into [`crate::notification::BridgeEvent`]s.
///
/// One edit arrives as up to three modification records and is raised as
/// insert-check, before-insert or before-delete, insert or delete, then
/// text-changed. The index is repaired before the insert or delete event is raised.
#[derive(Debug, Default)]
pub struct NotificationDecoder {
    cache: Cell<Option<CachedTranslation>>,
    pre_edit_depth: Cell<usize>,
}

/// Marks a pre-edit handler as running for as long as it lives.
struct PreEditScope<'a>(&'a Cell<usize>);

impl<'a> PreEditScope<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);

        Self(depth)
    }
}

impl Drop for PreEditScope<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

impl NotificationDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True while an insert-check, before-insert or before-delete handler is running.
    /// The engine is mid-edit then and must not be asked to edit again.
    #[inline]
    #[must_use]
    pub fn in_pre_edit(&self) -> bool {
        self.pre_edit_depth.get() > 0
    }

    /// Forgets any translation carried over from an unfinished edit.
    pub fn reset(&self) {
        self.cache.set(None);
    }

    /// Decodes a raw record and processes it. Unknown codes are ignored.
    ///
    /// # Safety
    ///
    /// `raw` must satisfy the contract of [`crate::notification::Notification::decode`].
    pub unsafe fn process_raw(
        &self,
        ctx: &DecodeContext<'_>,
        raw: &crate::protocol::ScNotification,
    ) {
        // SAFETY: forwarded from this function's contract.
        match unsafe { crate::notification::Notification::decode(raw) } {
            Ok(notification) => self.process(ctx, &notification),
            Err(code) => tracing::debug!(code, "ignoring unknown notification"),
        }
    }

    pub fn process(
        &self,
        ctx: &DecodeContext<'_>,
        notification: &crate::notification::Notification,
    ) {
        if notification.code == crate::notification::NotificationCode::Modified {
            self.process_modification(ctx, notification);
        } else {
            let mut event = Self::narrow_event(ctx, notification);

            ctx.observers.emit(&mut event);
        }
    }

    /*

    =========================
    ===== MODIFICATIONS =====
    =========================

    */

    fn process_modification(
        &self,
        ctx: &DecodeContext<'_>,
        notification: &crate::notification::Notification,
    ) {
        let source = crate::enums::ModificationSource::from_flags(notification.modification_type);
        let byte_position = notification.byte_position();

        if notification.has_flag(crate::protocol::SC_MOD_INSERTCHECK) {
            let position = self.cached_char_position(ctx, byte_position);
            let mut event =
                crate::notification::BridgeEvent::InsertCheck(crate::notification::InsertCheck {
                    position,
                    text: notification.text_lossy(),
                    replacement: None,
                });

            self.emit_pre_edit(ctx, &mut event);

            if let crate::notification::BridgeEvent::InsertCheck(check) = event
                && let Some(replacement) = check.replacement
            {
                tracing::debug!(position, len = replacement.len(), "insertion replaced by handler");

                ctx.dispatch.send(
                    crate::protocol::SCI_CHANGEINSERTION,
                    replacement.len(),
                    replacement.as_ptr() as isize,
                );
            }
        }

        if notification.has_flag(crate::protocol::SC_MOD_BEFOREINSERT) {
            let text = notification.text.as_deref().unwrap_or_default();
            let mut event = crate::notification::BridgeEvent::BeforeInsert(crate::notification::TextEdit {
                position: self.cached_char_position(ctx, byte_position),
                length: crate::utf::utf16_len(text),
                text: notification.text_lossy(),
                lines_added: 0,
                source,
            });

            self.emit_pre_edit(ctx, &mut event);
        }

        if notification.has_flag(crate::protocol::SC_MOD_BEFOREDELETE) {
            let position = self.cached_char_position(ctx, byte_position);
            let end = Self::char_position(ctx, byte_position.saturating_add(notification.length));
            let mut event = crate::notification::BridgeEvent::BeforeDelete(crate::notification::TextEdit {
                position,
                length: end.saturating_sub(position),
                text: String::new(),
                lines_added: 0,
                source,
            });

            self.emit_pre_edit(ctx, &mut event);
        }

        if let Some(edit) = crate::tracker::EditRecord::from_notification(notification) {
            let end = byte_position.saturating_add(edit.length);
            // Deleted chars can only be measured before the index forgets them.
            let deleted_end = match (edit.text, edit.kind) {
                (None, crate::enums::EditKind::Delete) => Some(Self::char_position(ctx, end)),
                _ => None,
            };

            ctx.tracker
                .apply(&mut ctx.index.borrow_mut(), ctx.dispatch, &edit);

            let position = self.cached_char_position(ctx, byte_position);
            let length = match (edit.text, deleted_end) {
                (Some(text), _) => crate::utf::utf16_len(text),
                (None, Some(deleted_end)) => deleted_end.saturating_sub(position),
                (None, None) => Self::char_position(ctx, end).saturating_sub(position),
            };
            let text_edit = crate::notification::TextEdit {
                position,
                length,
                text: notification.text_lossy(),
                lines_added: edit.lines_added,
                source,
            };
            let mut event = match edit.kind {
                crate::enums::EditKind::Insert => crate::notification::BridgeEvent::Insert(text_edit),
                crate::enums::EditKind::Delete => crate::notification::BridgeEvent::Delete(text_edit),
            };

            ctx.observers.emit(&mut event);
            self.cache.set(None);
            ctx.observers
                .emit(&mut crate::notification::BridgeEvent::TextChanged);
        }

        if notification.has_flag(crate::protocol::SC_MOD_CHANGEANNOTATION) {
            ctx.observers
                .emit(&mut crate::notification::BridgeEvent::ChangeAnnotation {
                    line: notification.line,
                    lines_added: notification.annotation_lines_added,
                });
        }
    }

    fn emit_pre_edit(&self, ctx: &DecodeContext<'_>, event: &mut crate::notification::BridgeEvent) {
        let _scope = PreEditScope::enter(&self.pre_edit_depth);

        ctx.observers.emit(event);
    }

    /// Char position of `byte_position`, reusing the translation made earlier
    /// in the same edit when it was for the same byte.
    fn cached_char_position(&self, ctx: &DecodeContext<'_>, byte_position: usize) -> usize {
        if let Some(cached) = self.cache.get()
            && cached.byte_position == byte_position
        {
            return cached.char_position;
        }

        let char_position = Self::char_position(ctx, byte_position);

        self.cache.set(Some(CachedTranslation {
            byte_position,
            char_position,
        }));

        char_position
    }

    fn char_position(ctx: &DecodeContext<'_>, byte_position: usize) -> usize {
        let index = ctx.index.borrow();

        crate::translator::OffsetTranslator::new(&index, ctx.dispatch).byte_to_char(byte_position)
    }

    /*

    =========================
    ===== NARROW EVENTS =====
    =========================

    */

    fn narrow_event(
        ctx: &DecodeContext<'_>,
        notification: &crate::notification::Notification,
    ) -> crate::notification::BridgeEvent {
        use crate::notification::BridgeEvent as E;
        use crate::notification::NotificationCode as C;

        let position = notification
            .position
            .map(|byte_position| Self::char_position(ctx, byte_position));
        let modifiers = notification.modifiers;
        let completion = || crate::notification::AutoCompletion {
            position,
            text: notification.text_lossy(),
            ch: notification.ch,
            method: notification.list_completion_method,
            list_type: notification.list_type,
        };

        match notification.code {
            C::StyleNeeded => E::StyleNeeded { position },
            C::CharAdded => E::CharAdded { ch: notification.ch },
            C::SavePointReached => E::SavePointReached,
            C::SavePointLeft => E::SavePointLeft,
            C::ModifyAttemptReadOnly => E::ModifyAttemptReadOnly,
            C::Key => E::Key {
                ch: notification.ch,
                modifiers,
            },
            C::DoubleClick => E::DoubleClick {
                position,
                line: notification.line,
                modifiers,
            },
            C::UpdateUi => E::UpdateUi {
                updated: notification.updated,
            },
            // Modifications never reach here.
            C::Modified => E::TextChanged,
            C::MacroRecord => E::MacroRecord {
                message: notification.message,
                w_param: notification.w_param,
                l_param: notification.l_param,
            },
            C::MarginClick => E::MarginClick {
                position,
                margin: notification.margin,
                modifiers,
            },
            C::MarginRightClick => E::MarginRightClick {
                position,
                margin: notification.margin,
                modifiers,
            },
            C::NeedShown => E::NeedShown {
                position,
                length: notification.length,
            },
            C::Painted => E::Painted,
            C::UserListSelection => E::UserListSelection(completion()),
            C::UriDropped => E::UriDropped {
                text: notification.text_lossy(),
            },
            C::DwellStart => E::DwellStart {
                position,
                x: notification.x,
                y: notification.y,
            },
            C::DwellEnd => E::DwellEnd {
                position,
                x: notification.x,
                y: notification.y,
            },
            C::Zoom => E::Zoom,
            C::HotspotClick => E::HotspotClick { position, modifiers },
            C::HotspotDoubleClick => E::HotspotDoubleClick { position, modifiers },
            C::HotspotReleaseClick => E::HotspotReleaseClick { position, modifiers },
            C::CallTipClick => E::CallTipClick { position },
            C::AutoCSelection => E::AutoCSelection(completion()),
            C::AutoCSelectionChange => E::AutoCSelectionChange(completion()),
            C::AutoCCompleted => E::AutoCCompleted(completion()),
            C::AutoCCancelled => E::AutoCCancelled,
            C::AutoCCharDeleted => E::AutoCCharDeleted,
            C::IndicatorClick => E::IndicatorClick { position, modifiers },
            C::IndicatorRelease => E::IndicatorRelease { position, modifiers },
            C::FocusIn => E::FocusIn,
            C::FocusOut => E::FocusOut,
        }
    }
}
