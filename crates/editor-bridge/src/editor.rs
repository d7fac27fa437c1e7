use std::cell::RefCell;
use std::rc::Rc;

use bridge_core::dispatch::{Dispatch, DispatchExt, from_word, to_word};
use bridge_core::protocol as p;

/// Messages that modify the document or replace it.
const EDIT_MESSAGES: [u32; 7] = [
    p::SCI_INSERTTEXT,
    p::SCI_CLEARALL,
    p::SCI_SETTEXT,
    p::SCI_APPENDTEXT,
    p::SCI_DELETERANGE,
    p::SCI_REPLACETARGET,
    p::SCI_SETDOCPOINTER,
];

/// One engine instance and the index of the document it shows.
///
/// Engine queries never raise notifications, so the index may stay borrowed
/// across them. Edits release every borrow before calling into the engine,
/// which reports the edit back through [`Editor::on_notification`] before the
/// call returns.
pub struct Editor {
    dispatch: Rc<dyn Dispatch>,
    index: RefCell<bridge_core::PositionIndex>,
    tracker: bridge_core::tracker::ModificationTracker,
    decoder: bridge_core::notification::NotificationDecoder,
    observers: bridge_core::observers::Observers,
    affinity: bridge_core::ThreadAffinity,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("document", &self.tracker.document())
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}

/*

====================
===== CREATION =====
====================

*/

impl Editor {
    /// Switches the engine to UTF-8, enables every modification event and
    /// indexes the current document.
    ///
    /// # Errors
    ///
    /// Fails if the initial index cannot be built.
    pub fn new(dispatch: Rc<dyn Dispatch>) -> bridge_core::BridgeResult<Rc<Self>> {
        dispatch.send(p::SCI_SETCODEPAGE, p::SC_CP_UTF8, 0);
        dispatch.send(p::SCI_SETMODEVENTMASK, p::SC_MODEVENTMASKALL, 0);

        let mut index = bridge_core::PositionIndex::from_metrics(Vec::new())?;
        let tracker = bridge_core::tracker::ModificationTracker::default();

        tracker.bind(&mut index, &*dispatch);

        tracing::debug!(
            document = tracker.document(),
            lines = index.line_count(),
            "editor bound"
        );

        Ok(Rc::new(Self {
            dispatch,
            index: RefCell::new(index),
            tracker,
            decoder: bridge_core::notification::NotificationDecoder::new(),
            observers: bridge_core::observers::Observers::new(),
            affinity: bridge_core::ThreadAffinity::current(),
        }))
    }

    /// A callback for the hosting shell to forward engine notifications to.
    /// It holds the editor weakly, so it may outlive it.
    ///
    /// # Safety
    ///
    /// The callback may only be given records delivered by the engine, see
    /// [`bridge_core::notification::Notification::decode`].
    pub unsafe fn notify_hook(self: &Rc<Self>) -> impl Fn(&p::ScNotification) + 'static {
        let editor = Rc::downgrade(self);

        move |raw: &p::ScNotification| {
            if let Some(editor) = editor.upgrade() {
                // SAFETY: the hook's own contract.
                unsafe { editor.on_notify_raw(raw) };
            }
        }
    }
}

/*

===================
===== ROUTING =====
===================

*/

impl Editor {
    fn context(&self) -> bridge_core::notification::DecodeContext<'_> {
        bridge_core::notification::DecodeContext {
            dispatch: &*self.dispatch,
            index: &self.index,
            tracker: &self.tracker,
            observers: &self.observers,
        }
    }

    pub fn on_notification(&self, notification: &bridge_core::notification::Notification) {
        self.affinity.enforce();
        self.decoder.process(&self.context(), notification);
    }

    /// Entry point for the hosting shell's "notified" signal. Null records are ignored.
    ///
    /// # Safety
    ///
    /// `raw` must be null or point at a live record delivered by the engine.
    pub unsafe fn on_notify_raw(&self, raw: *const p::ScNotification) {
        self.affinity.enforce();

        // SAFETY: the caller guarantees `raw` is null or a live engine record.
        if let Some(raw) = unsafe { raw.as_ref() } {
            // SAFETY: engine records honor the text pointer contract.
            unsafe { self.decoder.process_raw(&self.context(), raw) };
        }
    }

    pub fn subscribe(
        &self,
        kind: bridge_core::notification::EventKind,
        handler: impl FnMut(&mut bridge_core::notification::BridgeEvent) + 'static,
    ) -> bridge_core::observers::SubscriptionId {
        self.observers.subscribe(kind, handler)
    }

    pub fn subscribe_all(
        &self,
        handler: impl FnMut(&mut bridge_core::notification::BridgeEvent) + 'static,
    ) -> bridge_core::observers::SubscriptionId {
        self.observers.subscribe_all(handler)
    }

    pub fn unsubscribe(&self, id: bridge_core::observers::SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn event_channel(
        &self,
    ) -> crossbeam_channel::Receiver<bridge_core::notification::BridgeEvent> {
        self.observers.channel()
    }

    /// Sends any message as is. Switching documents this way rebinds the index.
    ///
    /// # Errors
    ///
    /// Messages that change the text or the document get the same checks as
    /// the typed edits, see [`Editor::insert_text`].
    pub fn send(&self, code: u32, w_param: usize, l_param: isize) -> bridge_core::BridgeResult<isize> {
        if EDIT_MESSAGES.contains(&code) {
            self.check_edit()?;
        }

        let result = self.dispatch.send(code, w_param, l_param);

        if code == p::SCI_SETDOCPOINTER {
            self.rebind();
        }

        Ok(result)
    }
}

/*

=======================
===== TRANSLATION =====
=======================

*/

impl Editor {
    /// Runs `f` against the current index.
    pub fn with_index<R>(&self, f: impl FnOnce(&bridge_core::PositionIndex) -> R) -> R {
        f(&self.index.borrow())
    }

    pub fn char_to_byte(&self, pos: usize) -> usize {
        let index = self.index.borrow();

        bridge_core::OffsetTranslator::new(&index, &*self.dispatch).char_to_byte(pos)
    }

    pub fn byte_to_char(&self, pos: usize) -> usize {
        let index = self.index.borrow();

        bridge_core::OffsetTranslator::new(&index, &*self.dispatch).byte_to_char(pos)
    }

    fn char_span_to_bytes(&self, pos: usize, len: usize) -> (usize, usize) {
        let index = self.index.borrow();

        bridge_core::OffsetTranslator::new(&index, &*self.dispatch).char_span_to_bytes(pos, len)
    }

    pub fn char_line_length(&self, line: usize) -> usize {
        self.index.borrow().char_line_length(line)
    }

    pub fn char_position_from_line(&self, line: usize) -> usize {
        self.index.borrow().char_position_from_line(line)
    }

    pub fn line_from_char_position(&self, pos: usize) -> usize {
        self.index.borrow().line_from_char_position(pos)
    }

    pub fn line_count(&self) -> usize {
        self.index.borrow().line_count()
    }

    /// Document length in chars.
    pub fn text_length(&self) -> usize {
        self.index.borrow().char_len()
    }

    pub fn byte_length(&self) -> usize {
        self.index.borrow().byte_len()
    }
}

/*

================
===== TEXT =====
================

*/

impl Editor {
    /// The whole document. Invalid UTF-8 is replaced with U+FFFD.
    pub fn text(&self) -> String {
        let bytes = self.dispatch.text_range(0, self.byte_length());

        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// `len` chars starting at char `pos`, clamped to the document.
    pub fn text_range(&self, pos: usize, len: usize) -> String {
        let (start, byte_len) = self.char_span_to_bytes(pos, len);
        let bytes = self.dispatch.text_range(start, start + byte_len);

        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Text of `line` including its line ending. Out-of-range lines clamp to the last line.
    pub fn line_text(&self, line: usize) -> String {
        let (start, len) = {
            let index = self.index.borrow();
            let line = line.min(index.line_count().saturating_sub(1));

            (index.byte_position_from_line(line), index.byte_line_length(line))
        };
        let bytes = self.dispatch.text_range(start, start + len);

        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// The character at char `pos`, or `None` at the end of the document.
    /// A position inside a surrogate pair gives the whole character.
    pub fn char_at(&self, pos: usize) -> Option<char> {
        let start = self.char_to_byte(pos);
        let end = (start + 4).min(self.byte_length());
        let bytes = self.dispatch.text_range(start, end);
        let (len, _) = bridge_core::utf::char_at(&bytes);

        if len == 0 {
            return None;
        }

        Some(
            std::str::from_utf8(&bytes[..len])
                .ok()
                .and_then(|text| text.chars().next())
                .unwrap_or(char::REPLACEMENT_CHARACTER),
        )
    }
}

/*

=================
===== EDITS =====
=================

*/

impl Editor {
    /// Edits are refused from the owner's other threads and while the engine
    /// is in the middle of another edit.
    fn check_edit(&self) -> bridge_core::BridgeResult<()> {
        self.affinity.check()?;

        if self.decoder.in_pre_edit() {
            return Err(bridge_core::BridgeError::ReentrantEdit);
        }

        Ok(())
    }

    fn c_string(text: &str) -> bridge_core::BridgeResult<std::ffi::CString> {
        std::ffi::CString::new(text)
            .map_err(|err| bridge_core::BridgeError::InteriorNul(err.nul_position()))
    }

    /// # Errors
    ///
    /// [`bridge_core::BridgeError::ReentrantEdit`] from a pre-edit handler,
    /// [`bridge_core::BridgeError::InteriorNul`] if `text` contains a NUL.
    pub fn insert_text(&self, pos: usize, text: &str) -> bridge_core::BridgeResult<()> {
        self.check_edit()?;

        let text = Self::c_string(text)?;
        let byte_pos = self.char_to_byte(pos);

        self.dispatch
            .send(p::SCI_INSERTTEXT, byte_pos, text.as_ptr() as isize);

        Ok(())
    }

    /// # Errors
    ///
    /// [`bridge_core::BridgeError::ReentrantEdit`] from a pre-edit handler.
    pub fn append_text(&self, text: &str) -> bridge_core::BridgeResult<()> {
        self.check_edit()?;

        self.dispatch
            .send(p::SCI_APPENDTEXT, text.len(), text.as_ptr() as isize);

        Ok(())
    }

    /// Deletes `len` chars at char `pos`, clamped to the document.
    ///
    /// # Errors
    ///
    /// [`bridge_core::BridgeError::ReentrantEdit`] from a pre-edit handler.
    pub fn delete_range(&self, pos: usize, len: usize) -> bridge_core::BridgeResult<()> {
        self.check_edit()?;

        let (start, byte_len) = self.char_span_to_bytes(pos, len);

        if byte_len > 0 {
            self.dispatch
                .send(p::SCI_DELETERANGE, start, to_word(byte_len));
        }

        Ok(())
    }

    /// # Errors
    ///
    /// [`bridge_core::BridgeError::ReentrantEdit`] from a pre-edit handler.
    pub fn clear_all(&self) -> bridge_core::BridgeResult<()> {
        self.check_edit()?;
        self.dispatch.send(p::SCI_CLEARALL, 0, 0);

        Ok(())
    }

    /// # Errors
    ///
    /// [`bridge_core::BridgeError::ReentrantEdit`] from a pre-edit handler,
    /// [`bridge_core::BridgeError::InteriorNul`] if `text` contains a NUL.
    pub fn set_text(&self, text: &str) -> bridge_core::BridgeResult<()> {
        self.check_edit()?;

        let text = Self::c_string(text)?;

        self.dispatch.send(p::SCI_SETTEXT, 0, text.as_ptr() as isize);

        Ok(())
    }

    /// Replaces chars `start..end` with `text` and returns how many chars
    /// ended up in their place, which differs from `text` when an insert-check
    /// handler rewrote it.
    ///
    /// # Errors
    ///
    /// [`bridge_core::BridgeError::ReentrantEdit`] from a pre-edit handler.
    pub fn replace_target(
        &self,
        start: usize,
        end: usize,
        text: &str,
    ) -> bridge_core::BridgeResult<usize> {
        self.check_edit()?;

        let byte_start = self.char_to_byte(start);
        let byte_end = self.char_to_byte(end.max(start));

        self.dispatch
            .send(p::SCI_SETTARGETRANGE, byte_start, to_word(byte_end));
        self.dispatch
            .send(p::SCI_REPLACETARGET, text.len(), text.as_ptr() as isize);

        let target_start = from_word(self.dispatch.send(p::SCI_GETTARGETSTART, 0, 0));
        let target_end = from_word(self.dispatch.send(p::SCI_GETTARGETEND, 0, 0));

        Ok(self
            .byte_to_char(target_end)
            .saturating_sub(self.byte_to_char(target_start)))
    }
}

/*

============================
===== CARET/SELECTION ======
============================

*/

impl Editor {
    fn char_reply(&self, code: u32) -> usize {
        self.byte_to_char(from_word(self.dispatch.send(code, 0, 0)))
    }

    pub fn current_position(&self) -> usize {
        self.char_reply(p::SCI_GETCURRENTPOS)
    }

    pub fn set_current_position(&self, pos: usize) {
        let byte_pos = self.char_to_byte(pos);

        self.dispatch.send(p::SCI_SETCURRENTPOS, byte_pos, 0);
    }

    pub fn anchor(&self) -> usize {
        self.char_reply(p::SCI_GETANCHOR)
    }

    pub fn set_anchor(&self, pos: usize) {
        let byte_pos = self.char_to_byte(pos);

        self.dispatch.send(p::SCI_SETANCHOR, byte_pos, 0);
    }

    pub fn selection_start(&self) -> usize {
        self.char_reply(p::SCI_GETSELECTIONSTART)
    }

    pub fn selection_end(&self) -> usize {
        self.char_reply(p::SCI_GETSELECTIONEND)
    }

    pub fn set_selection(&self, caret: usize, anchor: usize) {
        let caret = self.char_to_byte(caret);
        let anchor = self.char_to_byte(anchor);

        self.dispatch.send(p::SCI_SETSEL, anchor, to_word(caret));
    }

    pub fn goto_position(&self, pos: usize) {
        let byte_pos = self.char_to_byte(pos);

        self.dispatch.send(p::SCI_GOTOPOS, byte_pos, 0);
    }
}

/*

=====================
===== DOCUMENTS =====
=====================

*/

impl Editor {
    pub fn document(&self) -> Option<crate::document::Document> {
        crate::document::Document::from_pointer(self.dispatch.doc_pointer())
    }

    /// Shows `document` and rebuilds the index for it.
    ///
    /// # Errors
    ///
    /// [`bridge_core::BridgeError::ReentrantEdit`] from a pre-edit handler.
    pub fn set_document(&self, document: crate::document::Document) -> bridge_core::BridgeResult<()> {
        self.send(p::SCI_SETDOCPOINTER, 0, document.as_word())?;

        Ok(())
    }

    /// # Errors
    ///
    /// [`bridge_core::BridgeError::InvalidReply`] if the engine returns a null document.
    pub fn create_document(&self) -> bridge_core::BridgeResult<crate::document::Document> {
        let reply = self.dispatch.send(p::SCI_CREATEDOCUMENT, 0, 0);

        crate::document::Document::from_pointer(from_word(reply)).ok_or(
            bridge_core::BridgeError::InvalidReply {
                code: p::SCI_CREATEDOCUMENT,
                value: reply,
            },
        )
    }

    pub fn add_ref_document(&self, document: crate::document::Document) {
        self.dispatch
            .send(p::SCI_ADDREFDOCUMENT, 0, document.as_word());
    }

    pub fn release_document(&self, document: crate::document::Document) {
        self.dispatch
            .send(p::SCI_RELEASEDOCUMENT, 0, document.as_word());
    }

    /// Rebuilds the index from the engine without waiting for a mismatch.
    pub fn rebuild_index(&self) {
        self.rebind();
    }

    fn rebind(&self) {
        self.decoder.reset();
        self.tracker
            .bind(&mut self.index.borrow_mut(), &*self.dispatch);

        tracing::debug!(document = self.tracker.document(), "editor rebound");
    }
}
