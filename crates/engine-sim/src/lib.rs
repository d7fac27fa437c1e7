//! An in-process engine that answers the message subset the bridge uses.
//!
//! It keeps documents as plain byte buffers and delivers notifications the
//! same way the native engine does: synchronously, from inside `send`, before
//! the call returns. Like the native engine it trusts pointer parameters.

pub mod document;

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{CStr, c_char};
use std::ops::AddAssign;
use std::rc::Rc;

use bridge_core::dispatch::{from_word, to_word};
use bridge_core::protocol as p;

pub type NotifyTarget = Rc<dyn Fn(&p::ScNotification)>;

/// Document pointers are plain ids spaced like real allocations.
const DOC_STRIDE: usize = 0x1000;

#[derive(Debug)]
struct State {
    documents: HashMap<usize, document::SimDocument>,
    current: usize,
    next_doc: usize,
    caret: usize,
    anchor: usize,
    target: (usize, usize),
    code_page: usize,
    mod_event_mask: usize,
    /// Set while insert-check handlers run; holds any replacement they request.
    insert_check: Option<Option<Vec<u8>>>,
    performed: i32,
}

pub struct SimEngine {
    state: RefCell<State>,
    notify: RefCell<Option<NotifyTarget>>,
    /// Copied into every record's header.
    id: usize,
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SimEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimEngine")
            .field("state", &self.state)
            .field("has_notify_target", &self.notify.borrow().is_some())
            .finish()
    }
}

/*

====================
===== CREATION =====
====================

*/

impl SimEngine {
    #[must_use]
    pub fn new() -> Self {
        let mut documents = HashMap::new();

        documents.insert(DOC_STRIDE, document::SimDocument::default());

        Self {
            state: RefCell::new(State {
                documents,
                current: DOC_STRIDE,
                next_doc: DOC_STRIDE * 2,
                caret: 0,
                anchor: 0,
                target: (0, 0),
                code_page: 0,
                mod_event_mask: p::SC_MODEVENTMASKALL,
                insert_check: None,
                performed: p::SC_PERFORMED_USER,
            }),
            notify: RefCell::new(None),
            id: 1,
        }
    }

    /// Loads `bytes` into the current document without raising notifications.
    #[must_use]
    pub fn with_text(bytes: &[u8]) -> Self {
        let engine = Self::new();

        {
            let mut state = engine.state.borrow_mut();
            let current = state.current;

            if let Some(doc) = state.documents.get_mut(&current) {
                doc.insert(0, bytes);
            }
        }

        engine
    }

    /// Where notifications go. Replaces any previous target.
    pub fn set_notify_target(&self, target: impl Fn(&p::ScNotification) + 'static) {
        *self.notify.borrow_mut() = Some(Rc::new(target));
    }

    /// Flags attached to later edits, e.g. `SC_PERFORMED_UNDO` to replay an undo.
    pub fn set_performed(&self, performed: i32) {
        self.state.borrow_mut().performed = performed;
    }

    /// Bytes of the current document.
    #[must_use]
    pub fn text(&self) -> Vec<u8> {
        let state = self.state.borrow();

        state
            .documents
            .get(&state.current)
            .map(|doc| doc.text.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn code_page(&self) -> usize {
        self.state.borrow().code_page
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.state.borrow().documents.len()
    }

    /// Delivers an arbitrary record, as the engine would for clicks, dwell and the like.
    pub fn raise(&self, notification: &p::ScNotification) {
        let target = self.notify.borrow().clone();

        if let Some(target) = target {
            target(notification);
        }
    }

    /// Raises a notification of `code` built by `fill`.
    pub fn raise_with(&self, code: u32, fill: impl FnOnce(&mut p::ScNotification)) {
        let mut notification = self.record(code);

        fill(&mut notification);
        self.raise(&notification);
    }

    fn record(&self, code: u32) -> p::ScNotification {
        let mut notification = p::ScNotification::with_code(code);

        notification.header.id_from = self.id;

        notification
    }
}

/*

=================
===== EDITS =====
=================

*/

impl SimEngine {
    fn modified(&self, flags: i32, position: usize, text: Option<&[u8]>, length: usize, lines_added: isize) {
        if self.state.borrow().mod_event_mask & (flags as usize) == 0 {
            return;
        }

        let mut notification = self.record(p::SCN_MODIFIED);

        notification.modification_type = flags;
        notification.position = to_word(position);
        notification.length = to_word(length);
        notification.lines_added = lines_added;
        notification.text = text.map_or(std::ptr::null(), |text| text.as_ptr().cast());

        self.raise(&notification);
    }

    /// Full insert sequence: insert-check, before-insert, the edit, insert.
    /// Returns the number of bytes actually inserted.
    fn insert(&self, pos: usize, bytes: &[u8]) -> usize {
        let (pos, performed) = {
            let state = self.state.borrow();
            let len = state.documents.get(&state.current).map_or(0, document::SimDocument::len);

            (pos.min(len), state.performed)
        };

        self.state.borrow_mut().insert_check = Some(None);
        self.modified(p::SC_MOD_INSERTCHECK, pos, Some(bytes), bytes.len(), 0);

        let replacement = self.state.borrow_mut().insert_check.take().flatten();
        let bytes = replacement.as_deref().unwrap_or(bytes);

        if bytes.is_empty() {
            return 0;
        }

        self.modified(p::SC_MOD_BEFOREINSERT | performed, pos, Some(bytes), bytes.len(), 0);

        let lines_added = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            let current = state.current;
            let lines_added = state
                .documents
                .get_mut(&current)
                .map_or(0, |doc| doc.insert(pos, bytes));

            for mark in [&mut state.caret, &mut state.anchor] {
                if *mark > pos {
                    mark.add_assign(bytes.len());
                }
            }

            lines_added
        };

        self.modified(p::SC_MOD_INSERTTEXT | performed, pos, Some(bytes), bytes.len(), lines_added);

        bytes.len()
    }

    fn delete(&self, pos: usize, len: usize) {
        let (pos, len, performed) = {
            let state = self.state.borrow();
            let doc_len = state.documents.get(&state.current).map_or(0, document::SimDocument::len);
            let pos = pos.min(doc_len);

            (pos, len.min(doc_len - pos), state.performed)
        };

        if len == 0 {
            return;
        }

        self.modified(p::SC_MOD_BEFOREDELETE | performed, pos, None, len, 0);

        let (removed, lines_added) = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            let current = state.current;
            let result = state
                .documents
                .get_mut(&current)
                .map_or((Vec::new(), 0), |doc| doc.delete(pos, len));

            for mark in [&mut state.caret, &mut state.anchor] {
                if *mark > pos {
                    *mark = (*mark).saturating_sub(len).max(pos);
                }
            }

            result
        };

        self.modified(p::SC_MOD_DELETETEXT | performed, pos, Some(&removed), removed.len(), lines_added);
    }

    fn doc_len(&self) -> usize {
        let state = self.state.borrow();

        state.documents.get(&state.current).map_or(0, document::SimDocument::len)
    }

    /// Reads a NUL-terminated string parameter.
    fn c_string(l_param: isize) -> Vec<u8> {
        if l_param == 0 {
            return Vec::new();
        }

        // SAFETY: the protocol passes NUL-terminated strings for these messages.
        unsafe { CStr::from_ptr(l_param as *const c_char) }.to_bytes().to_vec()
    }

    /// Reads a length-prefixed string parameter.
    fn counted_string(len: usize, l_param: isize) -> Vec<u8> {
        if l_param == 0 || len == 0 {
            return Vec::new();
        }

        // SAFETY: the protocol passes `len` readable bytes for these messages.
        unsafe { std::slice::from_raw_parts(l_param as *const u8, len) }.to_vec()
    }
}

/*

=====================
===== DOCUMENTS =====
=====================

*/

impl SimEngine {
    fn create_document(&self) -> usize {
        let mut state = self.state.borrow_mut();
        let doc = state.next_doc;

        state.next_doc.add_assign(DOC_STRIDE);
        state.documents.insert(doc, document::SimDocument::default());

        doc
    }

    fn add_ref(&self, doc: usize) {
        if let Some(document) = self.state.borrow_mut().documents.get_mut(&doc) {
            document.refs.add_assign(1);
        }
    }

    fn release(&self, doc: usize) {
        let mut state = self.state.borrow_mut();
        let drop_it = match state.documents.get_mut(&doc) {
            Some(document) => {
                document.refs = document.refs.saturating_sub(1);
                document.refs == 0
            }
            None => false,
        };

        if drop_it {
            state.documents.remove(&doc);
            tracing::trace!(doc, "document released");
        }
    }

    fn set_document(&self, doc: usize) {
        let doc = if doc == 0 { self.create_document() } else { doc };

        if !self.state.borrow().documents.contains_key(&doc) {
            tracing::warn!(doc, "SETDOCPOINTER with unknown document");
            return;
        }

        let old = self.state.borrow().current;

        if old == doc {
            return;
        }

        // The view holds a reference to whatever it shows.
        self.add_ref(doc);

        {
            let mut state = self.state.borrow_mut();

            state.current = doc;
            state.caret = 0;
            state.anchor = 0;
            state.target = (0, 0);
        }

        self.release(old);
    }
}

/*

====================
===== DISPATCH =====
====================

*/

impl bridge_core::dispatch::Dispatch for SimEngine {
    fn send(&self, code: u32, w_param: usize, l_param: isize) -> isize {
        let result = self.handle(code, w_param, l_param);

        tracing::trace!(code, w_param, l_param, result, "sim send");

        result
    }
}

impl SimEngine {
    fn handle(&self, code: u32, w_param: usize, l_param: isize) -> isize {
        match code {
            p::SCI_INSERTTEXT => {
                let pos = if is_minus_one(w_param) {
                    self.state.borrow().caret
                } else {
                    w_param
                };

                self.insert(pos, &Self::c_string(l_param));
                0
            }
            p::SCI_APPENDTEXT => {
                self.insert(self.doc_len(), &Self::counted_string(w_param, l_param));
                0
            }
            p::SCI_CLEARALL => {
                self.delete(0, self.doc_len());
                0
            }
            p::SCI_SETTEXT => {
                self.delete(0, self.doc_len());
                self.insert(0, &Self::c_string(l_param));
                0
            }
            p::SCI_DELETERANGE => {
                self.delete(w_param, from_word(l_param));
                0
            }
            p::SCI_REPLACETARGET => {
                let text = if is_minus_one(w_param) {
                    Self::c_string(l_param)
                } else {
                    Self::counted_string(w_param, l_param)
                };
                let (start, end) = self.state.borrow().target;

                self.delete(start, end - start);

                let inserted = self.insert(start, &text);

                self.state.borrow_mut().target = (start, start + inserted);

                to_word(inserted)
            }
            p::SCI_CHANGEINSERTION => {
                let mut state = self.state.borrow_mut();

                match state.insert_check.as_mut() {
                    Some(slot) => {
                        *slot = Some(Self::counted_string(w_param, l_param));
                        0
                    }
                    None => {
                        tracing::warn!("SCI_CHANGEINSERTION outside insert-check");
                        0
                    }
                }
            }
            p::SCI_GETTEXTRANGEFULL => self.text_range(l_param),
            p::SCI_GETCHARAT => {
                let state = self.state.borrow();

                state
                    .documents
                    .get(&state.current)
                    .and_then(|doc| doc.text.get(w_param))
                    .map_or(0, |byte| isize::from(*byte as i8))
            }
            p::SCI_GETCODEPAGE => to_word(self.state.borrow().code_page),
            p::SCI_SETCODEPAGE => {
                self.state.borrow_mut().code_page = w_param;
                0
            }
            p::SCI_SETMODEVENTMASK => {
                self.state.borrow_mut().mod_event_mask = w_param;
                0
            }
            p::SCI_GETDOCPOINTER => to_word(self.state.borrow().current),
            p::SCI_SETDOCPOINTER => {
                self.set_document(from_word(l_param));
                0
            }
            p::SCI_CREATEDOCUMENT => to_word(self.create_document()),
            p::SCI_ADDREFDOCUMENT => {
                self.add_ref(from_word(l_param));
                0
            }
            p::SCI_RELEASEDOCUMENT => {
                self.release(from_word(l_param));
                0
            }
            _ => self.query(code, w_param, l_param),
        }
    }

    /// Messages that only read or move the caret and target.
    fn query(&self, code: u32, w_param: usize, l_param: isize) -> isize {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let Some(doc) = state.documents.get(&state.current) else {
            return 0;
        };
        let clamp = |pos: usize| pos.min(doc.len());

        match code {
            p::SCI_GETLENGTH => to_word(doc.len()),
            p::SCI_GETLINECOUNT => to_word(doc.line_count()),
            p::SCI_LINELENGTH => to_word(doc.line_length(w_param)),
            p::SCI_POSITIONFROMLINE => doc.line_start(w_param).map_or(-1, to_word),
            p::SCI_LINEFROMPOSITION => to_word(doc.line_from_position(w_param)),
            p::SCI_GETLINEENDPOSITION => to_word(doc.line_end(w_param)),
            p::SCI_GETCURRENTPOS => to_word(state.caret),
            p::SCI_GETANCHOR => to_word(state.anchor),
            p::SCI_GETSELECTIONSTART => to_word(state.caret.min(state.anchor)),
            p::SCI_GETSELECTIONEND => to_word(state.caret.max(state.anchor)),
            p::SCI_GETTARGETSTART => to_word(state.target.0),
            p::SCI_GETTARGETEND => to_word(state.target.1),
            p::SCI_GOTOPOS => {
                state.caret = clamp(w_param);
                state.anchor = state.caret;
                0
            }
            p::SCI_SETCURRENTPOS => {
                state.caret = clamp(w_param);
                0
            }
            p::SCI_SETANCHOR => {
                state.anchor = clamp(w_param);
                0
            }
            p::SCI_SETSELECTIONSTART => {
                state.anchor = clamp(w_param);
                state.caret = state.caret.max(state.anchor);
                0
            }
            p::SCI_SETSELECTIONEND => {
                state.caret = clamp(w_param);
                state.anchor = state.anchor.min(state.caret);
                0
            }
            p::SCI_SETSEL => {
                state.anchor = clamp(w_param);
                // A negative caret means the end of the document.
                state.caret = if l_param < 0 {
                    doc.len()
                } else {
                    clamp(from_word(l_param))
                };
                0
            }
            p::SCI_SETTARGETRANGE => {
                let start = clamp(w_param);

                state.target = (start, clamp(from_word(l_param)).max(start));
                0
            }
            _ => {
                tracing::debug!(code, "sim engine ignores message");
                0
            }
        }
    }

    fn text_range(&self, l_param: isize) -> isize {
        if l_param == 0 {
            return 0;
        }

        // SAFETY: the protocol passes a live `TextRangeFull` whose buffer has
        // room for the range plus a NUL.
        let range = unsafe { &*(l_param as *const p::TextRangeFull) };
        let state = self.state.borrow();
        let Some(doc) = state.documents.get(&state.current) else {
            return 0;
        };
        let start = from_word(range.chrg.cp_min).min(doc.len());
        let end = if range.chrg.cp_max < 0 {
            doc.len()
        } else {
            from_word(range.chrg.cp_max).clamp(start, doc.len())
        };
        let out = range.text.cast::<u8>();

        if out.is_null() {
            return 0;
        }

        // SAFETY: see above.
        unsafe {
            std::ptr::copy_nonoverlapping(doc.text[start..end].as_ptr(), out, end - start);
            *out.add(end - start) = 0;
        }

        to_word(end - start)
    }
}

/// `usize::MAX` is how a `-1` word arrives in an unsigned parameter.
#[inline]
fn is_minus_one(word: usize) -> bool {
    word == usize::MAX
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::dispatch::{Dispatch, DispatchExt};
    use std::cell::RefCell;

    fn recorder(engine: &SimEngine) -> Rc<RefCell<Vec<(i32, isize, isize, Vec<u8>)>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = Rc::clone(&log);

        engine.set_notify_target(move |notification| {
            let text = if notification.text.is_null() {
                Vec::new()
            } else {
                unsafe {
                    std::slice::from_raw_parts(
                        notification.text.cast::<u8>(),
                        notification.length as usize,
                    )
                }
                .to_vec()
            };

            log_clone.borrow_mut().push((
                notification.modification_type,
                notification.position,
                notification.lines_added,
                text,
            ));
        });

        log
    }

    #[test]
    fn test_insert_raises_full_sequence() {
        let engine = SimEngine::with_text(b"ab");
        let log = recorder(&engine);

        engine.send(p::SCI_INSERTTEXT, 1, c"X\n".as_ptr() as isize);

        let flags: Vec<i32> = log.borrow().iter().map(|entry| entry.0).collect();

        assert_eq!(
            flags,
            vec![
                p::SC_MOD_INSERTCHECK,
                p::SC_MOD_BEFOREINSERT | p::SC_PERFORMED_USER,
                p::SC_MOD_INSERTTEXT | p::SC_PERFORMED_USER
            ]
        );
        assert_eq!(log.borrow()[2].2, 1);
        assert_eq!(engine.text(), b"aX\nb");
        assert_eq!(engine.line_count(), 2);
    }

    #[test]
    fn test_change_insertion_during_insert_check() {
        let engine = Rc::new(SimEngine::with_text(b""));
        let weak = Rc::downgrade(&engine);

        engine.set_notify_target(move |notification| {
            if notification.modification_type == p::SC_MOD_INSERTCHECK
                && let Some(engine) = weak.upgrade()
            {
                let replacement = b"replaced";

                engine.send(p::SCI_CHANGEINSERTION, replacement.len(), replacement.as_ptr() as isize);
            }
        });

        engine.send(p::SCI_APPENDTEXT, 3, b"abc".as_ptr() as isize);

        assert_eq!(engine.text(), b"replaced");
    }

    #[test]
    fn test_delete_range_reports_removed_text() {
        let engine = SimEngine::with_text(b"one\ntwo");
        let log = recorder(&engine);

        engine.send(p::SCI_DELETERANGE, 2, 3);

        let log = log.borrow();

        assert_eq!(log[0].0, p::SC_MOD_BEFOREDELETE | p::SC_PERFORMED_USER);
        assert_eq!(log[1].3, b"e\nt");
        assert_eq!(log[1].2, -1);
        assert_eq!(engine.text(), b"onwo");
    }

    #[test]
    fn test_mask_filters_notifications() {
        let engine = SimEngine::new();
        let log = recorder(&engine);

        engine.send(p::SCI_SETMODEVENTMASK, p::SC_MOD_INSERTTEXT as usize, 0);
        engine.send(p::SCI_SETTEXT, 0, c"abc".as_ptr() as isize);

        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_line_queries_and_text_range() {
        let engine = SimEngine::with_text(b"ab\r\ncd\n");

        assert_eq!(engine.line_count(), 3);
        assert_eq!(engine.line_length(0), 4);
        assert_eq!(engine.position_from_line(1), 4);
        assert_eq!(engine.send(p::SCI_POSITIONFROMLINE, 9, 0), -1);
        assert_eq!(engine.send(p::SCI_LINEFROMPOSITION, 5, 0), 1);
        assert_eq!(engine.send(p::SCI_GETLINEENDPOSITION, 0, 0), 2);
        assert_eq!(DispatchExt::text_range(&engine, 1, 5), b"b\r\nc");
    }

    #[test]
    fn test_documents_are_reference_counted() {
        let engine = SimEngine::with_text(b"first");
        let first = engine.doc_pointer();
        let second = from_word(engine.send(p::SCI_CREATEDOCUMENT, 0, 0));

        // Keep the first document alive while the view shows the second.
        engine.send(p::SCI_ADDREFDOCUMENT, 0, to_word(first));
        engine.send(p::SCI_SETDOCPOINTER, 0, to_word(second));

        assert_eq!(engine.doc_pointer(), second);
        assert_eq!(engine.byte_length(), 0);
        assert_eq!(engine.document_count(), 2);

        engine.send(p::SCI_SETDOCPOINTER, 0, to_word(first));
        assert_eq!(engine.text(), b"first");

        // The view let go of the second document, so one release frees it.
        engine.send(p::SCI_RELEASEDOCUMENT, 0, to_word(second));
        assert_eq!(engine.document_count(), 1);
    }

    #[test]
    fn test_selection_and_target() {
        let engine = SimEngine::with_text(b"hello world");

        engine.send(p::SCI_SETSEL, 2, 5);
        assert_eq!(engine.send(p::SCI_GETSELECTIONSTART, 0, 0), 2);
        assert_eq!(engine.send(p::SCI_GETCURRENTPOS, 0, 0), 5);

        engine.send(p::SCI_SETTARGETRANGE, 6, 11);
        let replaced = engine.send(p::SCI_REPLACETARGET, usize::MAX, c"there".as_ptr() as isize);

        assert_eq!(replaced, 5);
        assert_eq!(engine.text(), b"hello there");
        assert_eq!(engine.send(p::SCI_GETTARGETEND, 0, 0), 11);
    }
}
