//! A minimal in-memory engine for unit tests: it answers the line and text
//! queries the index and translator issue, and records anything else it is sent.

use std::cell::{Cell, RefCell};

pub struct FakeEngine {
    pub text: RefCell<Vec<u8>>,
    pub doc: Cell<usize>,
    pub text_reads: Cell<usize>,
    /// Every message that is not a query, with any payload copied out.
    pub log: RefCell<Vec<(u32, usize, Vec<u8>)>>,
}

impl FakeEngine {
    pub fn new(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            text: RefCell::new(bytes.to_vec()),
            doc: Cell::new(0x1000),
            text_reads: Cell::new(0),
            log: RefCell::new(Vec::new()),
        }
    }

    pub fn text_reads(&self) -> usize {
        self.text_reads.get()
    }

    /// Applies an edit to the buffer and returns the record the real engine
    /// would deliver for it. `text` is the inserted or deleted text.
    pub fn edit(&self, pos: usize, delete_len: usize, insert: &[u8]) -> crate::notification::Notification {
        let lines_before = Self::count_lines(&self.text.borrow());
        let (kind, text) = {
            let mut buf = self.text.borrow_mut();

            if delete_len > 0 {
                let removed: Vec<u8> = buf.drain(pos..pos + delete_len).collect();

                (crate::protocol::SC_MOD_DELETETEXT, removed)
            } else {
                buf.splice(pos..pos, insert.iter().copied());

                (crate::protocol::SC_MOD_INSERTTEXT, insert.to_vec())
            }
        };
        let lines_added = Self::count_lines(&self.text.borrow()) as isize - lines_before as isize;

        crate::notification::Notification::modification(
            kind | crate::protocol::SC_PERFORMED_USER,
            pos,
            Some(text),
            lines_added,
        )
    }

    /// Line endings in `bytes`, counting `\r\n` once.
    pub fn count_lines(bytes: &[u8]) -> usize {
        Self::line_starts(bytes).len() - 1
    }

    fn line_starts(bytes: &[u8]) -> Vec<usize> {
        let mut starts = vec![0];
        let mut idx = 0;

        while idx < bytes.len() {
            match bytes[idx] {
                b'\r' if bytes.get(idx + 1) == Some(&b'\n') => {
                    idx += 2;
                    starts.push(idx);
                }
                b'\r' | b'\n' => {
                    idx += 1;
                    starts.push(idx);
                }
                _ => idx += 1,
            }
        }

        starts
    }
}

impl crate::dispatch::Dispatch for FakeEngine {
    fn send(&self, code: u32, w_param: usize, l_param: isize) -> isize {
        let text = self.text.borrow();
        let starts = Self::line_starts(&text);
        let line_end = |line: usize| starts.get(line + 1).copied().unwrap_or(text.len());

        let reply = match code {
            crate::protocol::SCI_GETLINECOUNT => starts.len(),
            crate::protocol::SCI_GETLENGTH => text.len(),
            crate::protocol::SCI_GETDOCPOINTER => self.doc.get(),
            crate::protocol::SCI_LINELENGTH => match starts.get(w_param) {
                Some(start) => line_end(w_param) - start,
                None => 0,
            },
            crate::protocol::SCI_POSITIONFROMLINE => {
                starts.get(w_param).copied().unwrap_or(text.len())
            }
            crate::protocol::SCI_LINEFROMPOSITION => {
                starts.partition_point(|start| *start <= w_param) - 1
            }
            crate::protocol::SCI_GETTEXTRANGEFULL => {
                self.text_reads.set(self.text_reads.get() + 1);

                let range = unsafe { &*(l_param as *const crate::protocol::TextRangeFull) };
                let start = (range.chrg.cp_min as usize).min(text.len());
                let end = (range.chrg.cp_max as usize).clamp(start, text.len());
                let out = range.text.cast::<u8>();

                unsafe {
                    std::ptr::copy_nonoverlapping(text[start..end].as_ptr(), out, end - start);
                    *out.add(end - start) = 0;
                }

                end - start
            }
            _ => {
                let payload = if l_param != 0 && code == crate::protocol::SCI_CHANGEINSERTION {
                    unsafe { std::slice::from_raw_parts(l_param as *const u8, w_param) }.to_vec()
                } else {
                    Vec::new()
                };

                self.log.borrow_mut().push((code, w_param, payload));
                0
            }
        };

        reply as isize
    }
}
