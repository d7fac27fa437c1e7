//! Keeps a [`crate::line_index::PositionIndex`] in step with the engine across edits.
//!
//! Each insert or delete re-reads only the lines around the edit. The window
//! starts one byte before the edit so that a `\r` directly in front of it is
//! included: joining or splitting a `\r\n` pair changes the line structure on
//! both sides of the edit point.

use crate::dispatch::DispatchExt;

/// The parts of an edit notification the tracker needs. Positions are bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditRecord<'a> {
    pub kind: crate::enums::EditKind,
    pub position: usize,
    pub length: usize,
    pub lines_added: isize,
    pub text: Option<&'a [u8]>,
}

impl<'a> EditRecord<'a> {
    /// `None` unless the notification is a completed insert or delete.
    #[must_use]
    pub fn from_notification(notification: &'a crate::notification::Notification) -> Option<Self> {
        let kind = if notification.has_flag(crate::protocol::SC_MOD_INSERTTEXT) {
            crate::enums::EditKind::Insert
        } else if notification.has_flag(crate::protocol::SC_MOD_DELETETEXT) {
            crate::enums::EditKind::Delete
        } else {
            return None;
        };

        Some(Self {
            kind,
            position: notification.byte_position(),
            length: notification.length,
            lines_added: notification.lines_added,
            text: notification.text.as_deref(),
        })
    }
}

/// How an edit was folded into the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repair {
    /// One ASCII line changed length in place.
    Adjusted { line: usize },
    /// `old_lines` lines starting at `first_line` were re-read as `new_lines` lines.
    Patched {
        first_line: usize,
        old_lines: usize,
        new_lines: usize,
    },
    /// The whole index was rebuilt from the engine.
    Rebuilt,
}

#[derive(Debug, Default)]
pub struct ModificationTracker {
    document: std::cell::Cell<usize>,
}

impl ModificationTracker {
    #[must_use]
    pub fn new(document: usize) -> Self {
        Self {
            document: std::cell::Cell::new(document),
        }
    }

    #[inline]
    #[must_use]
    pub fn document(&self) -> usize {
        self.document.get()
    }

    /// Binds a new document and rebuilds the index for it.
    pub fn bind(
        &self,
        index: &mut crate::line_index::PositionIndex,
        dispatch: &dyn crate::dispatch::Dispatch,
    ) -> Repair {
        self.document.set(dispatch.doc_pointer());

        self.rebuild(index, dispatch)
    }

    /// Folds one completed edit into `index`. Falls back to a full rebuild
    /// whenever the incremental result cannot be confirmed against the engine.
    pub fn apply(
        &self,
        index: &mut crate::line_index::PositionIndex,
        dispatch: &dyn crate::dispatch::Dispatch,
        edit: &EditRecord<'_>,
    ) -> Repair {
        let document = dispatch.doc_pointer();

        if document != self.document.get() {
            tracing::warn!(
                expected = self.document.get(),
                found = document,
                "document changed underneath the index; rebuilding"
            );

            self.document.set(document);

            return self.rebuild(index, dispatch);
        }

        let repair = match Self::patch(index, dispatch, edit) {
            Ok(repair) => repair,
            Err(err) => {
                tracing::warn!(%err, ?edit, "incremental repair failed; rebuilding");

                return self.rebuild(index, dispatch);
            }
        };

        if !Self::verify(index, dispatch, &repair) {
            tracing::warn!(?repair, ?edit, "index disagrees with the engine after repair; rebuilding");

            return self.rebuild(index, dispatch);
        }

        tracing::debug!(?repair, "index repaired");

        repair
    }

    pub fn rebuild(
        &self,
        index: &mut crate::line_index::PositionIndex,
        dispatch: &dyn crate::dispatch::Dispatch,
    ) -> Repair {
        if let Err(err) = index.rebuild(dispatch) {
            tracing::error!(%err, "position index rebuild failed");
        }

        Repair::Rebuilt
    }

    fn patch(
        index: &mut crate::line_index::PositionIndex,
        dispatch: &dyn crate::dispatch::Dispatch,
        edit: &EditRecord<'_>,
    ) -> Result<Repair, crate::enums::MathError> {
        let end = match edit.kind {
            crate::enums::EditKind::Insert => edit.position,
            crate::enums::EditKind::Delete => edit
                .position
                .checked_add(edit.length)
                .ok_or(crate::enums::MathError::Overflow)?,
        };

        let first_line = index.line_from_byte_position(edit.position.saturating_sub(1));
        let last_line = index.line_from_byte_position(end);
        let old_lines = last_line - first_line + 1;
        let new_lines = usize::try_from(
            isize::try_from(old_lines)?
                .checked_add(edit.lines_added)
                .ok_or(crate::enums::MathError::Overflow)?,
        )?;

        if old_lines == 1
            && edit.lines_added == 0
            && let Some(repair) = Self::adjust(index, edit, first_line)?
        {
            return Ok(repair);
        }

        let lines =
            crate::line_index::PositionIndex::measure_lines(dispatch, first_line, new_lines);

        index.splice(first_line, old_lines, &lines)?;

        Ok(Repair::Patched {
            first_line,
            old_lines,
            new_lines,
        })
    }

    /// An ASCII insert into a line with no multi-byte characters, away from
    /// any line ending, only changes that line's length. Deletions always
    /// re-read the line: removing bytes can join a stray lead byte to its
    /// continuation bytes.
    fn adjust(
        index: &mut crate::line_index::PositionIndex,
        edit: &EditRecord<'_>,
        line: usize,
    ) -> Result<Option<Repair>, crate::enums::MathError> {
        let Some(text) = edit.text else {
            return Ok(None);
        };

        if edit.kind != crate::enums::EditKind::Insert
            || text.len() != edit.length
            || !text.is_ascii()
            || memchr::memchr2(b'\r', b'\n', text).is_some()
        {
            return Ok(None);
        }

        let Some(metrics) = index.line_metrics(line) else {
            return Ok(None);
        };

        if !metrics.is_ascii() {
            return Ok(None);
        }

        let bytes = metrics
            .bytes
            .checked_add(edit.length)
            .ok_or(crate::enums::MathError::Overflow)?;

        index.splice(
            line,
            1,
            &[crate::line_index::line_summary::LineMetrics::new(bytes, bytes)],
        )?;

        Ok(Some(Repair::Adjusted { line }))
    }

    fn verify(
        index: &crate::line_index::PositionIndex,
        dispatch: &dyn crate::dispatch::Dispatch,
        repair: &Repair,
    ) -> bool {
        if dispatch.line_count() != index.line_count() || dispatch.byte_length() != index.byte_len()
        {
            return false;
        }

        match *repair {
            Repair::Adjusted { line } => dispatch.line_length(line) == index.byte_line_length(line),
            Repair::Patched {
                first_line,
                new_lines,
                ..
            } => {
                let next_line = first_line + new_lines;

                next_line >= index.line_count()
                    || dispatch.position_from_line(next_line)
                        == index.byte_position_from_line(next_line)
            }
            Repair::Rebuilt => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_index::PositionIndex;
    use crate::test_support::FakeEngine;

    fn setup(text: &str) -> (FakeEngine, PositionIndex, ModificationTracker) {
        let engine = FakeEngine::new(text);
        let mut index = PositionIndex::from_metrics(Vec::new()).unwrap();
        let tracker = ModificationTracker::default();

        assert_eq!(tracker.bind(&mut index, &engine), Repair::Rebuilt);

        (engine, index, tracker)
    }

    /// Applies the edit to the engine and the index, then checks the index
    /// against one built from scratch.
    fn edit(
        engine: &FakeEngine,
        index: &mut PositionIndex,
        tracker: &ModificationTracker,
        pos: usize,
        delete_len: usize,
        insert: &str,
    ) -> Repair {
        let notification = engine.edit(pos, delete_len, insert.as_bytes());
        let record = EditRecord::from_notification(&notification).unwrap();
        let repair = tracker.apply(index, engine, &record);
        let fresh = PositionIndex::build(engine).unwrap();

        let ours: Vec<_> = index.iter().map(|entry| entry.metrics).collect();
        let theirs: Vec<_> = fresh.iter().map(|entry| entry.metrics).collect();

        assert_eq!(ours, theirs, "after edit at {pos} (-{delete_len} +{insert:?})");

        repair
    }

    // --- FAST PATH TESTS ---

    #[test]
    fn test_ascii_insert_adjusts_in_place() {
        let (engine, mut index, tracker) = setup("hello\nworld");
        let reads = engine.text_reads();

        assert_eq!(
            edit(&engine, &mut index, &tracker, 2, 0, "XY"),
            Repair::Adjusted { line: 0 }
        );
        assert_eq!(engine.text_reads(), reads + 1, "only the fresh build reads text");
        assert_eq!(index.byte_position_from_line(1), 8);
    }

    #[test]
    fn test_delete_rejoining_a_sequence_is_patched() {
        // A stray 0xC3 and 0xA9 around an 'x' are three one-unit chars.
        let engine = FakeEngine::from_bytes(&[b'a', 0xC3, b'x', 0xA9, b'\n']);
        let mut index = PositionIndex::from_metrics(Vec::new()).unwrap();
        let tracker = ModificationTracker::default();

        tracker.bind(&mut index, &engine);
        assert_eq!(index.char_len(), 5);

        // Without the 'x' they form "é".
        let notification = engine.edit(2, 1, b"");
        let record = EditRecord::from_notification(&notification).unwrap();

        assert!(matches!(
            tracker.apply(&mut index, &engine, &record),
            Repair::Patched { .. }
        ));
        assert_eq!(index.char_len(), 3);
    }

    #[test]
    fn test_non_ascii_line_is_patched() {
        let (engine, mut index, tracker) = setup("héllo\nworld");

        assert!(matches!(
            edit(&engine, &mut index, &tracker, 1, 0, "X"),
            Repair::Patched { first_line: 0, .. }
        ));
        assert_eq!(index.char_position_from_line(1), 7);
    }

    // --- STRUCTURAL TESTS ---

    #[test]
    fn test_insert_adds_lines() {
        let (engine, mut index, tracker) = setup("one\ntwo\nthree");
        let before = index.byte_position_from_line(2);

        let repair = edit(&engine, &mut index, &tracker, 5, 0, "a\nb\n");

        assert_eq!(
            repair,
            Repair::Patched {
                first_line: 1,
                old_lines: 1,
                new_lines: 3
            }
        );
        assert_eq!(index.line_count(), 5);
        assert_eq!(index.byte_position_from_line(4), before + 4);
    }

    #[test]
    fn test_delete_line_ending_merges_lines() {
        let (engine, mut index, tracker) = setup("A\nB\nC");

        edit(&engine, &mut index, &tracker, 1, 1, "");

        assert_eq!(index.line_count(), 2);
        assert_eq!(index.char_line_length(0), 3);
    }

    #[test]
    fn test_crlf_pairs_join_and_split() {
        let (engine, mut index, tracker) = setup("a\rX\nb");

        assert_eq!(index.line_count(), 3);

        // Removing X turns "\r" + "\n" into one line ending.
        edit(&engine, &mut index, &tracker, 2, 1, "");
        assert_eq!(index.line_count(), 2);

        // Inserting between them splits it again.
        edit(&engine, &mut index, &tracker, 2, 0, "Y");
        assert_eq!(index.line_count(), 3);

        // Text ending in '\r' placed in front of a lone '\n'.
        edit(&engine, &mut index, &tracker, 3, 0, "\r");
        assert_eq!(index.line_count(), 3);
    }

    #[test]
    fn test_edits_at_document_edges() {
        let (engine, mut index, tracker) = setup("");

        edit(&engine, &mut index, &tracker, 0, 0, "first\n");
        edit(&engine, &mut index, &tracker, 6, 0, "second");
        edit(&engine, &mut index, &tracker, 0, 12, "");

        assert_eq!(index.line_count(), 1);
        assert_eq!(index.byte_len(), 0);
    }

    #[test]
    fn test_many_edits_stay_in_sync() {
        let (engine, mut index, tracker) = setup("start\n");
        let pieces = ["x", "\n", "é", "\r\n", "😀y", "\r", "abc\ndef", "日本"];
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;

        for step in 0..200 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;

            let len = engine.text.borrow().len();
            let pos = (seed as usize) % (len + 1);

            if step % 3 == 2 && len > 0 {
                let pos = pos.min(len - 1);
                let delete_len = ((seed >> 20) as usize % 4 + 1).min(len - pos);

                edit(&engine, &mut index, &tracker, pos, delete_len, "");
            } else {
                let piece = pieces[(seed >> 32) as usize % pieces.len()];

                edit(&engine, &mut index, &tracker, pos, 0, piece);
            }
        }
    }

    // --- FALLBACK TESTS ---

    #[test]
    fn test_wrong_line_delta_falls_back_to_rebuild() {
        let (engine, mut index, tracker) = setup("a\nb\nc");
        let mut notification = engine.edit(1, 0, b"\n");

        notification.lines_added = 0;

        let record = EditRecord::from_notification(&notification).unwrap();

        assert_eq!(tracker.apply(&mut index, &engine, &record), Repair::Rebuilt);
        assert_eq!(index.line_count(), 4);
    }

    #[test]
    fn test_document_swap_rebuilds() {
        let (engine, mut index, tracker) = setup("short");

        *engine.text.borrow_mut() = b"another\ndocument".to_vec();
        engine.doc.set(0x2000);

        let notification = crate::notification::Notification::modification(
            crate::protocol::SC_MOD_INSERTTEXT,
            0,
            Some(b"x".to_vec()),
            0,
        );
        let record = EditRecord::from_notification(&notification).unwrap();

        assert_eq!(tracker.apply(&mut index, &engine, &record), Repair::Rebuilt);
        assert_eq!(tracker.document(), 0x2000);
        assert_eq!(index.line_count(), 2);
    }

    #[test]
    fn test_non_edit_notifications_are_ignored() {
        let notification = crate::notification::Notification::modification(
            crate::protocol::SC_MOD_BEFOREINSERT,
            0,
            Some(b"x".to_vec()),
            0,
        );

        assert_eq!(EditRecord::from_notification(&notification), None);
    }
}
