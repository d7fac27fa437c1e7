//! Char (UTF-16 unit) and byte position conversion.
//!
//! Line starts come from the [`crate::line_index::PositionIndex`] in both
//! coordinate systems, so a conversion only ever walks the one line that
//! contains the target. Lines that are pure ASCII are not read at all.

use crate::dispatch::DispatchExt;

pub struct OffsetTranslator<'a> {
    index: &'a crate::line_index::PositionIndex,
    dispatch: &'a dyn crate::dispatch::Dispatch,
}

impl<'a> OffsetTranslator<'a> {
    #[must_use]
    pub fn new(
        index: &'a crate::line_index::PositionIndex,
        dispatch: &'a dyn crate::dispatch::Dispatch,
    ) -> Self {
        Self { index, dispatch }
    }

    /// Byte position of char position `pos`, clamped to `[0, byte_len]`.
    ///
    /// A position between the two halves of a surrogate pair resolves to the
    /// start of the pair.
    #[must_use]
    pub fn char_to_byte(&self, pos: usize) -> usize {
        let pos = pos.min(self.index.char_len());
        let entry = self
            .index
            .locate(crate::line_index::line_summary::Metric::Chars, pos);
        let within = pos - entry.start.chars;

        if within == 0 {
            return entry.start.bytes;
        }

        if entry.metrics.is_ascii() {
            return entry.start.bytes + within;
        }

        let bytes = self.line_bytes(&entry);

        entry.start.bytes + crate::utf::byte_offset_of_unit(&bytes, within)
    }

    /// Char position of byte position `pos`, clamped to `[0, char_len]`.
    ///
    /// A position inside a multi-byte sequence resolves to the start of that sequence.
    #[must_use]
    pub fn byte_to_char(&self, pos: usize) -> usize {
        let pos = pos.min(self.index.byte_len());
        let entry = self
            .index
            .locate(crate::line_index::line_summary::Metric::Bytes, pos);
        let within = pos - entry.start.bytes;

        if within == 0 {
            return entry.start.chars;
        }

        if entry.metrics.is_ascii() {
            return entry.start.chars + within;
        }

        let bytes = self.line_bytes(&entry);

        entry.start.chars + crate::utf::unit_offset_of_byte(&bytes, within)
    }

    /// Converts a char span into a `(byte_start, byte_len)` pair.
    #[must_use]
    pub fn char_span_to_bytes(&self, pos: usize, len: usize) -> (usize, usize) {
        let start = self.char_to_byte(pos);
        let end = self.char_to_byte(pos.saturating_add(len));

        (start, end.saturating_sub(start))
    }

    fn line_bytes(&self, entry: &crate::line_index::line_iter::LineEntry) -> Vec<u8> {
        self.dispatch
            .text_range(entry.start.bytes, entry.start.bytes + entry.metrics.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_index::PositionIndex;
    use crate::test_support::FakeEngine;

    fn bind(text: &str) -> (FakeEngine, PositionIndex) {
        let engine = FakeEngine::new(text);
        let index = PositionIndex::build(&engine).unwrap();

        (engine, index)
    }

    // --- SCENARIO TESTS ---

    #[test]
    fn test_multibyte_scenario() {
        let (engine, index) = bind("héllo\nworld");
        let translator = OffsetTranslator::new(&index, &engine);

        assert_eq!(translator.char_to_byte(1), 1);
        assert_eq!(translator.char_to_byte(2), 3);
        assert_eq!(translator.byte_to_char(3), 2);
        assert_eq!(translator.char_to_byte(6), 7);
        assert_eq!(translator.char_to_byte(11), 12);
        assert_eq!(index.line_from_char_position(7), 1);
        assert_eq!(index.char_position_from_line(1), 6);
    }

    #[test]
    fn test_clamps_past_the_end() {
        let (engine, index) = bind("ab\ncd");
        let translator = OffsetTranslator::new(&index, &engine);

        assert_eq!(translator.char_to_byte(999), 5);
        assert_eq!(translator.byte_to_char(999), 5);
    }

    #[test]
    fn test_byte_inside_sequence_snaps_back() {
        let (engine, index) = bind("a€b");
        let translator = OffsetTranslator::new(&index, &engine);

        assert_eq!(translator.byte_to_char(2), 1);
        assert_eq!(translator.byte_to_char(3), 1);
        assert_eq!(translator.byte_to_char(4), 2);
    }

    #[test]
    fn test_surrogate_pair() {
        let (engine, index) = bind("x😀\ny");
        let translator = OffsetTranslator::new(&index, &engine);

        assert_eq!(translator.char_to_byte(1), 1);
        assert_eq!(translator.char_to_byte(2), 1);
        assert_eq!(translator.char_to_byte(3), 5);
        assert_eq!(translator.byte_to_char(5), 3);
        assert_eq!(translator.char_to_byte(4), 6);
    }

    #[test]
    fn test_round_trip_everywhere() {
        let text = "fn main() {\r\n    let s = \"日本語\";\r\n}\n\u{1F600}x\rend é";
        let (engine, index) = bind(text);
        let translator = OffsetTranslator::new(&index, &engine);
        let units: Vec<u16> = text.encode_utf16().collect();

        assert_eq!(index.char_len(), units.len());

        for pos in 0..=units.len() {
            // Skip positions between the halves of a surrogate pair.
            if pos < units.len() && (0xDC00..0xE000).contains(&units[pos]) {
                continue;
            }

            let byte = translator.char_to_byte(pos);

            assert_eq!(translator.byte_to_char(byte), pos, "round trip at {pos}");
        }
    }

    #[test]
    fn test_invalid_bytes_count_as_one_unit() {
        let engine = FakeEngine::from_bytes(&[b'a', 0xC3, b'\n', 0xFF, b'b']);
        let index = PositionIndex::build(&engine).unwrap();
        let translator = OffsetTranslator::new(&index, &engine);

        assert_eq!(index.char_len(), 5);
        assert_eq!(translator.char_to_byte(2), 2);
        assert_eq!(translator.byte_to_char(4), 4);
    }

    #[test]
    fn test_ascii_lines_are_not_read() {
        let (engine, index) = bind("plain ascii line\nanother");
        let translator = OffsetTranslator::new(&index, &engine);
        let before = engine.text_reads();

        assert_eq!(translator.char_to_byte(20), 20);
        assert_eq!(translator.byte_to_char(7), 7);
        assert_eq!(engine.text_reads(), before);
    }

    #[test]
    fn test_char_span_to_bytes() {
        let (engine, index) = bind("héllo");
        let translator = OffsetTranslator::new(&index, &engine);

        assert_eq!(translator.char_span_to_bytes(1, 2), (1, 3));
        assert_eq!(translator.char_span_to_bytes(4, 10), (5, 1));
    }
}
