use std::ops::{AddAssign, SubAssign};

/// One engine-side document: raw bytes plus the byte offset where each line starts.
#[derive(Clone, Debug)]
pub struct SimDocument {
    pub text: Vec<u8>,
    pub line_starts: Vec<usize>,
    pub refs: usize,
}

impl Default for SimDocument {
    fn default() -> Self {
        Self {
            text: Vec::new(),
            line_starts: vec![0],
            refs: 1,
        }
    }
}

impl SimDocument {
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Start of `line`; `line_count` is the end of the text and anything past it is `None`.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        match line.cmp(&self.line_count()) {
            std::cmp::Ordering::Less => Some(self.line_starts[line]),
            std::cmp::Ordering::Equal => Some(self.text.len()),
            std::cmp::Ordering::Greater => None,
        }
    }

    /// Byte length of `line` including its line ending, 0 past the last line.
    pub fn line_length(&self, line: usize) -> usize {
        match (self.line_start(line), self.line_start(line + 1)) {
            (Some(start), Some(end)) if line < self.line_count() => end - start,
            _ => 0,
        }
    }

    /// Position of the line ending of `line`, or the end of the text for the last line.
    pub fn line_end(&self, line: usize) -> usize {
        let Some(start) = self.line_start(line.min(self.line_count() - 1)) else {
            return self.text.len();
        };
        let mut end = start + self.line_length(line.min(self.line_count() - 1));

        if end > start && self.text[end - 1] == b'\n' {
            end.sub_assign(1);
        }

        if end > start && self.text[end - 1] == b'\r' {
            end.sub_assign(1);
        }

        end
    }

    pub fn line_from_position(&self, pos: usize) -> usize {
        let pos = pos.min(self.text.len());

        self.line_starts.partition_point(|start| *start <= pos) - 1
    }

    /// Inserts `bytes` at `pos` (clamped) and returns the change in line count.
    pub fn insert(&mut self, pos: usize, bytes: &[u8]) -> isize {
        let pos = pos.min(self.text.len());

        self.text.splice(pos..pos, bytes.iter().copied());

        self.relines()
    }

    /// Removes `len` bytes at `pos` and returns them with the change in line count.
    pub fn delete(&mut self, pos: usize, len: usize) -> (Vec<u8>, isize) {
        let start = pos.min(self.text.len());
        let end = pos.saturating_add(len).min(self.text.len());
        let removed: Vec<u8> = self.text.drain(start..end).collect();

        (removed, self.relines())
    }

    fn relines(&mut self) -> isize {
        let before = self.line_starts.len() as isize;

        self.line_starts = Self::scan_lines(&self.text);

        self.line_starts.len() as isize - before
    }

    /// Line starts for `\n`, `\r` and `\r\n` endings.
    pub fn scan_lines(text: &[u8]) -> Vec<usize> {
        let mut starts = vec![0];
        let mut skip_until = 0usize;

        for eol in memchr::memchr2_iter(b'\r', b'\n', text) {
            if eol < skip_until {
                continue;
            }

            let mut next = eol + 1;

            if text[eol] == b'\r' && text.get(next) == Some(&b'\n') {
                next.add_assign(1);
            }

            starts.push(next);
            skip_until = next;
        }

        starts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_lines() {
        assert_eq!(SimDocument::scan_lines(b""), vec![0]);
        assert_eq!(SimDocument::scan_lines(b"a\r\nb\rc\n"), vec![0, 3, 5, 7]);
    }

    #[test]
    fn test_line_queries() {
        let mut doc = SimDocument::default();

        assert_eq!(doc.insert(0, b"ab\r\ncd"), 1);
        assert_eq!(doc.line_length(0), 4);
        assert_eq!(doc.line_length(1), 2);
        assert_eq!(doc.line_length(2), 0);
        assert_eq!(doc.line_end(0), 2);
        assert_eq!(doc.line_end(1), 6);
        assert_eq!(doc.line_start(2), Some(6));
        assert_eq!(doc.line_start(3), None);
        assert_eq!(doc.line_from_position(3), 0);
        assert_eq!(doc.line_from_position(4), 1);

        let (removed, delta) = doc.delete(2, 2);

        assert_eq!(removed, b"\r\n");
        assert_eq!(delta, -1);
        assert_eq!(doc.text, b"abcd");
    }
}
