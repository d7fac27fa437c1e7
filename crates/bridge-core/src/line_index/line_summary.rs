/// Length of one line in both coordinate systems, line ending included.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineMetrics {
    pub bytes: usize,
    /// UTF-16 units.
    pub chars: usize,
}

impl LineMetrics {
    #[must_use]
    pub fn new(bytes: usize, chars: usize) -> Self {
        Self { bytes, chars }
    }

    /// Measures a line from its raw bytes.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.len(),
            chars: crate::utf::utf16_len(bytes),
        }
    }

    /// Every multi-byte UTF-8 sequence is wider in bytes than in UTF-16 units,
    /// so equal lengths mean the line is plain ASCII.
    #[inline]
    #[must_use]
    pub fn is_ascii(&self) -> bool {
        self.bytes == self.chars
    }

    #[inline]
    #[must_use]
    pub fn measure(&self, metric: Metric) -> usize {
        match metric {
            Metric::Bytes => self.bytes,
            Metric::Chars => self.chars,
        }
    }
}

/// An offset into the document expressed in both coordinate systems.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinePoint {
    pub bytes: usize,
    pub chars: usize,
}

impl LinePoint {
    #[inline]
    #[must_use]
    pub fn measure(&self, metric: Metric) -> usize {
        match metric {
            Metric::Bytes => self.bytes,
            Metric::Chars => self.chars,
        }
    }

    #[inline]
    #[must_use]
    pub fn advanced_by(&self, metrics: &LineMetrics) -> LinePoint {
        LinePoint {
            bytes: self.bytes + metrics.bytes,
            chars: self.chars + metrics.chars,
        }
    }
}

/// Which coordinate system a lookup walks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    Bytes,
    Chars,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineSummary {
    pub line_count: usize,
    pub bytes: usize,
    pub chars: usize,
}

impl LineSummary {
    pub fn add(&mut self, other: &LineSummary) {
        self.line_count += other.line_count;
        self.bytes += other.bytes;
        self.chars += other.chars;
    }

    pub fn add_line(&mut self, metrics: &LineMetrics) {
        self.line_count += 1;
        self.bytes += metrics.bytes;
        self.chars += metrics.chars;
    }

    /// # Errors
    ///
    /// Returns [`crate::enums::MathError::Overflow`] if `other` is larger than `self`.
    pub fn checked_sub(&mut self, other: &LineSummary) -> Result<(), crate::enums::MathError> {
        self.line_count = self
            .line_count
            .checked_sub(other.line_count)
            .ok_or(crate::enums::MathError::Overflow)?;
        self.bytes = self
            .bytes
            .checked_sub(other.bytes)
            .ok_or(crate::enums::MathError::Overflow)?;
        self.chars = self
            .chars
            .checked_sub(other.chars)
            .ok_or(crate::enums::MathError::Overflow)?;

        Ok(())
    }

    /// Swaps one line's contribution for another's.
    ///
    /// # Errors
    ///
    /// Returns [`crate::enums::MathError::Overflow`] if `old` was never part of this summary.
    pub fn replace_line(
        &mut self,
        old: &LineMetrics,
        new: &LineMetrics,
    ) -> Result<(), crate::enums::MathError> {
        self.bytes = self
            .bytes
            .checked_sub(old.bytes)
            .and_then(|b| b.checked_add(new.bytes))
            .ok_or(crate::enums::MathError::Overflow)?;
        self.chars = self
            .chars
            .checked_sub(old.chars)
            .and_then(|c| c.checked_add(new.chars))
            .ok_or(crate::enums::MathError::Overflow)?;

        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn measure(&self, metric: Metric) -> usize {
        match metric {
            Metric::Bytes => self.bytes,
            Metric::Chars => self.chars,
        }
    }

    #[must_use]
    pub fn of_lines(lines: &[LineMetrics]) -> Self {
        lines.iter().fold(LineSummary::default(), |mut acc, line| {
            acc.add_line(line);

            acc
        })
    }
}
