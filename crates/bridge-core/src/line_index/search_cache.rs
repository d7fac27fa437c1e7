/// The line most recently located, kept so that runs of nearby queries do
/// not descend the tree every time.
#[derive(Clone, Copy, Debug)]
pub struct SearchCache {
    pub line_idx: usize,
    pub start: crate::line_index::line_summary::LinePoint,
    pub metrics: crate::line_index::line_summary::LineMetrics,
}

impl SearchCache {
    /// True when `offset` falls inside the cached line. The end of the line
    /// only counts for the last line, since elsewhere it is the next line's start.
    #[inline]
    #[must_use]
    pub fn contains(
        &self,
        metric: crate::line_index::line_summary::Metric,
        offset: usize,
        is_last_line: bool,
    ) -> bool {
        let start = self.start.measure(metric);
        let end = start + self.metrics.measure(metric);

        offset >= start && (offset < end || (is_last_line && offset == end))
    }
}
