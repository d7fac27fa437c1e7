use std::ops::AddAssign;

/// Per-line byte and UTF-16 lengths of the bound document, kept as a B-tree
/// whose summaries give O(log n) line starts in either coordinate system.
///
/// There is always at least one line; an empty document is one empty line.
#[derive(Debug)]
pub struct PositionIndex {
    pub root: crate::line_index::node::Node,
    pub cache: std::cell::Cell<Option<crate::line_index::search_cache::SearchCache>>,
}

/// Splits raw text into lines the way the engine does: a line ends after
/// `\r\n`, a lone `\r` or a lone `\n`, and the text after the last line
/// ending is one more (possibly empty) line.
pub fn split_lines(bytes: &[u8]) -> Vec<crate::line_index::line_summary::LineMetrics> {
    let mut lines = Vec::new();
    let mut line_start = 0usize;

    for eol in memchr::memchr2_iter(b'\r', b'\n', bytes) {
        // The `\n` of a `\r\n` pair was consumed with its `\r`.
        if eol < line_start {
            continue;
        }

        let mut end = eol + 1;

        if bytes[eol] == b'\r' && bytes.get(end) == Some(&b'\n') {
            end.add_assign(1);
        }

        lines.push(crate::line_index::line_summary::LineMetrics::of(
            &bytes[line_start..end],
        ));
        line_start = end;
    }

    lines.push(crate::line_index::line_summary::LineMetrics::of(
        &bytes[line_start..],
    ));

    lines
}

/*

====================
===== CREATION =====
====================

*/

impl PositionIndex {
    fn build_leaves(
        lines: Vec<crate::line_index::line_summary::LineMetrics>,
    ) -> Vec<crate::line_index::node::Node> {
        let mut leaves = Vec::with_capacity(lines.len().div_ceil(crate::line_index::MAX_CHILDREN));

        for chunk in lines.chunks(crate::line_index::MAX_CHILDREN) {
            leaves.push(crate::line_index::node::Node::Leaf(
                crate::line_index::node::LeafNode {
                    summary: crate::line_index::line_summary::LineSummary::of_lines(chunk),
                    lines: chunk.to_vec(),
                },
            ));
        }

        leaves
    }

    fn build_tree(
        mut current_level: Vec<crate::line_index::node::Node>,
    ) -> Result<crate::line_index::node::Node, crate::enums::MathError> {
        while current_level.len() > 1 {
            let chunk_count = current_level
                .len()
                .div_ceil(crate::line_index::MAX_CHILDREN);
            let mut next_level = Vec::with_capacity(chunk_count);
            let mut iter = current_level.into_iter();

            for _ in 0..chunk_count {
                let chunk: Vec<crate::line_index::node::Node> = iter
                    .by_ref()
                    .take(crate::line_index::MAX_CHILDREN)
                    .collect();

                next_level.push(crate::line_index::node::Node::Internal(
                    crate::line_index::node::InternalNode {
                        summary: crate::line_index::node::InternalNode::sum_children(&chunk),
                        children: chunk,
                    },
                ));
            }

            current_level = next_level;
        }

        current_level
            .pop()
            .ok_or(crate::enums::MathError::OutOfBounds(0))
    }

    fn empty_root() -> crate::line_index::node::Node {
        let empty_line = crate::line_index::line_summary::LineMetrics::default();

        crate::line_index::node::Node::Leaf(crate::line_index::node::LeafNode {
            summary: crate::line_index::line_summary::LineSummary::of_lines(&[empty_line]),
            lines: vec![empty_line],
        })
    }

    /// Bulk-loads an index from per-line metrics.
    ///
    /// # Errors
    ///
    /// Only fails if the tree cannot be assembled, which never happens for a
    /// non-empty level.
    pub fn from_metrics(
        lines: Vec<crate::line_index::line_summary::LineMetrics>,
    ) -> Result<Self, crate::enums::MathError> {
        let root = if lines.is_empty() {
            Self::empty_root()
        } else {
            Self::build_tree(Self::build_leaves(lines))?
        };

        Ok(Self {
            root,
            cache: std::cell::Cell::new(None),
        })
    }

    /// Builds an index directly from document bytes.
    ///
    /// # Errors
    ///
    /// See [`PositionIndex::from_metrics`].
    pub fn from_text(bytes: &[u8]) -> Result<Self, crate::enums::MathError> {
        Self::from_metrics(split_lines(bytes))
    }

    /// Builds an index for the document currently bound in the engine.
    ///
    /// # Errors
    ///
    /// See [`PositionIndex::from_metrics`].
    pub fn build(
        dispatch: &dyn crate::dispatch::Dispatch,
    ) -> Result<Self, crate::enums::MathError> {
        let mut index = Self::from_metrics(Vec::new())?;

        index.rebuild(dispatch)?;

        Ok(index)
    }

    /// Full resynchronization: re-reads the line count and every line from the engine.
    ///
    /// # Errors
    ///
    /// See [`PositionIndex::from_metrics`].
    pub fn rebuild(
        &mut self,
        dispatch: &dyn crate::dispatch::Dispatch,
    ) -> Result<(), crate::enums::MathError> {
        let line_count = crate::dispatch::DispatchExt::line_count(dispatch);
        let lines = Self::measure_lines(dispatch, 0, line_count);

        *self = Self::from_metrics(lines)?;

        tracing::debug!(
            line_count,
            bytes = self.byte_len(),
            chars = self.char_len(),
            "position index rebuilt"
        );

        Ok(())
    }

    /// Reads `count` lines starting at `first` from the engine and measures them.
    /// Text is pulled in blocks of about [`crate::line_index::READ_BLOCK`] bytes.
    pub fn measure_lines(
        dispatch: &dyn crate::dispatch::Dispatch,
        first: usize,
        count: usize,
    ) -> Vec<crate::line_index::line_summary::LineMetrics> {
        use crate::dispatch::DispatchExt;

        let mut lines = Vec::with_capacity(count);
        let mut pending = Vec::new();
        let mut block_start = dispatch.position_from_line(first);
        let mut block_len = 0usize;
        let end_line = first.saturating_add(count);

        for line in first..end_line {
            let len = dispatch.line_length(line);

            pending.push(len);
            block_len.add_assign(len);

            if block_len < crate::line_index::READ_BLOCK && line + 1 < end_line {
                continue;
            }

            let bytes = dispatch.text_range(block_start, block_start + block_len);
            let mut offset = 0usize;

            for len in pending.drain(..) {
                let end = (offset + len).min(bytes.len());
                let slice = bytes.get(offset.min(end)..end).unwrap_or(&[]);

                lines.push(crate::line_index::line_summary::LineMetrics::new(
                    len,
                    crate::utf::utf16_len(slice),
                ));
                offset.add_assign(len);
            }

            block_start.add_assign(block_len);
            block_len = 0;
        }

        lines
    }
}

/*

====================
===== TOTALS =======
====================

*/

impl PositionIndex {
    #[inline]
    pub fn line_count(&self) -> usize {
        self.root.summary().line_count
    }

    /// Total document length in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.root.summary().bytes
    }

    /// Total document length in UTF-16 units.
    #[inline]
    pub fn char_len(&self) -> usize {
        self.root.summary().chars
    }

    #[inline]
    fn last_line(&self) -> usize {
        self.line_count().saturating_sub(1)
    }
}

/*

======================
======= GETTER =======
======================

*/

impl PositionIndex {
    pub fn line_metrics(
        &self,
        line_idx: usize,
    ) -> Option<crate::line_index::line_summary::LineMetrics> {
        self.root.get(line_idx)
    }

    /// Length of `line` in UTF-16 units, line ending included. Out-of-range
    /// lines clamp to the last line.
    pub fn char_line_length(&self, line: usize) -> usize {
        self.line_metrics(line.min(self.last_line()))
            .map_or(0, |metrics| metrics.chars)
    }

    /// Byte counterpart of [`PositionIndex::char_line_length`].
    pub fn byte_line_length(&self, line: usize) -> usize {
        self.line_metrics(line.min(self.last_line()))
            .map_or(0, |metrics| metrics.bytes)
    }

    /// Start of `line` in both coordinate systems. `line` clamps to
    /// `[0, line_count]`; `line_count` itself is the end of the document.
    pub fn line_start(&self, line: usize) -> crate::line_index::line_summary::LinePoint {
        if line >= self.line_count() {
            return crate::line_index::line_summary::LinePoint {
                bytes: self.byte_len(),
                chars: self.char_len(),
            };
        }

        if let Some(cache) = self.cache.get()
            && cache.line_idx == line
        {
            return cache.start;
        }

        self.root.line_start(line).unwrap_or_default()
    }

    pub fn char_position_from_line(&self, line: usize) -> usize {
        self.line_start(line).chars
    }

    pub fn byte_position_from_line(&self, line: usize) -> usize {
        self.line_start(line).bytes
    }

    /// Finds the line containing `offset`, clamped into the document. The
    /// start of a line belongs to that line; the end of the document belongs
    /// to the last line.
    pub fn locate(
        &self,
        metric: crate::line_index::line_summary::Metric,
        offset: usize,
    ) -> crate::line_index::line_iter::LineEntry {
        let offset = offset.min(self.root.summary().measure(metric));

        if let Some(cache) = self.cache.get()
            && cache.contains(metric, offset, cache.line_idx == self.last_line())
        {
            return crate::line_index::line_iter::LineEntry {
                line_idx: cache.line_idx,
                start: cache.start,
                metrics: cache.metrics,
            };
        }

        let Some((line_idx, start, metrics)) = self.root.locate(metric, offset) else {
            return crate::line_index::line_iter::LineEntry {
                line_idx: 0,
                start: crate::line_index::line_summary::LinePoint::default(),
                metrics: crate::line_index::line_summary::LineMetrics::default(),
            };
        };

        self.cache
            .set(Some(crate::line_index::search_cache::SearchCache {
                line_idx,
                start,
                metrics,
            }));

        crate::line_index::line_iter::LineEntry {
            line_idx,
            start,
            metrics,
        }
    }

    pub fn line_from_char_position(&self, pos: usize) -> usize {
        self.locate(crate::line_index::line_summary::Metric::Chars, pos)
            .line_idx
    }

    pub fn line_from_byte_position(&self, pos: usize) -> usize {
        self.locate(crate::line_index::line_summary::Metric::Bytes, pos)
            .line_idx
    }

    pub fn lines(
        &self,
        start_line: usize,
        end_line: usize,
    ) -> crate::line_index::line_iter::LineRangeIter<'_> {
        crate::line_index::line_iter::LineRangeIter::new(&self.root, start_line, end_line)
    }

    pub fn iter(&self) -> crate::line_index::line_iter::LineRangeIter<'_> {
        self.lines(0, self.line_count())
    }
}

/*

====================
===== SPLICING =====
====================

*/

impl PositionIndex {
    /// Replaces the `old_count` lines starting at `first` with `new_lines`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::enums::MathError::OutOfBounds`] if the replaced range
    /// runs past the last line.
    pub fn splice(
        &mut self,
        first: usize,
        old_count: usize,
        new_lines: &[crate::line_index::line_summary::LineMetrics],
    ) -> Result<(), crate::enums::MathError> {
        let line_count = self.line_count();
        let end = first
            .checked_add(old_count)
            .ok_or(crate::enums::MathError::Overflow)?;

        if end > line_count {
            return Err(crate::enums::MathError::OutOfBounds(line_count));
        }

        self.cache.set(None);

        let shared = old_count.min(new_lines.len());

        for (offset, metrics) in new_lines[..shared].iter().enumerate() {
            self.root.set_line(first + offset, *metrics)?;
        }

        if old_count > shared {
            self.root.remove_line_range(first + shared, end - 1)?;
            self.collapse_root();
        }

        if new_lines.len() > shared {
            self.insert_lines(first + shared, &new_lines[shared..])?;
        }

        if self.line_count() == 0 {
            self.root = Self::empty_root();
        }

        Ok(())
    }

    fn insert_lines(
        &mut self,
        mut line_idx: usize,
        lines: &[crate::line_index::line_summary::LineMetrics],
    ) -> Result<(), crate::enums::MathError> {
        // One chunk at a time keeps every node within a single split.
        for chunk in lines.chunks(crate::line_index::MAX_CHILDREN) {
            if let Some(new_sibling) = self.root.insert_lines(line_idx, chunk)? {
                let old_root = std::mem::replace(&mut self.root, Self::empty_root());
                let children = vec![old_root, new_sibling];

                self.root =
                    crate::line_index::node::Node::Internal(crate::line_index::node::InternalNode {
                        summary: crate::line_index::node::InternalNode::sum_children(&children),
                        children,
                    });
            }

            line_idx.add_assign(chunk.len());
        }

        Ok(())
    }

    /// Drops internal roots that are left with one child, or none, after a removal.
    fn collapse_root(&mut self) {
        loop {
            match &mut self.root {
                crate::line_index::node::Node::Internal(internal_node)
                    if internal_node.children.len() == 1 =>
                {
                    if let Some(only_child) = internal_node.children.pop() {
                        self.root = only_child;
                    }
                }
                crate::line_index::node::Node::Internal(internal_node)
                    if internal_node.children.is_empty() =>
                {
                    self.root = Self::empty_root();
                }
                _ => break,
            }
        }
    }
}
