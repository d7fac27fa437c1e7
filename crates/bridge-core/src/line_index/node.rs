use std::ops::{AddAssign, SubAssign};

/// Contains child nodes with a total summary of its children's summaries
#[derive(Debug)]
pub struct InternalNode {
    pub summary: crate::line_index::line_summary::LineSummary,
    pub children: Vec<Node>,
}

/// Contains the metrics of consecutive lines
#[derive(Debug, Default)]
pub struct LeafNode {
    pub summary: crate::line_index::line_summary::LineSummary,
    pub lines: Vec<crate::line_index::line_summary::LineMetrics>,
}

#[derive(Debug)]
pub enum Node {
    Internal(InternalNode),
    Leaf(LeafNode),
}

impl Node {
    #[inline]
    pub fn summary(&self) -> &crate::line_index::line_summary::LineSummary {
        match self {
            Node::Internal(internal_node) => &internal_node.summary,
            Node::Leaf(leaf_node) => &leaf_node.summary,
        }
    }
}

/*

==================
===== LOOKUP =====
==================

*/

impl Node {
    pub fn get(&self, mut line_idx: usize) -> Option<crate::line_index::line_summary::LineMetrics> {
        let mut node = self;

        loop {
            match node {
                Node::Leaf(leaf_node) => return leaf_node.lines.get(line_idx).copied(),
                Node::Internal(internal_node) => {
                    let mut next = None;

                    for child in &internal_node.children {
                        let child_lines = child.summary().line_count;

                        if line_idx < child_lines {
                            next = Some(child);
                            break;
                        }

                        line_idx.sub_assign(child_lines);
                    }

                    node = next?;
                }
            }
        }
    }

    /// Offset of the first byte and first unit of `line_idx`.
    pub fn line_start(&self, mut line_idx: usize) -> Option<crate::line_index::line_summary::LinePoint> {
        let mut point = crate::line_index::line_summary::LinePoint::default();
        let mut node = self;

        loop {
            match node {
                Node::Leaf(leaf_node) => {
                    let preceding = leaf_node.lines.get(..line_idx)?;

                    if line_idx >= leaf_node.lines.len() {
                        return None;
                    }

                    return Some(
                        preceding
                            .iter()
                            .fold(point, |acc, metrics| acc.advanced_by(metrics)),
                    );
                }
                Node::Internal(internal_node) => {
                    let mut next = None;

                    for child in &internal_node.children {
                        let summary = child.summary();

                        if line_idx < summary.line_count {
                            next = Some(child);
                            break;
                        }

                        line_idx.sub_assign(summary.line_count);
                        point.bytes.add_assign(summary.bytes);
                        point.chars.add_assign(summary.chars);
                    }

                    node = next?;
                }
            }
        }
    }

    /// Finds the line containing `offset` measured in `metric`, returning its
    /// index, start and metrics. Offsets at or past the end resolve to the last line.
    pub fn locate(
        &self,
        metric: crate::line_index::line_summary::Metric,
        mut offset: usize,
    ) -> Option<(
        usize,
        crate::line_index::line_summary::LinePoint,
        crate::line_index::line_summary::LineMetrics,
    )> {
        let mut line_idx = 0usize;
        let mut point = crate::line_index::line_summary::LinePoint::default();
        let mut node = self;

        loop {
            match node {
                Node::Leaf(leaf_node) => {
                    let last = leaf_node.lines.len().checked_sub(1)?;

                    for (idx, metrics) in leaf_node.lines.iter().enumerate() {
                        let len = metrics.measure(metric);

                        if offset < len || idx == last {
                            return Some((line_idx + idx, point, *metrics));
                        }

                        offset.sub_assign(len);
                        point = point.advanced_by(metrics);
                    }

                    return None;
                }
                Node::Internal(internal_node) => {
                    let last = internal_node.children.len().checked_sub(1)?;
                    let mut next = None;

                    for (idx, child) in internal_node.children.iter().enumerate() {
                        let summary = child.summary();
                        let len = summary.measure(metric);

                        if offset < len || idx == last {
                            next = Some(child);
                            break;
                        }

                        offset.sub_assign(len);
                        line_idx.add_assign(summary.line_count);
                        point.bytes.add_assign(summary.bytes);
                        point.chars.add_assign(summary.chars);
                    }

                    node = next?;
                }
            }
        }
    }
}

/*

=====================
===== INSERTION =====
=====================

 */

impl Node {
    /// Inserts `lines` so that the first of them becomes `line_idx`.
    /// Callers keep `lines` at most `MAX_CHILDREN` long so one split suffices.
    #[inline]
    pub fn insert_lines(
        &mut self,
        line_idx: usize,
        lines: &[crate::line_index::line_summary::LineMetrics],
    ) -> Result<Option<Node>, crate::enums::MathError> {
        match self {
            Node::Leaf(leaf_node) => leaf_node
                .insert_lines(line_idx, lines)
                .map(|opt_node| opt_node.map(Node::Leaf)),
            Node::Internal(internal_node) => internal_node
                .insert_lines(line_idx, lines)
                .map(|opt_node| opt_node.map(Node::Internal)),
        }
    }
}

impl LeafNode {
    pub fn insert_lines(
        &mut self,
        line_idx: usize,
        lines: &[crate::line_index::line_summary::LineMetrics],
    ) -> Result<Option<LeafNode>, crate::enums::MathError> {
        if line_idx > self.lines.len() {
            return Err(crate::enums::MathError::OutOfBounds(self.lines.len()));
        }

        self.lines
            .splice(line_idx..line_idx, lines.iter().copied());
        self.summary
            .add(&crate::line_index::line_summary::LineSummary::of_lines(lines));

        Ok(self.split_if_needed())
    }

    pub fn split_if_needed(&mut self) -> Option<LeafNode> {
        let line_len = self.lines.len();

        if line_len <= crate::line_index::MAX_CHILDREN {
            return None;
        }

        let mid = line_len / 2;
        let right_lines = self.lines.split_off(mid);

        self.summary = crate::line_index::line_summary::LineSummary::of_lines(&self.lines);

        Some(LeafNode {
            summary: crate::line_index::line_summary::LineSummary::of_lines(&right_lines),
            lines: right_lines,
        })
    }
}

impl InternalNode {
    pub fn insert_lines(
        &mut self,
        mut line_idx: usize,
        lines: &[crate::line_index::line_summary::LineMetrics],
    ) -> Result<Option<InternalNode>, crate::enums::MathError> {
        let last = self
            .children
            .len()
            .checked_sub(1)
            .ok_or(crate::enums::MathError::OutOfBounds(0))?;
        let mut target = None;

        for (idx, child) in self.children.iter().enumerate() {
            let child_lines = child.summary().line_count;

            // Appending to the end of a child is as good as prepending to the next one.
            if line_idx <= child_lines || idx == last {
                target = Some(idx);
                break;
            }

            line_idx.sub_assign(child_lines);
        }

        let idx = target.ok_or(crate::enums::MathError::OutOfBounds(line_idx))?;

        if let Some(new_node) = self.children[idx].insert_lines(line_idx, lines)? {
            self.children.insert(idx + 1, new_node);
        }

        self.summary
            .add(&crate::line_index::line_summary::LineSummary::of_lines(lines));

        Ok(self.split_if_needed())
    }

    pub fn split_if_needed(&mut self) -> Option<InternalNode> {
        let children_len = self.children.len();

        if children_len <= crate::line_index::MAX_CHILDREN {
            return None;
        }

        let mid = children_len / 2;
        let right_children = self.children.split_off(mid);

        self.summary = Self::sum_children(&self.children);

        Some(InternalNode {
            summary: Self::sum_children(&right_children),
            children: right_children,
        })
    }

    pub fn sum_children(children: &[Node]) -> crate::line_index::line_summary::LineSummary {
        children.iter().fold(
            crate::line_index::line_summary::LineSummary::default(),
            |mut acc, child| {
                acc.add(child.summary());

                acc
            },
        )
    }
}

/*

======================
======= SETTER =======
======================

 */

impl Node {
    /// Replaces the metrics of one line and fixes the summaries on the way
    /// back up. Returns the metrics that were replaced.
    #[inline]
    pub fn set_line(
        &mut self,
        target_line_idx: usize,
        new_metrics: crate::line_index::line_summary::LineMetrics,
    ) -> Result<crate::line_index::line_summary::LineMetrics, crate::enums::MathError> {
        match self {
            Node::Leaf(leaf_node) => leaf_node.set_line(target_line_idx, new_metrics),
            Node::Internal(internal_node) => internal_node.set_line(target_line_idx, new_metrics),
        }
    }
}

impl LeafNode {
    pub fn set_line(
        &mut self,
        target_line_idx: usize,
        new_metrics: crate::line_index::line_summary::LineMetrics,
    ) -> Result<crate::line_index::line_summary::LineMetrics, crate::enums::MathError> {
        let slot = self
            .lines
            .get_mut(target_line_idx)
            .ok_or(crate::enums::MathError::OutOfBounds(target_line_idx))?;
        let old_metrics = std::mem::replace(slot, new_metrics);

        self.summary.replace_line(&old_metrics, &new_metrics)?;

        Ok(old_metrics)
    }
}

impl InternalNode {
    pub fn set_line(
        &mut self,
        mut target_line_idx: usize,
        new_metrics: crate::line_index::line_summary::LineMetrics,
    ) -> Result<crate::line_index::line_summary::LineMetrics, crate::enums::MathError> {
        for child in self.children.iter_mut() {
            let child_lines = child.summary().line_count;

            if target_line_idx < child_lines {
                let old_metrics = child.set_line(target_line_idx, new_metrics)?;

                self.summary.replace_line(&old_metrics, &new_metrics)?;

                return Ok(old_metrics);
            }

            target_line_idx.sub_assign(child_lines);
        }

        Err(crate::enums::MathError::OutOfBounds(target_line_idx))
    }
}

/*

========================
======= DELETION =======
========================

 */

impl Node {
    /// Removes a range of lines (inclusive) and culls empty nodes.
    /// Returns the summary of what was removed.
    #[inline]
    pub fn remove_line_range(
        &mut self,
        start: usize,
        end: usize,
    ) -> Result<crate::line_index::line_summary::LineSummary, crate::enums::MathError> {
        match self {
            Node::Leaf(leaf_node) => leaf_node.remove_line_range(start, end),
            Node::Internal(internal_node) => internal_node.remove_line_range(start, end),
        }
    }
}

impl LeafNode {
    pub fn remove_line_range(
        &mut self,
        start: usize,
        end: usize,
    ) -> Result<crate::line_index::line_summary::LineSummary, crate::enums::MathError> {
        let line_len = self.lines.len();
        let remove_start = start.min(line_len);
        let remove_end = end.saturating_add(1).min(line_len);

        if remove_start >= remove_end {
            return Ok(crate::line_index::line_summary::LineSummary::default());
        }

        let removed =
            crate::line_index::line_summary::LineSummary::of_lines(&self.lines[remove_start..remove_end]);

        self.lines.drain(remove_start..remove_end);
        self.summary.checked_sub(&removed)?;

        Ok(removed)
    }
}

impl InternalNode {
    pub fn remove_line_range(
        &mut self,
        mut start: usize,
        mut end: usize,
    ) -> Result<crate::line_index::line_summary::LineSummary, crate::enums::MathError> {
        let mut idx = 0usize;
        let mut removed = crate::line_index::line_summary::LineSummary::default();

        while idx < self.children.len() && start <= end {
            let child_line_count = self.children[idx].summary().line_count;

            if start >= child_line_count {
                start.sub_assign(child_line_count);
                end.sub_assign(child_line_count);
                idx.add_assign(1);

                continue;
            }

            let child_line_end = end.min(child_line_count - 1);

            removed.add(&self.children[idx].remove_line_range(start, child_line_end)?);

            if self.children[idx].summary().line_count == 0 {
                self.children.remove(idx);
            } else {
                idx.add_assign(1);
            }

            if end < child_line_count {
                break;
            }

            end.sub_assign(child_line_count);
            start = 0;
        }

        self.summary.checked_sub(&removed)?;

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::MathError;
    use crate::line_index::line_summary::{LineMetrics, LinePoint, LineSummary, Metric};

    // --- Helper Functions ---

    fn ascii(bytes: usize) -> LineMetrics {
        LineMetrics::new(bytes, bytes)
    }

    fn leaf_of(lines: &[LineMetrics]) -> LeafNode {
        LeafNode {
            summary: LineSummary::of_lines(lines),
            lines: lines.to_vec(),
        }
    }

    fn internal_of(children: Vec<Node>) -> InternalNode {
        InternalNode {
            summary: InternalNode::sum_children(&children),
            children,
        }
    }

    // =====================
    // ===== INSERTION =====
    // =====================

    #[test]
    fn test_leaf_insert_lines_in_middle() {
        let mut leaf = leaf_of(&[ascii(2), ascii(3)]);
        let split = leaf
            .insert_lines(1, &[LineMetrics::new(4, 2), ascii(1)])
            .unwrap();

        assert!(split.is_none());
        assert_eq!(
            leaf.lines,
            vec![ascii(2), LineMetrics::new(4, 2), ascii(1), ascii(3)]
        );
        assert_eq!(leaf.summary.line_count, 4);
        assert_eq!(leaf.summary.bytes, 10);
        assert_eq!(leaf.summary.chars, 8);
    }

    #[test]
    fn test_leaf_insert_past_end_fails() {
        let mut leaf = leaf_of(&[ascii(2)]);

        assert!(matches!(
            leaf.insert_lines(3, &[ascii(1)]),
            Err(MathError::OutOfBounds(1))
        ));
    }

    #[test]
    fn test_leaf_split_if_needed() {
        let mut leaf = leaf_of(&[ascii(2); 10]);
        let right = leaf
            .insert_lines(10, &[ascii(2); 8])
            .unwrap()
            .expect("18 lines must split");

        assert_eq!(leaf.lines.len(), 9);
        assert_eq!(leaf.summary.line_count, 9);
        assert_eq!(leaf.summary.bytes, 18);
        assert_eq!(right.lines.len(), 9);
        assert_eq!(right.summary.bytes, 18);
    }

    #[test]
    fn test_internal_insert_at_child_boundary_appends_to_left() {
        let mut internal = internal_of(vec![
            Node::Leaf(leaf_of(&[ascii(1), ascii(1)])),
            Node::Leaf(leaf_of(&[ascii(5)])),
        ]);

        internal.insert_lines(2, &[ascii(7)]).unwrap();

        assert_eq!(internal.summary.line_count, 4);
        assert_eq!(internal.summary.bytes, 14);
        assert_eq!(internal.children[0].summary().line_count, 3);
        assert_eq!(Node::Internal(internal).get(2), Some(ascii(7)));
    }

    // ======================
    // ======= LOOKUP =======
    // ======================

    #[test]
    fn test_locate_walks_both_metrics() {
        // "héllo\n" = 7 bytes / 6 units, "world" = 5 / 5
        let node = Node::Internal(internal_of(vec![
            Node::Leaf(leaf_of(&[LineMetrics::new(7, 6)])),
            Node::Leaf(leaf_of(&[ascii(5)])),
        ]));

        let (line, start, _) = node.locate(Metric::Chars, 5).unwrap();
        assert_eq!((line, start), (0, LinePoint::default()));

        let (line, start, metrics) = node.locate(Metric::Chars, 6).unwrap();
        assert_eq!(line, 1);
        assert_eq!(start, LinePoint { bytes: 7, chars: 6 });
        assert_eq!(metrics, ascii(5));

        let (line, ..) = node.locate(Metric::Bytes, 6).unwrap();
        assert_eq!(line, 0);

        // Past the end resolves to the last line.
        let (line, ..) = node.locate(Metric::Bytes, 500).unwrap();
        assert_eq!(line, 1);
    }

    #[test]
    fn test_line_start() {
        let node = Node::Internal(internal_of(vec![
            Node::Leaf(leaf_of(&[ascii(3), LineMetrics::new(4, 3)])),
            Node::Leaf(leaf_of(&[ascii(2), ascii(0)])),
        ]));

        assert_eq!(node.line_start(0), Some(LinePoint::default()));
        assert_eq!(node.line_start(2), Some(LinePoint { bytes: 7, chars: 6 }));
        assert_eq!(node.line_start(3), Some(LinePoint { bytes: 9, chars: 8 }));
        assert_eq!(node.line_start(4), None);
    }

    // ======================
    // ======= SETTER =======
    // ======================

    #[test]
    fn test_internal_set_line() {
        let mut internal = internal_of(vec![
            Node::Leaf(leaf_of(&[ascii(2), ascii(2)])),
            Node::Leaf(leaf_of(&[ascii(2), ascii(2), ascii(1)])),
        ]);

        // Line 3 is the second line of the second leaf.
        let old = internal.set_line(3, LineMetrics::new(6, 4)).unwrap();

        assert_eq!(old, ascii(2));
        assert_eq!(internal.summary.bytes, 13);
        assert_eq!(internal.summary.chars, 11);

        if let Node::Leaf(l) = &internal.children[1] {
            assert_eq!(l.lines[1], LineMetrics::new(6, 4));
            assert_eq!(l.summary.bytes, 9);
        } else {
            panic!("Expected LeafNode");
        }
    }

    #[test]
    fn test_set_line_out_of_bounds() {
        let mut leaf = leaf_of(&[ascii(2)]);

        assert!(matches!(
            leaf.set_line(5, ascii(1)),
            Err(MathError::OutOfBounds(5))
        ));
    }

    // ========================
    // ======= DELETION =======
    // ========================

    #[test]
    fn test_leaf_remove_line_range() {
        let mut leaf = leaf_of(&[ascii(2), ascii(2), LineMetrics::new(5, 2), ascii(2), ascii(1)]);
        let removed = leaf.remove_line_range(1, 3).unwrap();

        assert_eq!(removed.line_count, 3);
        assert_eq!(removed.bytes, 9);
        assert_eq!(removed.chars, 6);
        assert_eq!(leaf.lines, vec![ascii(2), ascii(1)]);
        assert_eq!(leaf.summary.bytes, 3);
    }

    #[test]
    fn test_internal_remove_spanning_children() {
        let mut internal = internal_of(vec![
            Node::Leaf(leaf_of(&[ascii(2), ascii(2)])),
            Node::Leaf(leaf_of(&[ascii(2), ascii(2)])),
        ]);
        let removed = internal.remove_line_range(1, 2).unwrap();

        assert_eq!(removed.bytes, 4);
        assert_eq!(internal.summary.line_count, 2);
        assert_eq!(internal.summary.bytes, 4);
        assert_eq!(internal.children.len(), 2);
    }

    #[test]
    fn test_internal_remove_culls_empty_nodes() {
        let mut internal = internal_of(vec![
            Node::Leaf(leaf_of(&[ascii(2)])),
            Node::Leaf(leaf_of(&[ascii(2), ascii(0)])),
        ]);

        internal.remove_line_range(0, 0).unwrap();

        assert_eq!(internal.children.len(), 1);
        assert_eq!(internal.summary.line_count, 2);

        if let Node::Leaf(l) = &internal.children[0] {
            assert_eq!(l.lines, vec![ascii(2), ascii(0)]);
        }
    }
}
