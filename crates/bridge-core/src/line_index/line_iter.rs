use std::ops::AddAssign;

/// One line as yielded by [`LineRangeIter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineEntry {
    pub line_idx: usize,
    pub start: crate::line_index::line_summary::LinePoint,
    pub metrics: crate::line_index::line_summary::LineMetrics,
}

#[derive(Debug)]
pub struct LineRangeIter<'node> {
    /// Stack tracks: (Node Reference, Index of next child/line to visit)
    pub stack: Vec<(&'node crate::line_index::node::Node, usize)>,
    pub current_line_idx: usize,
    pub end_line_idx: usize,
    pub current: crate::line_index::line_summary::LinePoint,
}

impl<'node> LineRangeIter<'node> {
    /// Positions the iterator on `start_line`, descending from `root`.
    pub fn new(
        root: &'node crate::line_index::node::Node,
        start_line: usize,
        end_line: usize,
    ) -> Self {
        // A tree of a million lines is only ~6 levels deep.
        let mut stack = Vec::with_capacity(8);
        let mut current = crate::line_index::line_summary::LinePoint::default();
        let mut remaining = start_line;
        let mut node = root;

        // Internal frames hold the index of the child being visited, so they
        // only surface again once that child is exhausted.
        loop {
            match node {
                crate::line_index::node::Node::Leaf(leaf_node) => {
                    for metrics in leaf_node.lines.iter().take(remaining) {
                        current = current.advanced_by(metrics);
                    }

                    stack.push((node, remaining));
                    break;
                }
                crate::line_index::node::Node::Internal(internal_node) => {
                    let mut child_idx = internal_node.children.len();

                    for (idx, child) in internal_node.children.iter().enumerate() {
                        let summary = child.summary();

                        if remaining < summary.line_count {
                            child_idx = idx;
                            break;
                        }

                        remaining -= summary.line_count;
                        current.bytes.add_assign(summary.bytes);
                        current.chars.add_assign(summary.chars);
                    }

                    stack.push((node, child_idx));

                    match internal_node.children.get(child_idx) {
                        Some(child) => node = child,
                        None => break,
                    }
                }
            }
        }

        Self {
            stack,
            current_line_idx: start_line,
            end_line_idx: end_line,
            current,
        }
    }
}

impl Iterator for LineRangeIter<'_> {
    type Item = LineEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_line_idx >= self.end_line_idx || self.stack.is_empty() {
            return None;
        }

        let metrics = loop {
            let (node, idx) = *self.stack.last()?;

            match node {
                crate::line_index::node::Node::Leaf(leaf_node) if idx < leaf_node.lines.len() => {
                    if let Some(frame) = self.stack.last_mut() {
                        frame.1.add_assign(1);
                    }

                    break leaf_node.lines[idx];
                }
                crate::line_index::node::Node::Internal(internal_node)
                    if idx < internal_node.children.len() =>
                {
                    self.stack.push((&internal_node.children[idx], 0));
                }
                _ => {
                    self.stack.pop();

                    if let Some(parent) = self.stack.last_mut() {
                        parent.1.add_assign(1);
                    }
                }
            }
        };

        let entry = LineEntry {
            line_idx: self.current_line_idx,
            start: self.current,
            metrics,
        };

        self.current = self.current.advanced_by(&metrics);
        self.current_line_idx.add_assign(1);

        Some(entry)
    }
}
