pub mod btree;
pub mod line_iter;
pub mod line_summary;
pub mod node;
pub mod search_cache;

pub use btree::PositionIndex;
pub use line_summary::{LineMetrics, LinePoint, LineSummary};

pub const MAX_CHILDREN: usize = 16;

/// How many bytes a rebuild pulls from the engine per read.
pub const READ_BLOCK: usize = 64 * 1024;
