pub mod dispatch;
pub mod enums;
pub mod errors;
pub mod line_index;
pub mod notification;
pub mod observers;
pub mod protocol;
pub mod tracker;
pub mod translator;
pub mod utf;

#[cfg(test)]
pub(crate) mod test_support;

pub use dispatch::{Dispatch, DispatchExt, DirectDispatcher, EngineHandle, ThreadAffinity};
pub use errors::{BridgeError, BridgeResult};
pub use line_index::PositionIndex;
pub use translator::OffsetTranslator;
