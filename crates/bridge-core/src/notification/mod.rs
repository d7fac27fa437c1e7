pub mod decoder;
pub mod events;
pub mod record;

pub use decoder::{DecodeContext, NotificationDecoder};
pub use events::{AutoCompletion, BridgeEvent, EventKind, InsertCheck, TextEdit};
pub use record::{Notification, NotificationCode};
