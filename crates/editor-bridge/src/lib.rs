//! The per-document binding a host talks to.
//!
//! An [`editor::Editor`] owns the position index for the document bound in one
//! engine instance, routes that engine's notifications, and exposes every
//! operation in char (UTF-16 unit) positions.

pub mod document;
pub mod editor;

pub use document::Document;
pub use editor::Editor;
