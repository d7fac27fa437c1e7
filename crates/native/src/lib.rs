//! Locating, extracting and loading the native editing engine.
//!
//! [`NativeModule::global`] is the usual entry point: it resolves the module
//! path from a [`NativeConfig`], writes the module image there under a
//! cross-process lock if it is missing, loads it and keeps it for the rest of
//! the process.

pub mod config;
pub mod error;
pub mod extract;
pub mod loader;
pub mod lock;
pub mod module_path;

pub use config::NativeConfig;
pub use error::{NativeError, NativeResult};
pub use loader::NativeModule;
