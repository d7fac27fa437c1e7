pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Index arithmetic failed while patching or rebuilding.
    #[error(transparent)]
    Math(#[from] crate::enums::MathError),

    /// The engine reported a shape the index cannot represent
    /// (for example a negative line count).
    #[error("engine returned an invalid value {value} for message {code}")]
    InvalidReply { code: u32, value: isize },

    /// An edit was issued from inside an insert-check or before-modification
    /// handler, while the engine is still in the middle of another edit.
    #[error("edits are not allowed while a pre-edit notification is being handled")]
    ReentrantEdit,

    /// The binding was used from a thread other than the one that created it.
    #[error("editor bound on thread {owner:?} was used from thread {caller:?}")]
    WrongThread {
        owner: std::thread::ThreadId,
        caller: std::thread::ThreadId,
    },

    /// Text handed to the engine as a NUL-terminated string contained a NUL byte.
    #[error("text contains an interior NUL byte at byte offset {0}")]
    InteriorNul(usize),
}

impl From<std::num::TryFromIntError> for BridgeError {
    fn from(value: std::num::TryFromIntError) -> Self {
        BridgeError::Math(crate::enums::MathError::ConversionFailed(value))
    }
}
