/// Where an edit reported by the engine came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModificationSource {
    User,
    Undo,
    Redo,
    /// Programmatic edits and anything the engine does not attribute.
    Other,
}

impl ModificationSource {
    /// Reads the `SC_PERFORMED_*` bits of a modification type.
    #[must_use]
    pub fn from_flags(modification_type: i32) -> Self {
        if modification_type & crate::protocol::SC_PERFORMED_UNDO != 0 {
            ModificationSource::Undo
        } else if modification_type & crate::protocol::SC_PERFORMED_REDO != 0 {
            ModificationSource::Redo
        } else if modification_type & crate::protocol::SC_PERFORMED_USER != 0 {
            ModificationSource::User
        } else {
            ModificationSource::Other
        }
    }
}

/// Which side of the index an edit landed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditKind {
    Insert,
    Delete,
}

#[derive(Debug, PartialEq)]
pub enum MathError {
    /// Wraps the specific error TryInto generates
    ConversionFailed(std::num::TryFromIntError),
    /// Represents the `None` case from checked math
    Overflow,
    OutOfBounds(usize),
}

impl std::fmt::Display for MathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MathError::ConversionFailed(e) => write!(f, "integer conversion failed: {e}"),
            MathError::Overflow => write!(f, "arithmetic overflow"),
            MathError::OutOfBounds(len) => write!(f, "index out of bounds (len={len})"),
        }
    }
}

impl std::error::Error for MathError {}

impl From<std::num::TryFromIntError> for MathError {
    fn from(err: std::num::TryFromIntError) -> Self {
        MathError::ConversionFailed(err)
    }
}
