//! Common result and error types for the ferrite toolchain.

/// The standard result type for fallible internal operations.
///
/// `Err` indicates an unrecoverable internal defect (a bug in ferrite), not
/// a problem with the user's register description. Authoring errors in the
/// input tree are reported through the generator's own error type and never
/// through [`InternalError`].
pub type FerriteResult<T> = Result<T, InternalError>;

/// An internal generator error indicating a bug in ferrite, not a user input problem.
///
/// These errors should never occur during normal operation. If one does occur,
/// it means there is a logic error in the generator that should be fixed.
#[derive(Debug, thiserror::Error)]
#[error("internal generator error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
