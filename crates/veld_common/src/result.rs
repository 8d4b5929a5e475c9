//! Common result and error types for the VELD elaboration core.

/// The standard result type for fallible internal operations.
///
/// `Ok` contains the result value (which may be partial or degraded after
/// error recovery). `Err` indicates an unrecoverable internal error (a bug
/// in VELD), not a user-facing error. User errors are reported through the
/// diagnostic sink and the operation still returns `Ok`.
pub type VeldResult<T> = Result<T, InternalError>;

/// An internal compiler error indicating a bug in VELD, not a user input
/// problem.
///
/// These errors should never occur during normal operation. If one does
/// occur, it means there is a logic error in the elaborator that should be
/// fixed.
#[derive(Debug, thiserror::Error)]
#[error("internal elaboration error: {message}")]
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
