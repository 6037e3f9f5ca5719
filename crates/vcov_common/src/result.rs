//! Common result and error types for the vcov workspace.

/// The standard result type for operations that can only fail on a broken
/// internal invariant.
///
/// `Err` indicates a bug in vcov (an inconsistent splice window, an item
/// variant reached where it can never appear), not a problem with the user's
/// design. Design problems are reported as diagnostics.
pub type VcovResult<T> = Result<T, InternalError>;

/// An internal consistency failure indicating a bug in vcov, not a user input problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal consistency failure: {message}")]
pub struct InternalError {
    /// Description of the violated invariant.
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
