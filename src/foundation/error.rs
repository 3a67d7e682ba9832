/// Convenience result type used across matstage.
pub type MaterialResult<T> = Result<T, MaterialError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Evaluation itself is total and never surfaces an error: degenerate numeric
/// values (inf/NaN from division by zero) pass through to the renderer. Errors
/// exist only at parse/link time, before a graph is live.
#[derive(thiserror::Error, Debug)]
pub enum MaterialError {
    /// Syntax error while parsing expression text.
    #[error("expression error at byte {offset}: {message}")]
    Expression {
        /// Byte offset of the offending token in the source string.
        offset: usize,
        /// Human-readable description.
        message: String,
    },

    /// An expression references an undefined table or an out-of-range parameter.
    #[error("link error: {0}")]
    Link(String),

    /// Invalid user-provided stage or material data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MaterialError {
    /// Build a [`MaterialError::Expression`] value.
    pub fn expression(offset: usize, message: impl Into<String>) -> Self {
        Self::Expression {
            offset,
            message: message.into(),
        }
    }

    /// Build a [`MaterialError::Link`] value.
    pub fn link(msg: impl Into<String>) -> Self {
        Self::Link(msg.into())
    }

    /// Build a [`MaterialError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
