//! Error Types
//!
//! Two layers of failure exist. [`ServerError`] covers the transport loop
//! (reading stdin, writing stdout, encoding responses) and is the only error
//! that can end the process. [`ToolError`] covers a single tool invocation
//! and is always turned into an `isError` tool result before it reaches the
//! client.

use thiserror::Error;

use crate::math::MathError;

/// Errors that stop the STDIO server loop.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors reported by a tool handler.
#[derive(Error, Debug)]
pub enum ToolError {
    /// A required argument was missing, empty, or not a string.
    #[error("{0}")]
    InvalidArguments(&'static str),

    /// The math engine rejected the input.
    #[error(transparent)]
    Math(#[from] MathError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_errors_display_the_underlying_message() {
        let err = ToolError::InvalidArguments("Expression is required");
        assert_eq!(err.to_string(), "Expression is required");

        let err = ToolError::from(MathError::UndefinedSymbol("y".to_string()));
        assert_eq!(err.to_string(), "Undefined symbol y");
    }
}
