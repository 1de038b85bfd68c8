//! Tools Module
//!
//! This module contains all MCP tool implementations. Each tool is a
//! separate module exporting a `register` function that adds the tool to the
//! registry during server initialization.
//!
//! Tools share one response-shaping path, [`invoke_and_wrap`]: a tool supplies
//! the computation and the success message, and every failure becomes an
//! `Error: <message>` tool result.

pub mod calculate;
pub mod derivative;

use serde_json::Value;

use crate::core::error::ToolError;
use crate::core::server::{ToolArguments, ToolResponse};

/// Fetch a required string argument.
///
/// Missing keys, non-string values and empty strings are all treated as
/// absent.
pub fn string_argument<'a>(arguments: &'a ToolArguments, key: &str) -> Option<&'a str> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

/// Run a tool computation and wrap its outcome in a [`ToolResponse`].
///
/// # Arguments
/// * `compute` - Validates the arguments and calls the math engine
/// * `message` - Formats the success text from the computed value
pub fn invoke_and_wrap<T, F, M>(compute: F, message: M) -> ToolResponse
where
    F: FnOnce() -> Result<T, ToolError>,
    M: FnOnce(T) -> String,
{
    match compute() {
        Ok(value) => ToolResponse::success(message(value)),
        Err(e) => {
            tracing::debug!(error = %e, "tool reported an error");
            ToolResponse::failure(format!("Error: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::MathError;
    use serde_json::json;

    #[test]
    fn wraps_success_with_message() {
        let response = invoke_and_wrap(|| Ok(21 * 2), |n| format!("answer: {}", n));
        assert_eq!(response, ToolResponse::success("answer: 42"));
    }

    #[test]
    fn wraps_failures_with_error_prefix() {
        let response = invoke_and_wrap(
            || -> Result<(), ToolError> { Err(MathError::UndefinedSymbol("q".to_string()).into()) },
            |_| unreachable!(),
        );
        assert_eq!(response, ToolResponse::failure("Error: Undefined symbol q"));
        assert!(response.is_error());
    }

    #[test]
    fn string_arguments_must_be_non_empty_strings() {
        let arguments = json!({ "a": "x", "b": "", "c": 3 });
        let arguments = arguments.as_object().unwrap();
        assert_eq!(string_argument(arguments, "a"), Some("x"));
        assert_eq!(string_argument(arguments, "b"), None);
        assert_eq!(string_argument(arguments, "c"), None);
        assert_eq!(string_argument(arguments, "d"), None);
    }
}
