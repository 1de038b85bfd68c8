//! Derivative Tool Implementation
//!
//! Differentiates an expression with respect to a named variable and returns
//! the simplified result, e.g. `x^2` with respect to `x` gives `2 * x`.

use std::sync::Arc;

use crate::core::error::ToolError;
use crate::core::server::{MCPTool, ToolArguments, ToolHandler, ToolRegistry};
use crate::math::MathEngine;
use crate::tools::{invoke_and_wrap, string_argument};

pub const NAME: &str = "derivative";

/// Tool metadata advertised through `tools/list`.
pub fn descriptor() -> MCPTool {
    MCPTool {
        name: NAME.to_string(),
        description: "Calculate the derivative of an expression with respect to a variable"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The expression to differentiate, e.g. \"x^2 + sin(x)\""
                },
                "variable": {
                    "type": "string",
                    "description": "The variable to differentiate with respect to, e.g. \"x\""
                }
            },
            "required": ["expression", "variable"]
        }),
    }
}

/// Register the derivative tool with the tool registry.
///
/// # Arguments
/// * `registry` - Mutable reference to the tool registry where the tool will be registered
/// * `engine` - Math engine used to differentiate expressions
pub fn register(registry: &mut ToolRegistry, engine: Arc<dyn MathEngine>) {
    let handler: ToolHandler = Box::new(move |args: &ToolArguments| {
        invoke_and_wrap(
            || {
                let (Some(expression), Some(variable)) = (
                    string_argument(args, "expression"),
                    string_argument(args, "variable"),
                ) else {
                    return Err(ToolError::InvalidArguments(
                        "Both expression and variable are required",
                    ));
                };
                let result = engine.derivative(expression, variable)?;
                Ok((expression, variable, result))
            },
            |(expression, variable, result)| {
                format!(
                    "The derivative of {} with respect to {} is: {}",
                    expression, variable, result
                )
            },
        )
    });

    registry.register(descriptor(), handler);
}
