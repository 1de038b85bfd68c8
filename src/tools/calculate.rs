//! Calculate Tool Implementation
//!
//! Evaluates a mathematical expression and returns its value. The expression
//! is passed to the math engine unmodified; the result is rendered the way
//! JavaScript prints numbers (`4`, `0.5`, `Infinity`).

use std::sync::Arc;

use crate::core::error::ToolError;
use crate::core::server::{MCPTool, ToolArguments, ToolHandler, ToolRegistry};
use crate::math::{MathEngine, format_number};
use crate::tools::{invoke_and_wrap, string_argument};

pub const NAME: &str = "calculate";

/// Tool metadata advertised through `tools/list`.
pub fn descriptor() -> MCPTool {
    MCPTool {
        name: NAME.to_string(),
        description: "Evaluate a mathematical expression".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The expression to evaluate, e.g. \"2 + 3 * sqrt(16)\""
                }
            },
            "required": ["expression"]
        }),
    }
}

/// Register the calculate tool with the tool registry.
///
/// # Arguments
/// * `registry` - Mutable reference to the tool registry where the tool will be registered
/// * `engine` - Math engine used to evaluate expressions
pub fn register(registry: &mut ToolRegistry, engine: Arc<dyn MathEngine>) {
    let handler: ToolHandler = Box::new(move |args: &ToolArguments| {
        invoke_and_wrap(
            || {
                let expression = string_argument(args, "expression")
                    .ok_or(ToolError::InvalidArguments("Expression is required"))?;
                Ok(engine.evaluate(expression)?)
            },
            |value| format!("The result of the expression is: {}", format_number(value)),
        )
    });

    registry.register(descriptor(), handler);
}
