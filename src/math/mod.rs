//! Math Engine
//!
//! The tool handlers never touch parsing or calculus directly. They see the
//! engine only through the [`MathEngine`] trait, which exposes two pure
//! operations: evaluate an expression to a number, and differentiate an
//! expression with respect to a variable.
//!
//! [`Engine`] is the bundled implementation:
//! - ast.rs: expression tree and printing
//! - parser.rs: tokenizer and recursive-descent parser
//! - eval.rs: numeric evaluation, constants and functions
//! - derivative.rs: symbolic differentiation rules
//! - simplify.rs: algebraic clean-up of derivative results

pub mod ast;
pub mod derivative;
pub mod eval;
pub mod parser;
pub mod simplify;

use thiserror::Error;

pub use ast::{Expr, format_number};

/// Errors raised while parsing, evaluating or differentiating.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Unexpected end of expression (char {0})")]
    UnexpectedEnd(usize),

    #[error("Unexpected token \"{token}\" (char {position})")]
    UnexpectedToken { token: String, position: usize },

    #[error("Unexpected character \"{character}\" (char {position})")]
    UnexpectedCharacter { character: char, position: usize },

    #[error("Parenthesis ) expected (char {0})")]
    MissingParenthesis(usize),

    #[error("Invalid number \"{0}\"")]
    InvalidNumber(String),

    #[error("Expression exceeds {0} characters")]
    TooLong(usize),

    #[error("Expression is nested too deeply (more than {0} levels)")]
    TooDeep(usize),

    #[error("Undefined symbol {0}")]
    UndefinedSymbol(String),

    #[error("Undefined function {0}")]
    UndefinedFunction(String),

    #[error("Wrong number of arguments in function {name} ({given} provided, {expected} expected)")]
    WrongArgumentCount {
        name: String,
        given: usize,
        expected: String,
    },

    #[error("Factorial is only defined for non-negative integers, got {0}")]
    InvalidFactorial(String),

    #[error("Number of decimals in function round must be an integer from 0 to 15, got {0}")]
    InvalidDecimals(String),

    #[error("Invalid variable \"{0}\": a symbol name is required")]
    InvalidVariable(String),

    #[error("Function \"{0}\" is not supported by derivative, or a wrong number of arguments is passed")]
    UnsupportedFunction(String),

    #[error("Operator \"{0}\" is not supported by derivative")]
    UnsupportedOperator(&'static str),
}

/// The evaluation and differentiation capability consumed by the tools.
///
/// Implementations must be pure: the same input always produces the same
/// output, and failures are reported as [`MathError`] values rather than
/// panics.
pub trait MathEngine: Send + Sync {
    /// Evaluate `expression` to a number.
    fn evaluate(&self, expression: &str) -> Result<f64, MathError>;

    /// Differentiate `expression` with respect to `variable`.
    fn derivative(&self, expression: &str, variable: &str) -> Result<Expr, MathError>;
}

/// Bundled engine: real-valued arithmetic, common functions and calculus rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct Engine;

impl MathEngine for Engine {
    fn evaluate(&self, expression: &str) -> Result<f64, MathError> {
        let expr = parser::parse(expression)?;
        eval::evaluate(&expr)
    }

    fn derivative(&self, expression: &str, variable: &str) -> Result<Expr, MathError> {
        if !parser::is_symbol_name(variable) {
            return Err(MathError::InvalidVariable(variable.to_string()));
        }
        let expr = parser::parse(expression)?;
        let derived = derivative::differentiate(&expr, variable)?;
        Ok(simplify::simplify(derived))
    }
}
