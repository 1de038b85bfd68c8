//! Numeric Evaluation
//!
//! Evaluates an expression tree to a single `f64`. Only named constants are
//! available as symbols; any other name is an undefined symbol.

use std::f64::consts;

use super::MathError;
use super::ast::{BinaryOp, Expr};

/// Largest n for which n! is finite in f64.
const MAX_FACTORIAL: u32 = 170;

/// Most decimals `round(x, n)` accepts.
const MAX_ROUND_DECIMALS: f64 = 15.0;

/// Look up a named constant.
pub fn constant(name: &str) -> Option<f64> {
    let value = match name {
        "pi" | "PI" => consts::PI,
        "e" | "E" => consts::E,
        "tau" => consts::TAU,
        "phi" => 1.618_033_988_749_895,
        "deg" => consts::PI / 180.0,
        "Infinity" => f64::INFINITY,
        "NaN" => f64::NAN,
        _ => return None,
    };
    Some(value)
}

pub fn evaluate(expr: &Expr) -> Result<f64, MathError> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Symbol(name) => constant(name).ok_or_else(|| MathError::UndefinedSymbol(name.clone())),
        Expr::Neg(inner) => Ok(-evaluate(inner)?),
        Expr::Factorial(inner) => factorial(evaluate(inner)?),
        Expr::Binary(op, left, right) => {
            let left = evaluate(left)?;
            let right = evaluate(right)?;
            Ok(apply_binary(*op, left, right))
        }
        Expr::Call(name, args) => {
            let values = args.iter().map(evaluate).collect::<Result<Vec<_>, _>>()?;
            call(name, &values)
        }
    }
}

pub fn apply_binary(op: BinaryOp, left: f64, right: f64) -> f64 {
    match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => left / right,
        BinaryOp::Mod => modulo(left, right),
        BinaryOp::Pow => left.powf(right),
    }
}

/// Modulo with the sign of the divisor; `x mod 0` is `x`.
fn modulo(x: f64, y: f64) -> f64 {
    if y == 0.0 {
        return x;
    }
    x - y * (x / y).floor()
}

fn factorial(n: f64) -> Result<f64, MathError> {
    if n < 0.0 || n.fract() != 0.0 || n.is_nan() {
        return Err(MathError::InvalidFactorial(super::ast::format_number(n)));
    }
    if n > f64::from(MAX_FACTORIAL) {
        return Ok(f64::INFINITY);
    }
    Ok((2..=n as u32).fold(1.0, |acc, k| acc * f64::from(k)))
}

fn arity(name: &str, given: usize, expected: &str) -> MathError {
    MathError::WrongArgumentCount {
        name: name.to_string(),
        given,
        expected: expected.to_string(),
    }
}

fn unary_function(name: &str) -> Option<fn(f64) -> f64> {
    let function: fn(f64) -> f64 = match name {
        "sin" => f64::sin,
        "cos" => f64::cos,
        "tan" => f64::tan,
        "sec" => |x: f64| 1.0 / x.cos(),
        "csc" => |x: f64| 1.0 / x.sin(),
        "cot" => |x: f64| 1.0 / x.tan(),
        "asin" => f64::asin,
        "acos" => f64::acos,
        "atan" => f64::atan,
        "sinh" => f64::sinh,
        "cosh" => f64::cosh,
        "tanh" => f64::tanh,
        "exp" => f64::exp,
        "log10" => f64::log10,
        "log2" => f64::log2,
        "sqrt" => f64::sqrt,
        "cbrt" => f64::cbrt,
        "abs" => f64::abs,
        "floor" => f64::floor,
        "ceil" => f64::ceil,
        "sign" => |x: f64| if x == 0.0 || x.is_nan() { x } else { x.signum() },
        _ => return None,
    };
    Some(function)
}

/// Apply the named function to already evaluated arguments.
pub fn call(name: &str, args: &[f64]) -> Result<f64, MathError> {
    if let Some(function) = unary_function(name) {
        return match args {
            [x] => Ok(function(*x)),
            _ => Err(arity(name, args.len(), "1")),
        };
    }

    match name {
        "log" => match args {
            [x] => Ok(x.ln()),
            [x, base] => Ok(x.ln() / base.ln()),
            _ => Err(arity(name, args.len(), "1 or 2")),
        },
        "round" => match args {
            [x] => Ok(x.round()),
            [x, digits] => {
                if digits.fract() != 0.0 || !(0.0..=MAX_ROUND_DECIMALS).contains(digits) {
                    return Err(MathError::InvalidDecimals(super::ast::format_number(*digits)));
                }
                let scale = 10f64.powi(*digits as i32);
                Ok((x * scale).round() / scale)
            }
            _ => Err(arity(name, args.len(), "1 or 2")),
        },
        "pow" => match args {
            [x, y] => Ok(x.powf(*y)),
            _ => Err(arity(name, args.len(), "2")),
        },
        "mod" => match args {
            [x, y] => Ok(modulo(*x, *y)),
            _ => Err(arity(name, args.len(), "2")),
        },
        "min" | "max" => {
            if args.is_empty() {
                return Err(arity(name, 0, "at least 1"));
            }
            let pick: fn(f64, f64) -> f64 = if name == "min" { f64::min } else { f64::max };
            Ok(args[1..].iter().fold(args[0], |acc, x| pick(acc, *x)))
        }
        _ => Err(MathError::UndefinedFunction(name.to_string())),
    }
}
