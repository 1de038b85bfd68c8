//! Symbolic Differentiation
//!
//! Applies the sum, product, quotient, power and chain rules to an
//! expression tree. The raw result is full of `* 1` and `+ 0` terms, so
//! callers run it through [`simplify`](super::simplify::simplify) before
//! printing.

use super::MathError;
use super::ast::{BinaryOp, Expr};

fn num(value: f64) -> Expr {
    Expr::Number(value)
}

fn ln(expr: Expr) -> Expr {
    Expr::call("log", vec![expr])
}

/// Differentiate `expr` with respect to `variable`.
pub fn differentiate(expr: &Expr, variable: &str) -> Result<Expr, MathError> {
    if !expr.depends_on(variable) {
        return Ok(num(0.0));
    }

    match expr {
        Expr::Number(_) => Ok(num(0.0)),
        Expr::Symbol(name) => Ok(num(if name == variable { 1.0 } else { 0.0 })),
        Expr::Neg(inner) => Ok(Expr::neg(differentiate(inner, variable)?)),
        Expr::Factorial(_) => Err(MathError::UnsupportedOperator("!")),
        Expr::Binary(op, left, right) => binary(*op, left, right, variable),
        Expr::Call(name, args) => call(name, args, variable),
    }
}

fn binary(op: BinaryOp, u: &Expr, v: &Expr, variable: &str) -> Result<Expr, MathError> {
    match op {
        BinaryOp::Add => Ok(Expr::add(differentiate(u, variable)?, differentiate(v, variable)?)),
        BinaryOp::Sub => Ok(Expr::sub(differentiate(u, variable)?, differentiate(v, variable)?)),
        BinaryOp::Mul => {
            // (u v)' = u' v + u v'
            let du = differentiate(u, variable)?;
            let dv = differentiate(v, variable)?;
            Ok(Expr::add(
                Expr::mul(du, v.clone()),
                Expr::mul(u.clone(), dv),
            ))
        }
        BinaryOp::Div => {
            let du = differentiate(u, variable)?;
            if !v.depends_on(variable) {
                return Ok(Expr::div(du, v.clone()));
            }
            // (u / v)' = (u' v - u v') / v^2
            let dv = differentiate(v, variable)?;
            Ok(Expr::div(
                Expr::sub(Expr::mul(du, v.clone()), Expr::mul(u.clone(), dv)),
                Expr::pow(v.clone(), num(2.0)),
            ))
        }
        BinaryOp::Mod => Err(MathError::UnsupportedOperator("%")),
        BinaryOp::Pow => power(u, v, variable),
    }
}

fn power(base: &Expr, exponent: &Expr, variable: &str) -> Result<Expr, MathError> {
    if !exponent.depends_on(variable) {
        // (u^c)' = c u^(c - 1) u'
        let du = differentiate(base, variable)?;
        return Ok(Expr::mul(
            Expr::mul(
                exponent.clone(),
                Expr::pow(base.clone(), Expr::sub(exponent.clone(), num(1.0))),
            ),
            du,
        ));
    }

    let dv = differentiate(exponent, variable)?;
    if !base.depends_on(variable) {
        // (c^v)' = c^v ln(c) v'
        return Ok(Expr::mul(
            Expr::mul(Expr::pow(base.clone(), exponent.clone()), ln(base.clone())),
            dv,
        ));
    }

    // (u^v)' = u^v (v' ln(u) + v u' / u)
    let du = differentiate(base, variable)?;
    Ok(Expr::mul(
        Expr::pow(base.clone(), exponent.clone()),
        Expr::add(
            Expr::mul(dv, ln(base.clone())),
            Expr::div(Expr::mul(exponent.clone(), du), base.clone()),
        ),
    ))
}

fn call(name: &str, args: &[Expr], variable: &str) -> Result<Expr, MathError> {
    let unsupported = || MathError::UnsupportedFunction(name.to_string());

    if name == "pow" {
        return match args {
            [base, exponent] => power(base, exponent, variable),
            _ => Err(unsupported()),
        };
    }

    if name == "log" {
        if let [u, base] = args {
            if base.depends_on(variable) {
                return Err(unsupported());
            }
            // log(u, b)' = u' / (u ln(b))
            let du = differentiate(u, variable)?;
            return Ok(Expr::div(du, Expr::mul(u.clone(), ln(base.clone()))));
        }
    }

    let [u] = args else {
        return Err(unsupported());
    };
    let du = differentiate(u, variable)?;
    let f = |function: &str| Expr::call(function, vec![u.clone()]);
    let one_minus_square = || Expr::sub(num(1.0), Expr::pow(u.clone(), num(2.0)));

    // f'(u), multiplied by u' below
    let outer = match name {
        "sin" => f("cos"),
        "cos" => Expr::neg(f("sin")),
        "tan" => Expr::pow(f("sec"), num(2.0)),
        "sec" => Expr::mul(f("sec"), f("tan")),
        "csc" => Expr::neg(Expr::mul(f("csc"), f("cot"))),
        "cot" => Expr::neg(Expr::pow(f("csc"), num(2.0))),
        "asin" => Expr::div(num(1.0), Expr::call("sqrt", vec![one_minus_square()])),
        "acos" => Expr::neg(Expr::div(num(1.0), Expr::call("sqrt", vec![one_minus_square()]))),
        "atan" => Expr::div(num(1.0), Expr::add(Expr::pow(u.clone(), num(2.0)), num(1.0))),
        "sinh" => f("cosh"),
        "cosh" => f("sinh"),
        "tanh" => Expr::sub(num(1.0), Expr::pow(f("tanh"), num(2.0))),
        "exp" => f("exp"),
        "log" => Expr::div(num(1.0), u.clone()),
        "log10" => Expr::div(num(1.0), Expr::mul(u.clone(), ln(num(10.0)))),
        "log2" => Expr::div(num(1.0), Expr::mul(u.clone(), ln(num(2.0)))),
        "sqrt" => Expr::div(num(1.0), Expr::mul(num(2.0), f("sqrt"))),
        "cbrt" => Expr::div(num(1.0), Expr::mul(num(3.0), Expr::pow(f("cbrt"), num(2.0)))),
        "abs" => Expr::div(f("abs"), u.clone()),
        _ => return Err(unsupported()),
    };

    Ok(Expr::mul(outer, du))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::parser::parse;
    use crate::math::simplify::simplify;

    fn derive(input: &str) -> Result<String, MathError> {
        let expr = parse(input).unwrap();
        Ok(simplify(differentiate(&expr, "x")?).to_string())
    }

    #[test]
    fn differentiates_polynomials() {
        assert_eq!(derive("x^2").unwrap(), "2 * x");
        assert_eq!(derive("x^3").unwrap(), "3 * x ^ 2");
        assert_eq!(derive("2x + 1").unwrap(), "2");
        assert_eq!(derive("x").unwrap(), "1");
        assert_eq!(derive("5").unwrap(), "0");
        assert_eq!(derive("y^2").unwrap(), "0");
    }

    #[test]
    fn applies_chain_rule_through_functions() {
        assert_eq!(derive("sin(x)").unwrap(), "cos(x)");
        assert_eq!(derive("cos(x)").unwrap(), "-sin(x)");
        assert_eq!(derive("exp(2x)").unwrap(), "2 * exp(2 * x)");
        assert_eq!(derive("log(x)").unwrap(), "1 / x");
        assert_eq!(derive("sin(x^2)").unwrap(), "2 * cos(x ^ 2) * x");
    }

    #[test]
    fn applies_product_and_quotient_rules() {
        assert_eq!(derive("x * sin(x)").unwrap(), "sin(x) + x * cos(x)");
        assert_eq!(derive("x / 2").unwrap(), "1 / 2");
        assert_eq!(derive("1 / x").unwrap(), "-1 / x ^ 2");
    }

    #[test]
    fn folds_constant_logarithms() {
        assert_eq!(derive("e^x").unwrap(), "e ^ x");
        assert_eq!(derive("2^x").unwrap(), "2 ^ x * log(2)");
        assert_eq!(derive("log(x, e)").unwrap(), "1 / x");
    }

    #[test]
    fn collapses_repeated_products() {
        let product = format!("x{}", "*x".repeat(99));
        assert_eq!(derive(&product).unwrap(), "100 * x ^ 99");
        assert_eq!(derive("x * x").unwrap(), "2 * x");
    }

    #[test]
    fn rejects_unsupported_constructs() {
        assert_eq!(
            derive("floor(x)").unwrap_err(),
            MathError::UnsupportedFunction("floor".to_string())
        );
        assert_eq!(
            derive("x!").unwrap_err(),
            MathError::UnsupportedOperator("!")
        );
        // constant with respect to x, so nothing to reject
        assert_eq!(derive("floor(y)").unwrap(), "0");
    }
}
