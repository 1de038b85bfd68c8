//! Algebraic Simplification
//!
//! A small bottom-up rewriter: folds constants, removes identity elements
//! (`x + 0`, `x * 1`, `x ^ 1`), pushes negation outward, moves numeric
//! coefficients to the front of products and collects like terms
//! (`x + x` is `2 * x`, `x * x` is `x ^ 2`). Division, exponentiation and
//! function calls are folded only when the result is an integer, so `1 / 3`
//! stays a fraction and `log(2)` stays symbolic while `log(e)` becomes `1`.

use super::ast::{BinaryOp, Expr};
use super::eval;

/// Upper bound on rewrite passes; each pass is a full bottom-up traversal.
const MAX_PASSES: usize = 16;

/// Relative distance from an integer within which a folded call counts as one.
const INTEGER_TOLERANCE: f64 = 1e-12;

pub fn simplify(expr: Expr) -> Expr {
    let mut current = expr;
    for _ in 0..MAX_PASSES {
        let next = step(current.clone());
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn is_number(expr: &Expr, value: f64) -> bool {
    matches!(expr, Expr::Number(n) if *n == value)
}

fn is_constant(expr: &Expr) -> bool {
    match expr {
        Expr::Number(_) => true,
        Expr::Symbol(name) => eval::constant(name).is_some(),
        _ => false,
    }
}

fn step(expr: Expr) -> Expr {
    match expr {
        Expr::Number(_) | Expr::Symbol(_) => expr,
        Expr::Neg(inner) => negate(step(*inner)),
        Expr::Factorial(inner) => Expr::Factorial(Box::new(step(*inner))),
        Expr::Call(name, args) => call(name, args.into_iter().map(step).collect()),
        Expr::Binary(op, left, right) => binary(op, step(*left), step(*right)),
    }
}

fn negate(expr: Expr) -> Expr {
    match expr {
        Expr::Number(value) => Expr::Number(-value),
        Expr::Neg(inner) => *inner,
        other => Expr::neg(other),
    }
}

fn call(name: String, args: Vec<Expr>) -> Expr {
    if !args.is_empty() && args.iter().all(is_constant) {
        let value = args
            .iter()
            .map(eval::evaluate)
            .collect::<Result<Vec<_>, _>>()
            .and_then(|values| eval::call(&name, &values));
        if let Ok(value) = value {
            let rounded = value.round();
            if value.is_finite() && (value - rounded).abs() <= INTEGER_TOLERANCE * rounded.abs().max(1.0) {
                return Expr::Number(rounded);
            }
        }
    }
    Expr::Call(name, args)
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    if let (Expr::Number(a), Expr::Number(b)) = (&left, &right) {
        let value = eval::apply_binary(op, *a, *b);
        let exact = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => true,
            BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow => value.fract() == 0.0,
        };
        if exact && value.is_finite() {
            return Expr::Number(value);
        }
    }

    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => sub(left, right),
        BinaryOp::Mul => mul(left, right),
        BinaryOp::Div => div(left, right),
        BinaryOp::Pow => pow(left, right),
        BinaryOp::Mod => Expr::binary(BinaryOp::Mod, left, right),
    }
}

/// Split a term into its numeric coefficient and the rest: `3 * x` is
/// `(3, x)` and `x` is `(1, x)`. Plain numbers have no such split.
fn term_parts(expr: &Expr) -> Option<(f64, &Expr)> {
    match expr {
        Expr::Number(_) => None,
        Expr::Binary(BinaryOp::Mul, coefficient, term) => match coefficient.as_ref() {
            Expr::Number(c) => Some((*c, term.as_ref())),
            _ => Some((1.0, expr)),
        },
        _ => Some((1.0, expr)),
    }
}

/// Split a factor into its base and numeric exponent: `x ^ 3` is `(x, 3)`
/// and `x` is `(x, 1)`.
fn power_parts(expr: &Expr) -> Option<(&Expr, f64)> {
    match expr {
        Expr::Number(_) => None,
        Expr::Binary(BinaryOp::Pow, base, exponent) => match exponent.as_ref() {
            Expr::Number(n) => Some((base.as_ref(), *n)),
            _ => Some((expr, 1.0)),
        },
        _ => Some((expr, 1.0)),
    }
}

// a x + b x -> (a + b) x, or (a - b) x with sign -1
fn collect_terms(left: &Expr, right: &Expr, sign: f64) -> Option<Expr> {
    let (a, x) = term_parts(left)?;
    let (b, y) = term_parts(right)?;
    (x == y).then(|| mul(Expr::Number(a + sign * b), x.clone()))
}

// x^m x^n -> x^(m + n)
fn collect_factors(left: &Expr, right: &Expr) -> Option<Expr> {
    let (x, m) = power_parts(left)?;
    let (y, n) = power_parts(right)?;
    (x == y).then(|| pow(x.clone(), Expr::Number(m + n)))
}

fn add(left: Expr, right: Expr) -> Expr {
    if let Some(sum) = collect_terms(&left, &right, 1.0) {
        return sum;
    }
    match (left, right) {
        (zero, x) | (x, zero) if is_number(&zero, 0.0) => x,
        (x, Expr::Neg(y)) => sub(x, *y),
        (x, Expr::Number(b)) if b < 0.0 => sub(x, Expr::Number(-b)),
        (Expr::Neg(x), y) => sub(y, *x),
        (x, y) => Expr::add(x, y),
    }
}

fn sub(left: Expr, right: Expr) -> Expr {
    if let Some(difference) = collect_terms(&left, &right, -1.0) {
        return difference;
    }
    match (left, right) {
        (x, zero) if is_number(&zero, 0.0) => x,
        (zero, y) if is_number(&zero, 0.0) => negate(y),
        (x, Expr::Neg(y)) => add(x, *y),
        (x, y) => Expr::sub(x, y),
    }
}

fn mul(left: Expr, right: Expr) -> Expr {
    let (left, right) = match (left, right) {
        (Expr::Number(a), Expr::Number(b)) => return Expr::Number(a * b),
        (zero, _) | (_, zero) if is_number(&zero, 0.0) => return Expr::Number(0.0),
        (one, x) | (x, one) if is_number(&one, 1.0) => return x,
        (minus_one, x) | (x, minus_one) if is_number(&minus_one, -1.0) => return negate(x),
        (Expr::Neg(x), y) => return negate(mul(*x, y)),
        (x, Expr::Neg(y)) => return negate(mul(x, *y)),
        pair => pair,
    };
    if let Some(power) = collect_factors(&left, &right) {
        return power;
    }

    match (left, right) {
        (Expr::Number(a), Expr::Binary(BinaryOp::Mul, inner, y)) => match *inner {
            Expr::Number(b) => mul(Expr::Number(a * b), *y),
            other => Expr::mul(Expr::Number(a), Expr::binary(BinaryOp::Mul, other, *y)),
        },
        // coefficient first: x * 2 -> 2 * x
        (x, Expr::Number(b)) => mul(Expr::Number(b), x),
        (Expr::Binary(BinaryOp::Mul, coefficient, x), y) if matches!(*coefficient, Expr::Number(_)) => {
            mul(*coefficient, mul(*x, y))
        }
        (x, Expr::Binary(BinaryOp::Mul, coefficient, y))
            if matches!(*coefficient, Expr::Number(_)) && !matches!(x, Expr::Number(_)) =>
        {
            mul(*coefficient, mul(x, *y))
        }
        (x, y) => Expr::mul(x, y),
    }
}

fn div(left: Expr, right: Expr) -> Expr {
    match (left, right) {
        (zero, _) if is_number(&zero, 0.0) => Expr::Number(0.0),
        (x, one) if is_number(&one, 1.0) => x,
        (Expr::Neg(x), y) => negate(div(*x, y)),
        (x, y) if x == y => Expr::Number(1.0),
        (x, y) => Expr::div(x, y),
    }
}

fn pow(left: Expr, right: Expr) -> Expr {
    match (left, right) {
        (_, zero) if is_number(&zero, 0.0) => Expr::Number(1.0),
        (x, one) if is_number(&one, 1.0) => x,
        (one, _) if is_number(&one, 1.0) => Expr::Number(1.0),
        (x, y) => Expr::pow(x, y),
    }
}
