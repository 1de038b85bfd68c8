//! Expression Tree
//!
//! Parsed expressions are represented as a small tree of numbers, symbols,
//! operators and function calls. The same tree is used for evaluation,
//! differentiation and printing, so a derivative can be rendered with the
//! same rules as any user-supplied expression.

use std::fmt;

/// Binary operators, in the order they appear in the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 2,
            BinaryOp::Pow => 4,
        }
    }
}

const UNARY_PRECEDENCE: u8 = 3;
const FACTORIAL_PRECEDENCE: u8 = 5;
const ATOM_PRECEDENCE: u8 = 6;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Symbol(String),
    Neg(Box<Expr>),
    Factorial(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

impl Expr {
    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::Symbol(name.into())
    }

    pub fn call(name: &str, args: Vec<Expr>) -> Self {
        Expr::Call(name.to_string(), args)
    }

    pub fn neg(expr: Expr) -> Self {
        Expr::Neg(Box::new(expr))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary(op, Box::new(left), Box::new(right))
    }

    pub fn add(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Add, left, right)
    }

    pub fn sub(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Sub, left, right)
    }

    pub fn mul(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Mul, left, right)
    }

    pub fn div(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Div, left, right)
    }

    pub fn pow(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Pow, left, right)
    }

    /// Whether the expression mentions `variable` anywhere.
    pub fn depends_on(&self, variable: &str) -> bool {
        match self {
            Expr::Number(_) => false,
            Expr::Symbol(name) => name == variable,
            Expr::Neg(inner) | Expr::Factorial(inner) => inner.depends_on(variable),
            Expr::Binary(_, left, right) => left.depends_on(variable) || right.depends_on(variable),
            Expr::Call(_, args) => args.iter().any(|arg| arg.depends_on(variable)),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(value) if value.is_sign_negative() && *value != 0.0 => UNARY_PRECEDENCE,
            Expr::Number(_) | Expr::Symbol(_) | Expr::Call(..) => ATOM_PRECEDENCE,
            Expr::Neg(_) => UNARY_PRECEDENCE,
            Expr::Factorial(_) => FACTORIAL_PRECEDENCE,
            Expr::Binary(op, ..) => op.precedence(),
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, parenthesize: bool) -> fmt::Result {
    if parenthesize {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

/// Renders the expression with spaced binary operators and only the
/// parentheses needed to preserve the tree's structure.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(value) => f.write_str(&format_number(*value)),
            Expr::Symbol(name) => f.write_str(name),
            Expr::Neg(inner) => {
                f.write_str("-")?;
                write_operand(f, inner, inner.precedence() <= UNARY_PRECEDENCE)
            }
            Expr::Factorial(inner) => {
                write_operand(f, inner, inner.precedence() < ATOM_PRECEDENCE)?;
                f.write_str("!")
            }
            Expr::Binary(op, left, right) => {
                let precedence = op.precedence();
                let (left_parens, right_parens) = match op {
                    // Right-associative: (a ^ b) ^ c needs parentheses, a ^ (b ^ c) does not
                    BinaryOp::Pow => (
                        left.precedence() <= precedence,
                        right.precedence() < precedence,
                    ),
                    BinaryOp::Sub | BinaryOp::Div | BinaryOp::Mod => (
                        left.precedence() < precedence,
                        right.precedence() <= precedence,
                    ),
                    BinaryOp::Add | BinaryOp::Mul => (
                        left.precedence() < precedence,
                        right.precedence() < precedence,
                    ),
                };
                write_operand(f, left, left_parens)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right, right_parens)
            }
            Expr::Call(name, args) => {
                write!(f, "{}(", name)?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Format a number the way JavaScript's `Number#toString` does.
///
/// Integral values print without a fractional part, non-finite values print
/// as `Infinity`, `-Infinity` and `NaN`, and very large or very small
/// magnitudes switch to exponent notation (`1e+21`, `1e-7`).
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    // `{:e}` yields the shortest round-trip digits as d.ddde<exp>
    let scientific = format!("{:e}", value.abs());
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let k = digits.len() as i32;
    let n = exponent + 1;

    let body = if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (whole, fraction) = digits.split_at(n as usize);
        format!("{}.{}", whole, fraction)
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let sign = if n - 1 < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", lead, sign, (n - 1).abs())
        } else {
            format!("{}.{}e{}{}", lead, rest, sign, (n - 1).abs())
        }
    };

    if value < 0.0 { format!("-{}", body) } else { body }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_numbers_like_javascript() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1234.5678), "1234.5678");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn prints_minimal_parentheses() {
        let x = || Expr::symbol("x");
        let expr = Expr::mul(Expr::Number(3.0), Expr::pow(x(), Expr::Number(2.0)));
        assert_eq!(expr.to_string(), "3 * x ^ 2");

        let expr = Expr::mul(Expr::add(x(), Expr::Number(1.0)), x());
        assert_eq!(expr.to_string(), "(x + 1) * x");

        let expr = Expr::sub(x(), Expr::sub(x(), Expr::Number(1.0)));
        assert_eq!(expr.to_string(), "x - (x - 1)");

        let expr = Expr::pow(Expr::pow(x(), Expr::Number(2.0)), Expr::Number(3.0));
        assert_eq!(expr.to_string(), "(x ^ 2) ^ 3");

        let expr = Expr::pow(Expr::Number(-2.0), x());
        assert_eq!(expr.to_string(), "(-2) ^ x");

        let expr = Expr::neg(Expr::call("sin", vec![x()]));
        assert_eq!(expr.to_string(), "-sin(x)");

        let expr = Expr::div(Expr::Number(1.0), Expr::mul(Expr::Number(2.0), x()));
        assert_eq!(expr.to_string(), "1 / (2 * x)");
    }

    #[test]
    fn tracks_variable_dependence() {
        let expr = Expr::call("sin", vec![Expr::mul(Expr::Number(2.0), Expr::symbol("x"))]);
        assert!(expr.depends_on("x"));
        assert!(!expr.depends_on("y"));
    }
}
