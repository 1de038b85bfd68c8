//! Expression Parser
//!
//! Turns an expression string into an [`Expr`] tree. The grammar, from
//! lowest to highest precedence:
//!
//! ```text
//! additive       := multiplicative (('+' | '-') multiplicative)*
//! multiplicative := unary (('*' | '/' | '%') unary | <implicit> unary)*
//! unary          := ('-' | '+') unary | power
//! power          := postfix ('^' unary)?
//! postfix        := primary '!'*
//! primary        := number | name | name '(' args ')' | '(' additive ')'
//! ```
//!
//! Implicit multiplication applies when an operand is directly followed by a
//! name or an opening parenthesis (`2x`, `3(x + 1)`, `(a)(b)`).

use super::MathError;
use super::ast::{BinaryOp, Expr};

/// Longest expression accepted, in characters.
pub const MAX_EXPRESSION_LEN: usize = 4096;

/// Deepest nesting of parentheses, signs, exponents and operator chains accepted.
pub const MAX_NESTING: usize = 128;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Name(String),
    Operator(char),
    LeftParen,
    RightParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(value) => super::ast::format_number(*value),
            Token::Name(name) => name.clone(),
            Token::Operator(op) => op.to_string(),
            Token::LeftParen => "(".to_string(),
            Token::RightParen => ")".to_string(),
            Token::Comma => ",".to_string(),
        }
    }
}

/// A token together with its 1-based character position.
type Spanned = (Token, usize);

fn tokenize(input: &str) -> Result<Vec<Spanned>, MathError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let position = i + 1;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i < chars.len() && chars[i] == '.' {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            // Exponent only when followed by digits, so `2e` stays `2 * e`
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let literal: String = chars[start..i].iter().collect();
            let value = literal
                .parse::<f64>()
                .map_err(|_| MathError::InvalidNumber(literal.clone()))?;
            tokens.push((Token::Number(value), position));
            continue;
        }

        if c.is_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                i += 1;
            }
            tokens.push((Token::Name(chars[start..i].iter().collect()), position));
            continue;
        }

        let token = match c {
            '+' | '-' | '*' | '/' | '%' | '^' | '!' => Token::Operator(c),
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            ',' => Token::Comma,
            _ => {
                return Err(MathError::UnexpectedCharacter {
                    character: c,
                    position,
                });
            }
        };
        tokens.push((token, position));
        i += 1;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Spanned>,
    cursor: usize,
    end_position: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|(token, _)| token)
    }

    fn next(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn eat_operator(&mut self, op: char) -> bool {
        if self.peek() == Some(&Token::Operator(op)) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self) -> MathError {
        match self.tokens.get(self.cursor) {
            Some((token, position)) => MathError::UnexpectedToken {
                token: token.describe(),
                position: *position,
            },
            None => MathError::UnexpectedEnd(self.end_position),
        }
    }

    fn enter(&mut self) -> Result<(), MathError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(MathError::TooDeep(MAX_NESTING));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // Each operand folded into a chain adds a level to the left-leaning
    // tree, so chains count towards the nesting limit like parentheses do.
    fn additive(&mut self) -> Result<Expr, MathError> {
        let mut left = self.multiplicative()?;
        let mut folded = 0;
        loop {
            let op = match self.peek() {
                Some(Token::Operator('+')) => BinaryOp::Add,
                Some(Token::Operator('-')) => BinaryOp::Sub,
                _ => break,
            };
            self.cursor += 1;
            self.enter()?;
            folded += 1;
            let right = self.multiplicative()?;
            left = Expr::binary(op, left, right);
        }
        self.depth -= folded;
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, MathError> {
        let mut left = self.unary()?;
        let mut folded = 0;
        loop {
            let op = match self.peek() {
                Some(Token::Operator('*')) => BinaryOp::Mul,
                Some(Token::Operator('/')) => BinaryOp::Div,
                Some(Token::Operator('%')) => BinaryOp::Mod,
                // implicit multiplication, no operator to consume
                Some(Token::Name(_)) | Some(Token::LeftParen) => {
                    self.enter()?;
                    folded += 1;
                    let right = self.unary()?;
                    left = Expr::mul(left, right);
                    continue;
                }
                _ => break,
            };
            self.cursor += 1;
            self.enter()?;
            folded += 1;
            let right = self.unary()?;
            left = Expr::binary(op, left, right);
        }
        self.depth -= folded;
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, MathError> {
        if self.eat_operator('-') {
            self.enter()?;
            let operand = self.unary()?;
            self.leave();
            return Ok(Expr::neg(operand));
        }
        if self.eat_operator('+') {
            self.enter()?;
            let operand = self.unary()?;
            self.leave();
            return Ok(operand);
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, MathError> {
        let base = self.postfix()?;
        if self.eat_operator('^') {
            self.enter()?;
            let exponent = self.unary()?;
            self.leave();
            return Ok(Expr::pow(base, exponent));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, MathError> {
        let mut expr = self.primary()?;
        while self.eat_operator('!') {
            expr = Expr::Factorial(Box::new(expr));
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, MathError> {
        let Some((token, _)) = self.tokens.get(self.cursor).cloned() else {
            return Err(self.unexpected());
        };
        match token {
            Token::Number(value) => {
                self.cursor += 1;
                Ok(Expr::Number(value))
            }
            Token::Name(name) => {
                self.cursor += 1;
                if self.peek() == Some(&Token::LeftParen) {
                    self.cursor += 1;
                    let args = self.arguments()?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::symbol(name))
                }
            }
            Token::LeftParen => {
                self.cursor += 1;
                self.enter()?;
                let inner = self.additive()?;
                self.leave();
                self.expect_close()?;
                Ok(inner)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, MathError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RightParen) {
            self.cursor += 1;
            return Ok(args);
        }
        self.enter()?;
        loop {
            args.push(self.additive()?);
            if self.peek() == Some(&Token::Comma) {
                self.cursor += 1;
                continue;
            }
            break;
        }
        self.leave();
        self.expect_close()?;
        Ok(args)
    }

    fn expect_close(&mut self) -> Result<(), MathError> {
        match self.next() {
            Some((Token::RightParen, _)) => Ok(()),
            Some((_, position)) => Err(MathError::MissingParenthesis(position)),
            None => Err(MathError::MissingParenthesis(self.end_position)),
        }
    }
}

/// Parse an expression string into an expression tree.
pub fn parse(input: &str) -> Result<Expr, MathError> {
    let length = input.chars().count();
    if length > MAX_EXPRESSION_LEN {
        return Err(MathError::TooLong(MAX_EXPRESSION_LEN));
    }

    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        end_position: length + 1,
        depth: 0,
    };

    let expr = parser.additive()?;
    if parser.cursor < parser.tokens.len() {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

/// Whether `name` is a valid symbol name on its own.
pub fn is_symbol_name(name: &str) -> bool {
    matches!(tokenize(name).as_deref(), Ok([(Token::Name(_), _)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn x() -> Expr {
        Expr::symbol("x")
    }

    #[test]
    fn respects_precedence_and_associativity() {
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Expr::add(Expr::Number(1.0), Expr::mul(Expr::Number(2.0), Expr::Number(3.0)))
        );
        assert_eq!(
            parse("8 - 4 - 2").unwrap(),
            Expr::sub(Expr::sub(Expr::Number(8.0), Expr::Number(4.0)), Expr::Number(2.0))
        );
        assert_eq!(
            parse("2 ^ 3 ^ 2").unwrap(),
            Expr::pow(Expr::Number(2.0), Expr::pow(Expr::Number(3.0), Expr::Number(2.0)))
        );
        // unary minus binds looser than exponentiation
        assert_eq!(
            parse("-x^2").unwrap(),
            Expr::neg(Expr::pow(x(), Expr::Number(2.0)))
        );
        assert_eq!(
            parse("2^-1").unwrap(),
            Expr::pow(Expr::Number(2.0), Expr::neg(Expr::Number(1.0)))
        );
    }

    #[test]
    fn supports_implicit_multiplication() {
        assert_eq!(parse("2x").unwrap(), Expr::mul(Expr::Number(2.0), x()));
        assert_eq!(
            parse("3(x + 1)").unwrap(),
            Expr::mul(Expr::Number(3.0), Expr::add(x(), Expr::Number(1.0)))
        );
        assert_eq!(
            parse("2 sin(x)").unwrap(),
            Expr::mul(Expr::Number(2.0), Expr::call("sin", vec![x()]))
        );
    }

    #[test]
    fn parses_calls_and_factorials() {
        assert_eq!(
            parse("log(x, 2)").unwrap(),
            Expr::call("log", vec![x(), Expr::Number(2.0)])
        );
        assert_eq!(
            parse("3!").unwrap(),
            Expr::Factorial(Box::new(Expr::Number(3.0)))
        );
        assert_eq!(parse("1.5e3").unwrap(), Expr::Number(1500.0));
        assert_eq!(parse(".25").unwrap(), Expr::Number(0.25));
    }

    #[test]
    fn reports_syntax_errors() {
        assert_eq!(parse("2 +").unwrap_err(), MathError::UnexpectedEnd(4));
        assert_eq!(parse("").unwrap_err(), MathError::UnexpectedEnd(1));
        assert_eq!(
            parse("2 * * 3").unwrap_err(),
            MathError::UnexpectedToken {
                token: "*".to_string(),
                position: 5
            }
        );
        assert_eq!(parse("(1 + 2").unwrap_err(), MathError::MissingParenthesis(7));
        assert_eq!(
            parse("2 # 3").unwrap_err(),
            MathError::UnexpectedCharacter {
                character: '#',
                position: 3
            }
        );
        assert_eq!(
            parse("1 2").unwrap_err(),
            MathError::UnexpectedToken {
                token: "2".to_string(),
                position: 3
            }
        );
    }

    #[test]
    fn rejects_excessive_nesting() {
        let deep = format!("{}1{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        assert_eq!(parse(&deep).unwrap_err(), MathError::TooDeep(MAX_NESTING));

        let long = "1+".repeat(MAX_EXPRESSION_LEN);
        assert_eq!(parse(&long).unwrap_err(), MathError::TooLong(MAX_EXPRESSION_LEN));
    }

    #[test]
    fn operator_chains_count_towards_nesting() {
        let chain = format!("x{}", "*x".repeat(2000));
        assert!(chain.len() < MAX_EXPRESSION_LEN);
        assert_eq!(parse(&chain).unwrap_err(), MathError::TooDeep(MAX_NESTING));

        let implicit = "(x)".repeat(MAX_NESTING + 2);
        assert_eq!(parse(&implicit).unwrap_err(), MathError::TooDeep(MAX_NESTING));

        let sum = format!("1{}", "+1".repeat(MAX_NESTING - 1));
        assert!(parse(&sum).is_ok());

        // sibling chains do not accumulate
        let short = format!("1{}", "+1".repeat(MAX_NESTING - 3));
        let siblings = format!("({}) * ({})", short, short);
        assert!(parse(&siblings).is_ok());
    }

    #[test]
    fn recognizes_symbol_names() {
        assert!(is_symbol_name("x"));
        assert!(is_symbol_name("theta_1"));
        assert!(!is_symbol_name("2x"));
        assert!(!is_symbol_name("x + y"));
        assert!(!is_symbol_name(""));
    }
}
