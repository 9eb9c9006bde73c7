//! Restricted arithmetic evaluator for byte-threshold expressions.
//!
//! Accepts numeric literals, `+ - * / **`, unary signs and parentheses, so a
//! threshold can be written as `30 * 10 ** 9` instead of `30000000000`.
//! Nothing else is recognized: no names, no calls, no attribute access.
//!
//! Arithmetic follows the familiar scripting-language rules:
//! - integers stay exact until an operation needs a float;
//! - `/` is always true division and yields a float;
//! - `**` binds tighter than a unary sign on its left and is right-associative,
//!   so `-2 ** 2 == -4` and `2 ** 3 ** 2 == 512`.

#![allow(missing_docs)]

use std::fmt;

use crate::core::errors::{Result, RotateError};

/// Maximum recursion depth accepted before the parser gives up.
///
/// Every parenthesis level, unary sign and `**` exponent descends one level.
const MAX_NESTING: usize = 64;

/// Value produced by evaluating an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    #[allow(clippy::cast_precision_loss)]
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(value) => value as f64,
            Self::Float(value) => value,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

/// Evaluate `expression` into a [`Number`].
pub fn evaluate(expression: &str) -> Result<Number> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        source: expression,
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(parser.error(format!("unexpected {token} at offset {}", token.offset)));
    }
    Ok(value)
}

/// Evaluate `expression` into a byte threshold.
///
/// Fractional results round up: free space is an integer, so `free < 1.5`
/// holds exactly when `free < 2`.
pub fn eval_byte_threshold(expression: &str) -> Result<u64> {
    let invalid = |details: String| RotateError::InvalidExpression {
        expression: expression.to_string(),
        details,
    };

    match evaluate(expression)? {
        Number::Int(value) => {
            u64::try_from(value).map_err(|_| invalid(format!("{value} is not a valid byte count")))
        }
        Number::Float(value) => {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{value} is not a valid byte count")));
            }
            let rounded = value.ceil();
            #[allow(clippy::cast_precision_loss)]
            let ceiling = u64::MAX as f64;
            if rounded >= ceiling {
                return Err(invalid(format!("{value} exceeds the largest byte count")));
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let bytes = rounded as u64;
            Ok(bytes)
        }
    }
}

// ──────────────────── lexer ────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum TokenKind {
    Number(Number),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    LParen,
    RParen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Number(n) => write!(f, "number {n}"),
            TokenKind::Plus => f.write_str("'+'"),
            TokenKind::Minus => f.write_str("'-'"),
            TokenKind::Star => f.write_str("'*'"),
            TokenKind::DoubleStar => f.write_str("'**'"),
            TokenKind::Slash => f.write_str("'/'"),
            TokenKind::LParen => f.write_str("'('"),
            TokenKind::RParen => f.write_str("')'"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let kind = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' if bytes.get(i + 1) == Some(&b'*') => TokenKind::DoubleStar,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'0'..=b'9' | b'.' => {
                let (number, len) = lex_number(source, i)?;
                tokens.push(Token {
                    kind: TokenKind::Number(number),
                    offset: i,
                });
                i += len;
                continue;
            }
            _ => {
                let ch = source[i..].chars().next().unwrap_or('?');
                return Err(RotateError::InvalidExpression {
                    expression: source.to_string(),
                    details: format!("unsupported character {ch:?} at offset {i}"),
                });
            }
        };
        let width = if kind == TokenKind::DoubleStar { 2 } else { 1 };
        tokens.push(Token { kind, offset: i });
        i += width;
    }

    Ok(tokens)
}

/// Lex a numeric literal starting at `start`; returns the value and byte length.
fn lex_number(source: &str, start: usize) -> Result<(Number, usize)> {
    let bytes = source.as_bytes();
    let invalid = |details: String| RotateError::InvalidExpression {
        expression: source.to_string(),
        details,
    };

    let mut end = start;
    let mut is_float = false;
    let digits = |end: &mut usize| {
        let from = *end;
        while *end < bytes.len() && (bytes[*end].is_ascii_digit() || bytes[*end] == b'_') {
            *end += 1;
        }
        *end - from
    };

    let int_digits = digits(&mut end);
    let mut frac_digits = 0;
    if end < bytes.len() && bytes[end] == b'.' {
        is_float = true;
        end += 1;
        frac_digits = digits(&mut end);
    }
    if int_digits == 0 && frac_digits == 0 {
        return Err(invalid(format!("malformed number at offset {start}")));
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        is_float = true;
        end += 1;
        if end < bytes.len() && matches!(bytes[end], b'+' | b'-') {
            end += 1;
        }
        if digits(&mut end) == 0 {
            return Err(invalid(format!("malformed exponent at offset {start}")));
        }
    }

    let literal = &source[start..end];
    if literal.starts_with('_')
        || literal.ends_with('_')
        || literal.contains("__")
        || literal.contains("_.")
        || literal.contains("._")
    {
        return Err(invalid(format!("misplaced '_' in {literal:?}")));
    }
    let cleaned: String = literal.chars().filter(|c| *c != '_').collect();

    let number = if is_float {
        cleaned
            .parse::<f64>()
            .map(Number::Float)
            .map_err(|err| invalid(format!("{literal:?}: {err}")))?
    } else {
        cleaned
            .parse::<i128>()
            .map(Number::Int)
            .map_err(|err| invalid(format!("{literal:?}: {err}")))?
    };
    Ok((number, end - start))
}

// ──────────────────── parser ────────────────────

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek().is_some_and(|t| t.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, details: String) -> RotateError {
        RotateError::InvalidExpression {
            expression: self.source.to_string(),
            details,
        }
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Number> {
        let mut acc = self.term()?;
        loop {
            if self.eat(TokenKind::Plus) {
                let rhs = self.term()?;
                acc = self.arith(acc, rhs, Op::Add)?;
            } else if self.eat(TokenKind::Minus) {
                let rhs = self.term()?;
                acc = self.arith(acc, rhs, Op::Sub)?;
            } else {
                return Ok(acc);
            }
        }
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Number> {
        let mut acc = self.unary()?;
        loop {
            if self.eat(TokenKind::Star) {
                let rhs = self.unary()?;
                acc = self.arith(acc, rhs, Op::Mul)?;
            } else if self.eat(TokenKind::Slash) {
                let rhs = self.unary()?;
                acc = self.divide(acc, rhs)?;
            } else {
                return Ok(acc);
            }
        }
    }

    // unary := ('+' | '-') unary | power
    fn unary(&mut self) -> Result<Number> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error(format!("nesting deeper than {MAX_NESTING} levels")));
        }
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> Result<Number> {
        if self.eat(TokenKind::Plus) {
            return self.unary();
        }
        if self.eat(TokenKind::Minus) {
            let value = self.unary()?;
            return match value {
                Number::Int(v) => v
                    .checked_neg()
                    .map(Number::Int)
                    .ok_or_else(|| self.error("integer overflow".to_string())),
                Number::Float(v) => Ok(Number::Float(-v)),
            };
        }
        self.power()
    }

    // power := primary ('**' unary)?
    fn power(&mut self) -> Result<Number> {
        let base = self.primary()?;
        if self.eat(TokenKind::DoubleStar) {
            let exponent = self.unary()?;
            return self.pow(base, exponent);
        }
        Ok(base)
    }

    // primary := number | '(' expr ')'
    fn primary(&mut self) -> Result<Number> {
        let Some(token) = self.peek() else {
            return Err(self.error("unexpected end of expression".to_string()));
        };
        match token.kind {
            TokenKind::Number(n) => {
                self.pos += 1;
                Ok(n)
            }
            TokenKind::LParen => {
                self.pos += 1;
                let value = self.expr()?;
                if !self.eat(TokenKind::RParen) {
                    return Err(self.error(format!(
                        "missing ')' for '(' at offset {}",
                        token.offset
                    )));
                }
                Ok(value)
            }
            _ => Err(self.error(format!("unexpected {token} at offset {}", token.offset))),
        }
    }

    fn arith(&self, lhs: Number, rhs: Number, op: Op) -> Result<Number> {
        if let (Number::Int(a), Number::Int(b)) = (lhs, rhs) {
            let out = match op {
                Op::Add => a.checked_add(b),
                Op::Sub => a.checked_sub(b),
                Op::Mul => a.checked_mul(b),
            };
            return out
                .map(Number::Int)
                .ok_or_else(|| self.error("integer overflow".to_string()));
        }
        let (a, b) = (lhs.as_f64(), rhs.as_f64());
        let out = match op {
            Op::Add => a + b,
            Op::Sub => a - b,
            Op::Mul => a * b,
        };
        self.finite(out)
    }

    fn divide(&self, lhs: Number, rhs: Number) -> Result<Number> {
        let divisor = rhs.as_f64();
        if divisor == 0.0 {
            return Err(self.error("division by zero".to_string()));
        }
        self.finite(lhs.as_f64() / divisor)
    }

    fn pow(&self, base: Number, exponent: Number) -> Result<Number> {
        if let (Number::Int(b), Number::Int(e)) = (base, exponent)
            && e >= 0
        {
            let exp = u32::try_from(e).map_err(|_| self.error("integer overflow".to_string()))?;
            return b
                .checked_pow(exp)
                .map(Number::Int)
                .ok_or_else(|| self.error("integer overflow".to_string()));
        }
        let (b, e) = (base.as_f64(), exponent.as_f64());
        if b == 0.0 && e < 0.0 {
            return Err(self.error("zero raised to a negative power".to_string()));
        }
        let out = b.powf(e);
        if out.is_nan() {
            return Err(self.error(format!("{base} ** {exponent} has no real value")));
        }
        self.finite(out)
    }

    fn finite(&self, value: f64) -> Result<Number> {
        if value.is_finite() {
            Ok(Number::Float(value))
        } else {
            Err(self.error("result is not a finite number".to_string()))
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
}
