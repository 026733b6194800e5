//! Four-operator arithmetic for edited quantity cells.
//!
//! Only numeric literals, `+ - * /`, unary signs and parentheses are
//! accepted. Anything else is a lexer error, so a cell is never treated as
//! code.

use thiserror::Error;

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArithmeticError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{ch}' at {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected token at {0}")]
    UnexpectedToken(usize),

    #[error("missing closing parenthesis")]
    UnclosedParen,

    #[error("division by zero")]
    DivisionByZero,

    #[error("expression nested too deeply")]
    TooDeep,

    #[error("result is not a finite number")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TokenKind {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Eof,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    pos: usize,
}

/// Integer literals such as `01` are rejected; `0`, `00` and `0.5` are not.
fn has_leading_zero(literal: &str) -> bool {
    !literal.contains('.')
        && literal.len() > 1
        && literal.starts_with('0')
        && literal.bytes().any(|byte| byte != b'0')
}

fn tokenize(input: &str) -> Result<Vec<Token>, ArithmeticError> {
    let chars = input.char_indices().collect::<Vec<_>>();
    let mut tokens = Vec::new();
    let mut index = 0;

    while let Some(&(pos, ch)) = chars.get(index) {
        let kind = match ch {
            c if c.is_whitespace() => {
                index += 1;
                continue;
            }
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '0'..='9' | '.' => {
                let start = index;
                while chars
                    .get(index)
                    .is_some_and(|(_, c)| c.is_ascii_digit() || *c == '.')
                {
                    index += 1;
                }
                let literal = chars[start..index].iter().map(|(_, c)| c).collect::<String>();
                if literal.matches('.').count() > 1
                    || literal == "."
                    || has_leading_zero(&literal)
                {
                    return Err(ArithmeticError::InvalidNumber(literal));
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ArithmeticError::InvalidNumber(literal.clone()))?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    pos,
                });
                continue;
            }
            _ => return Err(ArithmeticError::UnexpectedChar { ch, pos }),
        };
        tokens.push(Token { kind, pos });
        index += 1;
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        pos: input.len(),
    });
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn descend(&mut self) -> Result<(), ArithmeticError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ArithmeticError::TooDeep);
        }
        Ok(())
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, ArithmeticError> {
        let mut value = self.term()?;
        loop {
            match self.peek().kind {
                TokenKind::Plus => {
                    self.advance();
                    value += self.term()?;
                }
                TokenKind::Minus => {
                    self.advance();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<f64, ArithmeticError> {
        let mut value = self.unary()?;
        loop {
            match self.peek().kind {
                TokenKind::Star => {
                    self.advance();
                    value *= self.unary()?;
                }
                TokenKind::Slash => {
                    self.advance();
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err(ArithmeticError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    // unary := ('+' | '-') unary | primary
    fn unary(&mut self) -> Result<f64, ArithmeticError> {
        match self.peek().kind {
            TokenKind::Plus | TokenKind::Minus => {
                let sign = self.advance();
                self.descend()?;
                let value = self.unary()?;
                self.depth -= 1;
                Ok(if sign.kind == TokenKind::Minus {
                    -value
                } else {
                    value
                })
            }
            _ => self.primary(),
        }
    }

    // primary := NUMBER | '(' expr ')'
    fn primary(&mut self) -> Result<f64, ArithmeticError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(value) => Ok(value),
            TokenKind::LParen => {
                self.descend()?;
                let value = self.expr()?;
                if self.advance().kind != TokenKind::RParen {
                    return Err(ArithmeticError::UnclosedParen);
                }
                self.depth -= 1;
                Ok(value)
            }
            _ => Err(ArithmeticError::UnexpectedToken(token.pos)),
        }
    }
}

/// Evaluates a four-operator arithmetic expression.
///
/// # Errors
///
/// Returns an error for any token outside the grammar, malformed input,
/// division by zero, or a non-finite result.
pub fn evaluate(expr: &str) -> Result<f64, ArithmeticError> {
    let tokens = tokenize(expr)?;
    if tokens.len() == 1 {
        return Err(ArithmeticError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    let trailing = parser.peek();
    if trailing.kind != TokenKind::Eof {
        return Err(ArithmeticError::UnexpectedToken(trailing.pos));
    }
    if !value.is_finite() {
        return Err(ArithmeticError::NonFinite);
    }
    Ok(value)
}

fn has_operator(value: &str) -> bool {
    value.contains(['+', '-', '*', '/'])
}

/// Formats a result the way a spreadsheet user typed it: `55`, not `55.0`.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        #[allow(clippy::cast_possible_truncation)]
        let whole = value as i64;
        whole.to_string()
    } else {
        value.to_string()
    }
}

/// Replaces an arithmetic cell with its result; any other cell, or a cell
/// that fails to evaluate, is returned unchanged.
#[must_use]
pub fn auto_evaluate(cell: &str) -> String {
    let trimmed = cell.trim();
    if trimmed.is_empty() || !has_operator(trimmed) {
        return cell.to_string();
    }

    evaluate(trimmed).map_or_else(|_| cell.to_string(), format_number)
}
