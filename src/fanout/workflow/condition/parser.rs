//! Condition expression parser
//!
//! Parses expressions like:
//! - `agent_name == 'worker_1'`
//! - `score > 0.8`
//! - `not (a == 'x' or b > 5) and done == false`
//!
//! `and` binds tighter than `or`; parentheses group.

use super::ast::{CompareOp, Expression, Literal};
use crate::sdk::error::ConfigError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Path(String),
    Str(String),
    Num(f64),
    Op(CompareOp),
    And,
    Or,
    Not,
    True,
    False,
    Null,
    LParen,
    RParen,
}

/// Deepest `not`/parenthesis nesting accepted
const MAX_NESTING: usize = 32;

/// Parse a condition expression string into an AST
pub fn parse(input: &str) -> Result<Expression, ConfigError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
        input,
    };
    let expr = parser.parse_or()?;
    if parser.pos != tokens.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

fn tokenize(input: &str) -> Result<Vec<Token>, ConfigError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&q| q == c)
                    .map(|p| p + i + 1)
                    .ok_or_else(|| invalid(input, "unterminated string"))?;
                tokens.push(Token::Str(chars[i + 1..end].iter().collect()));
                i = end + 1;
            }
            '=' | '!' | '>' | '<' => {
                let next = chars.get(i + 1).copied();
                let (op, width) = match (c, next) {
                    ('=', Some('=')) => (CompareOp::Eq, 2),
                    ('!', Some('=')) => (CompareOp::NotEq, 2),
                    ('>', Some('=')) => (CompareOp::Gte, 2),
                    ('<', Some('=')) => (CompareOp::Lte, 2),
                    ('>', _) => (CompareOp::Gt, 1),
                    ('<', _) => (CompareOp::Lt, 1),
                    _ => return Err(invalid(input, &format!("unexpected '{}'", c))),
                };
                tokens.push(Token::Op(op));
                i += width;
            }
            c if c.is_ascii_digit() || c == '-' => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| invalid(input, &format!("bad number '{}'", text)))?;
                tokens.push(Token::Num(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    "contains" => Token::Op(CompareOp::Contains),
                    _ => Token::Path(word),
                });
            }
            other => return Err(invalid(input, &format!("unexpected '{}'", other))),
        }
    }

    Ok(tokens)
}

fn invalid(input: &str, message: &str) -> ConfigError {
    ConfigError::InvalidCondition(format!("{} in '{}'", message, input))
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    input: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn error(&self, message: &str) -> ConfigError {
        invalid(self.input, message)
    }

    fn enter(&mut self) -> Result<(), ConfigError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error(&format!("nesting deeper than {}", MAX_NESTING)));
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Expression, ConfigError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expression::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, ConfigError> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ConfigError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            self.enter()?;
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expression::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression, ConfigError> {
        match self.next() {
            Some(Token::LParen) => {
                self.enter()?;
                let expr = self.parse_or()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(expr),
                    _ => Err(self.error("expected ')'")),
                }
            }
            Some(Token::True) => Ok(Expression::True),
            Some(Token::False) => Ok(Expression::False),
            Some(Token::Path(path)) => {
                let op = match self.next() {
                    Some(Token::Op(op)) => op,
                    _ => return Err(self.error(&format!("expected operator after '{}'", path))),
                };
                let right = self.parse_literal()?;
                Ok(Expression::Compare { path, op, right })
            }
            Some(other) => Err(self.error(&format!("unexpected token {:?}", other))),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal, ConfigError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Literal::String(s)),
            Some(Token::Num(n)) => Ok(Literal::Number(n)),
            Some(Token::True) => Ok(Literal::Boolean(true)),
            Some(Token::False) => Ok(Literal::Boolean(false)),
            Some(Token::Null) => Ok(Literal::Null),
            _ => Err(self.error("expected a literal")),
        }
    }
}
