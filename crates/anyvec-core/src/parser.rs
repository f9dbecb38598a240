//! Parser for the portable filter grammar
//!
//! Grammar (highest binding last):
//!
//! ```text
//! expr      := or
//! or        := and ('||' and)*
//! and       := unary ('&&' unary)*
//! unary     := '!' unary | '(' expr ')' | predicate
//! predicate := ident OP value | ident 'in' '[' value (',' value)* ']'
//! OP        := '==' | '!=' | '>' | '>=' | '<' | '<='
//! value     := 'single-quoted string' | integer | float | true | false
//! ```
//!
//! Parsing a string rendered by [`Filter`]'s `Display` impl reconstructs an
//! equivalent tree. Malformed input fails with [`Error::Syntax`].

use crate::filter::{CompareOp, Filter, FilterValue};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    AndAnd,
    OrOr,
    Bang,
    Op(CompareOp),
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Token::AndAnd);
                    i += 2;
                } else {
                    return Err(Error::Syntax(format!(
                        "unknown operator '&' at position {}, expected '&&'",
                        i
                    )));
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Token::OrOr);
                    i += 2;
                } else {
                    return Err(Error::Syntax(format!(
                        "unknown operator '|' at position {}, expected '||'",
                        i
                    )));
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(CompareOp::Ne));
                    i += 2;
                } else {
                    tokens.push(Token::Bang);
                    i += 1;
                }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(CompareOp::Eq));
                    i += 2;
                } else {
                    return Err(Error::Syntax(format!(
                        "unknown operator '=' at position {}, expected '=='",
                        i
                    )));
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(CompareOp::Gte));
                    i += 2;
                } else {
                    tokens.push(Token::Op(CompareOp::Gt));
                    i += 1;
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(CompareOp::Lte));
                    i += 2;
                } else {
                    tokens.push(Token::Op(CompareOp::Lt));
                    i += 1;
                }
            }
            '\'' => {
                let start = i + 1;
                let mut j = start;
                while j < chars.len() && chars[j] != '\'' {
                    j += 1;
                }
                if j >= chars.len() {
                    return Err(Error::Syntax(format!(
                        "unterminated string literal starting at position {}",
                        i
                    )));
                }
                tokens.push(Token::Str(chars[start..j].iter().collect()));
                i = j + 1;
            }
            c if c.is_ascii_digit() || c == '-' => {
                let start = i;
                i += 1;
                let mut is_float = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    if chars[i] == '.' {
                        is_float = true;
                    }
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if is_float {
                    let value: f64 = text.parse().map_err(|_| {
                        Error::Syntax(format!("invalid number literal '{}'", text))
                    })?;
                    tokens.push(Token::Float(value));
                } else {
                    let value: i64 = text.parse().map_err(|_| {
                        Error::Syntax(format!("invalid number literal '{}'", text))
                    })?;
                    tokens.push(Token::Int(value));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(Error::Syntax(format!(
                    "unexpected character '{}' at position {}",
                    other, i
                )));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(Error::Syntax(format!(
                "expected {}, found {:?}",
                what, token
            ))),
            None => Err(Error::Syntax(format!(
                "expected {}, found end of input",
                what
            ))),
        }
    }

    fn parse_or(&mut self) -> Result<Filter> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::OrOr) {
            self.next();
            let right = self.parse_and()?;
            left = left.or(right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Filter> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.next();
            let right = self.parse_unary()?;
            left = left.and(right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Filter> {
        match self.peek() {
            Some(Token::Bang) => {
                self.next();
                Ok(self.parse_unary()?.negate())
            }
            Some(Token::LParen) => {
                self.next();
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner.grouped())
            }
            _ => self.parse_predicate(),
        }
    }

    fn parse_predicate(&mut self) -> Result<Filter> {
        let field = match self.next() {
            Some(Token::Ident(name)) => name,
            Some(token) => {
                return Err(Error::Syntax(format!(
                    "expected field name, found {:?}",
                    token
                )));
            }
            None => return Err(Error::Syntax("expected field name, found end of input".into())),
        };

        match self.next() {
            Some(Token::Op(op)) => {
                let value = self.parse_value()?;
                Ok(Filter::Compare { field, op, value })
            }
            Some(Token::Ident(kw)) if kw == "in" => {
                self.expect(Token::LBracket, "'['")?;
                let mut values = Vec::new();
                if self.peek() != Some(&Token::RBracket) {
                    loop {
                        values.push(self.parse_value()?);
                        match self.next() {
                            Some(Token::Comma) => continue,
                            Some(Token::RBracket) => break,
                            Some(token) => {
                                return Err(Error::Syntax(format!(
                                    "expected ',' or ']', found {:?}",
                                    token
                                )));
                            }
                            None => {
                                return Err(Error::Syntax(
                                    "expected ',' or ']', found end of input".into(),
                                ));
                            }
                        }
                    }
                } else {
                    self.next();
                }
                Ok(Filter::In { field, values })
            }
            Some(token) => Err(Error::Syntax(format!(
                "expected comparison operator or 'in' after '{}', found {:?}",
                field, token
            ))),
            None => Err(Error::Syntax(format!(
                "expected comparison operator or 'in' after '{}', found end of input",
                field
            ))),
        }
    }

    fn parse_value(&mut self) -> Result<FilterValue> {
        match self.next() {
            Some(Token::Str(s)) => Ok(FilterValue::Str(s)),
            Some(Token::Int(i)) => Ok(FilterValue::Int(i)),
            Some(Token::Float(x)) => Ok(FilterValue::Float(x)),
            Some(Token::Ident(word)) if word == "true" => Ok(FilterValue::Bool(true)),
            Some(Token::Ident(word)) if word == "false" => Ok(FilterValue::Bool(false)),
            Some(token) => Err(Error::Syntax(format!(
                "expected value literal, found {:?}",
                token
            ))),
            None => Err(Error::Syntax(
                "expected value literal, found end of input".into(),
            )),
        }
    }
}

/// Parse a portable filter string into a [`Filter`] tree
pub fn parse_filter(input: &str) -> Result<Filter> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(Error::Syntax("empty filter expression".into()));
    }

    let mut parser = Parser { tokens, pos: 0 };
    let filter = parser.parse_or()?;

    if let Some(extra) = parser.peek() {
        return Err(Error::Syntax(format!(
            "unexpected trailing input: {:?}",
            extra
        )));
    }

    Ok(filter)
}
