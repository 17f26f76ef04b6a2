// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Expression parsing.
//!
//! The surrounding statement grammar is recursive-descent over logical
//! lines (see `parser::Parser`); expressions nested inside those lines
//! are handled here by a small precedence-climbing parser so the rest
//! of the pipeline works over a real `ast::Expr` rather than a string.

use crate::ast::{BinOp, Expr, UnOp};
use crate::error::{ParseError, SourceLocation};

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Int(i64),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Plus,
    Minus,
    Star,
    Slash,
    EqEq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    AndAnd,
    OrOr,
    Bang,
}

fn tokenize(src: &str, loc: &SourceLocation) -> Result<Vec<Tok>, ParseError> {
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    let mut toks = Vec::new();
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '(' => {
                toks.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                toks.push(Tok::RParen);
                i += 1;
            }
            '[' => {
                toks.push(Tok::LBracket);
                i += 1;
            }
            ']' => {
                toks.push(Tok::RBracket);
                i += 1;
            }
            '+' => {
                toks.push(Tok::Plus);
                i += 1;
            }
            '-' => {
                toks.push(Tok::Minus);
                i += 1;
            }
            '*' => {
                toks.push(Tok::Star);
                i += 1;
            }
            '/' => {
                toks.push(Tok::Slash);
                i += 1;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                toks.push(Tok::EqEq);
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                toks.push(Tok::Ne);
                i += 2;
            }
            '!' => {
                toks.push(Tok::Bang);
                i += 1;
            }
            '<' if chars.get(i + 1) == Some(&'=') => {
                toks.push(Tok::Le);
                i += 2;
            }
            '<' => {
                toks.push(Tok::Lt);
                i += 1;
            }
            '>' if chars.get(i + 1) == Some(&'=') => {
                toks.push(Tok::Ge);
                i += 2;
            }
            '>' => {
                toks.push(Tok::Gt);
                i += 1;
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                toks.push(Tok::AndAnd);
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                toks.push(Tok::OrOr);
                i += 2;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text.parse::<i64>().map_err(|_| ParseError::InvalidExpression {
                    text: src.to_string(),
                    location: loc.clone(),
                })?;
                toks.push(Tok::Int(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                toks.push(Tok::Ident(text));
            }
            _ => {
                return Err(ParseError::InvalidExpression {
                    text: src.to_string(),
                    location: loc.clone(),
                })
            }
        }
    }
    Ok(toks)
}

struct ExprParser<'a> {
    toks: &'a [Tok],
    pos: usize,
    loc: &'a SourceLocation,
    src: &'a str,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn bump(&mut self) -> Option<Tok> {
        let t = self.toks.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn err(&self) -> ParseError {
        ParseError::InvalidExpression { text: self.src.to_string(), location: self.loc.clone() }
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(Tok::OrOr)) {
            self.bump();
            let right = self.parse_and()?;
            left = Expr::binary(BinOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while matches!(self.peek(), Some(Tok::AndAnd)) {
            self.bump();
            let right = self.parse_not()?;
            left = Expr::binary(BinOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Some(Tok::Bang)) {
            self.bump();
            let inner = self.parse_not()?;
            return Ok(Expr::Unary { op: UnOp::Not, expr: Box::new(inner) });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;
        let op = match self.peek() {
            Some(Tok::EqEq) => Some(BinOp::Eq),
            Some(Tok::Ne) => Some(BinOp::Ne),
            Some(Tok::Lt) => Some(BinOp::Lt),
            Some(Tok::Le) => Some(BinOp::Le),
            Some(Tok::Gt) => Some(BinOp::Gt),
            Some(Tok::Ge) => Some(BinOp::Ge),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let right = self.parse_additive()?;
            return Ok(Expr::binary(op, left, right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => BinOp::Add,
                Some(Tok::Minus) => BinOp::Sub,
                _ => break,
            };
            self.bump();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Star) => BinOp::Mul,
                Some(Tok::Slash) => BinOp::Div,
                _ => break,
            };
            self.bump();
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Some(Tok::Minus)) {
            self.bump();
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary { op: UnOp::Neg, expr: Box::new(inner) });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.bump().ok_or_else(|| self.err())? {
            Tok::Int(n) => Ok(Expr::Int(n)),
            Tok::LParen => {
                let inner = self.parse_or()?;
                match self.bump() {
                    Some(Tok::RParen) => Ok(inner),
                    _ => Err(self.err()),
                }
            }
            Tok::Ident(name) => match name.as_str() {
                "True" => Ok(Expr::Bool(true)),
                "False" => Ok(Expr::Bool(false)),
                _ => {
                    if matches!(self.peek(), Some(Tok::LBracket)) {
                        self.bump();
                        let index = self.parse_or()?;
                        match self.bump() {
                            Some(Tok::RBracket) => {
                                Ok(Expr::ArrayRead { array: name, index: Box::new(index) })
                            }
                            _ => Err(self.err()),
                        }
                    } else {
                        Ok(Expr::Var(name))
                    }
                }
            },
            _ => Err(self.err()),
        }
    }
}

/// Parse a full expression from source text at the given location.
pub fn parse_expr(src: &str, loc: &SourceLocation) -> Result<Expr, ParseError> {
    let toks = tokenize(src, loc)?;
    let mut p = ExprParser { toks: &toks, pos: 0, loc, src };
    let expr = p.parse_or()?;
    if p.pos != p.toks.len() {
        return Err(p.err());
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::new(1, String::new())
    }

    #[test]
    fn parses_arithmetic_precedence() {
        let e = parse_expr("1 + 2 * 3", &loc()).unwrap();
        assert_eq!(
            e,
            Expr::binary(BinOp::Add, Expr::Int(1), Expr::binary(BinOp::Mul, Expr::Int(2), Expr::Int(3)))
        );
    }

    #[test]
    fn parses_array_read() {
        let e = parse_expr("a[i + 1]", &loc()).unwrap();
        match e {
            Expr::ArrayRead { array, index } => {
                assert_eq!(array, "a");
                assert_eq!(*index, Expr::binary(BinOp::Add, Expr::Var("i".into()), Expr::Int(1)));
            }
            _ => panic!("expected array read"),
        }
    }

    #[test]
    fn parses_boolean_connectives() {
        let e = parse_expr("a > 0 && !(b == 0)", &loc()).unwrap();
        assert!(matches!(e, Expr::Binary { op: BinOp::And, .. }));
    }
}
