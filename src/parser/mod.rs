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

//! Recursive-descent parser over the logical line list produced by
//! [`crate::lexer::preprocess`].
//!
//! ```text
//! block       := stmt* '}'?
//! stmt        := if | while | for | assert | assign | arrayAssign
//! if          := 'if' '(' expr ')' '{' block ('else' '{' block)?
//! while       := 'while' '(' expr ')' '{' block
//! for         := 'for' '(' assign ';' expr ';' assign ')' '{' block
//! assert      := 'assert' '(' expr ')' ';'
//! assign      := ident ':=' expr ';'
//! arrayAssign := ident '[' expr ']' ':=' expr ';'
//! ```

pub mod expr;

use crate::ast::{Block, Stmt};
use crate::error::{ParseError, SourceLocation};
use crate::lexer::LogicalLine;
use expr::parse_expr;

pub struct Parser<'a> {
    lines: &'a [LogicalLine],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(lines: &'a [LogicalLine]) -> Self {
        Self { lines, pos: 0 }
    }

    /// Parse the whole program as a single top-level block.
    pub fn parse_program(src: &str) -> Result<Block, ParseError> {
        let lines = crate::lexer::preprocess(src)?;
        let mut parser = Parser::new(&lines);
        parser.parse_block()
    }

    fn current(&self) -> Option<&LogicalLine> {
        self.lines.get(self.pos)
    }

    fn loc(&self) -> SourceLocation {
        match self.current() {
            Some(l) => SourceLocation::new(l.line, l.text.clone()),
            None => SourceLocation::unknown(),
        }
    }

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let mut stmts = Vec::new();
        while let Some(line) = self.current() {
            let text = line.text.trim();
            if text.is_empty() {
                self.pos += 1;
                continue;
            }
            if text.starts_with('}') {
                self.pos += 1;
                break;
            }
            if text.starts_with("if") && starts_header(text, "if") {
                stmts.push(self.parse_if()?);
            } else if text.starts_with("while") && starts_header(text, "while") {
                stmts.push(self.parse_while()?);
            } else if text.starts_with("for") && starts_header(text, "for") {
                stmts.push(self.parse_for()?);
            } else {
                stmts.push(self.parse_simple_stmt()?);
            }
        }
        Ok(Block::new(stmts))
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let line = self.current().unwrap();
        let loc = SourceLocation::new(line.line, line.text.clone());
        let cond_text = header_condition(&line.text, "if")
            .ok_or_else(|| ParseError::InvalidIfHeader(loc.clone()))?;
        let cond = parse_expr(&cond_text, &loc)?;
        self.pos += 1;
        let then_block = self.parse_block()?;

        let mut else_block = None;
        if let Some(next) = self.current() {
            let text = next.text.trim();
            if text == "else" || text.starts_with("else") {
                if text == "else" {
                    self.pos += 1;
                    if let Some(brace_line) = self.current() {
                        if brace_line.text.trim() == "{" {
                            self.pos += 1;
                        }
                    }
                } else {
                    // "else {" already validated as a block header by the lexer
                    self.pos += 1;
                }
                else_block = Some(self.parse_block()?);
            }
        }

        Ok(Stmt::If { cond, then_block, else_block })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let line = self.current().unwrap();
        let loc = SourceLocation::new(line.line, line.text.clone());
        let cond_text = header_condition(&line.text, "while")
            .ok_or_else(|| ParseError::InvalidWhileHeader(loc.clone()))?;
        let cond = parse_expr(&cond_text, &loc)?;
        self.pos += 1;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let line = self.current().unwrap();
        let loc = SourceLocation::new(line.line, line.text.clone());
        let inner = header_condition(&line.text, "for")
            .ok_or_else(|| ParseError::InvalidForHeader(loc.clone()))?;
        let parts: Vec<&str> = inner.splitn(3, ';').collect();
        if parts.len() != 3 {
            return Err(ParseError::InvalidForHeader(loc.clone()));
        }
        let (init_var, init_expr) = parse_assign_text(parts[0].trim(), &loc)?;
        let cond = parse_expr(parts[1].trim(), &loc)?;
        let (update_var, update_expr) = parse_assign_text(parts[2].trim(), &loc)?;

        self.pos += 1;
        let body = self.parse_block()?;
        Ok(Stmt::For { init_var, init_expr, cond, update_var, update_expr, body })
    }

    fn parse_simple_stmt(&mut self) -> Result<Stmt, ParseError> {
        let line = self.current().unwrap();
        let loc = SourceLocation::new(line.line, line.text.clone());
        let text = line.text.trim();

        if let Some(rest) = text.strip_prefix("assert") {
            let rest = rest.trim();
            let inner = rest
                .strip_prefix('(')
                .and_then(|s| s.trim_end_matches(';').trim().strip_suffix(')'))
                .ok_or_else(|| ParseError::InvalidAssert(loc.clone()))?;
            if inner.contains("forall") || inner.contains("exists") {
                self.pos += 1;
                return Err(ParseError::UnsupportedFeature {
                    feature: "quantified assertions".to_string(),
                    location: loc,
                });
            }
            let cond = parse_expr(inner, &loc)?;
            self.pos += 1;
            return Ok(Stmt::Assert { cond });
        }

        self.pos += 1;
        if let Some(bracket) = text.find('[') {
            if text[..bracket].chars().all(|c| c.is_alphanumeric() || c == '_') && !text[..bracket].is_empty()
            {
                let close = text.find(']').ok_or_else(|| ParseError::InvalidAssign(loc.clone()))?;
                let array = text[..bracket].to_string();
                let index_text = &text[bracket + 1..close];
                let rest = text[close + 1..].trim();
                let rest = rest
                    .strip_prefix(":=")
                    .ok_or_else(|| ParseError::InvalidAssign(loc.clone()))?
                    .trim()
                    .trim_end_matches(';')
                    .trim();
                let index = parse_expr(index_text, &loc)?;
                let expr = parse_expr(rest, &loc)?;
                return Ok(Stmt::ArrayAssign { array, index, expr });
            }
        }

        let (var, expr_text) = text
            .split_once(":=")
            .ok_or_else(|| ParseError::InvalidAssign(loc.clone()))?;
        let var = var.trim().to_string();
        if var.is_empty() || !var.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(ParseError::InvalidAssign(loc));
        }
        let expr_text = expr_text.trim().trim_end_matches(';').trim();
        let expr = parse_expr(expr_text, &loc)?;
        Ok(Stmt::Assign { var, expr })
    }
}

fn starts_header(text: &str, kw: &str) -> bool {
    text.strip_prefix(kw).map(|rest| rest.trim_start().starts_with('(')).unwrap_or(false)
}

/// Extract the `(...)` condition text from a `kw (...) {` header line.
fn header_condition(text: &str, kw: &str) -> Option<String> {
    let rest = text.strip_prefix(kw)?.trim_start();
    let rest = rest.strip_prefix('(')?;
    let rest = rest.trim_end();
    let rest = rest.strip_suffix('{')?.trim_end();
    let inner = rest.strip_suffix(')')?;
    Some(inner.trim().to_string())
}

fn parse_assign_text(text: &str, loc: &SourceLocation) -> Result<(String, crate::ast::Expr), ParseError> {
    let (var, expr_text) = text.split_once(":=").ok_or_else(|| ParseError::InvalidAssign(loc.clone()))?;
    let var = var.trim().to_string();
    let expr = parse_expr(expr_text.trim(), loc)?;
    Ok((var, expr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, Expr};

    #[test]
    fn parses_assignment_and_assert() {
        let block = Parser::parse_program("x := 1;\nassert(x == 1);\n").unwrap();
        assert_eq!(block.stmts.len(), 2);
        assert!(matches!(block.stmts[0], Stmt::Assign { .. }));
        assert!(matches!(block.stmts[1], Stmt::Assert { .. }));
    }

    #[test]
    fn parses_if_else() {
        let src = "if (a > 0) {\nx := 1;\n} else {\nx := 2;\n}";
        let block = Parser::parse_program(src).unwrap();
        assert_eq!(block.stmts.len(), 1);
        match &block.stmts[0] {
            Stmt::If { else_block, .. } => assert!(else_block.is_some()),
            _ => panic!("expected if"),
        }
    }

    #[test]
    fn parses_while_loop() {
        let src = "i := 0;\nwhile (i < 3) {\ni := i + 1;\n}";
        let block = Parser::parse_program(src).unwrap();
        assert_eq!(block.stmts.len(), 2);
        assert!(matches!(block.stmts[1], Stmt::While { .. }));
    }

    #[test]
    fn parses_for_loop() {
        let src = "for (i := 0; i < 3; i := i + 1) {\nsum := sum + i;\n}";
        let block = Parser::parse_program(src).unwrap();
        match &block.stmts[0] {
            Stmt::For { init_var, update_var, .. } => {
                assert_eq!(init_var, "i");
                assert_eq!(update_var, "i");
            }
            _ => panic!("expected for"),
        }
    }

    #[test]
    fn parses_array_assign_and_read() {
        let src = "a[0] := x + 1;";
        let block = Parser::parse_program(src).unwrap();
        match &block.stmts[0] {
            Stmt::ArrayAssign { array, index, expr } => {
                assert_eq!(array, "a");
                assert_eq!(*index, Expr::Int(0));
                assert_eq!(*expr, Expr::binary(BinOp::Add, Expr::Var("x".into()), Expr::Int(1)));
            }
            _ => panic!("expected array assign"),
        }
    }

    #[test]
    fn rejects_quantified_assert() {
        let err = Parser::parse_program("assert(forall(x, x > 0));").unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedFeature { .. }));
    }
}
