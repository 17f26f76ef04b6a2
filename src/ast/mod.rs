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

//! Abstract syntax tree for the verified language.
//!
//! `Block`/`Stmt` mirror the grammar in the checker's specification
//! exactly; `Expr` is a small real expression AST (not a string) so the
//! SSA converter and SMT encoder can both lower it without re-parsing.

use serde::{Deserialize, Serialize};

/// A sequence of statements, as produced by one parse of a `{ ... }` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self { stmts }
    }
}

/// A single statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Assign {
        var: String,
        expr: Expr,
    },
    ArrayAssign {
        array: String,
        index: Expr,
        expr: Expr,
    },
    Assert {
        cond: Expr,
    },
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    For {
        init_var: String,
        init_expr: Expr,
        cond: Expr,
        update_var: String,
        update_expr: Expr,
        body: Block,
    },
}

/// Binary operators over expressions: arithmetic, comparison, and boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Unary operators: arithmetic negation and boolean negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    Neg,
    Not,
}

/// A real expression AST: integer literals, identifiers, array reads,
/// and unary/binary operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Int(i64),
    Bool(bool),
    Var(String),
    ArrayRead {
        array: String,
        index: Box<Expr>,
    },
    Unary {
        op: UnOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::Binary { op, left: Box::new(left), right: Box::new(right) }
    }

    /// Every identifier referenced by this expression (array names included).
    pub fn collect_vars(&self, out: &mut std::collections::BTreeSet<String>) {
        match self {
            Expr::Int(_) | Expr::Bool(_) => {}
            Expr::Var(name) => {
                out.insert(name.clone());
            }
            Expr::ArrayRead { array, index } => {
                out.insert(array.clone());
                index.collect_vars(out);
            }
            Expr::Unary { expr, .. } => expr.collect_vars(out),
            Expr::Binary { left, right, .. } => {
                left.collect_vars(out);
                right.collect_vars(out);
            }
        }
    }
}
