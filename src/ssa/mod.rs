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

//! Conversion of an [`ast::Block`] into a bounded static-single-assignment
//! instruction list: variable renaming, loop unrolling, and phi insertion
//! at control-flow merges.
//!
//! Only the unrolled representation is produced — there is no parallel
//! loop-header phi/back-edge machinery, since this checker is bounded
//! only (see the conversion notes in the design ledger).

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{Block, Expr, Stmt};
use crate::error::ConversionError;

/// A versioned name: `base_gen`, e.g. `x_3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub base: String,
    pub gen: u32,
}

impl Version {
    fn initial(base: impl Into<String>) -> Self {
        Self { base: base.into(), gen: 0 }
    }

    pub fn name(&self) -> String {
        format!("{}_{}", self.base, self.gen)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One instruction in the bounded SSA list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SsaInstr {
    /// `target := expr`, for a freshly versioned scalar.
    Define { target: Version, expr: Expr },
    /// `target := (store prev index value)`, for a freshly versioned array.
    ArrayStore { target: Version, prev: Version, index: Expr, value: Expr },
    /// `target := phi(cond, then_val, else_val)`.
    Phi { target: Version, cond: String, then_val: Version, else_val: Version, is_array: bool },
    /// `name := expr`, for a branch selector (`cond_k`).
    Condition { name: String, expr: Expr },
    /// `assert := expr`, in source order; may repeat.
    Assert { expr: Expr },
}

impl fmt::Display for SsaInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SsaInstr::Define { target, expr } => write!(f, "{target} := {expr:?}"),
            SsaInstr::ArrayStore { target, prev, index, value } => {
                write!(f, "{target} := store({prev}, {index:?}, {value:?})")
            }
            SsaInstr::Phi { target, cond, then_val, else_val, .. } => {
                write!(f, "{target} := phi({cond}, {then_val}, {else_val})")
            }
            SsaInstr::Condition { name, expr } => write!(f, "{name} := {expr:?}"),
            SsaInstr::Assert { expr } => write!(f, "assert := {expr:?}"),
        }
    }
}

#[derive(Clone, Default)]
struct VersionTables {
    scalar: HashMap<String, Version>,
    array: HashMap<String, Version>,
}

struct Converter {
    counter: HashMap<String, u32>,
    arr_counter: HashMap<String, u32>,
    tables: VersionTables,
    cond_counter: u32,
    depth: u32,
    instrs: Vec<SsaInstr>,
}

impl Converter {
    fn new(depth: u32) -> Self {
        Self {
            counter: HashMap::new(),
            arr_counter: HashMap::new(),
            tables: VersionTables::default(),
            cond_counter: 0,
            depth,
            instrs: Vec::new(),
        }
    }

    fn fresh_scalar(&mut self, id: &str) -> Version {
        let gen = self.counter.entry(id.to_string()).or_insert(0);
        *gen += 1;
        let v = Version { base: id.to_string(), gen: *gen };
        self.tables.scalar.insert(id.to_string(), v.clone());
        v
    }

    fn fresh_array(&mut self, id: &str) -> Version {
        let gen = self.arr_counter.entry(id.to_string()).or_insert(0);
        *gen += 1;
        let v = Version { base: id.to_string(), gen: *gen };
        self.tables.array.insert(id.to_string(), v.clone());
        v
    }

    fn lookup_scalar(&mut self, id: &str) -> Version {
        self.tables.scalar.entry(id.to_string()).or_insert_with(|| Version::initial(id)).clone()
    }

    fn lookup_array(&mut self, id: &str) -> Version {
        self.tables.array.entry(id.to_string()).or_insert_with(|| Version::initial(id)).clone()
    }

    fn fresh_cond(&mut self) -> String {
        let n = self.cond_counter;
        self.cond_counter += 1;
        format!("cond_{n}")
    }

    fn rewrite(&mut self, expr: &Expr) -> Expr {
        match expr {
            Expr::Int(n) => Expr::Int(*n),
            Expr::Bool(b) => Expr::Bool(*b),
            Expr::Var(name) => Expr::Var(self.lookup_scalar(name).name()),
            Expr::ArrayRead { array, index } => {
                let version = self.lookup_array(array);
                Expr::ArrayRead { array: version.name(), index: Box::new(self.rewrite(index)) }
            }
            Expr::Unary { op, expr } => Expr::Unary { op: *op, expr: Box::new(self.rewrite(expr)) },
            Expr::Binary { op, left, right } => {
                let left = self.rewrite(left);
                let right = self.rewrite(right);
                Expr::binary(*op, left, right)
            }
        }
    }

    fn convert_block(&mut self, block: &Block) -> Result<(), ConversionError> {
        for stmt in &block.stmts {
            self.convert_stmt(stmt)?;
        }
        Ok(())
    }

    fn convert_stmt(&mut self, stmt: &Stmt) -> Result<(), ConversionError> {
        match stmt {
            Stmt::Assign { var, expr } => {
                let rewritten = self.rewrite(expr);
                let target = self.fresh_scalar(var);
                self.instrs.push(SsaInstr::Define { target, expr: rewritten });
                Ok(())
            }
            Stmt::ArrayAssign { array, index, expr } => {
                let index = self.rewrite(index);
                let value = self.rewrite(expr);
                let prev = self.lookup_array(array);
                let target = self.fresh_array(array);
                self.instrs.push(SsaInstr::ArrayStore { target, prev, index, value });
                Ok(())
            }
            Stmt::Assert { cond } => {
                let expr = self.rewrite(cond);
                self.instrs.push(SsaInstr::Assert { expr });
                Ok(())
            }
            Stmt::If { cond, then_block, else_block } => {
                self.convert_if(cond, then_block, else_block.as_ref())
            }
            Stmt::While { cond, body } => {
                if self.depth == 0 {
                    return Err(ConversionError::LoopUnrollDepthZero(0));
                }
                for _ in 0..self.depth {
                    self.convert_if(cond, body, None)?;
                }
                Ok(())
            }
            Stmt::For { init_var, init_expr, cond, update_var, update_expr, body } => {
                if update_var != init_var {
                    return Err(ConversionError::ForUpdateTargetMismatch {
                        init: init_var.clone(),
                        update: update_var.clone(),
                        location: crate::error::SourceLocation::unknown(),
                    });
                }
                if self.depth == 0 {
                    return Err(ConversionError::LoopUnrollDepthZero(0));
                }
                let init_rewritten = self.rewrite(init_expr);
                let init_target = self.fresh_scalar(init_var);
                self.instrs.push(SsaInstr::Define { target: init_target, expr: init_rewritten });

                let mut body_with_update = body.clone();
                body_with_update
                    .stmts
                    .push(Stmt::Assign { var: update_var.clone(), expr: update_expr.clone() });

                for _ in 0..self.depth {
                    self.convert_if(cond, &body_with_update, None)?;
                }
                Ok(())
            }
        }
    }

    /// Shared machinery for `if`, and for each unrolled guarded copy of a
    /// `while`/`for` body: emit the selector, convert the guarded block
    /// starting from the current state, optionally convert an else block
    /// from the same starting state, then insert phis for every name whose
    /// version changed down either path.
    fn convert_if(
        &mut self,
        cond: &Expr,
        then_block: &Block,
        else_block: Option<&Block>,
    ) -> Result<(), ConversionError> {
        let cond_expr = self.rewrite(cond);
        let cond_name = self.fresh_cond();
        self.instrs.push(SsaInstr::Condition { name: cond_name.clone(), expr: cond_expr });

        let pre = self.tables.clone();

        self.convert_block(then_block)?;
        let then_tables = self.tables.clone();

        self.tables = pre.clone();
        if let Some(else_block) = else_block {
            self.convert_block(else_block)?;
        }
        let else_tables = self.tables.clone();

        self.tables = pre.clone();

        self.merge(&cond_name, &pre.scalar, &then_tables.scalar, &else_tables.scalar, false)?;
        self.merge(&cond_name, &pre.array, &then_tables.array, &else_tables.array, true)?;

        Ok(())
    }

    fn merge(
        &mut self,
        cond_name: &str,
        pre: &HashMap<String, Version>,
        then_map: &HashMap<String, Version>,
        else_map: &HashMap<String, Version>,
        is_array: bool,
    ) -> Result<(), ConversionError> {
        let mut modified: BTreeSet<String> = BTreeSet::new();
        for (key, ver) in then_map {
            if pre.get(key) != Some(ver) {
                modified.insert(key.clone());
            }
        }
        for (key, ver) in else_map {
            if pre.get(key) != Some(ver) {
                modified.insert(key.clone());
            }
        }

        for var in modified {
            let then_val = then_map
                .get(&var)
                .or_else(|| pre.get(&var))
                .cloned()
                .unwrap_or_else(|| Version::initial(&var));
            let else_val = else_map
                .get(&var)
                .or_else(|| pre.get(&var))
                .cloned()
                .unwrap_or_else(|| Version::initial(&var));
            if then_val.base != var || else_val.base != var {
                return Err(ConversionError::MalformedPhi { var });
            }

            let target = if is_array { self.fresh_array(&var) } else { self.fresh_scalar(&var) };
            self.instrs.push(SsaInstr::Phi {
                target,
                cond: cond_name.to_string(),
                then_val,
                else_val,
                is_array,
            });
        }
        Ok(())
    }
}

/// Convert a parsed program into a bounded SSA instruction list.
///
/// `depth` is the loop-unroll bound applied to every `while`/`for` loop,
/// including nested ones.
pub fn convert(block: &Block, depth: u32) -> Result<Vec<SsaInstr>, ConversionError> {
    if depth == 0 {
        return Err(ConversionError::LoopUnrollDepthZero(0));
    }
    let mut converter = Converter::new(depth);
    converter.convert_block(block)?;
    Ok(converter.instrs)
}

/// Render an instruction list the way the CLI's `--emit-ssa` flag does.
pub fn render(instrs: &[SsaInstr]) -> String {
    instrs.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, Expr};
    use crate::parser::Parser;

    fn ssa_of(src: &str, depth: u32) -> Vec<SsaInstr> {
        let block = Parser::parse_program(src).unwrap();
        convert(&block, depth).unwrap()
    }

    #[test]
    fn straight_line_versions_increase() {
        let instrs = ssa_of("x := 1;\nx := x + 1;\n", 1);
        assert_eq!(instrs.len(), 2);
        match &instrs[0] {
            SsaInstr::Define { target, .. } => assert_eq!(target.name(), "x_1"),
            _ => panic!(),
        }
        match &instrs[1] {
            SsaInstr::Define { target, expr } => {
                assert_eq!(target.name(), "x_2");
                assert_eq!(*expr, Expr::binary(BinOp::Add, Expr::Var("x_1".into()), Expr::Int(1)));
            }
            _ => panic!(),
        }
    }

    #[test]
    fn if_else_inserts_phi() {
        let instrs = ssa_of("if (a > 0) {\nx := 1;\n} else {\nx := 2;\n}", 1);
        let phis: Vec<_> = instrs
            .iter()
            .filter(|i| matches!(i, SsaInstr::Phi { target, .. } if target.base == "x"))
            .collect();
        assert_eq!(phis.len(), 1);
    }

    #[test]
    fn if_without_else_uses_pre_version_as_else_side() {
        let instrs = ssa_of("x := 0;\nif (a > 0) {\nx := 1;\n}", 1);
        let phi = instrs
            .iter()
            .find_map(|i| match i {
                SsaInstr::Phi { target, else_val, .. } if target.base == "x" => Some(else_val.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(phi.name(), "x_1");
    }

    #[test]
    fn while_loop_unrolls_depth_times() {
        let instrs = ssa_of("i := 0;\nwhile (i < 3) {\ni := i + 1;\n}", 3);
        let conds = instrs.iter().filter(|i| matches!(i, SsaInstr::Condition { .. })).count();
        assert_eq!(conds, 3);
    }

    #[test]
    fn for_loop_rejects_mismatched_update_target() {
        let block = Parser::parse_program("for (i := 0; i < 3; j := j + 1) {\nx := i;\n}").unwrap();
        let err = convert(&block, 1).unwrap_err();
        assert!(matches!(err, ConversionError::ForUpdateTargetMismatch { .. }));
    }

    #[test]
    fn depth_zero_is_rejected() {
        let block = Parser::parse_program("x := 1;\n").unwrap();
        let err = convert(&block, 0).unwrap_err();
        assert!(matches!(err, ConversionError::LoopUnrollDepthZero(0)));
    }

    #[test]
    fn array_store_bumps_array_version() {
        let instrs = ssa_of("a[0] := 1;\na[1] := 2;\n", 1);
        let versions: Vec<u32> = instrs
            .iter()
            .filter_map(|i| match i {
                SsaInstr::ArrayStore { target, .. } if target.base == "a" => Some(target.gen),
                _ => None,
            })
            .collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[test]
    fn target_uniqueness_holds_for_straight_line_programs() {
        let instrs = ssa_of("x := 1;\ny := x + 1;\nz := y + x;\n", 1);
        let mut seen = std::collections::HashSet::new();
        for instr in &instrs {
            if let SsaInstr::Define { target, .. } = instr {
                assert!(seen.insert(target.name()), "duplicate target {}", target.name());
            }
        }
    }
}
