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

//! Lowering of bounded SSA instruction lists into an SMT-LIB v2 script
//! over QF_AUFLIA.
//!
//! The `Formula` AST mirrors the shape the verification tooling in this
//! corpus already uses to represent solver obligations, trimmed down to
//! what this language needs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::{self, BinOp, UnOp};
use crate::error::EncodingError;
use crate::ssa::SsaInstr;

/// The sort of a declared symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sort {
    Int,
    Bool,
    ArrayIntInt,
}

impl Sort {
    fn smt_name(&self) -> &'static str {
        match self {
            Sort::Int => "Int",
            Sort::Bool => "Bool",
            Sort::ArrayIntInt => "(Array Int Int)",
        }
    }
}

/// A first-order formula over linear integer arithmetic and arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Formula {
    Bool(bool),
    Int(i64),
    Var(String),
    Eq(Box<Formula>, Box<Formula>),
    Ne(Box<Formula>, Box<Formula>),
    Lt(Box<Formula>, Box<Formula>),
    Le(Box<Formula>, Box<Formula>),
    Gt(Box<Formula>, Box<Formula>),
    Ge(Box<Formula>, Box<Formula>),
    Add(Box<Formula>, Box<Formula>),
    Sub(Box<Formula>, Box<Formula>),
    Mul(Box<Formula>, Box<Formula>),
    Div(Box<Formula>, Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Not(Box<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Ite(Box<Formula>, Box<Formula>, Box<Formula>),
    Forall(Vec<(String, Sort)>, Box<Formula>),
    Select(Box<Formula>, Box<Formula>),
    Store(Box<Formula>, Box<Formula>, Box<Formula>),
}

impl Formula {
    fn eq(a: Formula, b: Formula) -> Formula {
        Formula::Eq(Box::new(a), Box::new(b))
    }

    /// Render this formula as an SMT-LIB s-expression.
    pub fn to_smt(&self) -> String {
        match self {
            Formula::Bool(b) => b.to_string(),
            Formula::Int(n) => {
                if *n < 0 {
                    format!("(- {})", -n)
                } else {
                    n.to_string()
                }
            }
            Formula::Var(name) => name.clone(),
            Formula::Eq(a, b) => format!("(= {} {})", a.to_smt(), b.to_smt()),
            Formula::Ne(a, b) => format!("(not (= {} {}))", a.to_smt(), b.to_smt()),
            Formula::Lt(a, b) => format!("(< {} {})", a.to_smt(), b.to_smt()),
            Formula::Le(a, b) => format!("(<= {} {})", a.to_smt(), b.to_smt()),
            Formula::Gt(a, b) => format!("(> {} {})", a.to_smt(), b.to_smt()),
            Formula::Ge(a, b) => format!("(>= {} {})", a.to_smt(), b.to_smt()),
            Formula::Add(a, b) => format!("(+ {} {})", a.to_smt(), b.to_smt()),
            Formula::Sub(a, b) => format!("(- {} {})", a.to_smt(), b.to_smt()),
            Formula::Mul(a, b) => format!("(* {} {})", a.to_smt(), b.to_smt()),
            Formula::Div(a, b) => format!("(div {} {})", a.to_smt(), b.to_smt()),
            Formula::And(items) => {
                format!("(and {})", items.iter().map(|i| i.to_smt()).collect::<Vec<_>>().join(" "))
            }
            Formula::Or(items) => {
                format!("(or {})", items.iter().map(|i| i.to_smt()).collect::<Vec<_>>().join(" "))
            }
            Formula::Not(a) => format!("(not {})", a.to_smt()),
            Formula::Implies(a, b) => format!("(=> {} {})", a.to_smt(), b.to_smt()),
            Formula::Ite(c, t, e) => format!("(ite {} {} {})", c.to_smt(), t.to_smt(), e.to_smt()),
            Formula::Forall(vars, body) => {
                let binders = vars
                    .iter()
                    .map(|(name, sort)| format!("({name} {})", sort.smt_name()))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("(forall ({binders}) {})", body.to_smt())
            }
            Formula::Select(arr, idx) => format!("(select {} {})", arr.to_smt(), idx.to_smt()),
            Formula::Store(arr, idx, val) => {
                format!("(store {} {} {})", arr.to_smt(), idx.to_smt(), val.to_smt())
            }
        }
    }
}

/// Options controlling what the encoder adds beyond explicit user assertions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EncodeOptions {
    /// Append `forall k. 0<=k<n-1 => A[k] <= A[k+1]` over the final version
    /// of every array, bound to a declared `n`. Opt-in: off by default.
    pub assume_sorted_postcondition: bool,
}

/// An SMT-LIB script: ordered declarations plus ordered top-level assertions.
#[derive(Debug, Clone)]
pub struct Script {
    pub declarations: Vec<(String, Sort)>,
    pub assertions: Vec<Formula>,
}

impl Script {
    /// Render the full SMT-LIB v2 text, `set-logic` through `exit`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("(set-logic QF_AUFLIA)\n");
        for (name, sort) in &self.declarations {
            out.push_str(&format!("(declare-fun {name} () {})\n", sort.smt_name()));
        }
        for assertion in &self.assertions {
            out.push_str(&format!("(assert {})\n", assertion.to_smt()));
        }
        out.push_str("(check-sat)\n(get-model)\n(exit)\n");
        out
    }
}

fn expr_to_formula(expr: &ast::Expr, decls: &mut BTreeMap<String, Sort>) -> Formula {
    match expr {
        ast::Expr::Int(n) => Formula::Int(*n),
        ast::Expr::Bool(b) => Formula::Bool(*b),
        ast::Expr::Var(name) => {
            decls.entry(name.clone()).or_insert(Sort::Int);
            Formula::Var(name.clone())
        }
        ast::Expr::ArrayRead { array, index } => {
            decls.entry(array.clone()).or_insert(Sort::ArrayIntInt);
            Formula::Select(Box::new(Formula::Var(array.clone())), Box::new(expr_to_formula(index, decls)))
        }
        ast::Expr::Unary { op, expr } => {
            let inner = expr_to_formula(expr, decls);
            match op {
                UnOp::Neg => Formula::Sub(Box::new(Formula::Int(0)), Box::new(inner)),
                UnOp::Not => Formula::Not(Box::new(inner)),
            }
        }
        ast::Expr::Binary { op, left, right } => {
            let l = expr_to_formula(left, decls);
            let r = expr_to_formula(right, decls);
            match op {
                BinOp::Add => Formula::Add(Box::new(l), Box::new(r)),
                BinOp::Sub => Formula::Sub(Box::new(l), Box::new(r)),
                BinOp::Mul => Formula::Mul(Box::new(l), Box::new(r)),
                BinOp::Div => Formula::Div(Box::new(l), Box::new(r)),
                BinOp::Eq => Formula::Eq(Box::new(l), Box::new(r)),
                BinOp::Ne => Formula::Ne(Box::new(l), Box::new(r)),
                BinOp::Lt => Formula::Lt(Box::new(l), Box::new(r)),
                BinOp::Le => Formula::Le(Box::new(l), Box::new(r)),
                BinOp::Gt => Formula::Gt(Box::new(l), Box::new(r)),
                BinOp::Ge => Formula::Ge(Box::new(l), Box::new(r)),
                BinOp::And => Formula::And(vec![l, r]),
                BinOp::Or => Formula::Or(vec![l, r]),
            }
        }
    }
}

/// Lower one program's SSA list into top-level assertions, recording every
/// declared symbol's sort along the way. `negate_asserts` implements the
/// checker's assertion-polarity convention: user `assert(e)` becomes the
/// obligation `(assert (not e))`, so `sat` exhibits a counterexample and
/// `unsat` is a bounded proof.
fn lower(
    instrs: &[SsaInstr],
    decls: &mut BTreeMap<String, Sort>,
    negate_asserts: bool,
) -> Vec<Formula> {
    let mut out = Vec::new();
    for instr in instrs {
        match instr {
            SsaInstr::Define { target, expr } => {
                decls.insert(target.name(), Sort::Int);
                let rhs = expr_to_formula(expr, decls);
                out.push(Formula::eq(Formula::Var(target.name()), rhs));
            }
            SsaInstr::ArrayStore { target, prev, index, value } => {
                decls.insert(target.name(), Sort::ArrayIntInt);
                decls.entry(prev.name()).or_insert(Sort::ArrayIntInt);
                let idx = expr_to_formula(index, decls);
                let val = expr_to_formula(value, decls);
                let rhs = Formula::Store(Box::new(Formula::Var(prev.name())), Box::new(idx), Box::new(val));
                out.push(Formula::eq(Formula::Var(target.name()), rhs));
            }
            SsaInstr::Phi { target, cond, then_val, else_val, is_array } => {
                let sort = if *is_array { Sort::ArrayIntInt } else { Sort::Int };
                decls.insert(target.name(), sort);
                decls.entry(then_val.name()).or_insert(sort);
                decls.entry(else_val.name()).or_insert(sort);
                decls.entry(cond.clone()).or_insert(Sort::Bool);
                let rhs = Formula::Ite(
                    Box::new(Formula::Var(cond.clone())),
                    Box::new(Formula::Var(then_val.name())),
                    Box::new(Formula::Var(else_val.name())),
                );
                out.push(Formula::eq(Formula::Var(target.name()), rhs));
            }
            SsaInstr::Condition { name, expr } => {
                decls.insert(name.clone(), Sort::Bool);
                let rhs = expr_to_formula(expr, decls);
                out.push(Formula::eq(Formula::Var(name.clone()), rhs));
            }
            SsaInstr::Assert { expr } => {
                let f = expr_to_formula(expr, decls);
                out.push(if negate_asserts { Formula::Not(Box::new(f)) } else { f });
            }
        }
    }
    out
}

fn final_array_version(instrs: &[SsaInstr], array: &str) -> Option<String> {
    instrs.iter().rev().find_map(|i| match i {
        SsaInstr::ArrayStore { target, .. } if target.base == array => Some(target.name()),
        SsaInstr::Phi { target, is_array: true, .. } if target.base == array => Some(target.name()),
        _ => None,
    })
}

fn array_names(instrs: &[SsaInstr]) -> std::collections::BTreeSet<String> {
    instrs
        .iter()
        .filter_map(|i| match i {
            SsaInstr::ArrayStore { target, .. } => Some(target.base.clone()),
            SsaInstr::Phi { target, is_array: true, .. } => Some(target.base.clone()),
            _ => None,
        })
        .collect()
}

fn final_scalar_version(instrs: &[SsaInstr], var: &str) -> Option<String> {
    instrs.iter().rev().find_map(|i| match i {
        SsaInstr::Define { target, .. } if target.base == var => Some(target.name()),
        SsaInstr::Phi { target, is_array: false, .. } if target.base == var => Some(target.name()),
        _ => None,
    })
}

fn scalar_names(instrs: &[SsaInstr]) -> std::collections::BTreeSet<String> {
    instrs
        .iter()
        .filter_map(|i| match i {
            SsaInstr::Define { target, .. } => Some(target.base.clone()),
            SsaInstr::Phi { target, is_array: false, .. } => Some(target.base.clone()),
            _ => None,
        })
        .collect()
}

/// Every scalar base name whose implicit initial symbol (`<base>_0`) is
/// read somewhere in this SSA list — the program's free scalar inputs.
fn initial_scalar_inputs(instrs: &[SsaInstr]) -> std::collections::BTreeSet<String> {
    fn walk(e: &ast::Expr, out: &mut std::collections::BTreeSet<String>) {
        match e {
            ast::Expr::Int(_) | ast::Expr::Bool(_) => {}
            ast::Expr::Var(name) => {
                if let Some(base) = name.strip_suffix("_0") {
                    out.insert(base.to_string());
                }
            }
            ast::Expr::ArrayRead { index, .. } => walk(index, out),
            ast::Expr::Unary { expr, .. } => walk(expr, out),
            ast::Expr::Binary { left, right, .. } => {
                walk(left, out);
                walk(right, out);
            }
        }
    }
    let mut out = std::collections::BTreeSet::new();
    for instr in instrs {
        match instr {
            SsaInstr::Define { expr, .. } => walk(expr, &mut out),
            SsaInstr::ArrayStore { index, value, .. } => {
                walk(index, &mut out);
                walk(value, &mut out);
            }
            SsaInstr::Condition { expr, .. } => walk(expr, &mut out),
            SsaInstr::Assert { expr } => walk(expr, &mut out),
            SsaInstr::Phi { .. } => {}
        }
    }
    out
}

/// Every array base name whose implicit initial version (`<base>_0`) is
/// read or threaded through a store/phi somewhere in this SSA list.
fn initial_array_inputs(instrs: &[SsaInstr]) -> std::collections::BTreeSet<String> {
    fn walk(e: &ast::Expr, out: &mut std::collections::BTreeSet<String>) {
        match e {
            ast::Expr::Int(_) | ast::Expr::Bool(_) | ast::Expr::Var(_) => {}
            ast::Expr::ArrayRead { array, index } => {
                if let Some(base) = array.strip_suffix("_0") {
                    out.insert(base.to_string());
                }
                walk(index, out);
            }
            ast::Expr::Unary { expr, .. } => walk(expr, out),
            ast::Expr::Binary { left, right, .. } => {
                walk(left, out);
                walk(right, out);
            }
        }
    }
    let mut out = std::collections::BTreeSet::new();
    for instr in instrs {
        match instr {
            SsaInstr::Define { expr, .. } => walk(expr, &mut out),
            SsaInstr::ArrayStore { prev, index, value, .. } => {
                if prev.gen == 0 {
                    out.insert(prev.base.clone());
                }
                walk(index, &mut out);
                walk(value, &mut out);
            }
            SsaInstr::Phi { then_val, else_val, is_array: true, .. } => {
                if then_val.gen == 0 {
                    out.insert(then_val.base.clone());
                }
                if else_val.gen == 0 {
                    out.insert(else_val.base.clone());
                }
            }
            SsaInstr::Condition { expr, .. } => walk(expr, &mut out),
            SsaInstr::Assert { expr } => walk(expr, &mut out),
            SsaInstr::Phi { is_array: false, .. } => {}
        }
    }
    out
}

/// Encode a single program's SSA list for verification mode.
pub fn encode_verify(instrs: &[SsaInstr], options: EncodeOptions) -> Script {
    let mut decls = BTreeMap::new();
    let mut assertions = lower(instrs, &mut decls, true);

    if options.assume_sorted_postcondition {
        let arrays = array_names(instrs);
        for array in arrays {
            if let Some(final_name) = final_array_version(instrs, &array) {
                let n = "n_1".to_string();
                decls.entry(n.clone()).or_insert(Sort::Int);
                let k = "k".to_string();
                let body = Formula::Implies(
                    Box::new(Formula::And(vec![
                        Formula::Le(Box::new(Formula::Int(0)), Box::new(Formula::Var(k.clone()))),
                        Formula::Lt(
                            Box::new(Formula::Var(k.clone())),
                            Box::new(Formula::Sub(Box::new(Formula::Var(n.clone())), Box::new(Formula::Int(1)))),
                        ),
                    ])),
                    Box::new(Formula::Le(
                        Box::new(Formula::Select(
                            Box::new(Formula::Var(final_name.clone())),
                            Box::new(Formula::Var(k.clone())),
                        )),
                        Box::new(Formula::Select(
                            Box::new(Formula::Var(final_name.clone())),
                            Box::new(Formula::Add(Box::new(Formula::Var(k.clone())), Box::new(Formula::Int(1)))),
                        )),
                    )),
                );
                assertions.push(Formula::Forall(vec![(k, Sort::Int)], Box::new(body)));
            }
        }
    }

    Script { declarations: decls.into_iter().collect(), assertions }
}

/// Encode two programs' SSA lists for equivalence mode: disjoint `_1`/`_2`
/// suffixes, equality obligations over every common observable.
pub fn encode_equivalence(
    instrs1: &[SsaInstr],
    instrs2: &[SsaInstr],
) -> Result<Script, EncodingError> {
    let mut decls = BTreeMap::new();
    let renamed1 = rename_suffix(instrs1, "_1");
    let renamed2 = rename_suffix(instrs2, "_2");

    let mut assertions = lower(&renamed1, &mut decls, false);
    assertions.extend(lower(&renamed2, &mut decls, false));

    // The two programs only observe the *same* initial inputs if we say
    // so: without this, every free variable read by both (e.g. `a_0`,
    // `b_0`) is free to take different values on each side, so any
    // common-output program would spuriously "diverge". Assert equality
    // of every shared scalar and array input before comparing outputs.
    let inputs1 = initial_scalar_inputs(instrs1);
    let inputs2 = initial_scalar_inputs(instrs2);
    for var in inputs1.intersection(&inputs2) {
        assertions.push(Formula::eq(
            Formula::Var(format!("{var}_1_0")),
            Formula::Var(format!("{var}_2_0")),
        ));
    }

    let array_inputs1 = initial_array_inputs(instrs1);
    let array_inputs2 = initial_array_inputs(instrs2);
    for array in array_inputs1.intersection(&array_inputs2) {
        assertions.push(Formula::eq(
            Formula::Var(format!("{array}_1_0")),
            Formula::Var(format!("{array}_2_0")),
        ));
    }

    let scalars1 = scalar_names(instrs1);
    let scalars2 = scalar_names(instrs2);
    let arrays1 = array_names(instrs1);
    let arrays2 = array_names(instrs2);

    let mut obligations = Vec::new();

    for var in scalars1.union(&scalars2) {
        let final1 = final_scalar_version(&renamed1, &format!("{var}_1"));
        let final2 = final_scalar_version(&renamed2, &format!("{var}_2"));
        let name1 = final1.unwrap_or_else(|| {
            let zeroed = format!("{var}_1_0");
            decls.insert(zeroed.clone(), Sort::Int);
            obligations.push(Formula::eq(Formula::Var(zeroed.clone()), Formula::Int(0)));
            zeroed
        });
        let name2 = final2.unwrap_or_else(|| {
            let zeroed = format!("{var}_2_0");
            decls.insert(zeroed.clone(), Sort::Int);
            obligations.push(Formula::eq(Formula::Var(zeroed.clone()), Formula::Int(0)));
            zeroed
        });
        obligations.push(Formula::Ne(Box::new(Formula::Var(name1)), Box::new(Formula::Var(name2))));
    }

    for array in arrays1.intersection(&arrays2) {
        if let (Some(f1), Some(f2)) = (
            final_array_version(&renamed1, &format!("{array}_1")),
            final_array_version(&renamed2, &format!("{array}_2")),
        ) {
            obligations
                .push(Formula::Ne(Box::new(Formula::Var(f1)), Box::new(Formula::Var(f2))));
        }
    }

    if obligations.is_empty() {
        return Err(EncodingError::NothingToCompare);
    }

    assertions.push(Formula::Or(obligations));

    Ok(Script { declarations: decls.into_iter().collect(), assertions })
}

/// Rewrite every scalar/array base name in an SSA list by appending a
/// disjointness suffix (`_1` or `_2`), for equivalence-mode encoding.
fn rename_suffix(instrs: &[SsaInstr], suffix: &str) -> Vec<SsaInstr> {
    fn rename_version(v: &crate::ssa::Version, suffix: &str) -> crate::ssa::Version {
        crate::ssa::Version { base: format!("{}{suffix}", v.base), gen: v.gen }
    }
    // A `Var`/`ArrayRead` name is always an already-versioned `base_gen`
    // string produced by `Version::name()`. The suffix has to land between
    // `base` and `_gen`, matching `rename_version` above, or a read of `x_2`
    // stops referring to the same symbol as its defining target's rename.
    fn rename_versioned_name(name: &str, suffix: &str) -> String {
        match name.rfind('_') {
            Some(idx) => format!("{}{suffix}_{}", &name[..idx], &name[idx + 1..]),
            None => format!("{name}{suffix}"),
        }
    }
    fn rename_expr(e: &ast::Expr, suffix: &str) -> ast::Expr {
        match e {
            ast::Expr::Int(n) => ast::Expr::Int(*n),
            ast::Expr::Bool(b) => ast::Expr::Bool(*b),
            ast::Expr::Var(name) => ast::Expr::Var(rename_versioned_name(name, suffix)),
            ast::Expr::ArrayRead { array, index } => ast::Expr::ArrayRead {
                array: rename_versioned_name(array, suffix),
                index: Box::new(rename_expr(index, suffix)),
            },
            ast::Expr::Unary { op, expr } => {
                ast::Expr::Unary { op: *op, expr: Box::new(rename_expr(expr, suffix)) }
            }
            ast::Expr::Binary { op, left, right } => ast::Expr::Binary {
                op: *op,
                left: Box::new(rename_expr(left, suffix)),
                right: Box::new(rename_expr(right, suffix)),
            },
        }
    }

    instrs
        .iter()
        .map(|instr| match instr {
            SsaInstr::Define { target, expr } => {
                SsaInstr::Define { target: rename_version(target, suffix), expr: rename_expr(expr, suffix) }
            }
            SsaInstr::ArrayStore { target, prev, index, value } => SsaInstr::ArrayStore {
                target: rename_version(target, suffix),
                prev: rename_version(prev, suffix),
                index: rename_expr(index, suffix),
                value: rename_expr(value, suffix),
            },
            SsaInstr::Phi { target, cond, then_val, else_val, is_array } => SsaInstr::Phi {
                target: rename_version(target, suffix),
                cond: format!("{cond}{suffix}"),
                then_val: rename_version(then_val, suffix),
                else_val: rename_version(else_val, suffix),
                is_array: *is_array,
            },
            SsaInstr::Condition { name, expr } => {
                SsaInstr::Condition { name: format!("{name}{suffix}"), expr: rename_expr(expr, suffix) }
            }
            SsaInstr::Assert { expr } => SsaInstr::Assert { expr: rename_expr(expr, suffix) },
        })
        .collect()
}
