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

//! End-to-end verification pipeline: parse, convert to bounded SSA,
//! encode to SMT-LIB, and invoke a solver backend.
//!
//! Each call to [`VerifyPipeline::run`] owns fresh state; nothing here is
//! shared across requests, so a hosting layer may run many pipelines
//! concurrently (one per thread, or fanned out with `rayon`) without locks.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use rayon::prelude::*;

use crate::ast::Block;
use crate::error::{PipelineError, PipelineResult};
use crate::smt::{self, EncodeOptions};
use crate::solver::{SolverBackend, SolverStatus};
use crate::ssa::SsaInstr;
use crate::{ast, parser, ssa};

fn parse_and_convert(src: &str, depth: u32) -> PipelineResult<(Block, Vec<SsaInstr>)> {
    let block = parser::Parser::parse_program(src)?;
    let instrs = ssa::convert(&block, depth)?;
    Ok((block, instrs))
}

/// Which obligation the pipeline should check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Verify,
    Equivalence,
}

/// One verification or equivalence request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub code1: String,
    pub code2: Option<String>,
    pub depth: u32,
    pub mode: Mode,
    pub options: EncodeOptions,
}

/// The full result of running one request through the pipeline: every
/// intermediate artifact plus the final verdict, mirroring the web UI's
/// Parse/SSA/SMT tabs in the system this tool succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    pub parsed: String,
    pub unrolled: String,
    pub ssa: String,
    pub smt: String,
    pub status: SolverStatus,
    pub counterexamples: Vec<String>,
}

/// Runs one [`VerifyRequest`] to completion. Stateless between calls.
pub struct VerifyPipeline<'a> {
    solver: &'a dyn SolverBackend,
    timeout: Duration,
    verbose: bool,
}

impl<'a> VerifyPipeline<'a> {
    pub fn new(solver: &'a dyn SolverBackend) -> Self {
        Self { solver, timeout: Duration::from_secs(10), verbose: false }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn banner(&self, msg: &str) {
        if self.verbose {
            println!("{msg}");
        }
    }

    pub fn run(&self, request: &VerifyRequest) -> PipelineResult<VerifyReport> {
        if request.depth == 0 {
            return Err(PipelineError::InvalidDepth(0));
        }

        self.banner("Phase 1: preprocessing and parsing...");
        self.banner("Phase 2: converting to bounded SSA...");
        // The two programs' parse+convert sub-pipelines are independent of
        // each other, so equivalence mode runs them on rayon's pool rather
        // than sequentially.
        let (first, second) = rayon::join(
            || parse_and_convert(&request.code1, request.depth),
            || request.code2.as_ref().map(|src| parse_and_convert(src, request.depth)).transpose(),
        );
        let (block1, instrs1) = first?;
        let second = second?;
        let block2 = second.as_ref().map(|(b, _)| b.clone());
        let instrs2 = second.map(|(_, i)| i);
        let parsed = render_ast(&block1, block2.as_ref());
        let ssa_text = match &instrs2 {
            Some(i2) => format!("{}\n---\n{}", ssa::render(&instrs1), ssa::render(i2)),
            None => ssa::render(&instrs1),
        };
        let unrolled = ssa_text.clone();

        self.banner("Phase 3: encoding SMT-LIB script...");
        let script = match request.mode {
            Mode::Verify => smt::encode_verify(&instrs1, request.options),
            Mode::Equivalence => {
                let i2 = instrs2.as_ref().ok_or(crate::error::EncodingError::MissingSecondProgram)?;
                smt::encode_equivalence(&instrs1, i2)?
            }
        };
        let smt_text = script.render();

        self.banner("Phase 4: invoking solver...");
        let outcome = match self.solver.check(&smt_text, self.timeout) {
            Ok(outcome) => outcome,
            Err(crate::error::SolverError::Timeout(d)) => {
                eprintln!("warning: solver timed out after {d:?}, reporting unknown");
                return Ok(VerifyReport {
                    parsed,
                    unrolled,
                    ssa: ssa_text,
                    smt: smt_text,
                    status: SolverStatus::Unknown,
                    counterexamples: vec!["timeout".to_string()],
                });
            }
            Err(e) => return Err(e.into()),
        };

        Ok(VerifyReport {
            parsed,
            unrolled,
            ssa: ssa_text,
            smt: smt_text,
            status: outcome.status,
            counterexamples: outcome.model,
        })
    }
}

/// Run a batch of independent requests against one solver backend,
/// fanned out across rayon's global thread pool. Each request gets its
/// own `VerifyPipeline` instance, so requests share nothing but the
/// (stateless, `Sync`) solver backend — the many-pipelines-no-locks
/// model of §5 applied to a whole batch instead of one request.
pub fn run_batch(
    solver: &dyn SolverBackend,
    requests: &[VerifyRequest],
    timeout: Duration,
) -> Vec<PipelineResult<VerifyReport>> {
    requests
        .par_iter()
        .map(|request| VerifyPipeline::new(solver).with_timeout(timeout).run(request))
        .collect()
}

fn render_ast(block1: &ast::Block, block2: Option<&ast::Block>) -> String {
    match block2 {
        Some(b2) => format!("{block1:#?}\n---\n{b2:#?}"),
        None => format!("{block1:#?}"),
    }
}
