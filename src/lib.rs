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

//! A bounded model checker for a tiny imperative language.
//!
//! Parses one or two programs, converts them to bounded static-single-
//! assignment form with loop unrolling, lowers the result to an SMT-LIB v2
//! script over QF_AUFLIA, and reports the verdict an external solver
//! returns for it.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod smt;
pub mod solver;
pub mod ssa;

use std::path::Path;
use std::time::Duration;

use crate::error::PipelineResult;
use crate::pipeline::{Mode, VerifyPipeline, VerifyReport, VerifyRequest};
use crate::smt::EncodeOptions;
use crate::solver::{ExternalProcessSolver, SolverBackend};

/// The library's convenience entry point: owns solver configuration and
/// runs requests against it. Analogous to the teacher's `Compiler` facade.
pub struct Checker {
    solver_executable: String,
    timeout: Duration,
    verbose: bool,
}

impl Checker {
    pub fn new() -> Self {
        Self { solver_executable: "z3".to_string(), timeout: Duration::from_secs(10), verbose: false }
    }

    pub fn solver(mut self, executable: impl Into<String>) -> Self {
        self.solver_executable = executable.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn verbose(mut self, enable: bool) -> Self {
        self.verbose = enable;
        self
    }

    /// Verify a single program from its source text.
    pub fn verify(&self, code: &str, depth: u32, options: EncodeOptions) -> PipelineResult<VerifyReport> {
        let request = VerifyRequest {
            code1: code.to_string(),
            code2: None,
            depth,
            mode: Mode::Verify,
            options,
        };
        self.run(&request)
    }

    /// Check two programs for observable equivalence.
    pub fn equivalence(&self, code1: &str, code2: &str, depth: u32) -> PipelineResult<VerifyReport> {
        let request = VerifyRequest {
            code1: code1.to_string(),
            code2: Some(code2.to_string()),
            depth,
            mode: Mode::Equivalence,
            options: EncodeOptions::default(),
        };
        self.run(&request)
    }

    fn run(&self, request: &VerifyRequest) -> PipelineResult<VerifyReport> {
        let backend: ExternalProcessSolver = ExternalProcessSolver::new(self.solver_executable.clone());
        let pipeline = VerifyPipeline::new(&backend as &dyn SolverBackend)
            .with_timeout(self.timeout)
            .with_verbose(self.verbose);
        pipeline.run(request)
    }

    /// Read source text from a file and verify it.
    pub fn verify_file(
        &self,
        path: &Path,
        depth: u32,
        options: EncodeOptions,
    ) -> anyhow::Result<VerifyReport> {
        let src = std::fs::read_to_string(path)?;
        Ok(self.verify(&src, depth, options)?)
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}
