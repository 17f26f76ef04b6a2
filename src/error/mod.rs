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

//! Error types for the bounded model checker pipeline.
//!
//! One enum per pipeline stage, each carrying a [`SourceLocation`] where
//! applicable, composed into a single [`PipelineError`] via `#[from]` so
//! callers only ever handle one `Result` type.

use std::fmt;
use thiserror::Error;

/// A location in a submitted program, used for error reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub text: String,
}

impl SourceLocation {
    pub fn new(line: usize, text: impl Into<String>) -> Self {
        Self { line, text: text.into() }
    }

    pub fn unknown() -> Self {
        Self { line: 0, text: String::new() }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.text)
    }
}

/// Errors raised while normalizing raw source text into logical lines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unbalanced braces at {0}")]
    UnbalancedBraces(SourceLocation),

    #[error("block header missing its opening brace at {0}")]
    MissingOpeningBrace(SourceLocation),
}

/// Errors raised while parsing logical lines into an AST.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid if header at {0}")]
    InvalidIfHeader(SourceLocation),

    #[error("invalid while header at {0}")]
    InvalidWhileHeader(SourceLocation),

    #[error("invalid for header at {0}")]
    InvalidForHeader(SourceLocation),

    #[error("invalid assert statement at {0}")]
    InvalidAssert(SourceLocation),

    #[error("invalid assignment at {0}")]
    InvalidAssign(SourceLocation),

    #[error("invalid expression '{text}' at {location}")]
    InvalidExpression { text: String, location: SourceLocation },

    #[error("unsupported feature '{feature}' at {location}")]
    UnsupportedFeature { feature: String, location: SourceLocation },

    #[error(transparent)]
    Lex(#[from] LexError),
}

/// Errors raised while converting an AST to bounded SSA.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("malformed phi node for '{var}'")]
    MalformedPhi { var: String },

    #[error("loop unroll depth must be at least 1, got {0}")]
    LoopUnrollDepthZero(u32),

    #[error("for-loop update target '{update}' does not match init target '{init}' at {location}")]
    ForUpdateTargetMismatch {
        init: String,
        update: String,
        location: SourceLocation,
    },
}

/// Errors raised while lowering SSA to an SMT-LIB script.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("no common observable between the two programs to compare")]
    NothingToCompare,

    #[error("second SSA program required for equivalence mode")]
    MissingSecondProgram,
}

/// Errors raised while invoking or parsing output from the external solver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("solver timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("solver executable '{0}' not found")]
    Missing(String),

    #[error("solver process failed: {0}")]
    Spawn(String),
}

/// Top-level pipeline error: every stage error funnels into this.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("unroll depth must be a positive integer, got {0}")]
    InvalidDepth(u32),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
