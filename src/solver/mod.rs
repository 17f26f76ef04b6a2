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

//! Invocation of an external SMT solver and parsing of its output.
//!
//! [`SolverBackend`] keeps subprocess execution behind a trait boundary so
//! the pipeline can be exercised against [`MockSolver`] without requiring a
//! real solver binary on the test machine.

use std::io::{ErrorKind, Read};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::SolverError;

/// The verdict an SMT solver returns for a `(check-sat)` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverStatus {
    Sat,
    Unsat,
    Unknown,
    Error,
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SolverStatus::Sat => "sat",
            SolverStatus::Unsat => "unsat",
            SolverStatus::Unknown => "unknown",
            SolverStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// The parsed result of one solver invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverOutcome {
    pub status: SolverStatus,
    /// `"name = value"` pairs extracted from `(define-fun ...)` lines.
    pub model: Vec<String>,
}

/// Abstraction over "run this script through a solver", so the pipeline
/// does not depend on a concrete subprocess implementation.
///
/// `Sync` so a batch of pipelines can share one backend across rayon's
/// thread pool (see `pipeline::run_batch`).
pub trait SolverBackend: Sync {
    fn check(&self, script: &str, timeout: Duration) -> Result<SolverOutcome, SolverError>;
}

/// Writes the script to a scoped temp file and shells out to a real
/// solver binary, enforcing a wall-clock timeout.
pub struct ExternalProcessSolver {
    pub executable: String,
}

impl ExternalProcessSolver {
    pub fn new(executable: impl Into<String>) -> Self {
        Self { executable: executable.into() }
    }
}

impl Default for ExternalProcessSolver {
    fn default() -> Self {
        Self::new("z3")
    }
}

impl SolverBackend for ExternalProcessSolver {
    fn check(&self, script: &str, timeout: Duration) -> Result<SolverOutcome, SolverError> {
        let mut file =
            NamedTempFile::new().map_err(|e| SolverError::Spawn(format!("tempfile: {e}")))?;
        {
            use std::io::Write;
            write!(file, "{script}").map_err(|e| SolverError::Spawn(format!("write script: {e}")))?;
        }
        let path = file.path().to_owned();

        let mut child = Command::new(&self.executable)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => SolverError::Missing(self.executable.clone()),
                _ => SolverError::Spawn(e.to_string()),
            })?;

        let mut stdout_pipe = child.stdout.take().expect("solver stdout was piped");
        let reader = thread::spawn(move || {
            let mut buf = String::new();
            let _ = stdout_pipe.read_to_string(&mut buf);
            buf
        });

        let deadline = Instant::now() + timeout;
        let mut timed_out = false;
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        timed_out = true;
                        break;
                    }
                    thread::sleep(Duration::from_millis(25));
                }
                Err(e) => return Err(SolverError::Spawn(e.to_string())),
            }
        }

        let stdout = reader.join().unwrap_or_default();
        if timed_out {
            return Err(SolverError::Timeout(timeout));
        }

        let (status, model) = parse_output(&stdout);
        Ok(SolverOutcome { status, model })
    }
}

/// Parse solver stdout: a leading `sat`/`unsat`/`unknown` token and zero or
/// more `(define-fun name () Sort value)` model entries. `(error ...)`
/// lines are suppressed.
fn parse_output(stdout: &str) -> (SolverStatus, Vec<String>) {
    let mut status = SolverStatus::Unknown;
    let mut model = Vec::new();
    for line in stdout.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("(error") {
            continue;
        }
        match trimmed {
            "sat" => status = SolverStatus::Sat,
            "unsat" => status = SolverStatus::Unsat,
            "unknown" => status = SolverStatus::Unknown,
            _ => {
                if let Some(entry) = parse_define_fun(trimmed) {
                    model.push(entry);
                }
            }
        }
    }
    (status, model)
}

fn parse_define_fun(line: &str) -> Option<String> {
    let inner = line.strip_prefix("(define-fun")?.trim();
    let (name, rest) = inner.split_once("()")?;
    let name = name.trim();
    let rest = rest.trim().trim_end_matches(')').trim();
    let (_sort, value) = rest.split_once(' ')?;
    Some(format!("{} = {}", name, value.trim()))
}

/// A pre-programmed stand-in for a real solver, used by tests so they do
/// not depend on a solver binary being installed.
pub struct MockSolver {
    pub status: SolverStatus,
    pub model: Vec<String>,
}

impl MockSolver {
    pub fn new(status: SolverStatus, model: Vec<String>) -> Self {
        Self { status, model }
    }
}

impl SolverBackend for MockSolver {
    fn check(&self, _script: &str, _timeout: Duration) -> Result<SolverOutcome, SolverError> {
        Ok(SolverOutcome { status: self.status, model: self.model.clone() })
    }
}
