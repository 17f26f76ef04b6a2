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

//! Bounded model checker CLI.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};

use bmcheck::error::PipelineError;
use bmcheck::pipeline::{Mode, VerifyPipeline, VerifyReport, VerifyRequest};
use bmcheck::smt::EncodeOptions;
use bmcheck::solver::ExternalProcessSolver;

#[derive(Parser)]
#[command(name = "bmcheck")]
#[command(about = "Bounded model checker for a tiny imperative language", long_about = None)]
#[command(version)]
struct Cli {
    /// Print a banner for each pipeline phase
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Solver executable to invoke
    #[arg(long, global = true, default_value = "z3")]
    solver: String,

    /// Solver wall-clock timeout, in seconds
    #[arg(long, global = true, default_value_t = 10)]
    timeout_secs: u64,

    /// Print the parsed AST before the verdict
    #[arg(long, global = true)]
    emit_ast: bool,

    /// Print the bounded SSA listing before the verdict
    #[arg(long, global = true)]
    emit_ssa: bool,

    /// Print the emitted SMT-LIB script before the verdict
    #[arg(long, global = true)]
    emit_smt: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a single program's assertions for the given loop-unroll depth
    Verify {
        /// Source file for the program under check
        input: PathBuf,

        /// Loop-unroll bound, applied to every while/for loop
        #[arg(short, long, default_value_t = 1)]
        depth: u32,

        /// Append the opt-in sortedness postcondition over every array's
        /// final version
        #[arg(long)]
        sorted: bool,
    },
    /// Check two programs for observable equivalence on every common input
    Equivalence {
        /// First program
        input1: PathBuf,

        /// Second program
        input2: PathBuf,

        /// Loop-unroll bound, applied to every while/for loop in both programs
        #[arg(short, long, default_value_t = 1)]
        depth: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Verify { input, depth, sorted } => run_verify(&cli, input, *depth, *sorted),
        Commands::Equivalence { input1, input2, depth } => {
            run_equivalence(&cli, input1, input2, *depth)
        }
    };

    match result {
        Ok(report) => {
            print_emitted(&cli, &report);
            println!("status: {}", report.status);
            if !report.counterexamples.is_empty() {
                println!("model:");
                for entry in &report.counterexamples {
                    println!("  {entry}");
                }
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn print_emitted(cli: &Cli, report: &VerifyReport) {
    if cli.emit_ast {
        println!("--- ast ---\n{}", report.parsed);
    }
    if cli.emit_ssa {
        println!("--- ssa ---\n{}", report.ssa);
    }
    if cli.emit_smt {
        println!("--- smt ---\n{}", report.smt);
    }
}

fn run_verify(
    cli: &Cli,
    input: &PathBuf,
    depth: u32,
    sorted: bool,
) -> Result<VerifyReport, PipelineError> {
    let code1 = read_source(input);
    let request = VerifyRequest {
        code1,
        code2: None,
        depth,
        mode: Mode::Verify,
        options: EncodeOptions { assume_sorted_postcondition: sorted },
    };
    run_pipeline(cli, &request)
}

fn run_equivalence(
    cli: &Cli,
    input1: &PathBuf,
    input2: &PathBuf,
    depth: u32,
) -> Result<VerifyReport, PipelineError> {
    let code1 = read_source(input1);
    let code2 = read_source(input2);
    let request = VerifyRequest {
        code1,
        code2: Some(code2),
        depth,
        mode: Mode::Equivalence,
        options: EncodeOptions::default(),
    };
    run_pipeline(cli, &request)
}

fn run_pipeline(cli: &Cli, request: &VerifyRequest) -> Result<VerifyReport, PipelineError> {
    let backend = ExternalProcessSolver::new(cli.solver.clone());
    let pipeline = VerifyPipeline::new(&backend)
        .with_timeout(Duration::from_secs(cli.timeout_secs))
        .with_verbose(cli.verbose);
    pipeline.run(request)
}

fn read_source(path: &PathBuf) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("error: failed to read {}: {e}", path.display());
        process::exit(1);
    })
}
