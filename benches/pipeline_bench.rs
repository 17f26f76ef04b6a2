//! Pipeline performance benchmarks
//!
//! Measures performance of the parse -> SSA -> SMT stages at varying
//! program sizes and loop-unroll depths, against `MockSolver` so the
//! benchmark does not depend on a solver binary being installed.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bmcheck::pipeline::{Mode, VerifyPipeline, VerifyRequest};
use bmcheck::smt::EncodeOptions;
use bmcheck::solver::{MockSolver, SolverStatus};

/// Build a straight-line program with `n` sequential scalar assignments
/// threaded through one accumulator, followed by one assertion.
fn straight_line_source(n: usize) -> String {
    let mut src = String::new();
    src.push_str("acc := 0;\n");
    for i in 0..n {
        src.push_str(&format!("acc := acc + {i};\n"));
    }
    src.push_str("assert(acc >= 0);\n");
    src
}

/// Build a program with one `while` loop whose body does a handful of
/// scalar updates, to be unrolled at the benchmark's chosen depth.
fn loop_source() -> String {
    "i := 0;\nsum := 0;\nwhile (i < 1000) {\nsum := sum + i;\ni := i + 1;\n}\nassert(sum >= 0);\n"
        .to_string()
}

fn bench_straight_line(c: &mut Criterion) {
    let mock = MockSolver::new(SolverStatus::Unsat, vec![]);
    let pipeline = VerifyPipeline::new(&mock);

    let mut group = c.benchmark_group("straight_line");
    for size in [10usize, 100, 500] {
        let source = straight_line_source(size);
        group.bench_function(format!("statements_{size}"), |b| {
            b.iter(|| {
                let request = VerifyRequest {
                    code1: black_box(source.clone()),
                    code2: None,
                    depth: 1,
                    mode: Mode::Verify,
                    options: EncodeOptions::default(),
                };
                let _ = pipeline.run(&request);
            });
        });
    }
    group.finish();
}

fn bench_loop_unrolling(c: &mut Criterion) {
    let mock = MockSolver::new(SolverStatus::Unsat, vec![]);
    let pipeline = VerifyPipeline::new(&mock);
    let source = loop_source();

    let mut group = c.benchmark_group("loop_unroll_depth");
    for depth in [1u32, 4, 16] {
        group.bench_function(format!("depth_{depth}"), |b| {
            b.iter(|| {
                let request = VerifyRequest {
                    code1: black_box(source.clone()),
                    code2: None,
                    depth,
                    mode: Mode::Verify,
                    options: EncodeOptions::default(),
                };
                let _ = pipeline.run(&request);
            });
        });
    }
    group.finish();
}

fn bench_equivalence(c: &mut Criterion) {
    let mock = MockSolver::new(SolverStatus::Unsat, vec![]);
    let pipeline = VerifyPipeline::new(&mock);
    let code1 = straight_line_source(50);
    let code2 = straight_line_source(50);

    c.bench_function("equivalence_50_statements", |b| {
        b.iter(|| {
            let request = VerifyRequest {
                code1: black_box(code1.clone()),
                code2: Some(black_box(code2.clone())),
                depth: 1,
                mode: Mode::Equivalence,
                options: EncodeOptions::default(),
            };
            let _ = pipeline.run(&request);
        });
    });
}

criterion_group!(benches, bench_straight_line, bench_loop_unrolling, bench_equivalence);
criterion_main!(benches);
