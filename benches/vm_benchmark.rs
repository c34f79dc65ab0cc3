//! VM performance benchmarks driven through the spawned binary.

use criterion::{criterion_group, criterion_main, Criterion};
use std::process::Command;
use std::time::Duration;

/// Write the source to a temp file, run the opal binary on it, and
/// return how long the run took.
fn run_opal_timed(source: &str) -> Duration {
    let temp_dir = std::env::temp_dir();
    let temp_file = temp_dir.join(format!("opal_bench_{}.opal", std::process::id()));
    std::fs::write(&temp_file, source).unwrap();

    let start = std::time::Instant::now();
    let output = Command::new(env!("CARGO_BIN_EXE_opal"))
        .arg(temp_file.to_str().unwrap())
        .output()
        .expect("failed to execute opal");
    let elapsed = start.elapsed();

    assert!(
        output.status.success(),
        "benchmark should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    std::fs::remove_file(&temp_file).ok();
    elapsed
}

/// Recursive fib stresses call frames and arithmetic dispatch.
fn fibonacci_source(n: u32) -> String {
    format!(
        "fun fib(n) {{ if (n < 2) return n; return fib(n - 2) + fib(n - 1); }}\nprint fib({});\n",
        n
    )
}

/// Closure churn stresses upvalue capture and the collector.
const CLOSURE_CHURN: &str = "\
fun mk(i) {
  fun get() { return i; }
  return get;
}
var total = 0;
for (var i = 0; i < 2000; i = i + 1) {
  var f = mk(i);
  total = total + f();
}
print total;
";

/// Method dispatch through a small class hierarchy.
const METHOD_DISPATCH: &str = "\
class Counter {
  init() { this.n = 0; }
  bump() { this.n = this.n + 1; return this.n; }
}
var c = Counter();
var last = 0;
for (var i = 0; i < 5000; i = i + 1) last = c.bump();
print last;
";

fn bench_fibonacci(c: &mut Criterion) {
    let mut group = c.benchmark_group("fibonacci");
    group.sample_size(10);
    group.bench_function("fib_20", |b| {
        b.iter(|| run_opal_timed(&fibonacci_source(20)))
    });
    group.finish();
}

fn bench_closures(c: &mut Criterion) {
    let mut group = c.benchmark_group("closures");
    group.sample_size(10);
    group.bench_function("closure_churn", |b| b.iter(|| run_opal_timed(CLOSURE_CHURN)));
    group.finish();
}

fn bench_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("methods");
    group.sample_size(10);
    group.bench_function("method_dispatch", |b| {
        b.iter(|| run_opal_timed(METHOD_DISPATCH))
    });
    group.finish();
}

criterion_group!(benches, bench_fibonacci, bench_closures, bench_methods);
criterion_main!(benches);
