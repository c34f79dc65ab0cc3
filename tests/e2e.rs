use std::io::Write;
use std::process::{Command, Stdio};

/// Run a source string through the opal binary and collect the outcome.
/// Each test gets its own temp file so parallel runs don't collide.
fn run_opal(source: &str, extra_args: &[&str]) -> (String, String, Option<i32>) {
    let temp_dir = std::env::temp_dir();
    let unique_id = format!("{:?}", std::thread::current().id())
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>();
    let temp_file = temp_dir.join(format!("opal_test_{}.opal", unique_id));
    std::fs::write(&temp_file, source).unwrap();

    let mut args: Vec<&str> = extra_args.to_vec();
    let path = temp_file.to_str().unwrap().to_string();
    args.push(&path);

    let output = Command::new(env!("CARGO_BIN_EXE_opal"))
        .args(&args)
        .output()
        .expect("failed to execute opal");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code();

    std::fs::remove_file(&temp_file).ok();

    (stdout, stderr, code)
}

fn assert_runs(source: &str) -> String {
    let (stdout, stderr, code) = run_opal(source, &[]);
    assert_eq!(code, Some(0), "script should succeed, stderr:\n{}", stderr);
    stdout
}

#[test]
fn test_fibonacci() {
    let source = "\
fun fib(n) { if (n < 2) return n; return fib(n - 2) + fib(n - 1); }
print fib(10);
";
    assert_eq!(assert_runs(source), "55\n");
}

#[test]
fn test_closure_counter() {
    let source = "\
fun mk() { var i = 0; fun next() { i = i + 1; return i; } return next; }
var c = mk();
print c();
print c();
print c();
";
    assert_eq!(assert_runs(source), "1\n2\n3\n");
}

#[test]
fn test_string_interning_and_concat() {
    assert_eq!(assert_runs("print \"foo\" + \"bar\" == \"foobar\";"), "true\n");
}

#[test]
fn test_inheritance_and_super() {
    let source = "\
class A { m() { return \"A\"; } }
class B < A { m() { return super.m() + \"B\"; } }
print B().m();
";
    assert_eq!(assert_runs(source), "AB\n");
}

#[test]
fn test_initializer_and_fields() {
    let source = "\
class P { init(x) { this.x = x; } }
var p = P(7);
print p.x;
p.x = \"s\";
print p.x;
";
    assert_eq!(assert_runs(source), "7\ns\n");
}

#[test]
fn test_compile_error_exits_65_without_running() {
    let (stdout, stderr, code) = run_opal("var a = ; var b = 2; print b;", &[]);
    assert_eq!(code, Some(65));
    assert!(
        stderr.contains("[line 1] Error at ';': Expect expression."),
        "stderr: {}",
        stderr
    );
    assert!(!stdout.contains('2'), "stdout: {}", stdout);
}

#[test]
fn test_runtime_error_exits_70_with_traceback() {
    let source = "\
fun boom() { return 1 + nil; }
boom();
";
    let (_, stderr, code) = run_opal(source, &[]);
    assert_eq!(code, Some(70));
    assert!(
        stderr.contains("Operands must be two numbers or two strings."),
        "stderr: {}",
        stderr
    );
    // Innermost frame first, then the top level.
    assert!(stderr.contains("[line 1] in boom()"), "stderr: {}", stderr);
    assert!(stderr.contains("[line 2] in script"), "stderr: {}", stderr);
}

#[test]
fn test_stack_overflow_is_runtime_error() {
    let (_, stderr, code) = run_opal("fun f() { f(); } f();", &[]);
    assert_eq!(code, Some(70));
    assert!(stderr.contains("Stack overflow."), "stderr: {}", stderr);
}

#[test]
fn test_usage_error_exits_64() {
    let output = Command::new(env!("CARGO_BIN_EXE_opal"))
        .args(["one.opal", "two.opal"])
        .output()
        .expect("failed to execute opal");
    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage:"), "stderr: {}", stderr);
}

#[test]
fn test_missing_file_exits_74() {
    let output = Command::new(env!("CARGO_BIN_EXE_opal"))
        .arg("definitely_not_here.opal")
        .output()
        .expect("failed to execute opal");
    assert_eq!(output.status.code(), Some(74));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Could not read"), "stderr: {}", stderr);
}

#[test]
fn test_repl_reads_programs_from_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_opal"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn opal");

    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(b"var x = 40;\nprint x + 2;\n")
        .unwrap();
    let output = child.wait_with_output().expect("failed to wait for opal");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    // Globals persist from the first line to the second.
    assert!(stdout.contains("42"), "stdout: {}", stdout);
}

#[test]
fn test_repl_survives_errors() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_opal"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn opal");

    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(b"print missing;\nprint \"still here\";\n")
        .unwrap();
    let output = child.wait_with_output().expect("failed to wait for opal");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("still here"), "stdout: {}", stdout);
    assert!(stderr.contains("Undefined variable 'missing'."), "stderr: {}", stderr);
}

#[test]
fn test_dump_bytecode_flag() {
    let (stdout, stderr, code) = run_opal("print 1 + 2;", &["--dump-bytecode"]);
    assert_eq!(code, Some(0));
    assert!(stderr.contains("== <script> =="), "stderr: {}", stderr);
    assert!(stderr.contains("ADD"), "stderr: {}", stderr);
    assert_eq!(stdout, "3\n");
}

#[test]
fn test_stress_gc_flag_runs_clean() {
    let source = "\
class Box { init(v) { this.v = v; } }
var total = 0;
for (var i = 0; i < 30; i = i + 1) {
  var b = Box(i);
  total = total + b.v;
}
print total;
";
    let (stdout, stderr, code) = run_opal(source, &["--stress-gc"]);
    assert_eq!(code, Some(0), "stderr:\n{}", stderr);
    assert_eq!(stdout, "435\n");
}

#[test]
fn test_trace_gc_flag_logs_collections() {
    let (_, stderr, code) = run_opal("print \"ok\";", &["--stress-gc", "--trace-gc"]);
    assert_eq!(code, Some(0));
    assert!(stderr.contains("[GC] collect begin"), "stderr: {}", stderr);
    assert!(stderr.contains("[GC] collect end"), "stderr: {}", stderr);
}

#[test]
fn test_shadowing_and_scopes() {
    let source = "\
var a = \"global\";
{
  var a = \"outer\";
  {
    var a = \"inner\";
    print a;
  }
  print a;
}
print a;
";
    assert_eq!(assert_runs(source), "inner\nouter\nglobal\n");
}

#[test]
fn test_for_loop_closures_capture_distinct_iterations() {
    // Each iteration's body scope is distinct; closures made in later
    // rounds must not disturb earlier captures.
    let source = "\
var first;
var second;
for (var i = 0; i < 2; i = i + 1) {
  var j = i * 10;
  fun get() { return j; }
  if (i == 0) first = get; else second = get;
}
print first();
print second();
";
    assert_eq!(assert_runs(source), "0\n10\n");
}
