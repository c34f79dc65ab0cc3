use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;

use opal::config::RuntimeConfig;
use opal::vm::Vm;

#[derive(Parser)]
#[command(name = "opal", version)]
#[command(about = "A small class-based scripting language", long_about = None)]
struct Cli {
    /// Script to run; starts an interactive prompt when omitted
    script: Option<PathBuf>,

    /// Disassemble the compiled script to stderr before running
    #[arg(long)]
    dump_bytecode: bool,

    /// Log collector activity to stderr
    #[arg(long)]
    trace_gc: bool,

    /// Collect on every allocation (slow; for debugging the collector)
    #[arg(long)]
    stress_gc: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err)
            if err.kind() == ErrorKind::DisplayHelp || err.kind() == ErrorKind::DisplayVersion =>
        {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(_) => {
            eprintln!("Usage: opal [script]");
            return ExitCode::from(64);
        }
    };

    let config = RuntimeConfig {
        trace_gc: cli.trace_gc,
        stress_gc: cli.stress_gc,
        dump_bytecode: cli.dump_bytecode,
    };
    let mut vm = Vm::new(config);

    match cli.script {
        Some(path) => run_file(&mut vm, &path),
        None => repl(&mut vm),
    }
}

fn run_file(vm: &mut Vm, path: &Path) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Could not read \"{}\": {}.", path.display(), err);
            return ExitCode::from(74);
        }
    };
    match vm.interpret(&source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(err.exit_code()),
    }
}

/// Read one whole program per line. Errors are reported by the VM and
/// the session carries on; globals persist across lines.
fn repl(vm: &mut Vm) -> ExitCode {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                println!();
                return ExitCode::SUCCESS;
            }
            Ok(_) => {
                let _ = vm.interpret(&line);
            }
            Err(err) => {
                eprintln!("Could not read input: {}.", err);
                return ExitCode::from(74);
            }
        }
    }
}
