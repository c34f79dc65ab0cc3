//! opal is a small class-based, dynamically-typed scripting language.
//!
//! The pipeline is a single-pass compiler (scanner feeding a Pratt
//! parser that emits bytecode as it goes), a stack-based virtual machine
//! with closures and upvalues, and a precise mark-sweep garbage
//! collector with weak string interning.

pub mod compiler;
pub mod config;
pub mod vm;

pub use config::RuntimeConfig;
pub use vm::{Value, Vm};

use std::fmt;

/// How an interpretation failed. Diagnostics are printed when the error
/// occurs; this only classifies the failure so callers can map it to an
/// exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    Compile,
    Runtime,
}

impl Error {
    /// Script exit codes follow the sysexits convention: 65 for data
    /// (compile) errors, 70 for internal (runtime) errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Compile => 65,
            Error::Runtime => 70,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Compile => write!(f, "compile error"),
            Error::Runtime => write!(f, "runtime error"),
        }
    }
}
