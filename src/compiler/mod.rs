mod codegen;
pub mod scanner;

pub use codegen::compile;
