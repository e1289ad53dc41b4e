//! Crate root: wires together the compilation pipeline.
//!
//! This is a single-pass translator: there is no syntax tree and no backend
//! pass. The stages are small and composable:
//! - `scanner` performs character-level lexical analysis with one lookahead.
//! - `symtab` tracks declared variables and rejects duplicate/undefined use.
//! - `parser` owns all syntactic knowledge and emits target code while it
//!   recognises the input.
//! - `emitter` formats instructions for a stack-and-accumulator runtime,
//!   one line at a time, into an injected sink.
//! - `error` centralises the error taxonomy shared by the other modules.
//!
//! A program is consumed strictly left to right, once; the first error
//! aborts the whole compilation.

pub mod cli;
pub mod emitter;
pub mod error;
pub mod parser;
pub mod scanner;
pub mod symtab;

pub use emitter::Sink;
pub use error::{CompileError, CompileResult};

/// Compile a source string into the target-runtime instruction text.
pub fn compile(source: &str) -> CompileResult<String> {
  let mut out = String::new();
  compile_into(source, &mut out)?;
  Ok(out)
}

/// Compile into a caller-supplied line sink. On error the sink keeps
/// whatever was emitted before the failure.
pub fn compile_into<S: Sink>(source: &str, sink: S) -> CompileResult<()> {
  parser::compile(source, sink)
}
