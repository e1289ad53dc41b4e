//! Shared error utilities used across the compilation pipeline.
//!
//! The whole taxonomy lives in one enum so every stage can fail with a plain
//! `?`. There is no recovery or accumulation mode: the first error aborts the
//! compilation, and the driver prints it as a single `Error: …` line.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
pub enum CompileError {
  /// The scanner needed a character of a specific class and found another.
  #[snafu(display("unexpected character '{found}', expected {wanted}"))]
  UnexpectedCharacter { wanted: &'static str, found: char },

  /// The parser needed a specific token.
  #[snafu(display("expected {wanted}, but got \"{got}\""))]
  Expected { wanted: String, got: String },

  #[snafu(display("duplicate identifier \"{name}\""))]
  DuplicateIdentifier { name: String },

  #[snafu(display("undefined identifier \"{name}\""))]
  UndefinedIdentifier { name: String },

  /// Something other than a declaration or `BEGIN` before the main block.
  #[snafu(display("unrecognized keyword \"{lexeme}\""))]
  UnrecognizedKeyword { lexeme: String },
}
