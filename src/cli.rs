use std::path::PathBuf;

use palc::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rkissc")]
pub struct Cli {
  #[command(subcommand)]
  pub mode: Option<Mode>,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
  /// Compile a source file
  File { path: PathBuf },
  /// Read a program from the terminal, up to the closing `.`
  Repl,
}
