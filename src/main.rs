use std::fs;
use std::io::{self, BufRead};
use std::process;

use palc::Parser;
use rkissc::cli::{Cli, Mode};

fn main() {
  let source = match Cli::parse().mode.unwrap_or(Mode::Repl) {
    Mode::File { path } => match fs::read_to_string(&path) {
      Ok(text) => text,
      Err(err) => {
        eprintln!("Error: cannot read {}: {err}", path.display());
        process::exit(1);
      }
    },
    Mode::Repl => match read_program(io::stdin().lock()) {
      Ok(text) => text,
      Err(err) => {
        eprintln!("Error: {err}");
        process::exit(1);
      }
    },
  };

  match rkissc::compile(&source) {
    Ok(code) => print!("{code}"),
    Err(err) => {
      eprintln!("Error: {err}");
      process::exit(1);
    }
  }
}

/// Collect terminal lines until the one carrying the end-of-program mark.
fn read_program(input: impl BufRead) -> io::Result<String> {
  let mut buffer = String::new();
  for line in input.lines() {
    let line = line?;
    buffer.push_str(&line);
    buffer.push('\n');
    if line.trim_end().ends_with('.') {
      break;
    }
  }
  Ok(buffer)
}
