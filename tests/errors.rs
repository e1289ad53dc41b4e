//! The failure contract: compilation stops at the first error, and each
//! taxonomy variant surfaces with the offending lexeme in its message.

use rkissc::CompileError;

fn fail(source: &str) -> CompileError {
  rkissc::compile(source).expect_err("compilation should have failed")
}

#[test]
fn duplicate_identifier() {
  let err = fail("VAR X VAR X BEGIN END.");
  assert!(matches!(&err, CompileError::DuplicateIdentifier { name } if name == "X"));
  assert_eq!(err.to_string(), "duplicate identifier \"X\"");
}

#[test]
fn undefined_identifier_in_an_expression() {
  let err = fail("VAR X BEGIN X = Y + 1 END.");
  assert!(matches!(&err, CompileError::UndefinedIdentifier { name } if name == "Y"));
}

#[test]
fn undefined_identifier_in_read_list() {
  let err = fail("BEGIN READ(A) END.");
  assert!(matches!(err, CompileError::UndefinedIdentifier { .. }));
}

#[test]
fn unrecognized_keyword_before_the_main_block() {
  let err = fail("HALT BEGIN END.");
  assert_eq!(err.to_string(), "unrecognized keyword \"HALT\"");
}

#[test]
fn unexpected_character() {
  let err = fail("BEGIN @ END.");
  assert!(matches!(err, CompileError::UnexpectedCharacter { found: '@', .. }));
}

#[test]
fn mismatched_block_terminator() {
  let err = fail("VAR X = 1 BEGIN WHILE X > 0 X = X - 1 ENDIF END.");
  assert_eq!(err.to_string(), "expected \"ENDWHILE\", but got \"ENDIF\"");
}

#[test]
fn missing_program_sentinel_is_supplied_virtually() {
  // End-of-input acts as the sentinel, so a program lacking the literal
  // `.` still terminates cleanly.
  assert!(rkissc::compile("BEGIN END").is_ok());
}

#[test]
fn error_messages_fit_on_a_single_line() {
  for source in [
    "VAR X VAR X BEGIN END.",
    "BEGIN X = 1 END.",
    "HALT BEGIN END.",
    "BEGIN @ END.",
    "VAR X BEGIN IF X X = 1 ENDWHILE END.",
  ] {
    let message = fail(source).to_string();
    assert!(!message.contains('\n'), "multi-line message: {message:?}");
  }
}
