//! Single-pass recursive-descent translation: one method per grammar
//! production, each consuming tokens and emitting target instructions as it
//! goes. There is no syntax tree: the call stack *is* the parse tree, and
//! the emitter runs interleaved with recognition.
//!
//! Precedence is encoded in the usual ladder (factor → term → expression,
//! then relation → notFactor → boolTerm → boolExpr), with the statement
//! dispatcher on top driving declarations, assignments and control flow.

use crate::emitter::{Cmp, Emitter, Sink};
use crate::error::{CompileError, CompileResult};
use crate::scanner::{Keyword, Scanner, Token, TokenKind};
use crate::symtab::SymbolTable;

/// Translate one program into the given sink.
pub fn compile<S: Sink>(source: &str, sink: S) -> CompileResult<()> {
  Compiler::new(source, sink)?.program()
}

/// The compilation context: scanner cursor, one-token lookahead, the live
/// symbol table and the output emitter. Owned by exactly one pass.
pub struct Compiler<'a, S: Sink> {
  scanner: Scanner<'a>,
  tok: Token,
  symbols: SymbolTable,
  emit: Emitter<S>,
}

impl<'a, S: Sink> Compiler<'a, S> {
  pub fn new(source: &'a str, sink: S) -> CompileResult<Self> {
    let mut scanner = Scanner::new(source);
    let tok = scanner.next_token()?;
    Ok(Self {
      scanner,
      tok,
      symbols: SymbolTable::new(),
      emit: Emitter::new(sink),
    })
  }

  /// program := declarations 'BEGIN' block 'END' '.'
  pub fn program(&mut self) -> CompileResult<()> {
    self.top_decls()?;
    self.expect_keyword(Keyword::Begin)?;
    self.block()?;
    self.expect_keyword(Keyword::End)?;
    self.expect(TokenKind::Dot, "\".\"")?;
    Ok(())
  }

  // -- token plumbing ----------------------------------------------------

  fn bump(&mut self) -> CompileResult<()> {
    self.tok = self.scanner.next_token()?;
    Ok(())
  }

  fn expected(&self, wanted: impl Into<String>) -> CompileError {
    CompileError::Expected {
      wanted: wanted.into(),
      got: self.tok.describe(),
    }
  }

  /// Consume the current token if it has the given kind.
  fn accept(&mut self, kind: TokenKind) -> CompileResult<bool> {
    if self.tok.kind == kind {
      self.bump()?;
      Ok(true)
    } else {
      Ok(false)
    }
  }

  fn expect(&mut self, kind: TokenKind, wanted: &str) -> CompileResult<()> {
    if self.accept(kind)? {
      Ok(())
    } else {
      Err(self.expected(wanted))
    }
  }

  fn accept_keyword(&mut self, kw: Keyword) -> CompileResult<bool> {
    self.accept(TokenKind::Keyword(kw))
  }

  fn expect_keyword(&mut self, kw: Keyword) -> CompileResult<()> {
    if self.accept_keyword(kw)? {
      Ok(())
    } else {
      Err(self.expected(format!("\"{}\"", kw.as_str())))
    }
  }

  fn expect_ident(&mut self) -> CompileResult<String> {
    if self.tok.kind != TokenKind::Ident {
      return Err(self.expected("an identifier"));
    }
    let name = std::mem::take(&mut self.tok.lexeme);
    self.bump()?;
    Ok(name)
  }

  fn expect_number(&mut self) -> CompileResult<String> {
    if self.tok.kind != TokenKind::Number {
      return Err(self.expected("a number"));
    }
    let digits = std::mem::take(&mut self.tok.lexeme);
    self.bump()?;
    Ok(digits)
  }

  // -- expression engine -------------------------------------------------

  /// factor := '(' boolExpr ')' | identifier | number
  fn factor(&mut self) -> CompileResult<()> {
    match self.tok.kind {
      TokenKind::LParen => {
        self.bump()?;
        self.bool_expression()?;
        self.expect(TokenKind::RParen, "\")\"")
      }
      TokenKind::Ident => {
        let name = self.expect_ident()?;
        self.symbols.reference(&name)?;
        self.emit.load_var(&name);
        Ok(())
      }
      TokenKind::Number => {
        let digits = self.expect_number()?;
        self.emit.load_const(&digits);
        Ok(())
      }
      _ => Err(self.expected("an expression")),
    }
  }

  /// A leading sign is only legal on the first factor of a term. Unary
  /// minus is negate-after-load.
  fn first_factor(&mut self) -> CompileResult<()> {
    match self.tok.kind {
      TokenKind::Plus => {
        self.bump()?;
        self.factor()
      }
      TokenKind::Minus => {
        self.bump()?;
        self.factor()?;
        self.emit.negate();
        Ok(())
      }
      _ => self.factor(),
    }
  }

  /// Shared multiply/divide tail of `term` and `firstTerm`.
  fn term_tail(&mut self) -> CompileResult<()> {
    loop {
      let op = self.tok.kind;
      if op != TokenKind::Star && op != TokenKind::Slash {
        return Ok(());
      }
      self.emit.push();
      self.bump()?;
      self.factor()?;
      if op == TokenKind::Star {
        self.emit.pop_mul();
      } else {
        self.emit.pop_div();
      }
    }
  }

  fn term(&mut self) -> CompileResult<()> {
    self.factor()?;
    self.term_tail()
  }

  fn first_term(&mut self) -> CompileResult<()> {
    self.first_factor()?;
    self.term_tail()
  }

  /// expression := firstTerm (('+'|'-') term)*
  fn expression(&mut self) -> CompileResult<()> {
    self.first_term()?;
    loop {
      let op = self.tok.kind;
      if op != TokenKind::Plus && op != TokenKind::Minus {
        return Ok(());
      }
      self.emit.push();
      self.bump()?;
      self.term()?;
      if op == TokenKind::Plus {
        self.emit.pop_add();
      } else {
        self.emit.pop_sub();
      }
    }
  }

  // -- boolean/relational engine -----------------------------------------

  fn relop(&self) -> Option<Cmp> {
    match self.tok.kind {
      TokenKind::Eq => Some(Cmp::Eq),
      TokenKind::Ne => Some(Cmp::Ne),
      TokenKind::Lt => Some(Cmp::Lt),
      TokenKind::Le => Some(Cmp::Le),
      TokenKind::Gt => Some(Cmp::Gt),
      TokenKind::Ge => Some(Cmp::Ge),
      _ => None,
    }
  }

  /// relation := expression [relop expression]
  ///
  /// With no relop the raw arithmetic value stays in the accumulator; the
  /// boolean combinators and control-flow tests all treat nonzero as true.
  fn relation(&mut self) -> CompileResult<()> {
    self.expression()?;
    if let Some(cmp) = self.relop() {
      self.emit.push();
      self.bump()?;
      self.expression()?;
      self.emit.pop_compare(cmp);
    }
    Ok(())
  }

  /// boolFactor := 'T' | 'F' | relation
  fn bool_factor(&mut self) -> CompileResult<()> {
    match self.tok.kind {
      TokenKind::True => {
        self.emit.load_bool(true);
        self.bump()
      }
      TokenKind::False => {
        self.emit.load_bool(false);
        self.bump()
      }
      _ => self.relation(),
    }
  }

  /// notFactor := '!' boolFactor | boolFactor
  fn not_factor(&mut self) -> CompileResult<()> {
    if self.accept(TokenKind::Not)? {
      self.bool_factor()?;
      self.emit.logical_not();
      Ok(())
    } else {
      self.bool_factor()
    }
  }

  /// boolTerm := notFactor ('&' notFactor)*
  fn bool_term(&mut self) -> CompileResult<()> {
    self.not_factor()?;
    while self.tok.kind == TokenKind::And {
      self.emit.push();
      self.bump()?;
      self.not_factor()?;
      self.emit.pop_and();
    }
    Ok(())
  }

  /// boolExpr := boolTerm (('|'|'~') boolTerm)*
  fn bool_expression(&mut self) -> CompileResult<()> {
    self.bool_term()?;
    loop {
      let op = self.tok.kind;
      if op != TokenKind::Or && op != TokenKind::Xor {
        return Ok(());
      }
      self.emit.push();
      self.bump()?;
      self.bool_term()?;
      if op == TokenKind::Or {
        self.emit.pop_or();
      } else {
        self.emit.pop_xor();
      }
    }
  }

  // -- statement dispatcher ----------------------------------------------

  /// Declarations before the main block. Anything that is not `VAR` or
  /// `BEGIN` here is unrecognized.
  fn top_decls(&mut self) -> CompileResult<()> {
    loop {
      match self.tok.kind {
        TokenKind::Keyword(Keyword::Begin) => return Ok(()),
        TokenKind::Keyword(Keyword::Var) => self.declaration()?,
        _ => {
          return Err(CompileError::UnrecognizedKeyword {
            lexeme: self.tok.describe(),
          });
        }
      }
    }
  }

  /// declaration := 'VAR' name ['=' ['-'] number] (',' name ['=' ['-'] number])*
  fn declaration(&mut self) -> CompileResult<()> {
    self.bump()?; // VAR
    self.declare_one()?;
    while self.accept(TokenKind::Comma)? {
      self.declare_one()?;
    }
    Ok(())
  }

  /// A failed declare emits nothing: the table is checked before the
  /// initialization statement goes out.
  fn declare_one(&mut self) -> CompileResult<()> {
    let name = self.expect_ident()?;
    self.symbols.declare(&name)?;
    if self.accept(TokenKind::Eq)? {
      let negative = self.accept(TokenKind::Minus)?;
      let digits = self.expect_number()?;
      self.emit.init_var(&name, negative, &digits);
    } else {
      self.emit.init_var(&name, false, "0");
    }
    Ok(())
  }

  /// Statements until a block terminator. The terminator itself is left
  /// for the caller to match, so mismatches surface as `Expected`.
  fn block(&mut self) -> CompileResult<()> {
    while !self.tok.ends_block() {
      self.statement()?;
    }
    Ok(())
  }

  fn statement(&mut self) -> CompileResult<()> {
    match self.tok.kind {
      TokenKind::Keyword(Keyword::If) => self.do_if(),
      TokenKind::Keyword(Keyword::While) => self.do_while(),
      TokenKind::Keyword(Keyword::Loop) => self.do_loop(),
      TokenKind::Keyword(Keyword::Repeat) => self.do_repeat(),
      TokenKind::Keyword(Keyword::For) => self.do_for(),
      TokenKind::Keyword(Keyword::Do) => self.do_times(),
      TokenKind::Keyword(Keyword::Break) => self.do_break(),
      TokenKind::Keyword(Keyword::Read) => self.do_read(),
      TokenKind::Keyword(Keyword::Write) => self.do_write(),
      TokenKind::Keyword(Keyword::Var) => self.declaration(),
      TokenKind::Ident => self.assignment(),
      _ => Err(self.expected("a statement")),
    }
  }

  /// IF boolExpr block [ELSE block] ENDIF. The two branches are mutually
  /// exclusive by construction of the emitted conditional.
  fn do_if(&mut self) -> CompileResult<()> {
    self.bump()?;
    self.bool_expression()?;
    self.emit.if_open();
    self.block()?;
    if self.accept_keyword(Keyword::Else)? {
      self.emit.else_open();
      self.block()?;
    }
    self.expect_keyword(Keyword::Endif)?;
    self.emit.close();
    Ok(())
  }

  /// WHILE boolExpr block ENDWHILE. Pre-tested loop; the condition is
  /// re-emitted inside the loop head so it is re-evaluated each pass.
  fn do_while(&mut self) -> CompileResult<()> {
    self.bump()?;
    self.emit.loop_open();
    self.bool_expression()?;
    self.emit.break_if_false();
    self.block()?;
    self.expect_keyword(Keyword::Endwhile)?;
    self.emit.close();
    Ok(())
  }

  /// LOOP block ENDLOOP. Only BREAK gets out.
  fn do_loop(&mut self) -> CompileResult<()> {
    self.bump()?;
    self.emit.loop_open();
    self.block()?;
    self.expect_keyword(Keyword::Endloop)?;
    self.emit.close();
    Ok(())
  }

  /// REPEAT block UNTIL boolExpr. Post-tested; the body runs at least once.
  fn do_repeat(&mut self) -> CompileResult<()> {
    self.bump()?;
    self.emit.loop_open();
    self.block()?;
    self.expect_keyword(Keyword::Until)?;
    self.bool_expression()?;
    self.emit.break_if_true();
    self.emit.close();
    Ok(())
  }

  /// FOR name '=' expression TO expression block ENDFOR
  ///
  /// The induction variable is pre-decremented and stepped at the top of
  /// the loop; the limit lives on the stack for the loop's duration and is
  /// dropped after the close.
  fn do_for(&mut self) -> CompileResult<()> {
    self.bump()?;
    let name = self.expect_ident()?;
    self.symbols.reference(&name)?;
    self.expect(TokenKind::Eq, "\"=\"")?;
    self.expression()?;
    self.emit.decrement();
    self.emit.store(&name);
    self.expect_keyword(Keyword::To)?;
    self.expression()?;
    self.emit.push();
    self.emit.loop_open();
    self.emit.load_var(&name);
    self.emit.increment();
    self.emit.store(&name);
    self.emit.break_if_above_top();
    self.block()?;
    self.expect_keyword(Keyword::Endfor)?;
    self.emit.close();
    self.emit.drop_top();
    Ok(())
  }

  /// DO expression block ENDDO. Fixed repetition; the counter is kept on
  /// the stack across the body so the body is free to clobber `d0`.
  fn do_times(&mut self) -> CompileResult<()> {
    self.bump()?;
    self.expression()?;
    self.emit.push();
    self.emit.loop_open();
    self.emit.pop_acc();
    self.emit.break_if_nonpositive();
    self.emit.decrement();
    self.emit.push();
    self.block()?;
    self.expect_keyword(Keyword::Enddo)?;
    self.emit.close();
    Ok(())
  }

  fn do_break(&mut self) -> CompileResult<()> {
    self.bump()?;
    self.emit.break_out();
    Ok(())
  }

  /// READ '(' name (',' name)* ')'. One read-and-store per item.
  fn do_read(&mut self) -> CompileResult<()> {
    self.bump()?;
    self.expect(TokenKind::LParen, "\"(\"")?;
    self.read_item()?;
    while self.accept(TokenKind::Comma)? {
      self.read_item()?;
    }
    self.expect(TokenKind::RParen, "\")\"")
  }

  fn read_item(&mut self) -> CompileResult<()> {
    let name = self.expect_ident()?;
    self.symbols.reference(&name)?;
    self.emit.read_input();
    self.emit.store(&name);
    Ok(())
  }

  /// WRITE '(' expression (',' expression)* ')'. Evaluate-and-print.
  fn do_write(&mut self) -> CompileResult<()> {
    self.bump()?;
    self.expect(TokenKind::LParen, "\"(\"")?;
    self.expression()?;
    self.emit.print_acc();
    while self.accept(TokenKind::Comma)? {
      self.expression()?;
      self.emit.print_acc();
    }
    self.expect(TokenKind::RParen, "\")\"")
  }

  /// assignment := name '=' boolExpr. The name must already be declared.
  fn assignment(&mut self) -> CompileResult<()> {
    let name = self.expect_ident()?;
    self.symbols.reference(&name)?;
    self.expect(TokenKind::Eq, "\"=\"")?;
    self.bool_expression()?;
    self.emit.store(&name);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Run a single grammar production against a captured sink.
  fn emit_with(
    source: &str,
    production: impl FnOnce(&mut Compiler<'_, Vec<String>>) -> CompileResult<()>,
  ) -> Vec<String> {
    let mut compiler = Compiler::new(source, Vec::new()).expect("scan failed");
    production(&mut compiler).expect("parse failed");
    compiler.emit.into_sink()
  }

  #[test]
  fn addition_pushes_left_then_combines() {
    let lines = emit_with("1+2", |c| c.expression());
    assert_eq!(
      lines,
      vec![
        "\td0 = 1",
        "\tstack.push(d0)",
        "\td0 = 2",
        "\td0 += stack.pop()",
      ]
    );
  }

  #[test]
  fn subtraction_negates_after_subtract() {
    let lines = emit_with("5-2", |c| c.expression());
    assert_eq!(
      lines,
      vec![
        "\td0 = 5",
        "\tstack.push(d0)",
        "\td0 = 2",
        "\td0 -= stack.pop()",
        "\td0 = -d0",
      ]
    );
  }

  #[test]
  fn division_reorders_through_scratch() {
    let lines = emit_with("8/2", |c| c.expression());
    assert_eq!(
      lines,
      vec![
        "\td0 = 8",
        "\tstack.push(d0)",
        "\td0 = 2",
        "\td1 = d0",
        "\td0 = stack.pop()",
        "\td0 /= d1",
      ]
    );
  }

  #[test]
  fn multiplication_binds_tighter_than_addition() {
    let lines = emit_with("1+2*3", |c| c.expression());
    assert_eq!(
      lines,
      vec![
        "\td0 = 1",
        "\tstack.push(d0)",
        "\td0 = 2",
        "\tstack.push(d0)",
        "\td0 = 3",
        "\td0 *= stack.pop()",
        "\td0 += stack.pop()",
      ]
    );
  }

  #[test]
  fn unary_minus_is_negate_after_load() {
    let lines = emit_with("-7", |c| c.expression());
    assert_eq!(lines, vec!["\td0 = 7", "\td0 = -d0"]);
  }

  #[test]
  fn bare_relation_keeps_the_raw_value() {
    let lines = emit_with("3", |c| c.bool_expression());
    assert_eq!(lines, vec!["\td0 = 3"]);
  }

  #[test]
  fn relation_with_relop_normalizes() {
    let lines = emit_with("1<2", |c| c.bool_expression());
    assert_eq!(
      lines,
      vec![
        "\td0 = 1",
        "\tstack.push(d0)",
        "\td0 = 2",
        "\td0 = if stack.pop() < d0 { -1 } else { 0 }",
      ]
    );
  }

  #[test]
  fn while_emits_loop_condition_break_body_close() {
    let mut out = String::new();
    compile("VAR X = 0 BEGIN WHILE X < 3 X = X + 1 ENDWHILE END.", &mut out).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "\tvars[\"X\"] = 0");
    assert_eq!(lines[1], "\tloop {");
    // Condition: load X, push, load 3, compare, then the conditional break.
    assert_eq!(lines[5], "\td0 = if stack.pop() < d0 { -1 } else { 0 }");
    assert_eq!(lines[6], "\tif d0 == 0 { break }");
    assert_eq!(lines.last().unwrap(), &"\t}");
  }

  #[test]
  fn undeclared_assignment_is_rejected() {
    let err = compile("BEGIN X = 1 END.", String::new()).unwrap_err();
    assert!(matches!(err, CompileError::UndefinedIdentifier { name } if name == "X"));
  }

  #[test]
  fn duplicate_declaration_stops_before_emitting() {
    let mut out = String::new();
    let err = compile("VAR X, X BEGIN END.", &mut out).unwrap_err();
    assert!(matches!(err, CompileError::DuplicateIdentifier { .. }));
    // Only the first declaration made it out.
    assert_eq!(out, "\tvars[\"X\"] = 0\n");
  }

  #[test]
  fn stray_top_level_token_is_unrecognized() {
    let err = compile("FOO BEGIN END.", String::new()).unwrap_err();
    assert!(matches!(err, CompileError::UnrecognizedKeyword { lexeme } if lexeme == "FOO"));
  }

  #[test]
  fn mismatched_terminator_names_the_expected_one() {
    let err = compile("VAR X BEGIN IF X > 1 X = 1 ENDWHILE END.", String::new()).unwrap_err();
    match err {
      CompileError::Expected { wanted, got } => {
        assert_eq!(wanted, "\"ENDIF\"");
        assert_eq!(got, "ENDWHILE");
      }
      other => panic!("wrong error: {other:?}"),
    }
  }

  #[test]
  fn missing_end_is_reported_at_the_sentinel() {
    let err = compile("BEGIN .", String::new()).unwrap_err();
    match err {
      CompileError::Expected { wanted, .. } => assert_eq!(wanted, "\"END\""),
      other => panic!("wrong error: {other:?}"),
    }
  }

  #[test]
  fn declarations_are_legal_inside_blocks() {
    let mut out = String::new();
    compile("BEGIN VAR X = 2 X = X * 2 END.", &mut out).unwrap();
    assert!(out.starts_with("\tvars[\"X\"] = 2\n"));
  }

  #[test]
  fn compiling_twice_gives_identical_output() {
    let source = "VAR A = 1 BEGIN WHILE A < 9 A = A + A ENDWHILE WRITE(A) END.";
    let mut first = String::new();
    let mut second = String::new();
    compile(source, &mut first).unwrap();
    compile(source, &mut second).unwrap();
    assert_eq!(first, second);
  }
}
