//! Code emission: one target-runtime instruction per line, written the
//! moment the parser decides on it. There is no buffering pass and no
//! rollback, so a parse error after partial emission leaves partial output.
//!
//! The target is a small stack-and-accumulator machine: `d0` is the working
//! register, `d1` a scratch register for non-commutative operators, `stack`
//! a LIFO of integers and `vars` the variable store. Binary operators
//! always find their left operand on the stack and their right operand in
//! `d0`; subtraction and division re-correct the order (subtract then
//! negate, or park the divisor in `d1`).

/// Destination for emitted code, one line at a time. Injected so tests can
/// capture output without touching process I/O.
pub trait Sink {
  fn accept(&mut self, line: &str);
}

impl Sink for String {
  fn accept(&mut self, line: &str) {
    self.push_str(line);
    self.push('\n');
  }
}

impl Sink for Vec<String> {
  fn accept(&mut self, line: &str) {
    self.push(line.to_string());
  }
}

impl<S: Sink + ?Sized> Sink for &mut S {
  fn accept(&mut self, line: &str) {
    (**self).accept(line);
  }
}

/// Comparison instructions the relational grammar can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}

impl Cmp {
  fn symbol(self) -> &'static str {
    match self {
      Cmp::Eq => "==",
      Cmp::Ne => "!=",
      Cmp::Lt => "<",
      Cmp::Le => "<=",
      Cmp::Gt => ">",
      Cmp::Ge => ">=",
    }
  }
}

pub struct Emitter<S: Sink> {
  sink: S,
}

impl<S: Sink> Emitter<S> {
  pub fn new(sink: S) -> Self {
    Self { sink }
  }

  /// Hand the sink back, e.g. to inspect captured output.
  pub fn into_sink(self) -> S {
    self.sink
  }

  /// Every instruction carries the same fixed indentation prefix.
  fn line(&mut self, text: &str) {
    self.sink.accept(&format!("\t{text}"));
  }

  // -- loads and stores --------------------------------------------------

  pub fn load_const(&mut self, digits: &str) {
    self.line(&format!("d0 = {digits}"));
  }

  pub fn load_bool(&mut self, value: bool) {
    self.line(if value { "d0 = -1" } else { "d0 = 0" });
  }

  pub fn load_var(&mut self, name: &str) {
    self.line(&format!("d0 = vars[\"{name}\"]"));
  }

  pub fn store(&mut self, name: &str) {
    self.line(&format!("vars[\"{name}\"] = d0"));
  }

  /// Declaration-time initialization, straight from the literal.
  pub fn init_var(&mut self, name: &str, negative: bool, digits: &str) {
    let sign = if negative { "-" } else { "" };
    self.line(&format!("vars[\"{name}\"] = {sign}{digits}"));
  }

  // -- arithmetic --------------------------------------------------------

  pub fn negate(&mut self) {
    self.line("d0 = -d0");
  }

  pub fn push(&mut self) {
    self.line("stack.push(d0)");
  }

  pub fn pop_add(&mut self) {
    self.line("d0 += stack.pop()");
  }

  /// The stack holds the left operand, so subtract and flip the sign.
  pub fn pop_sub(&mut self) {
    self.line("d0 -= stack.pop()");
    self.negate();
  }

  pub fn pop_mul(&mut self) {
    self.line("d0 *= stack.pop()");
  }

  /// Park the divisor in the scratch register, pop the dividend back into
  /// the accumulator, then divide. Truncates toward zero.
  pub fn pop_div(&mut self) {
    self.line("d1 = d0");
    self.line("d0 = stack.pop()");
    self.line("d0 /= d1");
  }

  // -- boolean and relational --------------------------------------------
  //
  // Producers normalize: every instruction here yields -1 or 0 and tests
  // its operands against zero, so raw arithmetic values are accepted.

  pub fn logical_not(&mut self) {
    self.line("d0 = if d0 == 0 { -1 } else { 0 }");
  }

  pub fn pop_and(&mut self) {
    self.line("d0 = if stack.pop() != 0 && d0 != 0 { -1 } else { 0 }");
  }

  pub fn pop_or(&mut self) {
    self.line("d0 = if stack.pop() != 0 || d0 != 0 { -1 } else { 0 }");
  }

  pub fn pop_xor(&mut self) {
    self.line("d0 = if (stack.pop() != 0) != (d0 != 0) { -1 } else { 0 }");
  }

  pub fn pop_compare(&mut self, cmp: Cmp) {
    let op = cmp.symbol();
    self.line(&format!("d0 = if stack.pop() {op} d0 {{ -1 }} else {{ 0 }}"));
  }

  // -- control flow ------------------------------------------------------

  pub fn if_open(&mut self) {
    self.line("if d0 != 0 {");
  }

  pub fn else_open(&mut self) {
    self.line("} else {");
  }

  pub fn close(&mut self) {
    self.line("}");
  }

  pub fn loop_open(&mut self) {
    self.line("loop {");
  }

  pub fn break_if_false(&mut self) {
    self.line("if d0 == 0 { break }");
  }

  pub fn break_if_true(&mut self) {
    self.line("if d0 != 0 { break }");
  }

  pub fn break_out(&mut self) {
    self.line("break");
  }

  // -- counted-loop plumbing ---------------------------------------------

  pub fn increment(&mut self) {
    self.line("d0 += 1");
  }

  pub fn decrement(&mut self) {
    self.line("d0 -= 1");
  }

  /// Counted-range exit test: the loop limit sits on top of the stack.
  pub fn break_if_above_top(&mut self) {
    self.line("if d0 > stack.last() { break }");
  }

  /// Fixed-repetition exit test for an exhausted counter.
  pub fn break_if_nonpositive(&mut self) {
    self.line("if d0 <= 0 { break }");
  }

  pub fn pop_acc(&mut self) {
    self.line("d0 = stack.pop()");
  }

  /// Discard the top of the stack without touching the accumulator.
  pub fn drop_top(&mut self) {
    self.line("stack.pop()");
  }

  // -- input/output ------------------------------------------------------

  pub fn read_input(&mut self) {
    self.line("d0 = read()");
  }

  pub fn print_acc(&mut self) {
    self.line("print(d0)");
  }
}
