// Debug
// -----

use crate::runtime::cell::*;
use crate::runtime::heap::Heap;

pub fn show_cell(c: Cell) -> String {
  if c.is_pair() {
    return format!("Pair({:#06x})", c.loc());
  }
  if c.is_int() {
    return format!("Int({})", c.int_val());
  }
  if c.is_char() {
    return format!("Char({})", c.char_val());
  }
  if c.is_comb() {
    let name = match c {
      S => "S",
      K => "K",
      I => "I",
      B => "B",
      C => "C",
      SP => "S'",
      BS => "B*",
      CP => "C'",
      IOTA => "iota",
      KI => "ki",
      READ => "READ",
      WRITE => "WRITE",
      INC => "INC",
      CONS => "CONS",
      PUTC => "PUTC",
      RETURN => "RETURN",
      _ => "?",
    };
    return format!("Comb({})", name);
  }
  match c {
    NIL => "Nil".to_string(),
    COPIED => "Copied".to_string(),
    UNUSED => "Unused".to_string(),
    LAMBDA => "Lambda".to_string(),
    _ => format!("Imm({:#x})", c.0),
  }
}

/// Walks the graph under `root`, panicking on anything a collection must
/// never leave behind: a GC marker in a live field, or an I pair whose
/// target is another I pair.
pub fn validate_graph(heap: &Heap, root: Cell) {
  let mut seen = std::collections::HashSet::new();
  let mut todo = vec![root];
  while let Some(c) = todo.pop() {
    if !c.is_pair() || !seen.insert(c.loc()) {
      continue;
    }
    let car = heap.car(c);
    let cdr = heap.cdr(c);
    for field in [car, cdr] {
      if field == COPIED || field == UNUSED {
        panic!("live pair at {:#06x} holds {}", c.loc(), show_cell(field));
      }
    }
    if car == I && cdr.is_pair() && heap.car(cdr) == I {
      panic!("uncompressed indirection chain at {:#06x}", c.loc());
    }
    todo.push(car);
    todo.push(cdr);
  }
}
