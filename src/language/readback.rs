// Readback
// ========
//
// Prints a combinator graph in bracketed prefix form: ` marks an
// application of the next expression to the one after it, combinators
// print as their names, and anything else as ?.

use crate::runtime::cell::*;
use crate::runtime::heap::Heap;

pub fn as_code(heap: &Heap, term: Cell) -> String {
  let mut out = String::new();
  go(heap, term, &mut out);
  out
}

fn go(heap: &Heap, term: Cell, out: &mut String) {
  if term.is_pair() {
    out.push('`');
    go(heap, heap.car(term), out);
    go(heap, heap.cdr(term), out);
    return;
  }
  match term {
    S => out.push('S'),
    K => out.push('K'),
    I => out.push('I'),
    B => out.push('B'),
    C => out.push('C'),
    SP => out.push_str("S'"),
    BS => out.push_str("B*"),
    CP => out.push_str("C'"),
    KI => out.push_str("`ki"),
    _ => out.push('?'),
  }
}
