// Bracket abstraction
// ===================
//
// Compiles the lambda tree into a combinator expression. `translate`
// walks the tree; `unabstract` removes the innermost binder, producing a
// term that, applied to any v, behaves like the body with v substituted
// for index 0 and every other index decremented.
//
// The peephole rules fire while the expression is being built, rewriting
// the S-expansion into B, C, S', B* and C' forms. The rewrites mutate
// pairs in place; every pair they touch was just produced by `unabstract`
// and is not yet shared.
//
// Intermediate results live on the spine stack, never in locals across an
// allocation: any `pair` call can move the whole heap.

use crate::runtime::cell::*;
use crate::runtime::Runtime;

pub fn translate(rt: &mut Runtime, t: Cell) -> Result<Cell, String> {
  if !t.is_pair() {
    return Ok(t);
  }
  if rt.heap.car(t) == LAMBDA {
    let body = rt.heap.cdr(t);
    let body = translate(rt, body)?;
    return unabstract(rt, body);
  }
  let argm = rt.heap.cdr(t);
  rt.stack.push(argm)?;
  let func = rt.heap.car(t);
  let func = translate(rt, func)?;
  rt.stack.push(func)?;
  let argm = rt.stack.peek(1);
  let argm = translate(rt, argm)?;
  let func = rt.stack.top();
  let term = rt.pair(func, argm)?;
  rt.stack.drop_n(2);
  Ok(term)
}

fn is_k1(rt: &Runtime, x: Cell) -> bool {
  x.is_pair() && rt.heap.car(x) == K
}

fn is_b2(rt: &Runtime, x: Cell) -> bool {
  x.is_pair() && {
    let f = rt.heap.car(x);
    f.is_pair() && rt.heap.car(f) == B
  }
}

pub fn unabstract(rt: &mut Runtime, t: Cell) -> Result<Cell, String> {
  if t.is_int() {
    if t == Cell::int(0) {
      return Ok(I);
    }
    return rt.pair(K, Cell::int(t.int_val() - 1));
  }
  if !t.is_pair() {
    return rt.pair(K, t);
  }

  let argm = rt.heap.cdr(t);
  rt.stack.push(argm)?;
  let func = rt.heap.car(t);
  let func = unabstract(rt, func)?;
  rt.stack.push(func)?;
  let g = {
    let argm = rt.stack.peek(1);
    unabstract(rt, argm)?
  };
  rt.stack.set_peek(1, g);
  let f = rt.stack.top();

  let out;
  if is_k1(rt, f) {
    if g == I {
      // S (K x) I => x
      out = rt.heap.cdr(f);
    } else if is_k1(rt, g) {
      // S (K x) (K y) => K (x y)
      let x = rt.heap.cdr(f);
      rt.heap.set_car(g, x); // x y
      rt.heap.set_cdr(f, g); // K (x y)
      out = f;
    } else if is_b2(rt, g) {
      // S (K x) (B y z) => B* x y z
      rt.heap.set_car(f, BS); // B* x
      let gy = rt.heap.car(g);
      rt.heap.set_car(gy, f); // B* x y z
      out = g;
    } else {
      // S (K x) y => B x y
      rt.heap.set_car(f, B); // B x
      out = rt.pair(f, g)?; // B x y
    }
  } else if is_k1(rt, g) {
    if is_b2(rt, f) {
      // S (B x y) (K z) => C' x y z
      let fx = rt.heap.car(f);
      rt.heap.set_car(fx, CP);
      rt.heap.set_car(g, f);
      out = g;
    } else {
      // S x (K y) => C x y
      let y = rt.heap.cdr(g);
      let x = rt.stack.top();
      rt.heap.set(g, C, x); // C x
      out = rt.pair(g, y)?; // C x y
    }
  } else if is_b2(rt, f) {
    // S (B x y) z => S' x y z
    let fx = rt.heap.car(f);
    rt.heap.set_car(fx, SP); // S' x y
    out = rt.pair(f, g)?; // S' x y z
  } else {
    // S x y
    let sf = rt.pair(S, f)?;
    let g = rt.stack.peek(1);
    out = rt.pair(sf, g)?;
  }
  rt.stack.drop_n(2);
  Ok(out)
}
