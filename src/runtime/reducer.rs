// Reducer
// -------
//
// Lazy normal-order graph reduction driven by the spine stack. Each loop
// iteration unwinds the left spine of the top cell, then dispatches on the
// head. A rule reads its arguments out of the pair nodes below the head,
// drops the nodes it consumed and rewrites the topmost surviving pair in
// place, so a shared redex is reduced at most once. Rules that rewrite to
// an `I x` head follow the indirection immediately, keeping chains short.
//
// `pair` and `alloc` can both trigger a collection that relocates every
// pair, so a rule allocates first and only then reads its arguments back
// off the (freshly rewritten) stack. No pair reference is ever cached in
// a local across an allocation.

use crate::runtime::cell::*;
use crate::runtime::Runtime;

fn arg(rt: &Runtime, n: usize) -> Cell {
  rt.heap.cdr(rt.stack.peek(n))
}

/// Reduce the graph rooted at `root` until RETURN or an irreducible head.
/// The result (for the recursive INC/PUTC forcing) is left on the stack.
pub fn eval(rt: &mut Runtime, root: Cell) -> Result<(), String> {
  let bottom = rt.stack.sp();
  rt.stack.push(root)?;

  loop {
    while rt.stack.top().is_pair() {
      let f = rt.heap.car(rt.stack.top());
      rt.stack.push(f)?;
    }

    let top = rt.stack.top();
    let avail = bottom - rt.stack.sp();

    if top == I && avail > 1 {
      // I x -> x
      rt.stack.pop();
      let x = rt.heap.cdr(rt.stack.top());
      rt.stack.set_top(x);
    } else if top == S && avail > 3 {
      // S f g x -> (f x) (g x)
      let a = rt.alloc(2)?;
      let (fx, gx) = (a, a.offset(1));
      rt.heap.set(fx, arg(rt, 1), arg(rt, 3));
      rt.heap.set(gx, arg(rt, 2), arg(rt, 3));
      rt.stack.drop_n(3);
      let root = rt.stack.top();
      rt.heap.set(root, fx, gx);
    } else if top == K && avail > 2 {
      // K x y -> I x
      let x = arg(rt, 1);
      rt.stack.drop_n(2);
      let root = rt.stack.top();
      rt.heap.set(root, I, x);
      rt.stack.set_top(x);
    } else if top == B && avail > 3 {
      // B f g x -> f (g x)
      let gx = rt.pair(arg(rt, 2), arg(rt, 3))?;
      let f = arg(rt, 1);
      rt.stack.drop_n(3);
      let root = rt.stack.top();
      rt.heap.set(root, f, gx);
    } else if top == C && avail > 3 {
      // C f g x -> f x g
      let fx = rt.pair(arg(rt, 1), arg(rt, 3))?;
      let g = arg(rt, 2);
      rt.stack.drop_n(3);
      let root = rt.stack.top();
      rt.heap.set(root, fx, g);
    } else if top == SP && avail > 4 {
      // S' c f g x -> c (f x) (g x)
      let a = rt.alloc(3)?;
      let (fx, gx, cfx) = (a, a.offset(1), a.offset(2));
      rt.heap.set(fx, arg(rt, 2), arg(rt, 4));
      rt.heap.set(gx, arg(rt, 3), arg(rt, 4));
      rt.heap.set(cfx, arg(rt, 1), fx);
      rt.stack.drop_n(4);
      let root = rt.stack.top();
      rt.heap.set(root, cfx, gx);
    } else if top == BS && avail > 4 {
      // B* c f g x -> c (f (g x))
      let a = rt.alloc(2)?;
      let (gx, fgx) = (a, a.offset(1));
      rt.heap.set(gx, arg(rt, 3), arg(rt, 4));
      rt.heap.set(fgx, arg(rt, 2), gx);
      let c = arg(rt, 1);
      rt.stack.drop_n(4);
      let root = rt.stack.top();
      rt.heap.set(root, c, fgx);
    } else if top == CP && avail > 4 {
      // C' c f g x -> c (f x) g
      let a = rt.alloc(2)?;
      let (fx, cfx) = (a, a.offset(1));
      rt.heap.set(fx, arg(rt, 2), arg(rt, 4));
      rt.heap.set(cfx, arg(rt, 1), fx);
      let g = arg(rt, 3);
      rt.stack.drop_n(4);
      let root = rt.stack.top();
      rt.heap.set(root, cfx, g);
    } else if top == IOTA && avail > 1 {
      // iota x -> x S K
      let xs = rt.pair(arg(rt, 1), S)?;
      rt.stack.pop();
      let root = rt.stack.top();
      rt.heap.set(root, xs, K);
    } else if top == KI && avail > 2 {
      // KI x y -> I y
      rt.stack.drop_n(2);
      let root = rt.stack.top();
      rt.heap.set_car(root, I);
    } else if top == CONS && avail > 3 {
      // CONS x y f -> f x y
      let fx = rt.pair(arg(rt, 3), arg(rt, 1))?;
      let y = arg(rt, 2);
      rt.stack.drop_n(3);
      let root = rt.stack.top();
      rt.heap.set(root, fx, y);
    } else if top == READ && avail > 2 {
      // READ _ f -> CONS Char(c) (READ NIL) f, or I KI at end of input
      match rt.input.read_byte()? {
        None => {
          rt.stack.pop();
          let root = rt.stack.top();
          rt.heap.set(root, I, KI);
        }
        Some(c) => {
          let a = rt.alloc(2)?;
          let (cons, rest) = (a, a.offset(1));
          rt.heap.set(cons, CONS, Cell::chr(c as Word));
          rt.heap.set(rest, READ, NIL);
          rt.stack.pop();
          let root = rt.stack.top();
          rt.heap.set(root, cons, rest);
        }
      }
    } else if top == WRITE && avail > 1 {
      // WRITE x -> x PUTC RETURN
      rt.stack.pop();
      let x = rt.heap.cdr(rt.stack.top());
      let xp = rt.pair(x, PUTC)?;
      let root = rt.stack.top();
      rt.heap.set(root, xp, RETURN);
    } else if top == PUTC && avail > 3 {
      // PUTC x y i -> emit eval(x INC 0); WRITE y
      let a = rt.alloc(2)?;
      let (xi, xi0) = (a, a.offset(1));
      rt.heap.set(xi, arg(rt, 1), INC);
      rt.heap.set(xi0, xi, Cell::int(0));
      rt.stack.drop_n(2);
      eval(rt, xi0)?;

      let result = rt.stack.top();
      if !result.is_int() {
        return Err("invalid output format (result was not a number)".to_string());
      }
      let n = result.int_val();
      if !(0..256).contains(&n) {
        return Err(format!("invalid character {}", n));
      }
      rt.output.put(n as u8)?;
      rt.stack.pop();

      let y = rt.heap.cdr(rt.stack.top());
      rt.heap.set_cdr(rt.stack.peek(1), y);
      rt.stack.pop();
      let root = rt.stack.top();
      rt.heap.set_car(root, WRITE);
    } else if top == RETURN {
      return Ok(());
    } else if top == INC && avail > 1 {
      // INC x -> eval(x) + 1
      let x = arg(rt, 1);
      rt.stack.pop();
      eval(rt, x)?;

      let n = rt.stack.pop();
      if !n.is_int() {
        return Err("invalid output format (attempted to apply inc to a non-number)".to_string());
      }
      let root = rt.stack.top();
      rt.heap.set(root, I, Cell::int(n.int_val() + 1));
    } else if top.is_char() && avail > 2 {
      let c = top.char_val();
      if c == 0 {
        // Char(0) f z -> z
        let z = arg(rt, 2);
        rt.stack.drop_n(2);
        let root = rt.stack.top();
        rt.heap.set(root, I, z);
      } else {
        // Char(n+1) f z -> f (Char(n) f z)
        let a = rt.alloc(2)?;
        let (cf, cfz) = (a, a.offset(1));
        let f = arg(rt, 1);
        rt.heap.set(cf, Cell::chr(c - 1), f);
        rt.heap.set(cfz, cf, arg(rt, 2));
        rt.stack.drop_n(2);
        let root = rt.stack.top();
        rt.heap.set(root, f, cfz);
      }
    } else if top.is_int() && avail > 1 {
      return Err("invalid output format (attempted to apply a number)".to_string());
    } else {
      return Ok(());
    }
    rt.reductions += 1;
  }
}

/// Top-level evaluation: wrap the compiled program `p` as
/// `WRITE (p (READ NIL))` and reduce. The program root is pinned on the
/// spine stack while the wrapper is built, since either `pair` may collect.
pub fn eval_print(rt: &mut Runtime, root: Cell) -> Result<(), String> {
  rt.stack.push(root)?;
  let input = rt.pair(READ, NIL)?;
  let p = rt.stack.top();
  let applied = rt.pair(p, input)?;
  rt.stack.set_top(applied);
  let applied = rt.stack.top();
  let wrapped = rt.pair(WRITE, applied)?;
  rt.stack.pop();
  eval(rt, wrapped)
}
