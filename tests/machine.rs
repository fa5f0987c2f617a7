// Unit-level coverage of the cell model, the spine stack, the copying
// collector and the bracket-abstraction peepholes.

use clamb::language::{readback, translate};
use clamb::runtime::debug::validate_graph;
use clamb::runtime::{cell, Cell, Heap, Input, Output, Runtime, Stack, STACK_SIZE};

use cell::{COPIED, I, K, KI, LAMBDA, NIL, RETURN, S};

fn test_runtime(heap_size: usize) -> Runtime {
  Runtime::new(heap_size, Input::from_bytes(Vec::new()), Output::captured()).unwrap()
}

// Cells
// -----

#[test]
fn tags_discriminate() {
  let cases = [Cell::int(5), Cell::int(-5), Cell::chr(0), Cell::chr(255), S, RETURN, NIL, LAMBDA];
  for (i, a) in cases.iter().enumerate() {
    assert!(!a.is_pair());
    for b in cases.iter().skip(i + 1) {
      assert_ne!(a, b);
    }
  }
  assert!(Cell::pair(42).is_pair());
  assert_eq!(Cell::pair(42).loc(), 42);
}

#[test]
fn ints_are_signed() {
  assert_eq!(Cell::int(0).int_val(), 0);
  assert_eq!(Cell::int(12345).int_val(), 12345);
  assert_eq!(Cell::int(-1).int_val(), -1);
  assert_eq!(Cell::int(-12345).int_val(), -12345);
}

#[test]
fn chars_carry_the_full_byte_range() {
  for c in [0u32, 1, 65, 255, 256] {
    assert_eq!(Cell::chr(c).char_val(), c);
    assert!(Cell::chr(c).is_char());
  }
}

// Spine stack
// -----------

#[test]
fn stack_pushes_and_peeks() {
  let mut stack = Stack::new();
  stack.push(S).unwrap();
  stack.push(K).unwrap();
  stack.push(I).unwrap();
  assert_eq!(stack.top(), I);
  assert_eq!(stack.peek(1), K);
  assert_eq!(stack.peek(2), S);
  assert_eq!(stack.pop(), I);
  stack.drop_n(2);
  assert_eq!(stack.sp(), STACK_SIZE);
  assert_eq!(stack.max_depth(), 3);
}

#[test]
fn stack_overflow_is_fatal() {
  let mut stack = Stack::new();
  for _ in 0..STACK_SIZE {
    stack.push(NIL).unwrap();
  }
  let err = stack.push(NIL).unwrap_err();
  assert_eq!(err, "runtime error: stack overflow");
}

// Input sources
// -------------

#[test]
fn input_chains_files_in_order() {
  let dir = std::env::temp_dir();
  let first = dir.join(format!("clamb-input-a-{}", std::process::id()));
  let second = dir.join(format!("clamb-input-b-{}", std::process::id()));
  std::fs::write(&first, [0b1010_0000, b'!']).unwrap();
  std::fs::write(&second, b"Z").unwrap();

  // stdin sits behind the files; reading exactly the file bytes never
  // touches it
  let mut input = Input::open(&[first.clone(), second.clone()]).unwrap();
  assert!(input.read_bit().unwrap());
  assert!(!input.read_bit().unwrap());
  // byte reads abandon the partial byte and cross the file boundary
  assert_eq!(input.read_byte().unwrap(), Some(b'!'));
  assert_eq!(input.read_byte().unwrap(), Some(b'Z'));

  std::fs::remove_file(&first).unwrap();
  std::fs::remove_file(&second).unwrap();
}

#[test]
fn unopenable_file_is_fatal() {
  let missing = std::env::temp_dir().join(format!("clamb-missing-{}", std::process::id()));
  let err = Input::open(&[missing.clone()]).unwrap_err();
  assert_eq!(err, format!("cannot open {}", missing.display()));
}

// Collector
// ---------

#[test]
fn collection_preserves_structure_and_sharing() {
  let mut heap = Heap::new(512).unwrap();
  let mut stack = Stack::new();

  let inner = heap.pair(S, K, &mut stack).unwrap();
  let outer = heap.pair(inner, inner, &mut stack).unwrap();
  stack.push(outer).unwrap();

  heap.collect(&mut stack, [None, None]).unwrap();

  let outer = stack.top();
  let left = heap.car(outer);
  let right = heap.cdr(outer);
  assert_eq!(left, right, "sharing must survive the copy");
  assert_eq!(heap.car(left), S);
  assert_eq!(heap.cdr(left), K);
  validate_graph(&heap, outer);
}

#[test]
fn collection_updates_save_slots() {
  let mut heap = Heap::new(512).unwrap();
  let mut stack = Stack::new();

  let mut a = heap.pair(K, NIL, &mut stack).unwrap();
  let mut b = heap.pair(I, a, &mut stack).unwrap();
  heap.collect(&mut stack, [Some(&mut a), Some(&mut b)]).unwrap();

  assert_eq!(heap.car(a), K);
  assert_eq!(heap.cdr(b), a, "save slots must agree after relocation");
  assert_ne!(heap.car(a), COPIED);
}

#[test]
fn collection_compresses_indirection_chains() {
  let mut heap = Heap::new(512).unwrap();
  let mut stack = Stack::new();

  let target = heap.pair(S, K, &mut stack).unwrap();
  let mut chain = target;
  for _ in 0..8 {
    chain = heap.pair(I, chain, &mut stack).unwrap();
  }
  stack.push(chain).unwrap();

  heap.collect(&mut stack, [None, None]).unwrap();

  let chain = stack.top();
  assert_eq!(heap.car(chain), I);
  let tail = heap.cdr(chain);
  assert!(tail.is_pair());
  assert_eq!(heap.car(tail), S, "chain should collapse straight to the endpoint");
  validate_graph(&heap, chain);
}

#[test]
fn unreachable_cells_are_discarded() {
  let mut heap = Heap::new(512).unwrap();
  let mut stack = Stack::new();

  for _ in 0..100 {
    heap.pair(S, K, &mut stack).unwrap();
  }
  let keep = heap.pair(K, I, &mut stack).unwrap();
  stack.push(keep).unwrap();

  heap.collect(&mut stack, [None, None]).unwrap();
  assert_eq!(heap.pairs_alive(), 1);
}

#[test]
fn heap_grows_under_load() {
  let mut heap = Heap::new(512).unwrap();
  let mut stack = Stack::new();
  assert_eq!(heap.heap_size, 512);
  assert_eq!(heap.next_heap_size, 768);

  // fill with garbage until the first demand collection
  for _ in 0..600 {
    heap.pair(S, K, &mut stack).unwrap();
  }
  assert_eq!(heap.collections, 1);
  assert_eq!(heap.heap_size, 768, "first collection commits the staged 1.5x size");
  assert_eq!(heap.next_heap_size, 768);

  // now with a large live set: survivors over 1/8 of capacity schedule 8x
  let mut live = NIL;
  for _ in 0..200 {
    stack.push(live).unwrap();
    let top = stack.top();
    live = heap.pair(K, top, &mut stack).unwrap();
    stack.pop();
  }
  stack.push(live).unwrap();
  heap.collect(&mut stack, [None, None]).unwrap();
  assert_eq!(heap.heap_size, 768);
  assert_eq!(heap.next_heap_size, 200 * 8);
}

// Reducer odds and ends
// ---------------------

#[test]
fn iota_expands_to_s_and_k() {
  let mut rt = test_runtime(512);
  let root = rt.pair(cell::IOTA, K).unwrap();
  clamb::eval(&mut rt, root).unwrap();
  // iota K -> K S K -> S
  assert_eq!(rt.stack.top(), S);
}

#[test]
fn read_at_eof_is_the_empty_list() {
  let mut rt = test_runtime(512);
  let read = rt.pair(cell::READ, NIL).unwrap();
  rt.stack.push(read).unwrap();
  let top = rt.stack.top();
  let root = rt.pair(top, RETURN).unwrap();
  rt.stack.pop();
  clamb::eval(&mut rt, root).unwrap();
  assert_eq!(rt.stack.top(), KI);
}

// Bracket abstraction peepholes
// -----------------------------
//
// Each case feeds `unabstract` a hand-built body tree and checks the
// printed result. Int cells are de Bruijn indices; raw combinators stand
// for already-compiled subterms.

fn unabstracted(build: impl Fn(&mut Runtime) -> Cell) -> String {
  let mut rt = test_runtime(4096);
  let tree = build(&mut rt);
  let out = translate::unabstract(&mut rt, tree).unwrap();
  readback::as_code(&rt.heap, out)
}

#[test]
fn unabstract_innermost_variable() {
  assert_eq!(unabstracted(|_| Cell::int(0)), "I");
}

#[test]
fn unabstract_outer_variable() {
  let mut rt = test_runtime(512);
  let out = translate::unabstract(&mut rt, Cell::int(3)).unwrap();
  assert_eq!(rt.heap.car(out), K);
  assert_eq!(rt.heap.cdr(out), Cell::int(2));
}

#[test]
fn unabstract_constant() {
  assert_eq!(unabstracted(|_| S), "`KS");
}

#[test]
fn peephole_k_of_application() {
  // S (K x) (K y) => K (x y)
  assert_eq!(unabstracted(|rt| rt.pair(S, K).unwrap()), "`K`SK");
}

#[test]
fn peephole_drop_identity_argument() {
  // S (K x) I => x
  assert_eq!(unabstracted(|rt| rt.pair(S, Cell::int(0)).unwrap()), "S");
}

#[test]
fn peephole_b() {
  // S (K x) g => B x g
  assert_eq!(
    unabstracted(|rt| {
      let self_app = rt.pair(Cell::int(0), Cell::int(0)).unwrap();
      rt.pair(S, self_app).unwrap()
    }),
    "``BS``SII"
  );
}

#[test]
fn peephole_b_star() {
  // S (K x) (B y z) => B* x y z
  assert_eq!(
    unabstracted(|rt| {
      let self_app = rt.pair(Cell::int(0), Cell::int(0)).unwrap();
      let b_shape = rt.pair(S, self_app).unwrap();
      rt.pair(S, b_shape).unwrap()
    }),
    "```B*SS``SII"
  );
}

#[test]
fn peephole_c() {
  // S f (K y) => C f y
  assert_eq!(
    unabstracted(|rt| {
      let self_app = rt.pair(Cell::int(0), Cell::int(0)).unwrap();
      rt.pair(self_app, S).unwrap()
    }),
    "``C``SIIS"
  );
}

#[test]
fn peephole_c_prime() {
  // S (B x y) (K z) => C' x y z
  assert_eq!(
    unabstracted(|rt| {
      let self_app = rt.pair(Cell::int(0), Cell::int(0)).unwrap();
      let b_shape = rt.pair(S, self_app).unwrap();
      rt.pair(b_shape, S).unwrap()
    }),
    "```C'S``SIIS"
  );
}

#[test]
fn peephole_s_prime() {
  // S (B x y) g => S' x y g
  assert_eq!(
    unabstracted(|rt| {
      let self_app = rt.pair(Cell::int(0), Cell::int(0)).unwrap();
      let b_shape = rt.pair(S, self_app).unwrap();
      let self_app = rt.pair(Cell::int(0), Cell::int(0)).unwrap();
      rt.pair(b_shape, self_app).unwrap()
    }),
    "```S'S``SII``SII"
  );
}

#[test]
fn peephole_default_s() {
  assert_eq!(unabstracted(|rt| rt.pair(Cell::int(0), Cell::int(0)).unwrap()), "``SII");
}

#[test]
fn unused_marker_never_escapes_a_collection() {
  let mut rt = test_runtime(256);
  // churn enough to force several collections while a graph stays live
  let mut live = rt.pair(S, K).unwrap();
  for _ in 0..2000 {
    rt.stack.push(live).unwrap();
    let top = rt.stack.top();
    rt.pair(top, top).unwrap();
    live = rt.stack.pop();
  }
  rt.stack.push(live).unwrap();
  rt.heap.collect(&mut rt.stack, [None, None]).unwrap();
  assert!(rt.heap.collections >= 2);
  validate_graph(&rt.heap, rt.stack.top());
}
