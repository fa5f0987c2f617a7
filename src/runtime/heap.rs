// Heap
// ----
//
// Two semi-spaces of `heap_size` pairs each, two words per pair. The
// allocator bumps `free` upward through the from-space; when it hits the
// end, a Cheney collection copies the live graph into the other space and
// the roles swap. Roots are the live spine-stack slots plus up to two
// caller-supplied save slots, whose references are rewritten to the new
// locations.
//
// A collected pair leaves a forwarding marker behind: its car becomes
// COPIED and its cdr the new location. While copying a pair whose car is
// I, the cdr is chased through any further from-space I pairs and the
// endpoint written instead, so indirection chains cannot grow across
// collections.
//
// Growth runs on two sizes: `heap_size` is what both spaces currently
// hold, `next_heap_size` is what the next fresh space will get. After a
// collection that changed size, or whenever the survivors exceed 1/8 of
// the next size, the new size is committed and the off-space discarded;
// otherwise the off-space is kept around for the next cycle.

use std::time::{Duration, Instant};

use crate::runtime::cell::*;
use crate::runtime::stack::Stack;

pub const INITIAL_HEAP_SIZE: usize = 128 * 1024;

pub struct Heap {
  space: Vec<Cell>,        // from-space, bump-allocated
  spare: Option<Vec<Cell>>, // retained off-space, reused while the size is stable
  free: usize,             // next free word in `space`
  pub heap_size: usize,      // current capacity, in pairs
  pub next_heap_size: usize, // capacity of the next fresh space, in pairs
  pub gc_notify: bool,
  pub gc_time: Duration,
  pub collections: u64,
}

fn new_space(pairs: usize) -> Result<Vec<Cell>, String> {
  let words = pairs * 2;
  let mut space = Vec::new();
  space
    .try_reserve_exact(words)
    .map_err(|_| format!("cannot allocate heap storage ({} cells)", pairs))?;
  space.resize(words, UNUSED);
  Ok(space)
}

impl Heap {
  pub fn new(size: usize) -> Result<Heap, String> {
    Ok(Heap {
      space: new_space(size)?,
      spare: None,
      free: 0,
      heap_size: size,
      next_heap_size: size * 3 / 2,
      gc_notify: false,
      gc_time: Duration::ZERO,
      collections: 0,
    })
  }

  pub fn car(&self, c: Cell) -> Cell {
    debug_assert!(c.is_pair());
    self.space[c.loc()]
  }

  pub fn cdr(&self, c: Cell) -> Cell {
    debug_assert!(c.is_pair());
    self.space[c.loc() + 1]
  }

  pub fn set(&mut self, c: Cell, fst: Cell, snd: Cell) {
    debug_assert!(c.is_pair());
    self.space[c.loc()] = fst;
    self.space[c.loc() + 1] = snd;
  }

  pub fn set_car(&mut self, c: Cell, fst: Cell) {
    debug_assert!(c.is_pair());
    self.space[c.loc()] = fst;
  }

  pub fn set_cdr(&mut self, c: Cell, snd: Cell) {
    debug_assert!(c.is_pair());
    self.space[c.loc() + 1] = snd;
  }

  pub fn pairs_alive(&self) -> usize {
    self.free / 2
  }

  /// Allocate one pair. May collect, relocating `fst` and `snd` before
  /// they are stored.
  pub fn pair(&mut self, mut fst: Cell, mut snd: Cell, stack: &mut Stack) -> Result<Cell, String> {
    while self.free + 2 > self.space.len() {
      self.collect(stack, [Some(&mut fst), Some(&mut snd)])?;
    }
    let at = self.free;
    self.free += 2;
    self.space[at] = fst;
    self.space[at + 1] = snd;
    Ok(Cell::pair(at))
  }

  /// Reserve `n` contiguous pairs and return the first. The caller must
  /// fill every field before the next allocation.
  pub fn alloc(&mut self, n: usize, stack: &mut Stack) -> Result<Cell, String> {
    while self.free + 2 * n > self.space.len() {
      self.collect(stack, [None, None])?;
    }
    let at = self.free;
    self.free += 2 * n;
    Ok(Cell::pair(at))
  }

  /// Force a collection, rewriting the stack roots and up to two caller
  /// references to their new locations.
  pub fn collect(&mut self, stack: &mut Stack, mut saves: [Option<&mut Cell>; 2]) -> Result<(), String> {
    let start = Instant::now();

    let to = match self.spare.take() {
      Some(space) => space,
      None => new_space(self.next_heap_size)?,
    };
    let mut from = std::mem::replace(&mut self.space, to);
    self.free = 0;

    for slot in stack.live_mut() {
      *slot = self.copy_cell(&mut from, *slot);
    }
    for save in saves.iter_mut().flatten() {
      **save = self.copy_cell(&mut from, **save);
    }
    let mut scan = 0;
    while scan < self.free {
      let field = self.space[scan];
      self.space[scan] = self.copy_cell(&mut from, field);
      scan += 1;
    }

    let num_alive = self.free / 2;
    if self.gc_notify {
      eprintln!("GC: {} / {}", num_alive, self.heap_size);
    }

    if self.heap_size != self.next_heap_size || num_alive * 8 > self.next_heap_size {
      self.heap_size = self.next_heap_size;
      if num_alive * 8 > self.next_heap_size {
        self.next_heap_size = num_alive * 8;
      }
      // `from` drops here; the next cycle allocates at the committed size
    } else {
      self.spare = Some(from);
    }

    self.gc_time += start.elapsed();
    self.collections += 1;
    Ok(())
  }

  fn copy_cell(&mut self, from: &mut [Cell], c: Cell) -> Cell {
    if !c.is_pair() {
      return c;
    }
    let at = c.loc();
    if from[at] == COPIED {
      return from[at + 1];
    }
    let dst = self.free;
    self.free += 2;
    let head = from[at];
    self.space[dst] = head;
    if head == I {
      let mut tail = from[at + 1];
      while tail.is_pair() && from[tail.loc()] == I {
        tail = from[tail.loc() + 1];
      }
      self.space[dst + 1] = tail;
    } else {
      self.space[dst + 1] = from[at + 1];
    }
    from[at] = COPIED;
    from[at + 1] = Cell::pair(dst);
    Cell::pair(dst)
  }
}
