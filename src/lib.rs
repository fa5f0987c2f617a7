pub mod language;
pub mod runtime;

pub use language::{load_program, readback, syntax};
pub use runtime::{
  eval, eval_print, Cell, Heap, Input, Output, Runtime, Stack, INITIAL_HEAP_SIZE, STACK_SIZE,
};
