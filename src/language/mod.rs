pub mod parser;
pub mod readback;
pub mod syntax;
pub mod translate;

use crate::runtime::{Cell, Runtime};

/// Parse the bit-encoded program off the input stream and compile it to a
/// combinator expression.
pub fn load_program(rt: &mut Runtime) -> Result<Cell, String> {
  let tree = parser::parse(rt)?;
  translate::translate(rt, tree)
}
