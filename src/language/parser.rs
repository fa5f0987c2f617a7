// Parser
// ======
//
// Decodes the UL bit grammar into a lambda tree of heap cells:
//
//   term := '1' '1'*k '0'     variable with de Bruijn index k
//         | '01' term term    application
//         | '00' term         abstraction
//
// Variables become Int cells, applications become pairs whose car is not
// LAMBDA, abstractions become (LAMBDA, body) pairs. A half-built subterm
// is pushed onto the spine stack across the nested `pair` call, so a
// collection triggered while parsing the sibling cannot lose it.

use crate::runtime::cell::{Cell, LAMBDA};
use crate::runtime::Runtime;

pub fn parse(rt: &mut Runtime) -> Result<Cell, String> {
  if rt.input.read_bit()? {
    // variable
    let mut index = 0;
    while rt.input.read_bit()? {
      index += 1;
    }
    return Ok(Cell::int(index));
  }
  if rt.input.read_bit()? {
    // application
    let func = parse(rt)?;
    rt.stack.push(func)?;
    let argm = parse(rt)?;
    let func = rt.stack.top();
    let term = rt.pair(func, argm)?;
    rt.stack.pop();
    return Ok(term);
  }
  // abstraction
  let body = parse(rt)?;
  rt.pair(LAMBDA, body)
}
