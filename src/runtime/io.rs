// Input and output streams
// ------------------------
//
// Input concatenates every program file and then stdin into a single byte
// stream. The parser consumes it bit by bit, MSB first; once the program
// has been read, any partially consumed byte is abandoned and the reducer's
// READ combinator takes whole bytes from the next byte boundary onward.
//
// Output is a byte-at-a-time sink: buffered stdout by default, unbuffered
// on request, or an in-memory buffer so tests can capture a run.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Stdout, Write};
use std::path::PathBuf;

pub struct Input {
  sources: Vec<Box<dyn Read>>,
  current: usize,
  byte: u8,
  mask: u8,
}

impl std::fmt::Debug for Input {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Input")
      .field("current", &self.current)
      .field("byte", &self.byte)
      .field("mask", &self.mask)
      .finish()
  }
}

impl Input {
  /// Open each file in order, with stdin as the final source.
  pub fn open(files: &[PathBuf]) -> Result<Input, String> {
    let mut sources: Vec<Box<dyn Read>> = Vec::new();
    for path in files {
      let file = File::open(path).map_err(|_| format!("cannot open {}", path.display()))?;
      sources.push(Box::new(BufReader::new(file)));
    }
    sources.push(Box::new(io::stdin().lock()));
    Ok(Input::from_sources(sources))
  }

  pub fn from_reader(reader: Box<dyn Read>) -> Input {
    Input::from_sources(vec![reader])
  }

  pub fn from_bytes(bytes: Vec<u8>) -> Input {
    Input::from_reader(Box::new(io::Cursor::new(bytes)))
  }

  fn from_sources(sources: Vec<Box<dyn Read>>) -> Input {
    Input { sources, current: 0, byte: 0, mask: 0 }
  }

  /// Next whole byte, crossing source boundaries; None at the end of the
  /// last source.
  pub fn read_byte(&mut self) -> Result<Option<u8>, String> {
    let mut buf = [0u8; 1];
    while self.current < self.sources.len() {
      match self.sources[self.current].read(&mut buf) {
        Ok(0) => self.current += 1,
        Ok(_) => return Ok(Some(buf[0])),
        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
        Err(e) => return Err(format!("read error: {}", e)),
      }
    }
    Ok(None)
  }

  /// Next bit, MSB first. Running out of input mid-term is fatal.
  pub fn read_bit(&mut self) -> Result<bool, String> {
    if self.mask == 0 {
      match self.read_byte()? {
        Some(byte) => {
          self.byte = byte;
          self.mask = 0x80;
        }
        None => return Err("unexpected EOF".to_string()),
      }
    }
    let bit = self.byte & self.mask != 0;
    self.mask >>= 1;
    Ok(bit)
  }
}

pub enum Output {
  Buffered(BufWriter<Stdout>),
  Unbuffered(Stdout),
  Captured(Vec<u8>),
}

impl Output {
  pub fn stdout() -> Output {
    Output::Buffered(BufWriter::new(io::stdout()))
  }

  pub fn stdout_unbuffered() -> Output {
    Output::Unbuffered(io::stdout())
  }

  pub fn captured() -> Output {
    Output::Captured(Vec::new())
  }

  pub fn put(&mut self, byte: u8) -> Result<(), String> {
    let result = match self {
      Output::Buffered(w) => w.write_all(&[byte]),
      Output::Unbuffered(w) => w.write_all(&[byte]).and_then(|_| w.flush()),
      Output::Captured(buf) => {
        buf.push(byte);
        Ok(())
      }
    };
    result.map_err(|e| format!("write error: {}", e))
  }

  pub fn flush(&mut self) -> Result<(), String> {
    let result = match self {
      Output::Buffered(w) => w.flush(),
      Output::Unbuffered(w) => w.flush(),
      Output::Captured(_) => Ok(()),
    };
    result.map_err(|e| format!("write error: {}", e))
  }

  /// Drain the captured bytes. Empty for the stdout variants.
  pub fn take_bytes(&mut self) -> Vec<u8> {
    match self {
      Output::Captured(buf) => std::mem::take(buf),
      _ => Vec::new(),
    }
  }
}
