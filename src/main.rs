use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use clamb::language::{load_program, readback};
use clamb::runtime::{eval_print, Input, Output, Runtime, INITIAL_HEAP_SIZE};

/// Universal Lambda interpreter.
///
/// Reads a bit-encoded lambda term from the input files followed by
/// standard input, compiles it to combinators, and evaluates it against
/// the remaining input bytes.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Write each output byte as soon as it is produced.
  #[arg(short = 'u', long)]
  unbuffered: bool,

  /// Parse and translate only, printing the combinator expression.
  #[arg(short = 'p', long)]
  parse_only: bool,

  /// Verbosity: 1 prints evaluation statistics, 2 also logs collections.
  #[arg(short = 'v', long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=2))]
  verbose: u8,

  /// Program files, read in order before standard input.
  files: Vec<PathBuf>,
}

fn run_cli() -> Result<(), String> {
  let cli = Cli::parse();

  let input = Input::open(&cli.files)?;
  let output = if cli.unbuffered { Output::stdout_unbuffered() } else { Output::stdout() };
  let mut rt = Runtime::new(INITIAL_HEAP_SIZE, input, output)?;
  rt.heap.gc_notify = cli.verbose >= 2;

  let root = load_program(&mut rt)?;
  if cli.parse_only {
    println!("{}", readback::as_code(&rt.heap, root));
    return Ok(());
  }

  let gc_before = rt.heap.gc_time;
  let start = Instant::now();
  eval_print(&mut rt, root)?;
  rt.output.flush()?;
  let elapsed = start.elapsed();

  if cli.verbose >= 1 {
    let gc = rt.heap.gc_time - gc_before;
    println!();
    println!("{} reductions", rt.reductions);
    println!("  total eval time --- {:5.2} sec.", elapsed.saturating_sub(gc).as_secs_f64());
    println!("  total gc time   --- {:5.2} sec.", gc.as_secs_f64());
    println!("  max stack depth --- {}", rt.stack.max_depth());
  }
  Ok(())
}

fn main() {
  if let Err(err) = run_cli() {
    eprintln!("{}", err);
    std::process::exit(1);
  }
}
