//! A small driver around the engine: consults any files named on the command line, then
//! reads sentences from stdin. Clauses extend the database; queries run immediately and
//! print every solution. `halt.` leaves.

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};

use hornvm::Engine;

fn main() {
  env_logger::init();

  let mut engine = Engine::new();

  for path in env::args().skip(1) {
    match fs::read_to_string(&path) {
      Ok(text)   => run(&mut engine, &text),
      Err(error) => eprintln!("{}: {}", path, error)
    }
  }

  repl(&mut engine);
}

/// Loads a source text and, if it ends in a query, prints that query's solutions.
fn run(engine: &mut Engine, text: &str) {
  if let Err(error) = engine.consult(text) {
    eprintln!("{}", error);
    return;
  }

  if engine.has_pending_query() {
    let mut count = 0;
    for solution in engine.resolve() {
      count += 1;
      println!("{}", solution);
    }
    if count == 0 {
      println!("no");
    }
  }
}

fn repl(engine: &mut Engine) {
  let stdin = io::stdin();

  prompt();
  for line in stdin.lock().lines() {
    let line = match line {
      Ok(line) => line,
      Err(_)   => break
    };
    let trimmed = line.trim();

    if trimmed == "halt." || trimmed == "quit." {
      break;
    }
    if trimmed == "listing." {
      print!("{}", engine.listing());
      prompt();
      continue;
    }
    if !trimmed.is_empty() {
      run(engine, trimmed);
    }
    prompt();
  }
}

fn prompt() {
  print!("?- ");
  let _ = io::stdout().flush();
}
