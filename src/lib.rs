/*!
  A Prolog-like logic programming engine built on a Warren Abstract Machine core.

  Source text parses into `Sentence`s; the clause compiler turns each clause into a
  linear instruction sequence stored in a clause database indexed by `(functor, arity)`;
  and the abstract machine executes those sequences, performing unification as a side
  effect of its `get`/`put`/`unify` instructions. The resolution controller drives the
  machine across the database with trail-based backtracking, choice points, cut, and the
  control builtins, yielding answers through the lazy [`Solutions`] iterator.

  ```
  use hornvm::Engine;

  let mut engine = Engine::new();
  engine.consult("edge(a, b). edge(b, c). path(X, Z) :- edge(X, Z). \
                  path(X, Z) :- edge(X, Y), path(Y, Z).").unwrap();
  let answers: Vec<String> =
    engine.query("?- path(a, Z).").unwrap().map(|s| s.to_string()).collect();
  assert_eq!(answers, vec!["Z = b", "Z = c"]);
  ```

  The engine is single-threaded per resolution session: one [`Solutions`] borrows the
  engine for its whole lifetime, and the clause database is immutable while it runs.
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

mod address;
mod cell;
mod compiler;
mod database;
mod error;
mod functor;
mod gc;
mod instruction;
mod interner;
mod machine;
mod parser;
mod solve;
mod term;

use std::rc::Rc;

use log::warn;

use crate::compiler::{ClauseCompiler, CompiledQuery};
use crate::database::Database;
use crate::machine::Machine;

pub use crate::address::{Address, AddressNumberType};
pub use crate::cell::Cell;
pub use crate::error::{CompileError, ParseError};
pub use crate::functor::{ArityType, Functor, FunctorId};
pub use crate::gc::{Collector, RootSet};
pub use crate::instruction::{Instruction, Literal, Operation};
pub use crate::interner::Interner;
pub use crate::parser::parse;
pub use crate::solve::{Solution, Solutions};
pub use crate::term::{Clause, Sentence, Term};

/// A compiled instruction sequence, shared between the database, continuations, and
/// choice points.
pub(crate) type Code = Rc<Vec<instruction::Instruction>>;

/**
  The engine owns the interner and the clause database and hands out resolution
  sessions. There is no ambient global state: every name lookup and clause fetch goes
  through an `Engine` the caller holds.
*/
pub struct Engine {
  interner  : Interner,
  database  : Database,
  pending   : Option<CompiledQuery>,
  collector : Option<Box<dyn Collector>>
}

impl Engine {

  pub fn new() -> Engine {
    let mut interner = Interner::new();
    let database = Database::new(&mut interner);
    Engine {
      interner,
      database,
      pending: None,
      collector: None
    }
  }

  /**
    Loads one sentence: a clause is compiled into the database, a query is compiled and
    held as the pending query for [`Engine::resolve`]. Compile errors are reported
    before anything is stored.
  */
  pub fn compile(&mut self, sentence: Sentence) -> Result<(), CompileError> {
    match sentence {

      Sentence::Clause(clause) => {
        let compiled = ClauseCompiler::new(&mut self.interner).compile_clause(&clause)?;
        self.database.assert(compiled);
        Ok(())
      }

      Sentence::Query(goals) => {
        let compiled = ClauseCompiler::new(&mut self.interner).compile_query(&goals)?;
        if self.pending.is_some() {
          warn!("a pending query was replaced before being resolved");
        }
        self.pending = Some(compiled);
        Ok(())
      }

    }
  }

  /// Parses and loads a whole source text: clauses are asserted, and the last query (if
  /// any) becomes the pending query.
  pub fn consult(&mut self, source: &str) -> Result<(), CompileError> {
    for sentence in parser::parse(source)? {
      self.compile(sentence)?;
    }
    Ok(())
  }

  /**
    Resolves the pending query, consuming it. The returned sequence is lazy: each
    `next()` performs one resolution step, and requesting another solution backtracks
    into the most recent choice point. With no pending query the sequence is empty.
  */
  pub fn resolve(&mut self) -> Solutions<'_> {
    let pending = self.pending.take();
    let Engine { interner, database, collector, .. } = self;
    let collector = collector.as_mut().map(|boxed| &mut **boxed as &mut dyn Collector);

    match pending {

      Some(query) => {
        let machine = Machine::new(&query, database, interner, collector);
        Solutions::new(machine, query)
      }

      None => {
        warn!("resolve called with no pending query");
        let query = trivial_query();
        let machine = Machine::new(&query, database, interner, collector);
        Solutions::exhausted(machine, query)
      }

    }
  }

  /// Parses `source`, asserts its clauses, and resolves its query in one step.
  pub fn query(&mut self, source: &str) -> Result<Solutions<'_>, CompileError> {
    self.consult(source)?;
    if self.pending.is_none() {
      return Err(CompileError::QueryMissing(source.trim().to_string()));
    }
    Ok(self.resolve())
  }

  /// Whether a query has been compiled and awaits [`Engine::resolve`].
  pub fn has_pending_query(&self) -> bool {
    self.pending.is_some()
  }

  /// Clears the clause database, the pending query, and with them all machine state.
  /// The interner survives; ids remain stable for the lifetime of the engine.
  pub fn reset(&mut self) {
    self.database.reset();
    self.pending = None;
  }

  /// Installs a garbage collector to be invoked at goal boundaries. See [`Collector`].
  pub fn set_collector(&mut self, collector: Box<dyn Collector>) {
    self.collector = Some(collector);
  }

  /// A human readable listing of every compiled clause.
  pub fn listing(&self) -> String {
    self.database.listing(&self.interner)
  }

  pub fn interner(&self) -> &Interner {
    &self.interner
  }

}

impl Default for Engine {
  fn default() -> Self {
    Engine::new()
  }
}

fn trivial_query() -> CompiledQuery {
  CompiledQuery {
    permanents: 0,
    code: Rc::new(vec![instruction::Instruction::Halt]),
    bindings: vec![],
    source: "?- true.".to_string()
  }
}
