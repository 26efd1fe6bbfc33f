/*!
  The clause database: compiled clauses indexed by `(functor id, arity)`.

  Clause order within a procedure is assertion order, and the resolution controller tries
  candidates strictly first-asserted-first-tried. The database is immutable during
  resolution; loading and `reset` are bulk operations performed between queries.
*/

use std::collections::HashMap;
use std::rc::Rc;

use crate::compiler::CompiledClause;
use crate::functor::{ArityType, FunctorId};
use crate::instruction;
use crate::interner::Interner;

/// The functor ids of the control constructs, interned eagerly so the controller can
/// recognize them by integer comparison.
#[derive(Copy, Clone, Debug)]
pub struct Builtins {
  pub true_    : FunctorId,
  pub fail     : FunctorId,
  pub false_   : FunctorId,
  pub conj     : FunctorId,
  pub disj     : FunctorId,
  pub negation : FunctorId,
  pub call     : FunctorId,
  pub cut      : FunctorId
}

impl Builtins {
  pub fn intern(interner: &mut Interner) -> Builtins {
    Builtins {
      true_    : interner.intern("true", 0),
      fail     : interner.intern("fail", 0),
      false_   : interner.intern("false", 0),
      conj     : interner.intern(",", 2),
      disj     : interner.intern(";", 2),
      negation : interner.intern("\\+", 1),
      call     : interner.intern("call", 1),
      cut      : interner.intern("!", 0)
    }
  }
}

pub struct Database {
  procedures : HashMap<(FunctorId, ArityType), Vec<Rc<CompiledClause>>>,
  /// Every clause in assertion order, for listings.
  order      : Vec<Rc<CompiledClause>>,
  pub builtins: Builtins
}

impl Database {

  pub fn new(interner: &mut Interner) -> Database {
    Database {
      procedures: HashMap::new(),
      order: Vec::new(),
      builtins: Builtins::intern(interner)
    }
  }

  /// Adds a compiled clause at the end of its procedure.
  pub fn assert(&mut self, clause: CompiledClause) {
    let clause = Rc::new(clause);
    self.order.push(clause.clone());
    self.procedures
        .entry((clause.functor, clause.arity))
        .or_insert_with(Vec::new)
        .push(clause);
  }

  /// All candidate clauses for a goal, in assertion order.
  pub fn procedure(&self, functor: FunctorId, arity: ArityType) -> &[Rc<CompiledClause>] {
    self.procedures
        .get(&(functor, arity))
        .map(|clauses| clauses.as_slice())
        .unwrap_or(&[])
  }

  /// The `index`th clause of a procedure, if it exists.
  pub fn clause(&self, functor: FunctorId, arity: ArityType, index: usize)
    -> Option<&Rc<CompiledClause>>
  {
    self.procedure(functor, arity).get(index)
  }

  pub fn len(&self) -> usize {
    self.order.len()
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }

  /// Clears every loaded clause. The builtin functor ids survive, as does the interner.
  pub fn reset(&mut self) {
    self.procedures.clear();
    self.order.clear();
  }

  /// A human readable listing of every compiled clause in assertion order.
  pub fn listing(&self, interner: &Interner) -> String {
    let mut buffer = String::new();
    for clause in self.order.iter() {
      buffer.push_str(format!("% {}\n", clause.source).as_str());
      buffer.push_str(instruction::listing(&clause.code, interner).as_str());
      buffer.push('\n');
    }
    buffer
  }

}


#[cfg(test)]
mod tests {
  use crate::compiler::ClauseCompiler;
  use crate::parser::parse;
  use crate::term::Sentence;
  use super::*;

  fn load(text: &str) -> (Database, Interner) {
    let mut interner = Interner::new();
    let mut database = Database::new(&mut interner);
    for sentence in parse(text).unwrap() {
      if let Sentence::Clause(clause) = sentence {
        let compiled = ClauseCompiler::new(&mut interner).compile_clause(&clause).unwrap();
        database.assert(compiled);
      }
    }
    (database, interner)
  }

  #[test]
  fn clauses_keep_assertion_order() {
    let (database, interner) = load("f(x). f(y). g(z).");
    let f = interner.get("f", 1).unwrap();
    let clauses = database.procedure(f, 1);
    assert_eq!(clauses.len(), 2);
    assert!(clauses[0].source.contains("f(x)"));
    assert!(clauses[1].source.contains("f(y)"));
  }

  #[test]
  fn missing_procedures_are_empty() {
    let (database, mut interner) = load("f(x).");
    let nope = interner.intern("nope", 3);
    assert!(database.procedure(nope, 3).is_empty());
  }

  #[test]
  fn reset_clears_the_database() {
    let (mut database, interner) = load("f(x). g(y).");
    assert_eq!(database.len(), 2);
    database.reset();
    assert!(database.is_empty());
    let f = interner.get("f", 1).unwrap();
    assert!(database.procedure(f, 1).is_empty());
  }

  #[test]
  fn listing_shows_sources_and_instructions() {
    let (database, interner) = load("f(x).");
    let listing = database.listing(&interner);
    assert!(listing.contains("% f(x)."));
    assert!(listing.contains("GetConstant(x, X[1])"));
  }
}
