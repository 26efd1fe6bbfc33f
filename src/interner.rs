/*!
  A symbol table mapping functor symbols of the form `f/n` to dense integer identifiers and
  back. Everywhere an instruction references a name it carries a `FunctorId` instead, which
  is what lets the machine compare names by integer equality. The table is really just a
  convenience wrapper around a `BiMap`.

  Interning is idempotent: repeated calls with an identical `(name, arity)` pair return the
  same id, and ids are never reused across distinct names. Interning cannot fail except on
  resource exhaustion, which is fatal.

  Variable names are interned separately and per clause; see `compiler::variables`.
*/

use bimap::BiMap;
use string_cache::DefaultAtom;

use crate::functor::{ArityType, Functor, FunctorId};

pub struct Interner {
  table: BiMap<Functor, FunctorId>
}

impl Interner {

  pub fn new() -> Interner {
    Interner {
      table: BiMap::new()
    }
  }

  /// Interns `name/arity`, returning its existing id if it has one.
  pub fn intern(&mut self, name: &str, arity: ArityType) -> FunctorId {
    self.intern_functor(&Functor {
      name: DefaultAtom::from(name),
      arity
    })
  }

  pub fn intern_functor(&mut self, functor: &Functor) -> FunctorId {
    if let Some(id) = self.table.get_by_left(functor) {
      return *id;
    }
    let id = FunctorId(self.table.len() as i32);
    self.table.insert(functor.clone(), id);
    id
  }

  /// The exact inverse of `intern`. Looking up an id this table never issued is a bug in
  /// the machine, not a user error.
  pub fn lookup(&self, id: FunctorId) -> &Functor {
    match self.table.get_by_right(&id) {
      Some(functor) => functor,
      None          => unreachable!("Error: Unknown functor id {} passed to lookup.", id)
    }
  }

  /// The id of `name/arity` if it has been interned, without interning it.
  pub fn get(&self, name: &str, arity: ArityType) -> Option<FunctorId> {
    self.table
        .get_by_left(&Functor::new(name, arity))
        .copied()
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }

}

impl Default for Interner {
  fn default() -> Self {
    Interner::new()
  }
}
