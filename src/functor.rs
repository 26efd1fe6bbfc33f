//! A special functor struct is necessary, because we need to know the arity of the functor after
//! we no longer have access to its vector of arguments. Thus, a `Functor` is a name and an arity.

use std::fmt::{Display, Formatter};

use string_cache::DefaultAtom;

pub type ArityType = u32;

/**
  The `Functor` struct represents a symbol f/n. Clones are cheap. As with all strings in this
  codebase, `Functor::name` is interned. Note that f/2 != f/3, i.e. functors are the same if
  and only if both their name and their arity are the same. Constants are functors of arity 0.
*/
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Functor {
  pub name  : DefaultAtom,
  pub arity : ArityType,
}

impl Functor {
  pub fn new(name: &str, arity: ArityType) -> Functor {
    Functor {
      name: DefaultAtom::from(name),
      arity
    }
  }
}

impl Display for Functor{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    if self.arity == 0{
      write!(f, "{}", self.name)
    }else{
      write!(f, "{}/{}", self.name, self.arity)
    }
  }
}

/**
  A dense identifier standing in for a `Functor` everywhere an instruction references a name.
  Identifiers are handed out by the `Interner` and are stable for the lifetime of the engine:
  the same `(name, arity)` pair always maps to the same id, and ids are never reused.
*/
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct FunctorId(pub i32);

impl Display for FunctorId {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "f{}", self.0)
  }
}
