//! The abstract syntax tree types for programs and queries. This is the output contract of
//! the parser and the input of the clause compiler; the machine itself never walks a `Term`
//! except when decoding a solution back out of the heap.

use std::fmt::{Display, Formatter};

use string_cache::DefaultAtom;

use crate::functor::{ArityType, Functor};

pub type TermVec = Vec<Term>;

// region Term declarations and definitions

/// Abstract Syntax Representation
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
  /// An interned string starting with a lowercase letter; a functor of arity 0.
  Atom(DefaultAtom),

  /// A machine-native integer literal. There is no bignum representation.
  Integer(i64),

  /// A machine-native float literal.
  Float(f64),

  /// An interned string starting with an uppercase letter or underscore.
  Variable(DefaultAtom),

  /// The anonymous variable `_`. Every occurrence is a distinct fresh variable, and
  /// anonymous variables never appear in reported solutions.
  Wildcard,

  /// A `Structure` is a functor with arguments: `f(stuff)`. The argument list is nonempty;
  /// a would-be structure with no arguments is an `Atom`.
  Structure {
    functor : Functor,
    args    : TermVec
  }
}

impl Term{

  /// Builds a structure term, demoting it to an `Atom` when `args` is empty.
  pub fn structure(name: &str, args: TermVec) -> Term {
    if args.is_empty() {
      Term::Atom(DefaultAtom::from(name))
    } else {
      let functor = Functor::new(name, args.len() as ArityType);
      Term::Structure{ functor, args }
    }
  }

  /// The functor of a callable term: `f/n` for a structure, `name/0` for an atom.
  pub fn functor(&self) -> Option<Functor> {
    match self {
      Term::Atom(name)             => Some(Functor{ name: name.clone(), arity: 0 }),
      Term::Structure{functor, ..} => Some(functor.clone()),
      _                            => None
    }
  }

  /// A term is callable if it could stand as a goal: an atom or a structure.
  pub fn is_callable(&self) -> bool {
    match self {
      | Term::Atom(_)
      | Term::Structure{..} => true,
      _                     => false
    }
  }

}

impl Display for Term{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Term::Atom(name)     => write!(f, "{}", name),

      Term::Integer(i)     => write!(f, "{}", i),

      Term::Float(x)       => write!(f, "{}", x),

      Term::Variable(name) => write!(f, "{}", name),

      Term::Wildcard       => write!(f, "_"),

      Term::Structure { functor, args } => {
        write!(f, "{}(", functor.name)?;
        for (i, term) in args.iter().enumerate(){
          if i != 0 {
            write!(f, ", ")?;
          }
          write!(f, "{}", term)?;
        }
        write!(f, ")")
      }

    }
  }
}

// endregion Term

// region Clause and Sentence

/**
  A `Clause` is a fact or a rule: a callable head and a possibly empty ordered sequence of
  body goals, resolved left to right. The head and body share one variable scope, fresh per
  clause instantiation.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
  pub head: Term,
  pub body: TermVec
}

impl Clause {
  pub fn is_fact(&self) -> bool {
    self.body.is_empty()
  }
}

impl Display for Clause {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    if self.body.is_empty() {
      write!(f, "{}.", self.head)
    } else {
      write!(f, "{} :- ", self.head)?;
      for (i, goal) in self.body.iter().enumerate(){
        if i != 0 {
          write!(f, ", ")?;
        }
        write!(f, "{}", goal)?;
      }
      write!(f, ".")
    }
  }
}

/// One top-level sentence of a source text: either a program clause or a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
  Clause(Clause),
  Query(TermVec)
}

impl Display for Sentence {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Sentence::Clause(clause) => write!(f, "{}", clause),

      Sentence::Query(goals) => {
        write!(f, "?- ")?;
        for (i, goal) in goals.iter().enumerate(){
          if i != 0 {
            write!(f, ", ")?;
          }
          write!(f, "{}", goal)?;
        }
        write!(f, ".")
      }

    }
  }
}

// endregion Clause and Sentence

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn structure_demotes_to_atom() {
    assert_eq!(Term::structure("nil", vec![]), Term::Atom(DefaultAtom::from("nil")));
  }

  #[test]
  fn display_round_trip_text() {
    let term = Term::structure(
      "p",
      vec![
        Term::Variable(DefaultAtom::from("Z")),
        Term::structure("h", vec![Term::Variable(DefaultAtom::from("Z")),
                                  Term::Variable(DefaultAtom::from("W"))]),
        Term::structure("f", vec![Term::Variable(DefaultAtom::from("W"))]),
      ]
    );
    assert_eq!(format!("{}", term), "p(Z, h(Z, W), f(W))");
  }

  #[test]
  fn callable_terms() {
    assert!(Term::structure("f", vec![Term::Wildcard]).is_callable());
    assert!(Term::Atom(DefaultAtom::from("true")).is_callable());
    assert!(!Term::Integer(3).is_callable());
    assert!(!Term::Variable(DefaultAtom::from("X")).is_callable());
  }
}
