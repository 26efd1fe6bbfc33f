/*!
  Concrete in-memory representation of terms.

  The heap is a vector of `Cell`s. A structure `f(a, b)` occupies a `Fun` cell holding `f/2`
  followed directly by its two argument cells; an `Str` cell points at the `Fun` cell. An
  unbound variable is a `Ref` cell that points at itself; binding overwrites the cell with
  either a `Ref` to another cell or a value cell outright. Atomic constants, integers, and
  floats are immediate cells and never require heap allocation on their own.
*/

use std::fmt::{Display, Formatter};

use crate::address::Address;
use crate::functor::{ArityType, FunctorId};

#[derive(Clone, PartialEq, Debug)]
pub enum Cell {
  /// A pointer to a cell; a variable is a `REF` to itself.
  Ref(Address),
  /// `<STR, k>` where `k` is the heap address of a functor cell; a pointer to a structure.
  Str(Address),
  /// A functor header; argument cells follow directly behind it on the heap.
  Fun{
    functor: FunctorId,
    arity  : ArityType
  },
  /// An atomic constant, a functor of arity 0.
  Con(FunctorId),
  /// A machine-native integer immediate.
  Int(i64),
  /// A machine-native float immediate.
  Flt(f64),
  /// Unfilled cell.
  Empty
}

impl Cell {

  /// True for a `Ref` cell that points at its own heap address, i.e. an unbound variable.
  pub fn is_unbound_at(&self, address: Address) -> bool {
    match self {
      Cell::Ref(target) => *target == address,
      _                 => false
    }
  }

  /// Extracts the target address from `Ref` and `Str` cells.
  pub fn extract_address(&self) -> Option<Address> {
    match self {
      | Cell::Ref(address)
      | Cell::Str(address) => Some(*address),
      _                    => None
    }
  }

}

impl Display for Cell{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self{
      Cell::Ref(a)               => write!(f, "<REF, {}>", a),
      Cell::Str(a)               => write!(f, "<STR, {}>", a),
      Cell::Fun{functor, arity}  => write!(f, "{}/{}", functor, arity),
      Cell::Con(functor)         => write!(f, "<CON, {}>", functor),
      Cell::Int(i)               => write!(f, "<INT, {}>", i),
      Cell::Flt(x)               => write!(f, "<FLT, {}>", x),
      Cell::Empty                => write!(f, "`")
    }
  }
}
