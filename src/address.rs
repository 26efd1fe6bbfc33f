//! An address type that names a storage location in the machine: a heap cell, an
//! argument/temporary register, or a permanent-variable slot in the current
//! environment frame, with some convenience functions.

use std::ops::Add;
use std::fmt::{Display, Formatter};

// `AddressNumberType` is `usize`, as it is naturally an index into a memory store.
pub type AddressNumberType = usize;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum Address{
  /// A "pointer" to a cell is an index into the heap. We could call it a cell reference.
  Heap(AddressNumberType),
  /// A "pointer" to a register is an index into the register vector `X`.
  Register(AddressNumberType),
  /// A "pointer" to a permanent variable is an index into the slots `Y` of the
  /// active environment frame.
  Frame(AddressNumberType)
}

impl Address {

  /// Converts the address to an index into the corresponding vector.
  pub fn idx(&self) -> AddressNumberType {
    match self{
      Address::Heap(i)     => *i,
      // Registers count from 1, so subtract 1 to convert to index.
      Address::Register(i) => *i - 1,
      Address::Frame(i)    => *i
    }
  }

  /// Converts an index into the heap vector to a heap address.
  pub fn from_heap_idx(heap_idx: usize) -> Address{
    Address::Heap(heap_idx)
  }

  /// Converts an index into the register vector to a register address.
  pub fn from_reg_idx(reg_idx: usize) -> Address{
    Address::Register(reg_idx + 1)
  }

  /// Converts an index into the active frame's slot vector to a frame address.
  pub fn from_frame_idx(frame_idx: usize) -> Address{
    Address::Frame(frame_idx)
  }

  /// Panics if the address is not a heap pointer.
  pub fn require_heap(&self) -> AddressNumberType {
    match self {
      Address::Heap(i) => *i,
      _                => unreachable!(
        "Error: A non-heap pointer was given when a heap pointer was required: {}",
        self
      )
    }
  }

  pub fn is_register(&self) -> bool {
    match self {
      Address::Register(_) => true,
      _                    => false
    }
  }

  pub fn is_heap(&self) -> bool {
    match self {
      Address::Heap(_) => true,
      _                => false
    }
  }

}


impl Display for Address{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self{
      Address::Heap(i)     => write!(f, "HEAP[{}]", i),
      Address::Register(i) => write!(f, "X[{}]", i),
      Address::Frame(i)    => write!(f, "Y[{}]", i)
    }
  }
}

// Increment an address
impl Add<AddressNumberType> for Address{
  type Output = Address;
  fn add(self, rhs: AddressNumberType) -> Address{
    match self{
      Address::Heap(i)     => Address::Heap(i + rhs),
      Address::Register(i) => Address::Register(i + rhs),
      Address::Frame(i)    => Address::Frame(i + rhs)
    }
  }
}
