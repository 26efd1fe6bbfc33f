/*!
  The abstract instruction set of the virtual machine.

  A compiled clause is a linear `Vec<Instruction>`. An enum is used for the opcode itself
  so that opcode <-> text and opcode <-> number conversions are derived rather than written
  by hand; the instruction carries its operands as ordinary fields, since instructions only
  ever live in memory and are never serialized.

  The `CallTerm`, `CutTo`, and `Fail` operations are never emitted by the clause compiler.
  The resolution controller synthesizes short sequences containing them at runtime to drive
  the control builtins (conjunction, negation); their operands are heap addresses and
  choice-point depths that only exist during resolution.
*/

use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};
use num_enum::{TryFromPrimitive, IntoPrimitive};

use crate::address::{Address, AddressNumberType};
use crate::cell::Cell;
use crate::functor::{ArityType, FunctorId};
use crate::interner::Interner;

/**
  Opcodes of the virtual machine.

  Rust stores enum variants as bytes. As in C, enum values are represented by consecutive
  natural numbers and can be treated as numeric types, which is what the `num_enum` derives
  rely on. The numeric codes appear in instruction listings.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq,        Debug,         Hash
)]
#[repr(u8)]
pub enum Operation {
  PutVariable,       // put_variable( slot, register )
  PutValue,          // put_value( slot, register )
  PutConstant,       // put_constant( literal, register )
  PutStructure,      // put_structure( f/n, register )
  PutVoid,           // put_void( register )

  GetVariable,       // get_variable( slot, register )
  GetValue,          // get_value( slot, register )
  GetConstant,       // get_constant( literal, register )
  GetStructure,      // get_structure( f/n, register )

  SetVariable,       // set_variable( slot )
  SetValue,          // set_value( slot )
  SetConstant,       // set_constant( literal )
  SetVoid,           // set_void( n )

  UnifyVariable,     // unify_variable( slot )
  UnifyValue,        // unify_value( slot )
  UnifyConstant,     // unify_constant( literal )
  UnifyVoid,         // unify_void( n )

  Allocate,          // allocate( n )
  Deallocate,        // deallocate
  Call,              // call( f/n )
  Execute,           // execute( f/n )
  Proceed,           // proceed
  Cut,               // cut
  Halt,              // halt

  // Runtime-synthesized operations; the compiler never emits these.
  Fail,              // fail
  CallTerm,          // call_term( heap address )
  CutTo,             // cut_to( choice point depth )
}

impl Operation {
  /// The numeric code of the opcode, as shown in listings.
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }
}

/// An atomic operand of a `*Constant` instruction.
#[derive(Clone, PartialEq, Debug)]
pub enum Literal {
  Atom(FunctorId),
  Int(i64),
  Flt(f64)
}

impl Literal {
  /// The immediate cell this literal denotes at runtime.
  pub fn to_cell(&self) -> Cell {
    match self {
      Literal::Atom(id) => Cell::Con(*id),
      Literal::Int(i)   => Cell::Int(*i),
      Literal::Flt(x)   => Cell::Flt(*x)
    }
  }

  fn resolved(&self, interner: &Interner) -> String {
    match self {
      Literal::Atom(id) => format!("{}", interner.lookup(*id)),
      Literal::Int(i)   => format!("{}", i),
      Literal::Flt(x)   => format!("{}", x)
    }
  }
}

impl Display for Literal {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Literal::Atom(id) => write!(f, "{}", id),
      Literal::Int(i)   => write!(f, "{}", i),
      Literal::Flt(x)   => write!(f, "{}", x)
    }
  }
}

/**
  Holds the unencoded components of an instruction. `slot` operands address either a
  temporary register `X[n]` or a permanent variable `Y[n]` of the active frame; `register`
  operands always address an argument register.
*/
#[derive(Clone, PartialEq, Debug)]
pub enum Instruction {
  PutVariable  { slot: Address, register: AddressNumberType },
  PutValue     { slot: Address, register: AddressNumberType },
  PutConstant  { literal: Literal, register: AddressNumberType },
  PutStructure { functor: FunctorId, arity: ArityType, register: AddressNumberType },
  PutVoid      { register: AddressNumberType },

  GetVariable  { slot: Address, register: AddressNumberType },
  GetValue     { slot: Address, register: AddressNumberType },
  GetConstant  { literal: Literal, register: AddressNumberType },
  GetStructure { functor: FunctorId, arity: ArityType, register: AddressNumberType },

  SetVariable  { slot: Address },
  SetValue     { slot: Address },
  SetConstant  { literal: Literal },
  SetVoid      { count: usize },

  UnifyVariable{ slot: Address },
  UnifyValue   { slot: Address },
  UnifyConstant{ literal: Literal },
  UnifyVoid    { count: usize },

  Allocate     { slots: usize },
  Deallocate,
  Call         { functor: FunctorId, arity: ArityType },
  Execute      { functor: FunctorId, arity: ArityType },
  Proceed,
  Cut,
  Halt,

  Fail,
  CallTerm     { address: AddressNumberType },
  CutTo        { depth: usize },
}

impl Instruction {

  pub fn operation(&self) -> Operation {
    match self {
      Instruction::PutVariable  {..} => Operation::PutVariable,
      Instruction::PutValue     {..} => Operation::PutValue,
      Instruction::PutConstant  {..} => Operation::PutConstant,
      Instruction::PutStructure {..} => Operation::PutStructure,
      Instruction::PutVoid      {..} => Operation::PutVoid,
      Instruction::GetVariable  {..} => Operation::GetVariable,
      Instruction::GetValue     {..} => Operation::GetValue,
      Instruction::GetConstant  {..} => Operation::GetConstant,
      Instruction::GetStructure {..} => Operation::GetStructure,
      Instruction::SetVariable  {..} => Operation::SetVariable,
      Instruction::SetValue     {..} => Operation::SetValue,
      Instruction::SetConstant  {..} => Operation::SetConstant,
      Instruction::SetVoid      {..} => Operation::SetVoid,
      Instruction::UnifyVariable{..} => Operation::UnifyVariable,
      Instruction::UnifyValue   {..} => Operation::UnifyValue,
      Instruction::UnifyConstant{..} => Operation::UnifyConstant,
      Instruction::UnifyVoid    {..} => Operation::UnifyVoid,
      Instruction::Allocate     {..} => Operation::Allocate,
      Instruction::Deallocate        => Operation::Deallocate,
      Instruction::Call         {..} => Operation::Call,
      Instruction::Execute      {..} => Operation::Execute,
      Instruction::Proceed           => Operation::Proceed,
      Instruction::Cut               => Operation::Cut,
      Instruction::Halt              => Operation::Halt,
      Instruction::Fail              => Operation::Fail,
      Instruction::CallTerm     {..} => Operation::CallTerm,
      Instruction::CutTo        {..} => Operation::CutTo,
    }
  }

  /// Renders the instruction with functor ids resolved to their names.
  pub fn resolved(&self, interner: &Interner) -> String {
    match self {
      Instruction::PutConstant { literal, register } =>
        format!("{}({}, {})", self.operation(), literal.resolved(interner),
                Address::from_reg_idx(*register)),
      Instruction::GetConstant { literal, register } =>
        format!("{}({}, {})", self.operation(), literal.resolved(interner),
                Address::from_reg_idx(*register)),
      Instruction::SetConstant { literal } =>
        format!("{}({})", self.operation(), literal.resolved(interner)),
      Instruction::UnifyConstant { literal } =>
        format!("{}({})", self.operation(), literal.resolved(interner)),
      Instruction::PutStructure { functor, arity, register } =>
        format!("{}({}/{}, {})", self.operation(), interner.lookup(*functor).name, arity,
                Address::from_reg_idx(*register)),
      Instruction::GetStructure { functor, arity, register } =>
        format!("{}({}/{}, {})", self.operation(), interner.lookup(*functor).name, arity,
                Address::from_reg_idx(*register)),
      Instruction::Call { functor, .. } =>
        format!("{}({})", self.operation(), interner.lookup(*functor)),
      Instruction::Execute { functor, .. } =>
        format!("{}({})", self.operation(), interner.lookup(*functor)),
      _ => format!("{}", self)
    }
  }

}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let operation = self.operation();
    match self{

      | Instruction::PutVariable { slot, register }
      | Instruction::PutValue    { slot, register }
      | Instruction::GetVariable { slot, register }
      | Instruction::GetValue    { slot, register } => {
        write!(f, "{}({}, {})", operation, slot, Address::from_reg_idx(*register))
      }

      | Instruction::PutConstant { literal, register }
      | Instruction::GetConstant { literal, register } => {
        write!(f, "{}({}, {})", operation, literal, Address::from_reg_idx(*register))
      }

      | Instruction::PutStructure { functor, arity, register }
      | Instruction::GetStructure { functor, arity, register } => {
        write!(f, "{}({}/{}, {})", operation, functor, arity, Address::from_reg_idx(*register))
      }

      Instruction::PutVoid { register } => {
        write!(f, "{}({})", operation, Address::from_reg_idx(*register))
      }

      | Instruction::SetVariable  { slot }
      | Instruction::SetValue     { slot }
      | Instruction::UnifyVariable{ slot }
      | Instruction::UnifyValue   { slot } => {
        write!(f, "{}({})", operation, slot)
      }

      | Instruction::SetConstant  { literal }
      | Instruction::UnifyConstant{ literal } => {
        write!(f, "{}({})", operation, literal)
      }

      | Instruction::SetVoid  { count }
      | Instruction::UnifyVoid{ count } => {
        write!(f, "{}({})", operation, count)
      }

      Instruction::Allocate { slots } => {
        write!(f, "{}({})", operation, slots)
      }

      | Instruction::Call   { functor, arity }
      | Instruction::Execute{ functor, arity } => {
        write!(f, "{}({}/{})", operation, functor, arity)
      }

      Instruction::CallTerm { address } => {
        write!(f, "{}({})", operation, Address::from_heap_idx(*address))
      }

      Instruction::CutTo { depth } => {
        write!(f, "{}({})", operation, depth)
      }

      _ => write!(f, "{}", operation)

    }
  }
}

/**
  Produces a human readable listing of an instruction sequence, one instruction per line
  with its numeric opcode in a trailing comment column.
*/
pub fn listing(code: &[Instruction], interner: &Interner) -> String {
  let mut buffer = String::new();
  for instruction in code {
    buffer.push_str(
      format!("{:30}% {:>4}\n",
              instruction.resolved(interner),
              format!("{:02}", instruction.operation().code()),
      ).as_str()
    );
  }
  buffer
}


#[cfg(test)]
mod tests {
  use std::convert::TryFrom;
  use super::*;

  #[test]
  fn opcode_numbering_round_trips() {
    for code in 0..=Operation::CutTo.code() {
      let operation = Operation::try_from(code).unwrap();
      assert_eq!(operation.code(), code);
    }
    assert!(Operation::try_from(Operation::CutTo.code() + 1).is_err());
  }

  #[test]
  fn display_uses_operation_names() {
    let instruction = Instruction::Allocate { slots: 2 };
    assert_eq!(format!("{}", instruction), "Allocate(2)");
    assert_eq!(format!("{}", Instruction::Proceed), "Proceed");
  }

  #[test]
  fn operation_names_parse() {
    assert_eq!("GetStructure".parse::<Operation>(), Ok(Operation::GetStructure));
    assert!("Robert".parse::<Operation>().is_err());
  }

  #[test]
  fn resolved_listing_shows_names() {
    let mut interner = Interner::new();
    let f = interner.intern("f", 1);
    let code = vec![
      Instruction::GetStructure { functor: f, arity: 1, register: 1 },
      Instruction::UnifyVoid { count: 1 },
      Instruction::Proceed
    ];
    let text = listing(&code, &interner);
    assert!(text.contains("GetStructure(f/1, X[1])"));
    assert!(text.contains("Proceed"));
  }
}
