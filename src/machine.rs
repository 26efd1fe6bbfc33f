/*!
  Structures and functions for the abstract machine that executes compiled clauses.

  The machine owns every mutable run-time store: the heap, the argument/temporary
  registers, the environment frame arena, the choice point stack, and the trail. Forward
  execution only ever grows the heap; storage is reclaimed in bulk when backtracking
  truncates to a choice point's high-water marks. Unification happens as a side effect of
  the `get`/`unify` instructions and of the explicit `unify` worklist loop; a failed
  unification does not recover locally but reports failure upward, where the resolution
  controller (see `solve`) restores the most recent choice point.

  Environment frames are arena-allocated: `Deallocate` re-links the current frame pointer
  without freeing storage, so a frame referenced by an outstanding choice point stays
  valid until backtracking truncates past it. Heap cells never point at frame slots, only
  the reverse, which keeps truncation sound.
*/

use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};

use crate::address::{Address, AddressNumberType};
use crate::cell::Cell;
use crate::compiler::CompiledQuery;
use crate::database::Database;
use crate::functor::{ArityType, FunctorId};
use crate::gc::Collector;
use crate::instruction::Instruction;
use crate::interner::Interner;
use crate::Code;

/// Sentinel for "no environment frame".
pub(crate) const NO_FRAME: usize = usize::MAX;

/// A return point: an instruction sequence and an offset into it.
#[derive(Clone, Debug)]
pub(crate) struct Continuation {
  pub code : Code,
  pub pc   : usize
}

/// Per-activation storage for permanent variables plus the saved return state.
#[derive(Debug)]
pub(crate) struct Frame {
  pub continuation : Option<Continuation>,
  pub parent       : usize,
  /// Choice point depth at clause entry; `Cut` truncates to this.
  pub barrier      : usize,
  pub slots        : Vec<Cell>
}

/// What remains to be tried when a choice point is resumed.
#[derive(Debug)]
pub(crate) enum Alternatives {
  /// Remaining database clauses for a goal, tried in assertion order.
  Clauses {
    functor : FunctorId,
    arity   : ArityType,
    next    : usize
  },
  /// The untaken right branch of a disjunction, as a heap term.
  Branch {
    address : AddressNumberType
  },
  /// The success continuation of a negation barrier: restoring this alternative
  /// discards the attempt's bindings and proceeds with the caller.
  NegationSucceed
}

/**
  A snapshot enabling the controller to retry an alternative later. The saved state is
  O(arity): argument registers plus fixed-size marks, independent of heap size.
*/
#[derive(Debug)]
pub(crate) struct ChoicePoint {
  pub alternatives : Alternatives,
  pub arguments    : Vec<Cell>,
  pub environment  : usize,
  pub continuation : Option<Continuation>,
  pub heap_mark    : usize,
  pub trail_mark   : usize,
  pub frame_mark   : usize
}

/// Structure-argument transfer mode for the `unify_*` instructions.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum Mode {
  Read,
  Write
}

impl Display for Mode{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self{
      Mode::Read  => write!(f, "Read"),
      Mode::Write => write!(f, "Write")
    }
  }
}

/// The outcome of executing one instruction.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum Step {
  /// Keep executing.
  Continue,
  /// Unification failed; the controller must backtrack.
  Fail,
  /// The query reached `Halt` with every goal proved.
  Solution
}

pub struct Machine<'d> {

  // Shared immutable context
  pub(crate) database : &'d Database,
  pub(crate) interner : &'d Interner,
  pub(crate) collector: Option<&'d mut dyn Collector>,

  // Memory stores
  pub(crate) heap          : Vec<Cell>,
  pub(crate) registers     : Vec<Cell>,
  pub(crate) frames        : Vec<Frame>,
  pub(crate) choice_points : Vec<ChoicePoint>,
  pub(crate) trail         : Vec<AddressNumberType>,

  // Registers and cursors
  pub(crate) code         : Code,
  pub(crate) pc           : usize,
  pub(crate) continuation : Option<Continuation>,
  pub(crate) environment  : usize,
  /// Heap mark of the newest choice point; bindings below it must be trailed.
  pub(crate) hb           : usize,
  /// Choice point depth at entry of the clause being executed.
  pub(crate) b0           : usize,
  pub(crate) mode         : Mode,
  /// Heap address of the next structure argument in read mode.
  pub(crate) s            : usize

}

impl<'d> Machine<'d> {

  // region Construction and low-level utility methods

  pub(crate) fn new(
    query     : &CompiledQuery,
    database  : &'d Database,
    interner  : &'d Interner,
    collector : Option<&'d mut dyn Collector>
  ) -> Machine<'d>
  {
    Machine {
      database,
      interner,
      collector,
      heap          : Vec::new(),
      registers     : Vec::new(),
      frames        : Vec::new(),
      choice_points : Vec::new(),
      trail         : Vec::new(),
      code          : query.code.clone(),
      pc            : 0,
      continuation  : None,
      environment   : NO_FRAME,
      hb            : 0,
      b0            : 0,
      mode          : Mode::Read, // Arbitrary value
      s             : 0
    }
  }

  /// Sets the register, dynamically growing the register vector if needed.
  pub(crate) fn set_register(&mut self, index: usize, cell: Cell){
    if index >= self.registers.len() {
      self.registers.resize(index + 1, Cell::Empty);
    }
    self.registers[index] = cell;
  }

  pub(crate) fn register(&self, index: usize) -> Cell {
    match self.registers.get(index) {
      Some(cell) => cell.clone(),
      None       => unreachable!("Error: Read of unwritten register X[{}].", index + 1)
    }
  }

  /// Reads the cell a `slot` operand names: a register or a frame slot.
  fn read_slot(&self, slot: Address) -> Cell {
    match slot {
      Address::Register(_) => self.register(slot.idx()),
      Address::Frame(i)    => self.frame().slots[i].clone(),
      Address::Heap(_)     => unreachable!(
        "Error: A heap address was used as an instruction slot: {}", slot
      )
    }
  }

  fn write_slot(&mut self, slot: Address, cell: Cell){
    match slot {
      Address::Register(_) => self.set_register(slot.idx(), cell),
      Address::Frame(i)    => {
        let environment = self.environment;
        self.frames[environment].slots[i] = cell;
      }
      Address::Heap(_)     => unreachable!(
        "Error: A heap address was used as an instruction slot: {}", slot
      )
    }
  }

  fn frame(&self) -> &Frame {
    match self.frames.get(self.environment) {
      Some(frame) => frame,
      None        => unreachable!("Error: No active environment frame.")
    }
  }

  /// Pushes a fresh unbound variable onto the heap and returns its cell.
  fn new_variable(&mut self) -> Cell {
    let address = self.heap.len();
    let cell = Cell::Ref(Address::from_heap_idx(address));
    self.heap.push(cell.clone());
    cell
  }

  /// The functor header a structure pointer refers to.
  pub(crate) fn functor_at(&self, address: usize) -> (FunctorId, ArityType) {
    match &self.heap[address] {
      Cell::Fun{ functor, arity } => (*functor, *arity),
      cell => panic!(
        "Fatal: STR at HEAP[{}] does not point at a functor cell but at {}.", address, cell
      )
    }
  }

  // endregion

  // region Dereferencing, binding, and unification

  /**
    Dereferences a chain of references. Returns either an unbound variable (a
    self-referential `Ref`), or a value cell (`Str`, `Con`, `Int`, `Flt`).

    Cycles cannot arise from sound unification; encountering one indicates machine
    corruption, so the chase is guarded and aborts loudly rather than spinning.
  */
  pub(crate) fn dereference(&self, cell: Cell) -> Cell {
    let mut cell = cell;
    let mut steps: usize = 0;
    loop {
      match &cell {

        Cell::Ref(address) => {
          let index = address.require_heap();
          let target = self.heap[index].clone();
          if target == cell {
            // A variable references itself when unbound.
            return cell;
          }
          match target {
            Cell::Ref(_) => { cell = target; }
            value        => { return value; }
          }
        }

        _ => { return cell; }

      }

      steps += 1;
      if steps > self.heap.len() {
        panic!("Fatal: cyclic reference chain while dereferencing; the heap is corrupt.");
      }
    }
  }

  /**
    Binds the unbound variable at `address` to `value`. The binding is recorded on the
    trail only when it is conditional, i.e. the cell is older than the newest choice
    point's heap mark and so must be undone if that choice point is restored.
  */
  pub(crate) fn bind(&mut self, address: AddressNumberType, value: Cell){
    #[cfg(feature = "trace_computation")]
    log::trace!("bind(HEAP[{}], {})", address, value);

    debug_assert!(
      self.heap[address].is_unbound_at(Address::from_heap_idx(address)),
      "bind called on a non-variable"
    );

    self.heap[address] = value;
    if address < self.hb {
      self.trail.push(address);
    }
  }

  /**
    Unifies two cells, binding variables as needed, and reports success. Dereferencing
    and argument decomposition run through an explicit worklist, so unification never
    recurses at instruction-dispatch time. Partial bindings made before a failure are
    *not* rolled back here; undoing them via the trail is the backtracking controller's
    job.
  */
  pub(crate) fn unify(&mut self, left: Cell, right: Cell) -> bool {
    let mut worklist: Vec<(Cell, Cell)> = vec![(left, right)];

    while let Some((left, right)) = worklist.pop() {
      let left  = self.dereference(left);
      let right = self.dereference(right);

      if left == right {
        // Identical unbound variables or identical immediates.
        continue;
      }

      match (left, right) {

        (Cell::Ref(left_address), Cell::Ref(right_address)) => {
          let left_address  = left_address.require_heap();
          let right_address = right_address.require_heap();
          // Bind the younger variable to the older so bindings tend to survive
          // backtracking without trailing.
          if left_address < right_address {
            self.bind(right_address, Cell::Ref(Address::from_heap_idx(left_address)));
          } else {
            self.bind(left_address, Cell::Ref(Address::from_heap_idx(right_address)));
          }
        }

        (Cell::Ref(address), value) => {
          self.bind(address.require_heap(), value);
        }

        (value, Cell::Ref(address)) => {
          self.bind(address.require_heap(), value);
        }

        (Cell::Str(left_address), Cell::Str(right_address)) => {
          let left_address  = left_address.require_heap();
          let right_address = right_address.require_heap();
          let (left_functor, left_arity)   = self.functor_at(left_address);
          let (right_functor, right_arity) = self.functor_at(right_address);
          if left_functor != right_functor || left_arity != right_arity {
            return false;
          }
          for argument in 1..=(left_arity as usize) {
            worklist.push((
              self.heap[left_address + argument].clone(),
              self.heap[right_address + argument].clone()
            ));
          }
        }

        _ => { return false; }

      }
    }

    true
  }

  /// Undoes every trailed binding above `mark`, newest first.
  pub(crate) fn unwind_trail(&mut self, mark: usize){
    while self.trail.len() > mark {
      // The loop condition guarantees the pop succeeds.
      let address = self.trail.pop().unwrap();
      self.heap[address] = Cell::Ref(Address::from_heap_idx(address));
    }
  }

  /// Keeps `hb` equal to the newest choice point's heap mark.
  pub(crate) fn update_hb(&mut self){
    self.hb = self.choice_points
                  .last()
                  .map(|choice_point| choice_point.heap_mark)
                  .unwrap_or(0);
  }

  /// Discards every choice point above `depth`. Cut is destructive pruning: the trail
  /// is deliberately left alone so older choice points still restore correctly.
  pub(crate) fn cut_to(&mut self, depth: usize){
    if self.choice_points.len() > depth {
      #[cfg(feature = "trace_computation")]
      log::trace!("cut: discarding {} choice point(s)", self.choice_points.len() - depth);
      self.choice_points.truncate(depth);
      self.update_hb();
    }
  }

  // endregion

  // region Instruction execution

  /// Executes the single instruction under the instruction pointer.
  pub(crate) fn step(&mut self) -> Step {
    let instruction = self.code[self.pc].clone();
    self.pc += 1;

    #[cfg(feature = "trace_computation")]
    log::trace!("{}\n{}", instruction, self);

    match instruction {

      // region Put instructions

      Instruction::PutVariable { slot, register } => {
        let cell = self.new_variable();
        self.write_slot(slot, cell.clone());
        self.set_register(register, cell);
        Step::Continue
      }

      Instruction::PutValue { slot, register } => {
        let cell = self.read_slot(slot);
        self.set_register(register, cell);
        Step::Continue
      }

      Instruction::PutConstant { literal, register } => {
        self.set_register(register, literal.to_cell());
        Step::Continue
      }

      Instruction::PutStructure { functor, arity, register } => {
        let address = self.heap.len();
        self.heap.push(Cell::Fun{ functor, arity });
        self.set_register(register, Cell::Str(Address::from_heap_idx(address)));
        Step::Continue
      }

      Instruction::PutVoid { register } => {
        let cell = self.new_variable();
        self.set_register(register, cell);
        Step::Continue
      }

      // endregion

      // region Get instructions

      Instruction::GetVariable { slot, register } => {
        let cell = self.register(register);
        self.write_slot(slot, cell);
        Step::Continue
      }

      Instruction::GetValue { slot, register } => {
        let left  = self.read_slot(slot);
        let right = self.register(register);
        match self.unify(left, right) {
          true  => Step::Continue,
          false => Step::Fail
        }
      }

      Instruction::GetConstant { literal, register } => {
        let cell = self.register(register);
        self.match_constant(literal.to_cell(), cell)
      }

      Instruction::GetStructure { functor, arity, register } => {
        let cell = self.register(register);
        match self.dereference(cell) {

          Cell::Ref(address) => {
            // A variable. Create the functor header on the heap, bind the variable to
            // it, and build the arguments in write mode.
            let header = self.heap.len();
            self.heap.push(Cell::Fun{ functor, arity });
            self.bind(address.require_heap(), Cell::Str(Address::from_heap_idx(header)));
            self.mode = Mode::Write;
            Step::Continue
          }

          Cell::Str(address) => {
            let address = address.require_heap();
            let (found_functor, found_arity) = self.functor_at(address);
            if found_functor == functor && found_arity == arity {
              self.mode = Mode::Read;
              self.s = address + 1;
              Step::Continue
            } else {
              Step::Fail
            }
          }

          _ => Step::Fail

        }
      }

      // endregion

      // region Set instructions

      Instruction::SetVariable { slot } => {
        let cell = self.new_variable();
        self.write_slot(slot, cell);
        Step::Continue
      }

      Instruction::SetValue { slot } => {
        let cell = self.read_slot(slot);
        self.heap.push(cell);
        Step::Continue
      }

      Instruction::SetConstant { literal } => {
        self.heap.push(literal.to_cell());
        Step::Continue
      }

      Instruction::SetVoid { count } => {
        for _ in 0..count {
          self.new_variable();
        }
        Step::Continue
      }

      // endregion

      // region Unify instructions

      Instruction::UnifyVariable { slot } => {
        match self.mode {

          Mode::Read  => {
            let cell = self.heap[self.s].clone();
            self.write_slot(slot, cell);
            self.s += 1;
          }

          Mode::Write => {
            let cell = self.new_variable();
            self.write_slot(slot, cell);
          }

        }
        Step::Continue
      }

      Instruction::UnifyValue { slot } => {
        match self.mode {

          Mode::Read  => {
            let argument = Cell::Ref(Address::from_heap_idx(self.s));
            self.s += 1;
            let cell = self.read_slot(slot);
            match self.unify(cell, argument) {
              true  => Step::Continue,
              false => Step::Fail
            }
          }

          Mode::Write => {
            let cell = self.read_slot(slot);
            self.heap.push(cell);
            Step::Continue
          }

        }
      }

      Instruction::UnifyConstant { literal } => {
        match self.mode {

          Mode::Read  => {
            let argument = Cell::Ref(Address::from_heap_idx(self.s));
            self.s += 1;
            self.match_constant(literal.to_cell(), argument)
          }

          Mode::Write => {
            self.heap.push(literal.to_cell());
            Step::Continue
          }

        }
      }

      Instruction::UnifyVoid { count } => {
        match self.mode {

          Mode::Read  => { self.s += count; }

          Mode::Write => {
            for _ in 0..count {
              self.new_variable();
            }
          }

        }
        Step::Continue
      }

      // endregion

      // region Control instructions

      Instruction::Allocate { slots } => {
        let frame = Frame {
          continuation: self.continuation.clone(),
          parent: self.environment,
          barrier: self.b0,
          slots: vec![Cell::Empty; slots]
        };
        self.frames.push(frame);
        self.environment = self.frames.len() - 1;
        Step::Continue
      }

      Instruction::Deallocate => {
        let (continuation, parent) = {
          let frame = self.frame();
          (frame.continuation.clone(), frame.parent)
        };
        self.continuation = continuation;
        self.environment = parent;
        Step::Continue
      }

      Instruction::Call { functor, arity } => {
        self.continuation = Some(Continuation {
          code: self.code.clone(),
          pc: self.pc
        });
        self.dispatch(functor, arity)
      }

      Instruction::Execute { functor, arity } => {
        // The continuation was restored by the preceding `Deallocate`.
        self.dispatch(functor, arity)
      }

      Instruction::Proceed => {
        match self.continuation.clone() {
          Some(continuation) => {
            self.code = continuation.code;
            self.pc = continuation.pc;
            Step::Continue
          }
          None => unreachable!("Error: Proceed executed with no continuation.")
        }
      }

      Instruction::Cut => {
        let barrier = self.frame().barrier;
        self.cut_to(barrier);
        Step::Continue
      }

      Instruction::CutTo { depth } => {
        self.cut_to(depth);
        Step::Continue
      }

      Instruction::Halt => Step::Solution,

      Instruction::Fail => Step::Fail,

      Instruction::CallTerm { address } => {
        self.continuation = Some(Continuation {
          code: self.code.clone(),
          pc: self.pc
        });
        self.meta_call(address)
      }

      // endregion

    }
  }

  /// Shared tail of `GetConstant` and read-mode `UnifyConstant`: either matches the
  /// constant, binds a variable to it, or fails.
  fn match_constant(&mut self, literal: Cell, cell: Cell) -> Step {
    match self.dereference(cell) {

      Cell::Ref(address) => {
        self.bind(address.require_heap(), literal);
        Step::Continue
      }

      value if value == literal => Step::Continue,

      _ => Step::Fail

    }
  }

  // endregion Instruction execution

  // region Display methods

  fn make_register_table<T>(
      name      : char,
      registers : &[T],
      highlight : usize,
      start     : usize
    ) -> Table
    where T: Display
  {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    for (i, cell) in registers.iter().enumerate() {
      match i == highlight {

        true  => {
          table.add_row(
            row![r->format!("* --> {}[{}] =", name, i + start), format!("{}", cell)]
          );
        }

        false => {
          table.add_row(
            row![r->format!("{}[{}] =", name, i + start), format!("{}", cell)]
          );
        }

      } // end match on highlight
    } // end for
    table
  }

  // endregion Display methods

}


lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl<'d> Display for Machine<'d> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let h_table = Machine::make_register_table('H', &self.heap,      self.s,  0);
    let x_table = Machine::make_register_table('X', &self.registers, 0,       1);

    let mut combined_table = table!([h_table, x_table]);

    combined_table.set_titles(row![ub->"Heap", ub->"Registers"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    writeln!(
      f,
      "Mode: {}  PC: {}  E: {}  B: {}  TR: {}",
      self.mode,
      self.pc,
      match self.environment { NO_FRAME => "-".to_string(), e => format!("{}", e) },
      self.choice_points.len(),
      self.trail.len()
    )?;
    write!(f, "{}", combined_table)
  }
}


#[cfg(test)]
mod tests {
  use crate::cell::Cell;
  use crate::compiler::ClauseCompiler;
  use crate::interner::Interner;
  use super::*;

  /// A machine over an empty database, enough to exercise the memory primitives.
  fn scratch_machine<'d>(database: &'d Database, interner: &'d Interner) -> Machine<'d> {
    let query = CompiledQuery {
      permanents: 0,
      code: std::rc::Rc::new(vec![Instruction::Halt]),
      bindings: vec![],
      source: "?- true.".to_string()
    };
    Machine::new(&query, database, interner, None)
  }

  fn context() -> (Database, Interner) {
    let mut interner = Interner::new();
    let database = Database::new(&mut interner);
    (database, interner)
  }

  /// Builds `f(a, X)`-shaped data directly on the heap, returning the structure cell
  /// and the heap address of the variable argument.
  fn sample_structure(machine: &mut Machine<'_>, functor: FunctorId) -> (Cell, usize) {
    let header = machine.heap.len();
    machine.heap.push(Cell::Fun{ functor, arity: 2 });
    machine.heap.push(Cell::Con(functor));
    let var_address = machine.heap.len();
    machine.heap.push(Cell::Ref(Address::from_heap_idx(var_address)));
    (Cell::Str(Address::from_heap_idx(header)), var_address)
  }

  #[test]
  fn dereference_follows_chains() {
    let (database, interner) = context();
    let mut machine = scratch_machine(&database, &interner);

    let a = machine.heap.len();
    machine.heap.push(Cell::Ref(Address::from_heap_idx(a)));
    let b = machine.heap.len();
    machine.heap.push(Cell::Ref(Address::from_heap_idx(a)));

    let result = machine.dereference(Cell::Ref(Address::from_heap_idx(b)));
    assert_eq!(result, Cell::Ref(Address::from_heap_idx(a)));

    machine.heap[a] = Cell::Int(42);
    let result = machine.dereference(Cell::Ref(Address::from_heap_idx(b)));
    assert_eq!(result, Cell::Int(42));
  }

  #[test]
  fn unify_is_symmetric() {
    let (database, mut interner) = context();
    let f = interner.intern("f", 2);

    for flip in &[false, true] {
      let mut machine = scratch_machine(&database, &interner);
      let (left, _)  = sample_structure(&mut machine, f);
      let (right, _) = sample_structure(&mut machine, f);
      let outcome = match flip {
        false => machine.unify(left, right),
        true  => machine.unify(right, left)
      };
      assert!(outcome);
    }

    // A mismatch fails in both orders.
    let g = interner.intern("g", 2);
    for flip in &[false, true] {
      let mut machine = scratch_machine(&database, &interner);
      let (left, _)  = sample_structure(&mut machine, f);
      let (right, _) = sample_structure(&mut machine, g);
      let outcome = match flip {
        false => machine.unify(left, right),
        true  => machine.unify(right, left)
      };
      assert!(!outcome);
    }
  }

  #[test]
  fn unify_binds_argument_variables() {
    let (database, mut interner) = context();
    let f = interner.intern("f", 2);
    let mut machine = scratch_machine(&database, &interner);

    let (left, left_var)   = sample_structure(&mut machine, f);
    let (right, right_var) = sample_structure(&mut machine, f);

    assert!(machine.unify(left, right));
    // The two variables are now aliases; the younger points at the older.
    let left_value  = machine.dereference(Cell::Ref(Address::from_heap_idx(left_var)));
    let right_value = machine.dereference(Cell::Ref(Address::from_heap_idx(right_var)));
    assert_eq!(left_value, right_value);
  }

  #[test]
  fn conditional_bindings_are_trailed_and_undone() {
    let (database, interner) = context();
    let mut machine = scratch_machine(&database, &interner);

    // An unbound variable older than the choice point.
    let old_var = machine.heap.len();
    machine.heap.push(Cell::Ref(Address::from_heap_idx(old_var)));

    // Pretend a choice point was pushed here.
    machine.hb = machine.heap.len();
    let trail_mark = machine.trail.len();
    let heap_mark = machine.heap.len();
    let snapshot = machine.heap.clone();

    machine.bind(old_var, Cell::Int(7));
    assert_eq!(machine.trail.len(), trail_mark + 1);

    machine.unwind_trail(trail_mark);
    machine.heap.truncate(heap_mark);
    assert_eq!(machine.heap, snapshot, "heap must restore bit for bit");
  }

  #[test]
  fn unconditional_bindings_are_not_trailed() {
    let (database, interner) = context();
    let mut machine = scratch_machine(&database, &interner);

    let var = machine.heap.len();
    machine.heap.push(Cell::Ref(Address::from_heap_idx(var)));

    // No choice point: hb stays 0 and binding needs no trail entry.
    machine.bind(var, Cell::Int(1));
    assert!(machine.trail.is_empty());
  }

  #[test]
  fn cut_discards_choice_points_but_not_the_trail() {
    let (database, interner) = context();
    let mut machine = scratch_machine(&database, &interner);

    machine.choice_points.push(ChoicePoint {
      alternatives: Alternatives::NegationSucceed,
      arguments: vec![],
      environment: NO_FRAME,
      continuation: None,
      heap_mark: 0,
      trail_mark: 0,
      frame_mark: 0
    });
    machine.update_hb();
    machine.trail.push(0);

    machine.cut_to(0);
    assert!(machine.choice_points.is_empty());
    assert_eq!(machine.trail.len(), 1);
    assert_eq!(machine.hb, 0);
  }

  #[test]
  fn classic_query_against_classic_program_unifies() {
    // The M0 example: program p(f(X), h(Y, f(a)), Y), query ?- p(Z, h(Z, W), f(W)).
    let mut interner = Interner::new();
    let mut database = Database::new(&mut interner);

    let sentences = crate::parser::parse("p(f(X), h(Y, f(a)), Y).").unwrap();
    if let crate::term::Sentence::Clause(clause) = &sentences[0] {
      let compiled = ClauseCompiler::new(&mut interner).compile_clause(clause).unwrap();
      database.assert(compiled);
    }

    let query_sentences = crate::parser::parse("?- p(Z, h(Z, W), f(W)).").unwrap();
    let compiled_query = match &query_sentences[0] {
      crate::term::Sentence::Query(goals) => {
        ClauseCompiler::new(&mut interner).compile_query(goals).unwrap()
      }
      _ => panic!("expected a query")
    };

    let mut machine = Machine::new(&compiled_query, &database, &interner, None);
    loop {
      match machine.step() {
        Step::Continue => continue,
        Step::Solution => break,
        Step::Fail     => panic!("the classic example must unify")
      }
    }
  }
}
