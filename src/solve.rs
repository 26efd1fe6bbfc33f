/*!
  The resolution controller: drives the abstract machine across the clause database.

  The controller selects candidate clauses for each goal, pushes a choice point when more
  than one candidate remains, restores the most recent choice point on failure, implements
  cut by discarding choice points, and yields solutions through the lazy `Solutions`
  iterator. The control builtins (conjunction, disjunction, `call/1`, and negation as
  failure) are intercepted here at dispatch time and driven by short synthesized
  instruction sequences rather than by recursion.

  Failure is a value, not an exception: every step reports `Continue`, `Fail`, or
  `Solution`, and the run loop turns `Fail` into a backtracking transition until either a
  solution is reached or the choice point stack is exhausted.
*/

use std::rc::Rc;

use log::{debug, warn};
use string_cache::DefaultAtom;

use crate::address::{Address, AddressNumberType};
use crate::cell::Cell;
use crate::compiler::{CompiledClause, CompiledQuery};
use crate::functor::{ArityType, FunctorId};
use crate::gc::RootSet;
use crate::instruction::Instruction;
use crate::machine::{Alternatives, ChoicePoint, Continuation, Machine, Step};
use crate::term::Term;
use crate::Code;

/// The terminal outcomes of one resolution run.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum Outcome {
  /// A full proof was found; the query frame holds one solution.
  Solution,
  /// No choice points remain: final failure.
  Exhausted
}

impl<'d> Machine<'d> {

  // region Run loop

  /**
    Runs the machine from the given starting step until a solution is found or the
    search space is exhausted. Passing `Step::Fail` resumes by backtracking first,
    which is exactly how the next solution after a success is requested.
  */
  pub(crate) fn run(&mut self, start: Step) -> Outcome {
    let mut state = start;
    loop {
      state = match state {

        Step::Continue => self.step(),

        Step::Fail     => {
          match self.backtrack() {
            Some(next) => next,
            None       => {
              return Outcome::Exhausted;
            }
          }
        }

        Step::Solution => {
          return Outcome::Solution;
        }

      };
    }
  }

  // endregion Run loop

  // region Goal dispatch

  /**
    Transfers control to a goal: either one of the control builtins, or a procedure from
    the clause database. Dispatch is the goal boundary, so this is also where a
    configured garbage collector is given its collection point, never mid-unification.
  */
  pub(crate) fn dispatch(&mut self, functor: FunctorId, arity: ArityType) -> Step {
    self.collection_point();

    #[cfg(feature = "trace_computation")]
    log::trace!("dispatch {}", self.interner.lookup(functor));

    let builtins = self.database.builtins;
    if arity == 0 {
      if functor == builtins.true_ {
        return self.proceed();
      }
      if functor == builtins.fail || functor == builtins.false_ {
        return Step::Fail;
      }
      if functor == builtins.cut {
        // A meta-called cut prunes to the barrier of the call that reached it.
        let barrier = self.b0;
        self.cut_to(barrier);
        return self.proceed();
      }
    }
    if arity == 1 {
      if functor == builtins.call {
        return self.builtin_call();
      }
      if functor == builtins.negation {
        return self.builtin_negation();
      }
    }
    if arity == 2 {
      if functor == builtins.conj {
        return self.builtin_conjunction();
      }
      if functor == builtins.disj {
        return self.builtin_disjunction();
      }
    }

    let clauses = self.database.procedure(functor, arity);
    match clauses.len() {

      0 => {
        debug!("unknown predicate {} fails", self.interner.lookup(functor));
        Step::Fail
      }

      1 => {
        // A single candidate needs no choice point.
        let clause = clauses[0].clone();
        self.b0 = self.choice_points.len();
        self.enter_clause(&clause)
      }

      _ => {
        let clause = clauses[0].clone();
        self.b0 = self.choice_points.len();
        self.push_choice_point(
          Alternatives::Clauses { functor, arity, next: 1 },
          arity as usize
        );
        self.enter_clause(&clause)
      }

    }
  }

  fn enter_clause(&mut self, clause: &Rc<CompiledClause>) -> Step {
    self.code = clause.code.clone();
    self.pc = 0;
    Step::Continue
  }

  /// Jumps to the current continuation; used by builtins that succeed immediately.
  fn proceed(&mut self) -> Step {
    match self.continuation.clone() {
      Some(continuation) => {
        self.code = continuation.code;
        self.pc = continuation.pc;
        Step::Continue
      }
      None => unreachable!("Error: builtin returned with no continuation.")
    }
  }

  // endregion Goal dispatch

  // region Choice points and backtracking

  fn push_choice_point(&mut self, alternatives: Alternatives, arity: usize){
    let arguments = (0..arity).map(|i| self.register(i)).collect();
    let choice_point = ChoicePoint {
      alternatives,
      arguments,
      environment: self.environment,
      continuation: self.continuation.clone(),
      heap_mark: self.heap.len(),
      trail_mark: self.trail.len(),
      frame_mark: self.frames.len()
    };
    self.choice_points.push(choice_point);
    self.hb = self.heap.len();
  }

  /**
    Restores the most recent choice point and commits to its next alternative. Returns
    `None` when no choice point remains, which is final failure. The restore undoes the
    trail strictly newest-first down to the choice point's mark, truncates the heap to
    its high-water mark, and discards frames created since.
  */
  pub(crate) fn backtrack(&mut self) -> Option<Step> {
    #[cfg(feature = "trace_computation")]
    log::trace!("backtrack ({} choice point(s))", self.choice_points.len());

    if self.choice_points.is_empty() {
      return None;
    }

    // Restore the saved machine state.
    let (trail_mark, heap_mark, frame_mark, environment, continuation, arguments) = {
      let choice_point = self.choice_points.last().unwrap();
      (
        choice_point.trail_mark,
        choice_point.heap_mark,
        choice_point.frame_mark,
        choice_point.environment,
        choice_point.continuation.clone(),
        choice_point.arguments.clone()
      )
    };

    self.unwind_trail(trail_mark);
    self.heap.truncate(heap_mark);
    self.frames.truncate(frame_mark);
    self.environment = environment;
    self.continuation = continuation;
    for (index, cell) in arguments.into_iter().enumerate() {
      self.set_register(index, cell);
    }
    self.b0 = self.choice_points.len() - 1;

    // Commit to the next alternative.
    enum Resumption {
      Clause { functor: FunctorId, arity: ArityType, chosen: usize },
      Branch { address: AddressNumberType },
      Negation
    }

    let index = self.choice_points.len() - 1;
    let resumption = match &mut self.choice_points[index].alternatives {

      Alternatives::Clauses { functor, arity, next } => {
        let chosen = *next;
        *next += 1;
        Resumption::Clause { functor: *functor, arity: *arity, chosen }
      }

      Alternatives::Branch { address } => Resumption::Branch { address: *address },

      Alternatives::NegationSucceed => Resumption::Negation

    };

    match resumption {

      Resumption::Clause { functor, arity, chosen } => {
        let total = self.database.procedure(functor, arity).len();
        if chosen + 1 == total {
          // Last alternative: the choice point has served its purpose.
          self.choice_points.pop();
        }
        self.update_hb();
        let clause = self.database.procedure(functor, arity)[chosen].clone();
        Some(self.enter_clause(&clause))
      }

      Resumption::Branch { address } => {
        // A disjunction has exactly two branches; this was the last.
        self.choice_points.pop();
        self.update_hb();
        Some(self.meta_call(address))
      }

      Resumption::Negation => {
        // The negated goal was exhausted: the attempt's bindings are already undone by
        // the restore above, and the negation as a whole succeeds.
        self.choice_points.pop();
        self.update_hb();
        Some(self.proceed())
      }

    }
  }

  // endregion Choice points and backtracking

  // region Control builtins

  /// `call/1`: meta-call the argument term. The callee's cut barrier is local.
  fn builtin_call(&mut self) -> Step {
    let cell = self.register(0);
    let address = self.term_address(cell);
    self.meta_call(address)
  }

  /**
    `','/2` as a meta-called goal: run both subgoals in order. A tiny synthesized
    sequence drives the two calls through an environment of its own, so the caller's
    continuation is restored afterward exactly as for a compiled rule body.
  */
  fn builtin_conjunction(&mut self) -> Step {
    let left_cell  = self.register(0);
    let right_cell = self.register(1);
    let left  = self.term_address(left_cell);
    let right = self.term_address(right_cell);

    let code: Code = Rc::new(vec![
      Instruction::Allocate { slots: 0 },
      Instruction::CallTerm { address: left },
      Instruction::CallTerm { address: right },
      Instruction::Deallocate,
      Instruction::Proceed
    ]);
    self.code = code;
    self.pc = 0;
    Step::Continue
  }

  /**
    `';'/2`: offer both branches as alternatives. The untaken right branch lives in a
    choice point; backtracking into it meta-calls that branch with the state restored
    to the moment of the disjunction.
  */
  fn builtin_disjunction(&mut self) -> Step {
    let left_cell  = self.register(0);
    let right_cell = self.register(1);
    // Both branch terms go to the heap before the choice point is pushed, so its
    // high-water mark protects them across backtracking.
    let left  = self.term_address(left_cell);
    let right = self.term_address(right_cell);

    self.push_choice_point(Alternatives::Branch { address: right }, 2);
    self.meta_call(left)
  }

  /**
    `'\\+'/1`, negation as failure: run the goal against a barrier choice point. If the
    goal succeeds, its continuation cuts the barrier away and fails, so the whole
    negation fails with every binding undone by the ensuing backtrack. If the goal is
    exhausted instead, backtracking restores the barrier, undoing the attempt's
    bindings, and the negation as a whole succeeds with the caller's continuation.
  */
  fn builtin_negation(&mut self) -> Step {
    let cell = self.register(0);
    let address = self.term_address(cell);

    self.push_choice_point(Alternatives::NegationSucceed, 1);
    let barrier = self.choice_points.len() - 1;

    self.continuation = Some(Continuation {
      code: Rc::new(vec![
        Instruction::CutTo { depth: barrier },
        Instruction::Fail
      ]),
      pc: 0
    });
    self.meta_call(address)
  }

  /**
    The heap address of a term held in a register. A reference cell already names one;
    any other cell is copied to the top of the heap so the synthesized control code can
    refer to it by address.
  */
  fn term_address(&mut self, cell: Cell) -> AddressNumberType {
    match cell {
      Cell::Ref(address) => address.require_heap(),
      other              => {
        let address = self.heap.len();
        self.heap.push(other);
        address
      }
    }
  }

  /// Calls the goal denoted by the heap term at `address`.
  pub(crate) fn meta_call(&mut self, address: AddressNumberType) -> Step {
    let cell = self.dereference(Cell::Ref(Address::from_heap_idx(address)));
    match cell {

      Cell::Con(functor) => self.dispatch(functor, 0),

      Cell::Str(header) => {
        let header = header.require_heap();
        let (functor, arity) = self.functor_at(header);
        for index in 0..arity as usize {
          let argument = self.heap[header + 1 + index].clone();
          self.set_register(index, argument);
        }
        self.dispatch(functor, arity)
      }

      Cell::Ref(_) => {
        warn!("meta-call of an unbound variable fails");
        Step::Fail
      }

      other => {
        warn!("meta-call of non-callable term {} fails", other);
        Step::Fail
      }

    }
  }

  // endregion Control builtins

  // region Garbage collection hook

  /// Offers the configured collector a collection point. Dispatch boundaries are the
  /// only places this is called from, so the collector never observes a heap that is
  /// mid-unification.
  fn collection_point(&mut self){
    let mut collector = match self.collector.take() {
      Some(collector) => collector,
      None            => { return; }
    };

    {
      let roots = RootSet {
        heap: &self.heap,
        argument_registers: &self.registers,
        frame_slots: self.frames.iter().map(|frame| frame.slots.as_slice()).collect(),
        choice_point_args: self.choice_points
                               .iter()
                               .map(|choice_point| choice_point.arguments.as_slice())
                               .collect(),
        trail: &self.trail
      };
      collector.collect(&roots);
    }

    self.collector = Some(collector);
  }

  // endregion Garbage collection hook

  // region Solution extraction

  /**
    Reads the current bindings of the query's named variables out of the query frame,
    fully dereferencing each through the heap. Variables that are still unbound are
    absent from the result.
  */
  pub(crate) fn collect_solution(&self, query: &CompiledQuery) -> Solution {
    let mut bindings: Vec<(DefaultAtom, Term)> = Vec::new();

    // The query's environment is the first frame allocated and is never truncated.
    let frame = &self.frames[0];
    for (name, slot) in query.bindings.iter() {
      let cell = frame.slots[*slot].clone();
      match self.dereference(cell) {
        Cell::Ref(_) => {
          // Unbound: the solution places no constraint on this variable.
        }
        value => {
          bindings.push((name.clone(), self.decode_term(value, 0)));
        }
      }
    }

    Solution { bindings }
  }

  /// Rebuilds the `Term` a heap cell denotes. Guarded against cyclic structures, which
  /// sound unification cannot produce; hitting the guard aborts loudly.
  fn decode_term(&self, cell: Cell, depth: usize) -> Term {
    if depth > self.heap.len() {
      panic!("Fatal: cyclic structure while decoding a solution; the heap is corrupt.");
    }

    match self.dereference(cell) {

      Cell::Ref(address) => {
        // An unbound variable nested inside a reported term gets a heap-stable name.
        let name = format!("_G{}", address.require_heap());
        Term::Variable(DefaultAtom::from(name.as_str()))
      }

      Cell::Con(id) => Term::Atom(self.interner.lookup(id).name.clone()),

      Cell::Int(i) => Term::Integer(i),

      Cell::Flt(x) => Term::Float(x),

      Cell::Str(header) => {
        let header = header.require_heap();
        let (id, arity) = self.functor_at(header);
        let functor = self.interner.lookup(id).clone();
        let args = (1..=arity as usize)
          .map(|index| self.decode_term(self.heap[header + index].clone(), depth + 1))
          .collect();
        Term::Structure { functor, args }
      }

      cell => panic!("Fatal: cannot decode cell {} as a term.", cell)

    }
  }

  // endregion Solution extraction

}


// region Solution and Solutions

/// One answer: the named query variables with their bound values, in order of first
/// occurrence in the query. Unbound and anonymous variables never appear.
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
  bindings: Vec<(DefaultAtom, Term)>
}

impl Solution {

  pub fn get(&self, name: &str) -> Option<&Term> {
    self.bindings
        .iter()
        .find(|(binding_name, _)| &**binding_name == name)
        .map(|(_, term)| term)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&DefaultAtom, &Term)> {
    self.bindings.iter().map(|(name, term)| (name, term))
  }

  pub fn len(&self) -> usize {
    self.bindings.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bindings.is_empty()
  }

}

impl std::fmt::Display for Solution {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if self.bindings.is_empty() {
      return write!(f, "true");
    }
    for (index, (name, term)) in self.bindings.iter().enumerate() {
      if index != 0 {
        write!(f, ", ")?;
      }
      write!(f, "{} = {}", name, term)?;
    }
    Ok(())
  }
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum SolutionsState {
  /// The machine has not run yet.
  Fresh,
  /// At least one solution has been yielded; the next request backtracks first.
  Yielded,
  /// The search space is exhausted.
  Done
}

/**
  The lazy sequence of solutions to one query. Each `next()` consumes exactly one
  resolution step: the first call runs the machine to its first success, and every
  later call backtracks into the most recent choice point before running on. The
  sequence is finite iff the search space is; no depth bound is imposed.
*/
pub struct Solutions<'d> {
  machine : Machine<'d>,
  query   : CompiledQuery,
  state   : SolutionsState
}

impl<'d> Solutions<'d> {

  pub(crate) fn new(machine: Machine<'d>, query: CompiledQuery) -> Solutions<'d> {
    Solutions {
      machine,
      query,
      state: SolutionsState::Fresh
    }
  }

  /// A sequence that is over before it starts; used when no query was prepared.
  pub(crate) fn exhausted(machine: Machine<'d>, query: CompiledQuery) -> Solutions<'d> {
    Solutions {
      machine,
      query,
      state: SolutionsState::Done
    }
  }

}

impl<'d> Iterator for Solutions<'d> {
  type Item = Solution;

  fn next(&mut self) -> Option<Self::Item> {
    let start = match self.state {
      SolutionsState::Fresh   => Step::Continue,
      SolutionsState::Yielded => Step::Fail,
      SolutionsState::Done    => {
        return None;
      }
    };

    match self.machine.run(start) {

      Outcome::Solution => {
        self.state = SolutionsState::Yielded;
        Some(self.machine.collect_solution(&self.query))
      }

      Outcome::Exhausted => {
        self.state = SolutionsState::Done;
        None
      }

    }
  }
}

// endregion Solution and Solutions
