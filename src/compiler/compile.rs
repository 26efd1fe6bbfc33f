/*!
  Functions to produce a compilation artifact from a parsed clause or query.

  The compilation pipeline is this:
  ```text
  text -> [`parser::parse`] -> `Sentence`s ->⋯

  ⋯-> [`Variables::classify`] -> permanent/temporary assignment ->⋯

  ⋯-> [`ClauseCompiler`] -> `Instruction`s stored in the clause database
  ```
  Head arguments compile to the `get`/`unify` family, flattening nested structures
  outer-first so that the machine never unifies recursively at dispatch time. Body goal
  arguments compile to the `put`/`set` family, building nested structures inner-first so
  a register is always assigned before it is used. The last goal of a rule compiles
  tail-call style to `Deallocate` + `Execute`; a query keeps its frame alive and ends in
  `Halt` so its bindings can be read out as a solution.
*/

use std::collections::VecDeque;
use std::rc::Rc;

use string_cache::DefaultAtom;

use crate::address::Address;
use crate::error::CompileError;
use crate::functor::{ArityType, Functor, FunctorId};
use crate::instruction::{Instruction, Literal};
use crate::interner::Interner;
use crate::term::{Clause, Term};
use super::variables::Variables;

/// A compiled program clause: a linear instruction sequence plus its static metadata.
#[derive(Clone, Debug)]
pub struct CompiledClause {
  pub functor    : FunctorId,
  pub arity      : ArityType,
  /// Number of permanent-variable slots the clause's environment frame needs.
  pub permanents : usize,
  pub code       : Rc<Vec<Instruction>>,
  /// The source form of the clause, kept for listings and diagnostics.
  pub source     : String
}

/// A compiled query. The bindings map each named query variable to the frame slot its
/// value must be read from when a solution is extracted.
#[derive(Clone, Debug)]
pub struct CompiledQuery {
  pub permanents : usize,
  pub code       : Rc<Vec<Instruction>>,
  pub bindings   : Vec<(DefaultAtom, usize)>,
  pub source     : String
}

/// Compiles one clause or query at a time against a shared interner.
pub struct ClauseCompiler<'a> {
  interner: &'a mut Interner
}

impl<'a> ClauseCompiler<'a> {

  pub fn new(interner: &'a mut Interner) -> ClauseCompiler<'a> {
    ClauseCompiler{ interner }
  }

  /// Compiles a program clause. The head must be callable; this is checked before any
  /// instruction is emitted.
  pub fn compile_clause(&mut self, clause: &Clause) -> Result<CompiledClause, CompileError> {
    let source = format!("{}", clause);

    let head_functor = match clause.head.functor() {
      Some(functor) => functor,
      None          => {
        return Err(CompileError::HeadNotCallable {
          head: format!("{}", clause.head),
          clause: source
        });
      }
    };

    let body = normalize_goals(&clause.body, &source)?;
    let variables = Variables::classify(Some(&clause.head), &body, false);

    let mut emitter = Emitter::new(
      &mut *self.interner,
      variables,
      register_base(Some(&head_functor), &body)
    );

    let has_environment = !body.is_empty();
    if has_environment {
      emitter.emit(Instruction::Allocate { slots: emitter.variables.permanent_count() });
    }

    if let Term::Structure{ args, .. } = &clause.head {
      for (index, arg) in args.iter().enumerate() {
        emitter.head_argument(arg, index);
      }
    }

    if body.is_empty() {
      emitter.emit(Instruction::Proceed);
    } else {
      emitter.body_goals(&body, BodyStyle::Rule);
    }

    let functor = emitter.interner.intern_functor(&head_functor);
    let permanents = emitter.variables.permanent_count();
    let code = emitter.finish();

    Ok(CompiledClause {
      functor,
      arity: head_functor.arity,
      permanents,
      code: Rc::new(code),
      source
    })
  }

  /// Compiles a query. Every named variable is permanent so that its binding survives
  /// backtracking and can be reported; the emitted code ends in `Halt` rather than
  /// deallocating, keeping the query frame readable.
  pub fn compile_query(&mut self, goals: &[Term]) -> Result<CompiledQuery, CompileError> {
    let source = {
      let rendered: Vec<String> = goals.iter().map(|g| format!("{}", g)).collect();
      format!("?- {}.", rendered.join(", "))
    };

    let body = normalize_goals(goals, &source)?;
    let variables = Variables::classify(None, &body, true);

    let mut emitter = Emitter::new(
      &mut *self.interner,
      variables,
      register_base(None, &body)
    );

    emitter.emit(Instruction::Allocate { slots: emitter.variables.permanent_count() });
    emitter.body_goals(&body, BodyStyle::Query);
    emitter.emit(Instruction::Halt);

    let permanents = emitter.variables.permanent_count();
    let bindings = emitter.variables
                          .frame_bindings()
                          .into_iter()
                          .filter(|(name, _)| !name.starts_with('_'))
                          .collect();
    let code = emitter.finish();

    Ok(CompiledQuery {
      permanents,
      code: Rc::new(code),
      bindings,
      source
    })
  }

}

/// Whether a body belongs to a rule (tail-call the last goal) or a query (plain calls
/// throughout, frame kept).
#[derive(Copy, Clone, Eq, PartialEq)]
enum BodyStyle {
  Rule,
  Query
}

/**
  Validates body goals and puts them in callable form: a variable goal `X` becomes
  `call(X)`; wildcards and numbers are rejected. The cut atom passes through and is
  recognized again at emission.
*/
fn normalize_goals(goals: &[Term], clause_source: &str) -> Result<Vec<Term>, CompileError> {
  let mut normalized = Vec::with_capacity(goals.len());
  for goal in goals {
    match goal {

      Term::Variable(_) => {
        normalized.push(Term::structure("call", vec![goal.clone()]));
      }

      | Term::Atom(_)
      | Term::Structure{..} => {
        normalized.push(goal.clone());
      }

      _ => {
        return Err(CompileError::GoalNotCallable {
          goal: format!("{}", goal),
          clause: clause_source.to_string()
        });
      }

    }
  }
  Ok(normalized)
}

/// The first register index available for temporaries: one past the widest argument list
/// in the clause, so temporaries never collide with argument registers.
fn register_base(head: Option<&Functor>, body: &[Term]) -> usize {
  let mut base = head.map(|f| f.arity as usize).unwrap_or(0);
  for goal in body {
    if let Some(functor) = goal.functor() {
      base = base.max(functor.arity as usize);
    }
  }
  base
}

fn is_cut(goal: &Term) -> bool {
  match goal {
    Term::Atom(name) => &**name == "!",
    _                => false
  }
}

/// The per-clause emission state: the growing code vector, the variable registry, and the
/// temporary-register cursor.
struct Emitter<'e> {
  interner      : &'e mut Interner,
  variables     : Variables,
  code          : Vec<Instruction>,
  next_register : usize
}

impl<'e> Emitter<'e> {

  fn new(interner: &'e mut Interner, variables: Variables, register_base: usize)
    -> Emitter<'e>
  {
    Emitter {
      interner,
      variables,
      code: Vec::new(),
      next_register: register_base
    }
  }

  fn finish(self) -> Vec<Instruction> {
    self.code
  }

  fn emit(&mut self, instruction: Instruction) {
    self.code.push(instruction);
  }

  fn fresh_register(&mut self) -> Address {
    let address = Address::from_reg_idx(self.next_register);
    self.next_register += 1;
    address
  }

  fn literal(&mut self, term: &Term) -> Literal {
    match term {
      Term::Atom(name) => Literal::Atom(self.interner.intern(name, 0)),
      Term::Integer(i) => Literal::Int(*i),
      Term::Float(x)   => Literal::Flt(*x),
      _                => unreachable!("Error: Non-literal term {} used as a literal.", term)
    }
  }

  /// One occurrence of a named variable: its storage address and whether it is the first.
  fn variable(&mut self, name: &DefaultAtom) -> (Address, bool) {
    let next = &mut self.next_register;
    self.variables.occurrence(name, || {
      let address = Address::from_reg_idx(*next);
      *next += 1;
      address
    })
  }

  // region Head (get/unify) emission

  /**
    Compiles one top-level head argument. Nested structures are decomposed breadth first:
    the outer structure emits a `GetStructure` immediately and leaves a fresh register for
    each structural subterm, which a later `GetStructure` then examines.
  */
  fn head_argument(&mut self, arg: &Term, register: usize) {
    match arg {

      // Any argument matches; nothing to check, nothing to record.
      Term::Wildcard => {}

      Term::Variable(name) => {
        let (slot, first) = self.variable(name);
        match first {
          true  => self.emit(Instruction::GetVariable { slot, register }),
          false => self.emit(Instruction::GetValue    { slot, register })
        }
      }

      | Term::Atom(_)
      | Term::Integer(_)
      | Term::Float(_) => {
        let literal = self.literal(arg);
        self.emit(Instruction::GetConstant { literal, register });
      }

      Term::Structure{ functor, args } => {
        let mut worklist: VecDeque<(Functor, &[Term], usize)> = VecDeque::new();
        worklist.push_back((functor.clone(), args.as_slice(), register));

        while let Some((functor, args, register)) = worklist.pop_front() {
          let id = self.interner.intern_functor(&functor);
          self.emit(Instruction::GetStructure {
            functor: id,
            arity: functor.arity,
            register
          });

          for sub in args {
            match sub {

              Term::Wildcard => self.emit(Instruction::UnifyVoid { count: 1 }),

              Term::Variable(name) => {
                let (slot, first) = self.variable(name);
                match first {
                  true  => self.emit(Instruction::UnifyVariable { slot }),
                  false => self.emit(Instruction::UnifyValue    { slot })
                }
              }

              | Term::Atom(_)
              | Term::Integer(_)
              | Term::Float(_) => {
                let literal = self.literal(sub);
                self.emit(Instruction::UnifyConstant { literal });
              }

              Term::Structure{ functor: sub_functor, args: sub_args } => {
                let temp = self.fresh_register();
                self.emit(Instruction::UnifyVariable { slot: temp });
                worklist.push_back((sub_functor.clone(), sub_args.as_slice(), temp.idx()));
              }

            }
          }
        }
      }

    }
  }

  // endregion Head emission

  // region Body (put/set) emission

  fn body_goals(&mut self, goals: &[Term], style: BodyStyle) {
    for (index, goal) in goals.iter().enumerate() {
      let last = index + 1 == goals.len();

      if is_cut(goal) {
        self.emit(Instruction::Cut);
        if last && style == BodyStyle::Rule {
          self.emit(Instruction::Deallocate);
          self.emit(Instruction::Proceed);
        }
        continue;
      }

      // Goals were normalized, so the functor exists.
      let functor = goal.functor().unwrap();
      if let Term::Structure{ args, .. } = goal {
        for (argument, arg) in args.iter().enumerate() {
          self.goal_argument(arg, argument);
        }
      }

      let id = self.interner.intern_functor(&functor);
      match (last, style) {
        (true, BodyStyle::Rule) => {
          self.emit(Instruction::Deallocate);
          self.emit(Instruction::Execute { functor: id, arity: functor.arity });
        }
        _ => {
          self.emit(Instruction::Call { functor: id, arity: functor.arity });
        }
      }
    }
  }

  /// Compiles one top-level goal argument into argument register `register`.
  fn goal_argument(&mut self, arg: &Term, register: usize) {
    match arg {

      Term::Wildcard => self.emit(Instruction::PutVoid { register }),

      Term::Variable(name) => {
        let (slot, first) = self.variable(name);
        match first {
          true  => self.emit(Instruction::PutVariable { slot, register }),
          false => self.emit(Instruction::PutValue    { slot, register })
        }
      }

      | Term::Atom(_)
      | Term::Integer(_)
      | Term::Float(_) => {
        let literal = self.literal(arg);
        self.emit(Instruction::PutConstant { literal, register });
      }

      Term::Structure{ functor, args } => {
        self.put_structure(functor, args, register);
      }

    }
  }

  /**
    Builds a structure into `register`, inner structures first so that every register a
    `SetValue` references has already been assigned.
  */
  fn put_structure(&mut self, functor: &Functor, args: &[Term], register: usize) {
    // Build every structural argument into its own temporary first.
    let mut built: Vec<Option<Address>> = vec![None; args.len()];
    for (index, sub) in args.iter().enumerate() {
      if let Term::Structure{ functor: sub_functor, args: sub_args } = sub {
        let temp = self.fresh_register();
        self.put_structure(sub_functor, sub_args, temp.idx());
        built[index] = Some(temp);
      }
    }

    let id = self.interner.intern_functor(functor);
    self.emit(Instruction::PutStructure {
      functor: id,
      arity: functor.arity,
      register
    });

    for (index, sub) in args.iter().enumerate() {
      match sub {

        Term::Wildcard => self.emit(Instruction::SetVoid { count: 1 }),

        Term::Variable(name) => {
          let (slot, first) = self.variable(name);
          match first {
            true  => self.emit(Instruction::SetVariable { slot }),
            false => self.emit(Instruction::SetValue    { slot })
          }
        }

        | Term::Atom(_)
        | Term::Integer(_)
        | Term::Float(_) => {
          let literal = self.literal(sub);
          self.emit(Instruction::SetConstant { literal });
        }

        Term::Structure{..} => {
          // Built above; the slot is present by construction.
          self.emit(Instruction::SetValue { slot: built[index].unwrap() });
        }

      }
    }
  }

  // endregion Body emission

}


#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use crate::parser::parse;
  use crate::term::Sentence;
  use super::*;

  fn compile_first(text: &str, interner: &mut Interner) -> CompiledClause {
    let sentences = parse(text).unwrap();
    match &sentences[0] {
      Sentence::Clause(clause) => {
        ClauseCompiler::new(interner).compile_clause(clause).unwrap()
      }
      _ => panic!("expected a clause")
    }
  }

  fn compile_query_text(text: &str, interner: &mut Interner) -> CompiledQuery {
    let sentences = parse(text).unwrap();
    match &sentences[0] {
      Sentence::Query(goals) => {
        ClauseCompiler::new(interner).compile_query(goals).unwrap()
      }
      _ => panic!("expected a query")
    }
  }

  #[test]
  fn compiles_the_classic_program_term() {
    let mut interner = Interner::new();
    let compiled = compile_first("p(f(X), h(Y, f(a)), Y).", &mut interner);

    let f = interner.get("f", 1).unwrap();
    let h = interner.get("h", 2).unwrap();
    let a = interner.get("a", 0).unwrap();

    assert_eq!(compiled.arity, 3);
    assert_eq!(compiled.permanents, 0);
    assert_eq!(
      *compiled.code,
      vec![
        Instruction::GetStructure { functor: f, arity: 1, register: 0 },
        Instruction::UnifyVariable { slot: Address::from_reg_idx(3) },
        Instruction::GetStructure { functor: h, arity: 2, register: 1 },
        Instruction::UnifyVariable { slot: Address::from_reg_idx(4) },
        Instruction::UnifyVariable { slot: Address::from_reg_idx(5) },
        Instruction::GetStructure { functor: f, arity: 1, register: 5 },
        Instruction::UnifyConstant { literal: Literal::Atom(a) },
        Instruction::GetValue { slot: Address::from_reg_idx(4), register: 2 },
        Instruction::Proceed
      ]
    );
  }

  #[test]
  fn compiles_the_classic_query_term() {
    let mut interner = Interner::new();
    let compiled = compile_query_text("?- p(Z, h(Z, W), f(W)).", &mut interner);

    let p = interner.get("p", 3).unwrap();
    let h = interner.get("h", 2).unwrap();
    let f = interner.get("f", 1).unwrap();

    assert_eq!(compiled.permanents, 2);
    assert_eq!(
      *compiled.code,
      vec![
        Instruction::Allocate { slots: 2 },
        Instruction::PutVariable { slot: Address::from_frame_idx(0), register: 0 },
        Instruction::PutStructure { functor: h, arity: 2, register: 1 },
        Instruction::SetValue { slot: Address::from_frame_idx(0) },
        Instruction::SetVariable { slot: Address::from_frame_idx(1) },
        Instruction::PutStructure { functor: f, arity: 1, register: 2 },
        Instruction::SetValue { slot: Address::from_frame_idx(1) },
        Instruction::Call { functor: p, arity: 3 },
        Instruction::Halt
      ]
    );
  }

  #[test]
  fn compiles_a_chain_rule_with_permanent_variables() {
    let mut interner = Interner::new();
    let compiled = compile_first("path(X, Z) :- edge(X, Y), path(Y, Z).", &mut interner);

    let edge = interner.get("edge", 2).unwrap();
    let path = interner.get("path", 2).unwrap();

    assert_eq!(compiled.permanents, 2);
    assert_eq!(
      *compiled.code,
      vec![
        Instruction::Allocate { slots: 2 },
        Instruction::GetVariable { slot: Address::from_reg_idx(2), register: 0 },
        Instruction::GetVariable { slot: Address::from_frame_idx(0), register: 1 },
        Instruction::PutValue { slot: Address::from_reg_idx(2), register: 0 },
        Instruction::PutVariable { slot: Address::from_frame_idx(1), register: 1 },
        Instruction::Call { functor: edge, arity: 2 },
        Instruction::PutValue { slot: Address::from_frame_idx(1), register: 0 },
        Instruction::PutValue { slot: Address::from_frame_idx(0), register: 1 },
        Instruction::Deallocate,
        Instruction::Execute { functor: path, arity: 2 }
      ]
    );
  }

  #[test]
  fn cut_in_final_position_still_returns() {
    let mut interner = Interner::new();
    let compiled = compile_first("q(X) :- p(X), !.", &mut interner);

    let p = interner.get("p", 1).unwrap();
    // X lives only in the head + first goal unit, so it is temporary.
    assert_eq!(compiled.permanents, 0);
    assert_eq!(
      *compiled.code,
      vec![
        Instruction::Allocate { slots: 0 },
        Instruction::GetVariable { slot: Address::from_reg_idx(1), register: 0 },
        Instruction::PutValue { slot: Address::from_reg_idx(1), register: 0 },
        Instruction::Call { functor: p, arity: 1 },
        Instruction::Cut,
        Instruction::Deallocate,
        Instruction::Proceed
      ]
    );
  }

  #[test]
  fn wildcard_head_arguments_emit_nothing() {
    let mut interner = Interner::new();
    let compiled = compile_first("f(_, _, _).", &mut interner);
    assert_eq!(*compiled.code, vec![Instruction::Proceed]);
  }

  #[test]
  fn variable_goals_are_wrapped_in_call() {
    let mut interner = Interner::new();
    let compiled = compile_first("apply(G) :- G.", &mut interner);
    let call = interner.get("call", 1).unwrap();
    assert!(compiled.code.contains(&Instruction::Execute { functor: call, arity: 1 }));
  }

  #[test]
  fn rejects_an_uncallable_head() {
    let mut interner = Interner::new();
    let clause = Clause {
      head: Term::Integer(3),
      body: vec![]
    };
    let result = ClauseCompiler::new(&mut interner).compile_clause(&clause);
    assert!(matches!(result, Err(CompileError::HeadNotCallable{..})));
  }

  #[test]
  fn rejects_an_uncallable_goal() {
    let sentences = parse("p :- _.").unwrap();
    let mut interner = Interner::new();
    match &sentences[0] {
      Sentence::Clause(clause) => {
        let result = ClauseCompiler::new(&mut interner).compile_clause(clause);
        assert!(matches!(result, Err(CompileError::GoalNotCallable{..})));
      }
      _ => panic!("expected a clause")
    }
  }
}
