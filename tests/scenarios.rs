//! End-to-end resolution tests: a program is consulted, a query is resolved, and the
//! reported solutions are compared against the expected bindings in order.

use std::cell::Cell as StdCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use hornvm::{Collector, CompileError, Engine, RootSet, Sentence, Term};

/// Consults `program`, runs `query`, and renders every solution in order.
fn solutions(program: &str, query: &str) -> Vec<String> {
  let mut engine = Engine::new();
  engine.consult(program).unwrap();
  engine.query(query)
        .unwrap()
        .map(|solution| solution.to_string())
        .collect()
}

// region Core resolution scenarios

#[test]
fn single_fact_single_solution() {
  assert_eq!(solutions("f(x).", "?- f(X)."), vec!["X = x"]);
}

#[test]
fn mismatched_constant_fails() {
  assert_eq!(solutions("f(x).", "?- f(y)."), Vec::<String>::new());
}

#[test]
fn rule_resolves_through_its_body() {
  assert_eq!(solutions("g(x). f(X) :- g(X).", "?- f(Y)."), vec!["Y = x"]);
}

#[test]
fn two_facts_yield_two_solutions_in_assertion_order() {
  assert_eq!(solutions("f(x). f(y).", "?- f(X)."), vec!["X = x", "X = y"]);
}

#[test]
fn nested_structures_unify() {
  assert_eq!(solutions("b(f(x)).", "?- b(f(X))."), vec!["X = x"]);
}

#[test]
fn anonymous_variables_never_appear_in_solutions() {
  assert_eq!(solutions("f(_, _, _).", "?- f(_, _, _)."), vec!["true"]);
}

// endregion Core resolution scenarios

// region Conjunction and backtracking

#[test]
fn conjunction_backtracks_through_earlier_goals() {
  let program = "q(a). q(b). r(b, c). p(X, Y) :- q(X), r(X, Y).";
  assert_eq!(solutions(program, "?- p(X, Y)."), vec!["X = b, Y = c"]);
}

#[test]
fn transitive_closure_enumerates_in_order() {
  let program = "edge(a, b). edge(b, c). \
                 path(X, Z) :- edge(X, Z). \
                 path(X, Z) :- edge(X, Y), path(Y, Z).";
  assert_eq!(solutions(program, "?- path(a, Z)."), vec!["Z = b", "Z = c"]);
}

#[test]
fn structure_encoded_lists_append() {
  let program = "app(nil, L, L). app(c(H, T), L, c(H, R)) :- app(T, L, R).";
  assert_eq!(
    solutions(program, "?- app(c(a, c(b, nil)), c(x, nil), R)."),
    vec!["R = c(a, c(b, c(x, nil)))"]
  );
}

#[test]
fn append_runs_backward() {
  let program = "app(nil, L, L). app(c(H, T), L, c(H, R)) :- app(T, L, R).";
  assert_eq!(
    solutions(program, "?- app(X, Y, c(a, nil))."),
    vec!["X = nil, Y = c(a, nil)", "X = c(a, nil), Y = nil"]
  );
}

#[test]
fn failed_head_unification_leaves_no_residual_bindings() {
  // The first clause binds X to a before failing on its second argument; the binding
  // must be fully undone before the second clause is tried.
  assert_eq!(solutions("p(a, b). p(c, d).", "?- p(X, d)."), vec!["X = c"]);
}

#[test]
fn shared_variables_unify_in_both_directions() {
  assert_eq!(solutions("eq(X, X).", "?- eq(f(Y), f(a))."), vec!["Y = a"]);
}

#[test]
fn partial_bindings_with_wildcards() {
  assert_eq!(solutions("f(a, b).", "?- f(_, Y)."), vec!["Y = b"]);
}

#[test]
fn numeric_literals_resolve() {
  assert_eq!(solutions("num(3). num(2.5).", "?- num(X)."), vec!["X = 3", "X = 2.5"]);
}

#[test]
fn solutions_are_lazy_over_an_infinite_space() {
  let program = "nat(z). nat(s(X)) :- nat(X).";
  let mut engine = Engine::new();
  engine.consult(program).unwrap();
  let first_three: Vec<String> = engine.query("?- nat(X).")
                                       .unwrap()
                                       .take(3)
                                       .map(|solution| solution.to_string())
                                       .collect();
  assert_eq!(first_three, vec!["X = z", "X = s(z)", "X = s(s(z))"]);
}

// endregion Conjunction and backtracking

// region Cut

#[test]
fn cut_commits_to_the_first_alternative() {
  let program = "p(a). p(b). q(X) :- p(X), !.";
  assert_eq!(solutions(program, "?- q(X)."), vec!["X = a"]);
}

#[test]
fn cut_is_irrevocable_under_later_failure() {
  // q commits to X = a; when r(a) fails there is nothing left to retry, even though
  // p(b), r(b) would have succeeded without the cut.
  let program = "p(a). p(b). r(b). q(X) :- p(X), !.";
  assert_eq!(solutions(program, "?- q(X), r(X)."), Vec::<String>::new());
}

#[test]
fn cut_only_prunes_its_own_clause() {
  let program = "p(a). p(b). q(X) :- p(X), !. q(z).";
  // The cut discards q's remaining clause alternatives as well as p's.
  assert_eq!(solutions(program, "?- q(X)."), vec!["X = a"]);
}

// endregion Cut

// region Control builtins

#[test]
fn true_succeeds_and_fail_fails() {
  assert_eq!(solutions("g.", "?- true."), vec!["true"]);
  assert_eq!(solutions("g.", "?- fail."), Vec::<String>::new());
  assert_eq!(solutions("g.", "?- false."), Vec::<String>::new());
}

#[test]
fn disjunction_offers_both_branches() {
  let program = "e(1). f(2). d(X) :- (e(X) ; f(X)).";
  assert_eq!(solutions(program, "?- d(X)."), vec!["X = 1", "X = 2"]);
}

#[test]
fn disjunction_with_failing_left_branch() {
  assert_eq!(solutions("g.", "?- (fail ; g)."), vec!["true"]);
}

#[test]
fn conjunction_nested_inside_disjunction() {
  assert_eq!(solutions("g. h.", "?- (fail, g ; g, h)."), vec!["true"]);
}

#[test]
fn negation_as_failure() {
  let program = "man(socrates).";
  assert_eq!(solutions(program, "?- \\+ man(socrates)."), Vec::<String>::new());
  assert_eq!(solutions(program, "?- \\+ man(zeus)."), vec!["true"]);
}

#[test]
fn negation_discards_bindings_from_the_attempt() {
  let program = "male(henry). male(tom). married(tom). \
                 bachelor(X) :- male(X), \\+ married(X).";
  assert_eq!(solutions(program, "?- bachelor(X)."), vec!["X = henry"]);
}

#[test]
fn negated_goal_with_a_solution_makes_the_negation_fail() {
  assert_eq!(solutions("p(a).", "?- \\+ p(X)."), Vec::<String>::new());
}

#[test]
fn call_meta_calls_its_argument() {
  assert_eq!(solutions("p(1).", "?- call(p(X))."), vec!["X = 1"]);
}

#[test]
fn variable_goals_are_meta_called() {
  let program = "p(1). apply(G) :- G.";
  assert_eq!(solutions(program, "?- apply(p(X))."), vec!["X = 1"]);
}

#[test]
fn meta_calling_an_unbound_variable_fails_quietly() {
  assert_eq!(solutions("g.", "?- X."), Vec::<String>::new());
}

#[test]
fn unknown_predicates_fail_rather_than_error() {
  assert_eq!(solutions("g.", "?- ghost(x)."), Vec::<String>::new());
}

// endregion Control builtins

// region Engine surface

#[test]
fn resolution_is_deterministic_across_fresh_runs() {
  let program = "edge(a, b). edge(b, c). \
                 path(X, Z) :- edge(X, Z). \
                 path(X, Z) :- edge(X, Y), path(Y, Z).";
  let first  = solutions(program, "?- path(X, Z).");
  let second = solutions(program, "?- path(X, Z).");
  assert_eq!(first, second);
}

#[test]
fn the_same_engine_reruns_a_query_identically() {
  let mut engine = Engine::new();
  engine.consult("f(x). f(y).").unwrap();
  let first: Vec<String> =
    engine.query("?- f(X).").unwrap().map(|s| s.to_string()).collect();
  let second: Vec<String> =
    engine.query("?- f(X).").unwrap().map(|s| s.to_string()).collect();
  assert_eq!(first, second);
}

#[test]
fn compile_and_resolve_follow_the_sentence_contract() {
  let mut engine = Engine::new();
  for sentence in hornvm::parse("f(x). f(y). ?- f(X).").unwrap() {
    engine.compile(sentence).unwrap();
  }
  assert!(engine.has_pending_query());
  let answers: Vec<String> = engine.resolve().map(|s| s.to_string()).collect();
  assert_eq!(answers, vec!["X = x", "X = y"]);
  // The query was consumed; resolving again yields nothing.
  assert!(!engine.has_pending_query());
  assert_eq!(engine.resolve().count(), 0);
}

#[test]
fn reset_clears_the_database() {
  let mut engine = Engine::new();
  engine.consult("f(x).").unwrap();
  assert_eq!(engine.query("?- f(X).").unwrap().count(), 1);
  engine.reset();
  assert_eq!(engine.query("?- f(X).").unwrap().count(), 0);
}

#[test]
fn solution_bindings_are_inspectable() {
  let mut engine = Engine::new();
  engine.consult("f(x, g(y)).").unwrap();
  let solution = engine.query("?- f(A, B).").unwrap().next().unwrap();
  assert_eq!(solution.len(), 2);
  assert!(matches!(solution.get("A"), Some(Term::Atom(_))));
  assert!(matches!(solution.get("B"), Some(Term::Structure{..})));
  assert!(solution.get("C").is_none());
}

#[test]
fn parse_errors_surface_as_compile_errors() {
  let mut engine = Engine::new();
  assert!(matches!(engine.consult("f("), Err(CompileError::Parse(_))));
}

#[test]
fn query_requires_a_query_sentence() {
  let mut engine = Engine::new();
  assert!(matches!(engine.query("f(x)."), Err(CompileError::QueryMissing(_))));
}

#[test]
fn listing_covers_loaded_clauses() {
  let mut engine = Engine::new();
  engine.consult("f(x). g(X) :- f(X).").unwrap();
  let listing = engine.listing();
  assert!(listing.contains("% f(x)."));
  assert!(listing.contains("GetConstant(x, X[1])"));
  assert!(listing.contains("Execute(f/1)"));
}

#[test]
fn loading_a_query_by_sentence_matches_text_queries() {
  let mut engine = Engine::new();
  engine.consult("f(x).").unwrap();
  let sentences = hornvm::parse("?- f(X).").unwrap();
  assert!(matches!(sentences[0], Sentence::Query(_)));
  engine.compile(sentences.into_iter().next().unwrap()).unwrap();
  assert_eq!(engine.resolve().count(), 1);
}

// endregion Engine surface

// region Garbage collection hook

struct CountingCollector {
  invocations: Rc<StdCell<usize>>
}

impl Collector for CountingCollector {
  fn collect(&mut self, roots: &RootSet<'_>) {
    // The root set is fully traversable at every collection point.
    let _ = roots.roots().count();
    let _ = roots.trail.len();
    self.invocations.set(self.invocations.get() + 1);
  }
}

#[test]
fn the_collector_runs_at_goal_boundaries() {
  let invocations = Rc::new(StdCell::new(0));
  let mut engine = Engine::new();
  engine.set_collector(Box::new(CountingCollector {
    invocations: invocations.clone()
  }));
  engine.consult("g(x). f(X) :- g(X).").unwrap();
  let count = engine.query("?- f(Y).").unwrap().count();
  assert_eq!(count, 1);
  // One collection point per goal dispatch: f/1 and g/1 at least.
  assert!(invocations.get() >= 2);
}

// endregion Garbage collection hook
