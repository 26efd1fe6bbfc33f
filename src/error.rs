/*!
  The public error taxonomy.

  Only static problems are errors: source text that does not parse, and clauses the
  compiler rejects before emitting any instructions. Unification failure and search
  exhaustion are routine outcomes, not errors, and never surface through these types;
  the lazy solution sequence simply ends. Internal invariant violations (a cyclic
  dereference chain, a stack underflow) indicate a bug in the machine itself and abort
  the resolution session with a panic rather than being reported here.
*/

use thiserror::Error;

/// A syntactic error with the line on which it was noticed.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("parse error at line {line}: {message}")]
pub struct ParseError {
  pub line    : usize,
  pub message : String
}

/// A clause rejected before compilation began, reported with the offending clause text.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum CompileError {

  #[error("{0}")]
  Parse(#[from] ParseError),

  #[error("clause head is not callable: `{head}` in `{clause}`")]
  HeadNotCallable {
    head   : String,
    clause : String
  },

  #[error("body goal is not callable: `{goal}` in `{clause}`")]
  GoalNotCallable {
    goal   : String,
    clause : String
  },

  #[error("expected a query, but `{0}` contains none")]
  QueryMissing(String),

}
