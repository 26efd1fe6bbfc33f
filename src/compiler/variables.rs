/*!
  A data structure to hold information about the variables in a clause.

  Variable names are interned per clause: the scope of a name is a single clause or query,
  numbering is dense in order of first occurrence, and the registry is built fresh for each
  sentence, so facts, rules, and queries never share variable identity across sentences.

  Classification follows the classic rule: the head and the first body goal form one
  occurrence unit, and every later body goal is its own unit. A variable that occurs in
  more than one unit is *permanent* and is allocated a slot in the environment frame; any
  other variable is *temporary* and lives only in a register. For a query every named
  variable is forced permanent, since the bindings must survive backtracking in order to
  be reported as solutions.
*/

use std::collections::HashMap;

use string_cache::DefaultAtom;

use crate::address::Address;
use crate::term::Term;

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Variable {
  pub name         : DefaultAtom,
  pub is_permanent : bool,
  /// Whether the first occurrence has been compiled yet.
  pub seen         : bool,
  /// The register or frame slot assigned to the variable.
  pub address      : Option<Address>
}

impl Variable{
  fn new(name: DefaultAtom, is_permanent: bool) -> Variable{
    Variable{
      name,
      is_permanent,
      seen: false,
      address: None
    }
  }
}

pub struct Variables {
  variables : HashMap<DefaultAtom, Variable>,
  /// Names in order of first occurrence; a name's index here is its per-clause id.
  order     : Vec<DefaultAtom>,
  permanent_count: usize
}

impl Variables{

  /**
    Builds the registry for one clause. `head` is `None` for a query. When
    `force_permanent` is set every named variable is treated as permanent.
  */
  pub fn classify(head: Option<&Term>, body: &[Term], force_permanent: bool) -> Variables {
    // The names of each occurrence unit, in order.
    let mut units: Vec<Vec<DefaultAtom>> = Vec::new();

    // The variables in the head are included as variables in the first body goal.
    let mut first_unit: Vec<DefaultAtom> = Vec::new();
    if let Some(head) = head {
      collect_variables(head, &mut first_unit);
    }
    if let Some(goal) = body.first() {
      collect_variables(goal, &mut first_unit);
    }
    units.push(first_unit);
    for goal in body.iter().skip(1) {
      let mut unit = Vec::new();
      collect_variables(goal, &mut unit);
      units.push(unit);
    }

    let mut variables: HashMap<DefaultAtom, Variable> = HashMap::new();
    let mut order: Vec<DefaultAtom> = Vec::new();

    for unit in units.iter() {
      // Count each name at most once per unit.
      let mut counted: Vec<&DefaultAtom> = Vec::new();
      for name in unit.iter() {
        if counted.contains(&name) {
          continue;
        }
        counted.push(name);
        match variables.get_mut(name) {

          Some(variable) => {
            // The variable has previously been seen in an earlier unit, so it is
            // live across a goal boundary.
            variable.is_permanent = true;
          }

          None => {
            order.push(name.clone());
            variables.insert(name.clone(), Variable::new(name.clone(), force_permanent));
          }

        }
      }
    }

    // Permanent variables get frame slots in order of first occurrence.
    let mut permanent_count = 0;
    for name in order.iter() {
      let variable = variables.get_mut(name).unwrap();
      if variable.is_permanent {
        variable.address = Some(Address::from_frame_idx(permanent_count));
        permanent_count += 1;
      }
    }

    Variables{
      variables,
      order,
      permanent_count
    }
  }

  pub fn permanent_count(&self) -> usize {
    self.permanent_count
  }

  /// The dense per-clause id of a variable name.
  pub fn id(&self, name: &DefaultAtom) -> Option<i32> {
    self.order.iter().position(|n| n == name).map(|i| i as i32)
  }

  pub fn is_permanent(&self, name: &DefaultAtom) -> bool {
    self.variables
        .get(name)
        .map(|v| v.is_permanent)
        .unwrap_or(false)
  }

  /**
    Records one compiled occurrence of `name`. Returns the variable's storage address and
    whether this was its first occurrence. A temporary variable without a register yet is
    assigned the next one from `fresh_register`.
  */
  pub fn occurrence<F>(&mut self, name: &DefaultAtom, mut fresh_register: F) -> (Address, bool)
    where F: FnMut() -> Address
  {
    let variable = match self.variables.get_mut(name) {
      Some(variable) => variable,
      None           => unreachable!(
        "Error: Variable {} was not classified before compilation.", name
      )
    };

    if variable.address.is_none() {
      variable.address = Some(fresh_register());
    }
    let first = !variable.seen;
    variable.seen = true;

    (variable.address.unwrap(), first)
  }

  /// The named variables that hold frame slots, with their slot indices, in order of
  /// first occurrence. For a query this is the solution-binding map.
  pub fn frame_bindings(&self) -> Vec<(DefaultAtom, usize)> {
    self.order
        .iter()
        .filter_map(|name| {
          let variable = &self.variables[name];
          match variable.address {
            Some(Address::Frame(slot)) => Some((name.clone(), slot)),
            _                          => None
          }
        })
        .collect()
  }

}

/// Appends every variable name in `term` to `out`, in textual order, wildcards excluded.
fn collect_variables(term: &Term, out: &mut Vec<DefaultAtom>){
  match term {

    Term::Variable(name) => out.push(name.clone()),

    Term::Structure{ args, .. } => {
      for arg in args {
        collect_variables(arg, out);
      }
    }

    _ => {}

  }
}


#[cfg(test)]
mod tests {
  use crate::parser::parse;
  use crate::term::Sentence;
  use super::*;

  fn classify_clause(text: &str) -> Variables {
    let sentences = parse(text).unwrap();
    match &sentences[0] {
      Sentence::Clause(clause) => Variables::classify(Some(&clause.head), &clause.body, false),
      Sentence::Query(goals)   => Variables::classify(None, goals, true)
    }
  }

  #[test]
  fn head_and_first_goal_are_one_unit() {
    let variables = classify_clause("f(X) :- g(X).");
    assert!(!variables.is_permanent(&DefaultAtom::from("X")));
  }

  #[test]
  fn spanning_a_goal_boundary_is_permanent() {
    let variables = classify_clause("path(X, Z) :- edge(X, Y), path(Y, Z).");
    assert!(!variables.is_permanent(&DefaultAtom::from("X")));
    assert!(variables.is_permanent(&DefaultAtom::from("Y")));
    assert!(variables.is_permanent(&DefaultAtom::from("Z")));
    assert_eq!(variables.permanent_count(), 2);
  }

  #[test]
  fn query_variables_are_all_permanent() {
    let variables = classify_clause("?- f(X, Y).");
    assert!(variables.is_permanent(&DefaultAtom::from("X")));
    assert!(variables.is_permanent(&DefaultAtom::from("Y")));
    assert_eq!(variables.frame_bindings().len(), 2);
  }

  #[test]
  fn ids_are_dense_in_occurrence_order() {
    let variables = classify_clause("f(B, A) :- g(A, C).");
    assert_eq!(variables.id(&DefaultAtom::from("B")), Some(0));
    assert_eq!(variables.id(&DefaultAtom::from("A")), Some(1));
    assert_eq!(variables.id(&DefaultAtom::from("C")), Some(2));
  }
}
