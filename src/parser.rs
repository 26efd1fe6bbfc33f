/*!

This module parses Prolog-like source code into `Sentence` values. It is the textual front
end of the engine; everything downstream of it works on `Term`s and never on source text.

The language is given by the following EBNF:
    ```
    <sentences>   ::=  <sentence>*
    <sentence>    ::=  <clause> | <query>
    <clause>      ::=  <predicate> ( ':-' <body> )? '.'
    <query>       ::=  '?-' <body> '.'
    <body>        ::=  <disjunct>
    <disjunct>    ::=  <conjunct> ( ';' <disjunct> )?
    <conjunct>    ::=  <goal> ( ',' <goal> )*
    <goal>        ::=  '!' | '\+' <goal> | '(' <disjunct> ')' | <predicate> | <variable>
    <predicate>   ::=  <structure>
    <term>        ::=  <number> | <variable> | <structure>
    <structure>   ::=  <small_atom> '(' <term> ( ',' <term> )* (',')? ')' | <small_atom>
    <small_atom>  ::=  <lowercase> <alphanumeric_>*
    <variable>    ::=  ( <uppercase> | '_' ) <alphanumeric_>*
    <number>      ::=  '-'? <digits> ( '.' <digits> )?
    ```

Special lexical forms, which are ignored:
    ```
    <eol_comment>     ::= '%' .* ('\n' | EOF)
    <inline_comment>  ::= '(*' (.* | '\n')* '*)'
    <whitespace>      ::= [ \t\cr\n\lf]+
    ```

Whitespace and comments are ignored. Note that comments are not nested. We allow
comma-delineated lists to have a trailing comma without warning. Constants are represented
as atoms, i.e. functors with a zero-length argument list. A bare `_` is the anonymous
variable; every occurrence of it is fresh. The conjunction `,` binds tighter than the
disjunction `;`, and both associate to the right.

*/

use nom::{
  branch::alt,
  bytes::complete::{
    tag,
    take_until,
    take_while,
    take_while1
  },
  character::complete::{
    char as one_char,
    digit1,
    multispace1
  },
  combinator::{
    map,
    map_res,
    opt,
    recognize
  },
  multi::{
    many0,
    separated_nonempty_list
  },
  sequence::{
    delimited,
    pair,
    preceded,
    separated_pair,
    terminated,
    tuple
  },
  IResult
};
use string_cache::DefaultAtom;

use crate::error::ParseError;
use crate::term::{Clause, Sentence, Term, TermVec};

/// Parses text to produce a sequence of `Sentence`s, reporting the first syntax error
/// with the line on which it occurred.
pub fn parse(input: &str) -> Result<Vec<Sentence>, ParseError> {
  let mut sentences: Vec<Sentence> = Vec::new();
  let mut text = input;

  loop {
    // `pskip` cannot fail; it accepts the empty string.
    if let Ok((rest, _)) = pskip(text) {
      text = rest;
    }
    if text.is_empty() {
      break;
    }

    match psentence(text) {

      Ok((rest, sentence)) => {
        sentences.push(sentence);
        text = rest;
      }

      Err(_) => {
        return Err(ParseError {
          line: line_of(input, text),
          message: format!("could not parse sentence beginning `{}`", snippet(text))
        });
      }

    }
  }

  Ok(sentences)
}

/// The 1-based line number at which the unparsed suffix `rest` begins.
fn line_of(input: &str, rest: &str) -> usize {
  let consumed = input.len() - rest.len();
  input[..consumed].chars().filter(|c| *c == '\n').count() + 1
}

/// A short prefix of the offending text for error messages.
fn snippet(text: &str) -> String {
  let line = text.lines().next().unwrap_or("").trim();
  if line.chars().count() > 40 {
    let prefix: String = line.chars().take(40).collect();
    format!("{}…", prefix)
  } else {
    line.to_string()
  }
}


// region Sentence parsers

fn psentence(text: &str) -> IResult<&str, Sentence>{
  alt((pquery, prule, pfact))(text)
}

/// <query> ::= '?-' <body> '.'
fn pquery(text: &str) -> IResult<&str, Sentence>{
  map(
    delimited(ws(tag("?-")), pbody, wst(one_char('.'))),
    Sentence::Query
  )(text)
}

/// <rule> ::= <predicate> ':-' <body> '.'
fn prule(text: &str) -> IResult<&str, Sentence>{
  map(
    terminated(
      separated_pair(ppredicate, wst(tag(":-")), pbody),
      wst(one_char('.'))
    ),
    |(head, body)| Sentence::Clause(Clause{ head, body })
  )(text)
}

/// <fact> ::= <predicate> '.'
fn pfact(text: &str) -> IResult<&str, Sentence>{
  map(
    terminated(ppredicate, wst(one_char('.'))),
    |head| Sentence::Clause(Clause{ head, body: vec![] })
  )(text)
}

// endregion Sentence parsers

// region Goal parsers

/**
  A body is a single goal expression. If the expression is a top-level conjunction it is
  split into the goal list here; a disjunction stays a single `;/2` goal and is taken
  apart by the resolution controller at run time.
*/
fn pbody(text: &str) -> IResult<&str, TermVec>{
  map(pdisjunct, |term| {
    let mut goals = Vec::new();
    flatten_conjunction(term, &mut goals);
    goals
  })(text)
}

fn flatten_conjunction(term: Term, goals: &mut TermVec){
  let is_conjunction = match &term {
    Term::Structure{ functor, .. } => &*functor.name == "," && functor.arity == 2,
    _                              => false
  };

  if is_conjunction {
    if let Term::Structure{ args, .. } = term {
      let mut args = args.into_iter();
      // The arity is checked above, so both arguments exist.
      flatten_conjunction(args.next().unwrap(), goals);
      flatten_conjunction(args.next().unwrap(), goals);
    }
  } else {
    goals.push(term);
  }
}

/// <disjunct> ::= <conjunct> ( ';' <disjunct> )?
fn pdisjunct(text: &str) -> IResult<&str, Term>{
  map(
    pair(pconjunct, opt(preceded(wst(one_char(';')), pdisjunct))),
    |(left, right)| {
      match right {
        Some(right) => Term::structure(";", vec![left, right]),
        None        => left
      }
    }
  )(text)
}

/// <conjunct> ::= <goal> ( ',' <goal> )*
fn pconjunct(text: &str) -> IResult<&str, Term>{
  map(
    separated_nonempty_list(wst(one_char(',')), pgoal),
    |mut goals| {
      // Fold right so that `a, b, c` becomes `','(a, ','(b, c))`.
      let last = goals.pop().unwrap();
      goals.into_iter()
           .rev()
           .fold(last, |acc, goal| Term::structure(",", vec![goal, acc]))
    }
  )(text)
}

/**
  <goal> ::= '!' | '\+' <goal> | '(' <disjunct> ')' | <predicate> | <variable>

  A variable in goal position is legal; the compiler wraps it in `call/1`.
*/
fn pgoal(text: &str) -> IResult<&str, Term>{
  ws(alt((
    map(one_char('!'), |_| Term::Atom(DefaultAtom::from("!"))),
    map(preceded(ws(tag("\\+")), pgoal), |goal| Term::structure("\\+", vec![goal])),
    delimited(one_char('('), pdisjunct, ws(one_char(')'))),
    pstructure,
    pvariable
  )))(text)
}

// endregion Goal parsers

// region Term parsers

/// <predicate> ::= <structure>
fn ppredicate(text: &str) -> IResult<&str, Term>{
  ws(pstructure)(text)
}

/// <term> ::= <number> | <variable> | <structure>
fn pterm(text: &str) -> IResult<&str, Term>{
  ws(alt((
    pnumber, pvariable, pstructure
  )))(text)
}

/// <structure> ::= <small_atom> '(' <term> (',' <term>)* (',')? ')' | <small_atom>
fn pstructure(text: &str) -> IResult<&str, Term>{
  alt((
    // Nonconstant functor
    map(
      tuple((
        wst(psmall_atom),
        one_char('('),
        terminated(
          separated_nonempty_list(one_char(','), pterm),
          opt(one_char(','))
        ),
        one_char(')')
      )),
      |out| Term::structure(out.0, out.2)
    ),
    // Constant
    map(psmall_atom, |out| Term::Atom(DefaultAtom::from(out)))
  ))(text)
}

/// <small_atom> ::= <lowercase> <alphanumeric_>*
fn psmall_atom(text: &str) -> IResult<&str, &str>{
  recognize(pair(
    take_while1(|c: char| c.is_lowercase() && c.is_alphabetic()),
    take_while(|c: char| c.is_alphanumeric() || c == '_')
  ))(text)
}

/// <variable> ::= ( <uppercase> | '_' ) <alphanumeric_>*
fn pvariable(text: &str) -> IResult<&str, Term>{
  map(
    recognize(pair(
      take_while1(|c: char| c.is_uppercase() || c == '_'),
      take_while(|c: char| c.is_alphanumeric() || c == '_')
    )),
    |out: &str| {
      if out == "_" {
        Term::Wildcard
      } else {
        Term::Variable(DefaultAtom::from(out))
      }
    }
  )(text)
}

/// <number> ::= '-'? <digits> ( '.' <digits> )?
fn pnumber(text: &str) -> IResult<&str, Term>{
  map_res(
    recognize(tuple((
      opt(one_char('-')),
      digit1,
      opt(pair(one_char('.'), digit1))
    ))),
    |out: &str| -> Result<Term, String> {
      if out.contains('.') {
        out.parse::<f64>().map(Term::Float).map_err(|e| e.to_string())
      } else {
        out.parse::<i64>().map(Term::Integer).map_err(|e| e.to_string())
      }
    }
  )(text)
}

// endregion Term parsers

// region Whitespace and comments

fn ws<'a, F, O>(inner: F) -> impl Fn(&'a str) -> IResult<&'a str, O>
  where F: Fn(&'a str) -> IResult<&'a str, O>
{
  move |i| {
    let (i, _) = pskip(i)?;
    let (i, o) = inner(i)?;
    let (i, _) = pskip(i)?;
    Ok((i, o))
  }
}

fn wst<'a, F, O>(inner: F) -> impl Fn(&'a str) -> IResult<&'a str, O>
  where F: Fn(&'a str) -> IResult<&'a str, O>
{
  move |i| {
    let (i, o) = inner(i)?;
    let (i, _) = pskip(i)?;
    Ok((i, o))
  }
}

fn pskip(i: &str) -> IResult<&str, ()>{
  map(
    many0(
      alt((map(multispace1, |_| ()), pinline_comment, peol_comment))
    ),
    |_| ()
  )(i)
}

/// <eol_comment> ::= '%' [^\n\r]*
fn peol_comment(i: &str) -> IResult<&str, ()>{
  map(
    pair(one_char('%'), take_while(|c| c != '\n' && c != '\r')),
    |_| ()
  )(i)
}

/// <inline_comment> ::= '(*' .* '*)'
fn pinline_comment(i: &str) -> IResult<&str, ()>{
  map(
    tuple((
      tag("(*"),
      take_until("*)"),
      tag("*)")
    )),
    |_| ()
  )(i)
}

// endregion Whitespace and comments


#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use super::*;

  fn atom(name: &str) -> Term {
    Term::Atom(DefaultAtom::from(name))
  }

  fn var(name: &str) -> Term {
    Term::Variable(DefaultAtom::from(name))
  }

  #[test]
  fn parses_a_fact() {
    let sentences = parse("f(x).").unwrap();
    assert_eq!(
      sentences,
      vec![Sentence::Clause(Clause{
        head: Term::structure("f", vec![atom("x")]),
        body: vec![]
      })]
    );
  }

  #[test]
  fn parses_a_rule_with_conjunction() {
    let sentences = parse("path(X, Z) :- edge(X, Y), path(Y, Z).").unwrap();
    match &sentences[0] {
      Sentence::Clause(clause) => {
        assert_eq!(format!("{}", clause.head), "path(X, Z)");
        assert_eq!(clause.body.len(), 2);
        assert_eq!(format!("{}", clause.body[1]), "path(Y, Z)");
      }
      _ => panic!("expected a clause")
    }
  }

  #[test]
  fn parses_a_query() {
    let sentences = parse("?- f(X, g(Y)).").unwrap();
    assert_eq!(
      sentences,
      vec![Sentence::Query(vec![
        Term::structure("f", vec![var("X"), Term::structure("g", vec![var("Y")])])
      ])]
    );
  }

  #[test]
  fn conjunction_binds_tighter_than_disjunction() {
    let sentences = parse("?- a, b ; c.").unwrap();
    match &sentences[0] {
      Sentence::Query(goals) => {
        assert_eq!(goals.len(), 1);
        assert_eq!(format!("{}", goals[0]), ";(,(a, b), c)");
      }
      _ => panic!("expected a query")
    }
  }

  #[test]
  fn parses_cut_negation_and_wildcard() {
    let sentences = parse("p(X) :- q(X, _), !, \\+ r(X).").unwrap();
    match &sentences[0] {
      Sentence::Clause(clause) => {
        assert_eq!(clause.body[0], Term::structure("q", vec![var("X"), Term::Wildcard]));
        assert_eq!(clause.body[1], atom("!"));
        assert_eq!(clause.body[2],
                   Term::structure("\\+", vec![Term::structure("r", vec![var("X")])]));
      }
      _ => panic!("expected a clause")
    }
  }

  #[test]
  fn parses_numbers() {
    let sentences = parse("?- f(3, -7, 2.5).").unwrap();
    assert_eq!(
      sentences,
      vec![Sentence::Query(vec![
        Term::structure("f", vec![Term::Integer(3), Term::Integer(-7), Term::Float(2.5)])
      ])]
    );
  }

  #[test]
  fn skips_comments() {
    let text = "% a line comment\nf(x). (* an inline\ncomment *) g(y).";
    let sentences = parse(text).unwrap();
    assert_eq!(sentences.len(), 2);
  }

  #[test]
  fn reports_the_error_line() {
    let error = parse("f(x).\ng(.\n").unwrap_err();
    assert_eq!(error.line, 2);
  }

  #[test]
  fn rejects_a_clause_without_a_period() {
    assert!(parse("f(x)").is_err());
  }
}
