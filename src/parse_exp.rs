use regex::Regex;
/// Recursive-descent parsing of infix connector expressions ("A+ & (B- or C-)").
///
/// This consumes the notation the stringifier emits: `&`/`or` operators,
/// parens, `{...}` for optional content, `[...]` cost brackets with an
/// optional decimal suffix, and `@` for multi-connectors. It exists for test
/// input and the clause round-trip law; the dictionary file format proper
/// (word files, macros, subscript handling) is out of scope.
use crate::connectors::ConDescTable;
use crate::errors::CoreError;
use crate::exprs::{Dir, ExpId, Exprs};

type ParseResult<'a, T> = Result<(T, &'a str), CoreError>;
type Infallible<'a, T> = (T, &'a str);

fn err(msg: String) -> CoreError {
  CoreError::MalformedExpression(msg)
}

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

/// Try to consume a regex, returning None if it doesn't match
fn optional_re<'a>(re: &'static Regex, s: &'a str) -> Infallible<'a, Option<&'a str>> {
  if let Some(caps) = re.captures(s) {
    let m = caps.get(0).unwrap();
    if m.start() > 0 {
      return (None, s);
    }
    let (_, rest) = s.split_at(m.end());
    (Some(m.as_str()), rest)
  } else {
    (None, s)
  }
}

/// Try to consume a regex, failing if it doesn't match
fn needed_re<'a>(re: &'static Regex, s: &'a str) -> ParseResult<'a, &'a str> {
  if let (Some(c), rest) = optional_re(re, s) {
    Ok((c, rest))
  } else {
    Err(err(format!("couldn't match {} at {}", re, s)))
  }
}

/// Try to consume a char, returning None if it doesn't match
fn optional_char(c: char, s: &str) -> Infallible<Option<char>> {
  if s.starts_with(c) {
    (Some(c), &s[c.len_utf8()..])
  } else {
    (None, s)
  }
}

/// Try to consume a char, failing if it doesn't match
fn needed_char(c: char, s: &str) -> ParseResult<char> {
  if let (Some(c), rest) = optional_char(c, s) {
    Ok((c, rest))
  } else {
    Err(err(format!("couldn't match {} at {}", c, s)))
  }
}

fn skip_whitespace(s: &str) -> &str {
  regex_static!(WHITESPACE, r"\s+");
  optional_re(&WHITESPACE, s).1
}

/// Parse a complete expression string into the arena.
pub fn parse_exp(s: &str, exprs: &mut Exprs, descs: &mut ConDescTable) -> Result<ExpId, CoreError> {
  let (id, rest) = parse_or_expr(skip_whitespace(s), exprs, descs)?;
  let rest = skip_whitespace(rest);
  if !rest.is_empty() {
    return Err(err(format!("trailing input at {}", rest)));
  }
  Ok(id)
}

fn parse_or_expr<'a>(
  s: &'a str,
  exprs: &mut Exprs,
  descs: &mut ConDescTable,
) -> ParseResult<'a, ExpId> {
  regex_static!(OR_OP, r"or\b");

  let (first, mut rem) = parse_and_expr(s, exprs, descs)?;
  let mut ops = vec![first];
  loop {
    let s = skip_whitespace(rem);
    if let (Some(_), s) = optional_re(&OR_OP, s) {
      let (op, s) = parse_and_expr(skip_whitespace(s), exprs, descs)?;
      ops.push(op);
      rem = s;
    } else {
      break;
    }
  }

  if ops.len() == 1 {
    Ok((ops[0], rem))
  } else {
    Ok((exprs.or(ops, 0.0), rem))
  }
}

fn parse_and_expr<'a>(
  s: &'a str,
  exprs: &mut Exprs,
  descs: &mut ConDescTable,
) -> ParseResult<'a, ExpId> {
  let (first, mut rem) = parse_term(s, exprs, descs)?;
  let mut ops = vec![first];
  loop {
    let s = skip_whitespace(rem);
    if let (Some(_), s) = optional_char('&', s) {
      let (op, s) = parse_term(skip_whitespace(s), exprs, descs)?;
      ops.push(op);
      rem = s;
    } else {
      break;
    }
  }

  if ops.len() == 1 {
    Ok((ops[0], rem))
  } else {
    Ok((exprs.and(ops, 0.0), rem))
  }
}

fn parse_term<'a>(
  s: &'a str,
  exprs: &mut Exprs,
  descs: &mut ConDescTable,
) -> ParseResult<'a, ExpId> {
  if let (Some(_), s) = optional_char('(', s) {
    let s = skip_whitespace(s);
    if let (Some(_), s) = optional_char(')', s) {
      // the empty conjunction: a clause with no half-links
      return Ok((exprs.and(Vec::new(), 0.0), s));
    }
    let (id, s) = parse_or_expr(s, exprs, descs)?;
    let (_, s) = needed_char(')', skip_whitespace(s))?;
    return Ok((id, s));
  }

  if let (Some(_), s) = optional_char('{', s) {
    let (id, s) = parse_or_expr(skip_whitespace(s), exprs, descs)?;
    let (_, s) = needed_char('}', skip_whitespace(s))?;
    let empty = exprs.and(Vec::new(), 0.0);
    return Ok((exprs.or(vec![empty, id], 0.0), s));
  }

  if let (Some(_), s) = optional_char('[', s) {
    let (id, s) = parse_or_expr(skip_whitespace(s), exprs, descs)?;
    let (_, s) = needed_char(']', skip_whitespace(s))?;
    let (bump, s) = parse_cost_suffix(s)?;
    exprs.get_mut(id).cost += bump;
    return Ok((id, s));
  }

  parse_connector(s, exprs, descs)
}

/// A number after a closing cost bracket overrides the default cost of 1.
fn parse_cost_suffix(s: &str) -> ParseResult<f64> {
  regex_static!(NUMBER, r"-?[0-9]+(\.[0-9]+)?");
  if let (Some(num), s) = optional_re(&NUMBER, s) {
    let value = num
      .parse::<f64>()
      .map_err(|e| err(format!("bad cost {}: {}", num, e)))?;
    Ok((value, s))
  } else {
    Ok((1.0, s))
  }
}

fn parse_connector<'a>(
  s: &'a str,
  exprs: &mut Exprs,
  descs: &mut ConDescTable,
) -> ParseResult<'a, ExpId> {
  regex_static!(CONNECTOR_NAME, r"[A-Z]+[a-z0-9*]*");

  let (multi, s) = optional_char('@', s);
  let (name, s) =
    needed_re(&CONNECTOR_NAME, s).map_err(|e| err(format!("connector name: {}", e)))?;
  let (dir, s) = if let (Some(_), s) = optional_char('+', s) {
    (Dir::Right, s)
  } else if let (Some(_), s) = optional_char('-', s) {
    (Dir::Left, s)
  } else {
    return Err(err(format!("connector {} needs + or - at {}", name, s)));
  };

  let desc = descs.intern(name);
  Ok((exprs.connector(desc, dir, multi.is_some(), 0.0), s))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn roundtrip(s: &str) -> String {
    let mut exprs = Exprs::new();
    let mut descs = ConDescTable::new();
    let id = parse_exp(s, &mut exprs, &mut descs).unwrap();
    format!("{}", exprs.display(&descs, id))
  }

  #[test]
  fn test_parse_connector() {
    assert_eq!(roundtrip("A+"), "A+");
    assert_eq!(roundtrip("@Xca*b-"), "@Xca*b-");
  }

  #[test]
  fn test_parse_operators() {
    assert_eq!(roundtrip("A+ & B-"), "A+ & B-");
    assert_eq!(roundtrip("A+ or B-"), "A+ or B-");
    assert_eq!(roundtrip("(A+ & B-) or C+"), "(A+ & B-) or C+");
    assert_eq!(roundtrip("A- & (B+ or C+) & D+"), "A- & (B+ or C+) & D+");
  }

  #[test]
  fn test_parse_optional_and_empty() {
    assert_eq!(roundtrip("{A+}"), "{A+}");
    assert_eq!(roundtrip("()"), "()");
  }

  #[test]
  fn test_parse_cost_brackets() {
    assert_eq!(roundtrip("[A+]"), "[A+]");
    assert_eq!(roundtrip("[[A+]]"), "[[A+]]");
    assert_eq!(roundtrip("[A+]0.5"), "[A+]0.500");
    assert_eq!(roundtrip("[A+ & B-]2.5"), "[A+ & B-]2.500");
  }

  #[test]
  fn test_parse_rejects_garbage() {
    let mut exprs = Exprs::new();
    let mut descs = ConDescTable::new();
    assert!(parse_exp("A", &mut exprs, &mut descs).is_err());
    assert!(parse_exp("A+ &", &mut exprs, &mut descs).is_err());
    assert!(parse_exp("(A+", &mut exprs, &mut descs).is_err());
    assert!(parse_exp("a+", &mut exprs, &mut descs).is_err());
  }
}
