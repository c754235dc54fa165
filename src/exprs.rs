use std::fmt;

use crate::connectors::{ConDescId, ConDescTable};

/// Costs within this distance compare equal, for display and round-trip tests.
pub const COST_EPSILON: f64 = 1e-5;

/// Farthest-word bound meaning "no limit".
pub const UNLIMITED_WORD: u32 = u32::MAX;

pub fn cost_eq(a: f64, b: f64) -> bool {
  (a - b).abs() < COST_EPSILON
}

/// Direction of a half-link: `-` connects leftward, `+` rightward.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Dir {
  Left,
  Right,
}

impl Dir {
  pub fn as_char(self) -> char {
    match self {
      Self::Left => '-',
      Self::Right => '+',
    }
  }
}

/// Diagnostic decoration on an expression node. No semantic effect.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpTag {
  pub name: String,
  pub id: u32,
}

#[derive(Debug, Clone)]
pub enum ExpKind {
  Connector {
    desc: ConDescId,
    dir: Dir,
    multi: bool,
    farthest_word: u32,
  },
  And(Vec<ExpId>),
  Or(Vec<ExpId>),
}

/// One node of a dictionary expression tree. Trees are immutable during
/// expansion; the dictionary owns them and the core borrows them read-only.
#[derive(Debug, Clone)]
pub struct Exp {
  pub kind: ExpKind,
  pub cost: f64,
  pub tag: Option<ExpTag>,
}

/// Index type for the expression arena
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ExpId(pub u32);

/// Arena holding the expression trees of a dictionary.
#[derive(Debug, Default)]
pub struct Exprs {
  nodes: Vec<Exp>,
}

impl Exprs {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn alloc(&mut self, exp: Exp) -> ExpId {
    let idx = self.nodes.len() as u32;
    self.nodes.push(exp);
    ExpId(idx)
  }

  /// Get an id. Assumes valid, panics on OOB
  pub fn get(&self, id: ExpId) -> &Exp {
    self.nodes.get(id.0 as usize).expect("invalid ExpId")
  }

  /// Fallible lookup, for walking trees handed in from outside.
  pub fn try_get(&self, id: ExpId) -> Option<&Exp> {
    self.nodes.get(id.0 as usize)
  }

  pub fn get_mut(&mut self, id: ExpId) -> &mut Exp {
    self.nodes.get_mut(id.0 as usize).expect("invalid ExpId")
  }

  pub fn connector(&mut self, desc: ConDescId, dir: Dir, multi: bool, cost: f64) -> ExpId {
    self.alloc(Exp {
      kind: ExpKind::Connector {
        desc,
        dir,
        multi,
        farthest_word: UNLIMITED_WORD,
      },
      cost,
      tag: None,
    })
  }

  pub fn and(&mut self, ops: Vec<ExpId>, cost: f64) -> ExpId {
    self.alloc(Exp {
      kind: ExpKind::And(ops),
      cost,
      tag: None,
    })
  }

  pub fn or(&mut self, ops: Vec<ExpId>, cost: f64) -> ExpId {
    self.alloc(Exp {
      kind: ExpKind::Or(ops),
      cost,
      tag: None,
    })
  }

  /// Number of nodes in the tree rooted at `e`.
  pub fn size_of_expression(&self, e: ExpId) -> usize {
    match &self.get(e).kind {
      ExpKind::Connector { .. } => 1,
      ExpKind::And(ops) | ExpKind::Or(ops) => {
        1 + ops.iter().map(|op| self.size_of_expression(*op)).sum::<usize>()
      }
    }
  }

  /// Display an expression in infix style
  pub fn display<'a>(&'a self, descs: &'a ConDescTable, id: ExpId) -> ExpDisplay<'a> {
    ExpDisplay {
      exprs: self,
      descs,
      id,
    }
  }
}

/// Helper struct for displaying an expression
pub struct ExpDisplay<'a> {
  pub exprs: &'a Exprs,
  pub descs: &'a ConDescTable,
  pub id: ExpId,
}

impl fmt::Display for ExpDisplay<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write_exp(f, self.exprs, self.descs, self.id, false)
  }
}

/// Split a cost into bracket nesting and a decimal remainder, matching the
/// classic rendering: integer costs 1..=4 become that many `[]` pairs,
/// everything else is printed as a decimal suffix.
fn cost_breakdown(cost: f64) -> (usize, f64) {
  if cost < -COST_EPSILON {
    return (1, cost);
  }
  if cost_eq(cost, 0.0) {
    return (0, 0.0);
  }
  let icost = cost as i64;
  let dcost = cost - icost as f64;
  if dcost > COST_EPSILON {
    (1, cost)
  } else if icost > 4 {
    (1, icost as f64)
  } else {
    (icost as usize, 0.0)
  }
}

fn write_cost_suffix(f: &mut fmt::Formatter<'_>, icost: usize, dcost: f64) -> fmt::Result {
  for _ in 0..icost {
    write!(f, "]")?;
  }
  if !cost_eq(dcost, 0.0) {
    write!(f, "{:.3}", dcost)?;
  }
  Ok(())
}

fn write_tag(f: &mut fmt::Formatter<'_>, exp: &Exp) -> fmt::Result {
  if let Some(tag) = &exp.tag {
    write!(f, "]{}", tag.name)?;
  }
  Ok(())
}

/// Is this the conventional "optional" shape: OR(AND() with cost 0, x)?
fn optional_operand(exprs: &Exprs, exp: &Exp) -> Option<ExpId> {
  if let ExpKind::Or(ops) = &exp.kind {
    if ops.len() == 2 {
      if let ExpKind::And(inner) = &exprs.get(ops[0]).kind {
        if inner.is_empty() && cost_eq(exprs.get(ops[0]).cost, 0.0) {
          return Some(ops[1]);
        }
      }
    }
  }
  None
}

fn write_exp(
  f: &mut fmt::Formatter<'_>,
  exprs: &Exprs,
  descs: &ConDescTable,
  id: ExpId,
  need_parens: bool,
) -> fmt::Result {
  let exp = exprs.get(id);
  let (icost, dcost) = cost_breakdown(exp.cost);

  if exp.tag.is_some() {
    write!(f, "[")?;
  }

  let ops = match &exp.kind {
    ExpKind::Connector {
      desc, dir, multi, ..
    } => {
      for _ in 0..icost {
        write!(f, "[")?;
      }
      if *multi {
        write!(f, "@")?;
      }
      write!(f, "{}{}", descs.get(*desc).string, dir.as_char())?;
      write_cost_suffix(f, icost, dcost)?;
      return write_tag(f, exp);
    }
    ExpKind::And(ops) | ExpKind::Or(ops) => ops,
  };

  if ops.is_empty() {
    for _ in 0..icost {
      write!(f, "[")?;
    }
    write!(f, "()")?;
    write_cost_suffix(f, icost, dcost)?;
    return write_tag(f, exp);
  }

  for _ in 0..icost {
    write!(f, "[")?;
  }

  if let Some(optional) = optional_operand(exprs, exp) {
    write!(f, "{{")?;
    write_exp(f, exprs, descs, optional, false)?;
    write!(f, "}}")?;
    write_cost_suffix(f, icost, dcost)?;
    return write_tag(f, exp);
  }

  if icost == 0 && need_parens {
    write!(f, "(")?;
  }

  let is_and = matches!(exp.kind, ExpKind::And(_));
  let joiner = if is_and { " & " } else { " or " };

  write_exp(f, exprs, descs, ops[0], true)?;
  for op in &ops[1..] {
    write!(f, "{}", joiner)?;
    let same_type = matches!(
      (&exp.kind, &exprs.get(*op).kind),
      (ExpKind::And(_), ExpKind::And(_)) | (ExpKind::Or(_), ExpKind::Or(_))
    );
    write_exp(f, exprs, descs, *op, !same_type)?;
  }

  write_cost_suffix(f, icost, dcost)?;
  if icost == 0 && need_parens {
    write!(f, ")")?;
  }
  write_tag(f, exp)
}
