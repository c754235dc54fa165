use std::fmt;

use crate::connectors::{ConDescTable, ConnectorId};
use crate::errors::{CoreError, Result};
use crate::exprs::{ExpId, ExpKind, Exprs};
use crate::pool::{Id, Pool};

pub type TconnectorId = Id<Tconnector>;
pub type ClauseId = Id<Clause>;

/// Temporary half-link used while converting an expression into clauses.
#[derive(Debug, Clone, Copy)]
pub struct Tconnector {
  pub next: Option<TconnectorId>,
  /// The CONNECTOR leaf this entry wraps.
  pub exp: ExpId,
  /// Monotonic position of that leaf within the current expansion.
  pub pos: u32,
  /// Cache slot for the materialized connector, set through memory sharing:
  /// tails shared by `catenate` make one clause's materialization visible to
  /// every later clause deriving from the same sub-expression.
  pub tracon: Option<ConnectorId>,
}

/// One AND-clause: a list of temporary half-links plus the accumulated cost.
#[derive(Debug, Clone, Copy)]
pub struct Clause {
  pub next: Option<ClauseId>,
  pub links: Option<TconnectorId>,
  pub cost: f64,
}

/// Scratch state threaded through one expression expansion.
pub struct ClauseContext<'a> {
  pub clause_pool: &'a mut Pool<Clause>,
  pub tconn_pool: &'a mut Pool<Tconnector>,
  pub exp_pos: &'a mut u32,
}

/// Builds a new list of half-links that is the catenation of `head1` with
/// `head2`. `head1` is copied into fresh pool entries; `head2` is linked on
/// by reference, so its entries (and their cache slots) stay shared.
fn catenate(
  pool: &mut Pool<Tconnector>,
  head1: Option<TconnectorId>,
  head2: Option<TconnectorId>,
) -> Result<Option<TconnectorId>> {
  let mut head = None;
  let mut prev: Option<TconnectorId> = None;
  let mut e1 = head1;
  while let Some(id) = e1 {
    let mut copy = *pool.get(id);
    e1 = copy.next;
    copy.next = None;
    let new = pool.alloc(copy)?;
    match prev {
      Some(p) => pool.get_mut(p).next = Some(new),
      None => head = Some(new),
    }
    prev = Some(new);
  }

  match prev {
    Some(p) => {
      pool.get_mut(p).next = head2;
      Ok(head)
    }
    None => Ok(head2),
  }
}

/// build the half-link for the terminal node e
fn build_terminal(e: ExpId, ct: &mut ClauseContext) -> Result<TconnectorId> {
  let t = ct.tconn_pool.alloc(Tconnector {
    next: None,
    exp: e,
    pos: *ct.exp_pos,
    tracon: None,
  })?;
  *ct.exp_pos += 1;
  Ok(t)
}

/// Add the node's own cost to every clause on the list and locate its tail.
fn add_cost_and_find_last(
  pool: &mut Pool<Clause>,
  head: Option<ClauseId>,
  cost: f64,
) -> (Option<ClauseId>, Option<ClauseId>) {
  let mut last = None;
  let mut c = head;
  while let Some(id) = c {
    let clause = pool.get_mut(id);
    clause.cost += cost;
    last = Some(id);
    c = clause.next;
  }
  (head, last)
}

/// Build the clause list for the expression `e`. Does not change `e`.
///
/// Returns the head and tail of the list. AND nodes fold their operands as a
/// Cartesian product; OR nodes concatenate. The total count is multiplicative,
/// so the product is materialized clause-by-clause out of the pools rather
/// than as a precomputed array.
pub fn build_clause(
  exprs: &Exprs,
  e: ExpId,
  ct: &mut ClauseContext,
) -> Result<(Option<ClauseId>, Option<ClauseId>)> {
  let exp = exprs
    .try_get(e)
    .ok_or_else(|| CoreError::MalformedExpression(format!("dangling expression id {:?}", e)))?;

  match &exp.kind {
    ExpKind::Connector { .. } => {
      let t = build_terminal(e, ct)?;
      let c = ct.clause_pool.alloc(Clause {
        next: None,
        links: Some(t),
        cost: exp.cost,
      })?;
      Ok((Some(c), Some(c)))
    }

    ExpKind::And(ops) => {
      // A zero-operand AND leaves exactly this one empty clause standing.
      let mut head = Some(ct.clause_pool.alloc(Clause {
        next: None,
        links: None,
        cost: 0.0,
      })?);

      for op in ops {
        let (op_head, _) = build_clause(exprs, *op, ct)?;
        let mut new_head = None;
        let mut a = head;
        while let Some(aid) = a {
          let Clause {
            links: a_links,
            cost: a_cost,
            next: a_next,
          } = *ct.clause_pool.get(aid);
          let mut b = op_head;
          while let Some(bid) = b {
            let Clause {
              links: b_links,
              cost: b_cost,
              next: b_next,
            } = *ct.clause_pool.get(bid);
            let links = catenate(ct.tconn_pool, b_links, a_links)?;
            let combined = ct.clause_pool.alloc(Clause {
              next: new_head,
              links,
              cost: a_cost + b_cost,
            })?;
            new_head = Some(combined);
            b = b_next;
          }
          a = a_next;
        }
        head = new_head;
      }

      Ok(add_cost_and_find_last(ct.clause_pool, head, exp.cost))
    }

    ExpKind::Or(ops) => {
      let mut head = None;
      let mut last: Option<ClauseId> = None;
      for op in ops {
        let (op_head, op_last) = build_clause(exprs, *op, ct)?;
        if op_head.is_none() {
          continue;
        }
        match last {
          Some(l) => ct.clause_pool.get_mut(l).next = op_head,
          None => head = op_head,
        }
        last = op_last;
      }

      Ok(add_cost_and_find_last(ct.clause_pool, head, exp.cost))
    }
  }
}

/// Number of clauses that would be generated by expanding the expression.
pub fn count_clauses(exprs: &Exprs, e: ExpId) -> u64 {
  match &exprs.get(e).kind {
    ExpKind::Connector { .. } => 1,
    ExpKind::And(ops) => ops
      .iter()
      .fold(1, |acc: u64, op| acc.saturating_mul(count_clauses(exprs, *op))),
    ExpKind::Or(ops) => ops
      .iter()
      .fold(0, |acc: u64, op| acc.saturating_add(count_clauses(exprs, *op))),
  }
}

/// Collect a clause's half-link ids in list order.
pub fn clause_link_ids(pool: &Pool<Tconnector>, links: Option<TconnectorId>) -> Vec<TconnectorId> {
  let mut ids = Vec::new();
  let mut t = links;
  while let Some(id) = t {
    ids.push(id);
    t = pool.get(id).next;
  }
  ids
}

/// Collect the clause ids of a list in order.
pub fn clause_list_ids(pool: &Pool<Clause>, head: Option<ClauseId>) -> Vec<ClauseId> {
  let mut ids = Vec::new();
  let mut c = head;
  while let Some(id) = c {
    ids.push(id);
    c = pool.get(id).next;
  }
  ids
}

/// Helper struct for displaying a clause list, one clause per line
pub struct ClauseListDisplay<'a> {
  pub clause_pool: &'a Pool<Clause>,
  pub tconn_pool: &'a Pool<Tconnector>,
  pub exprs: &'a Exprs,
  pub descs: &'a ConDescTable,
  pub head: Option<ClauseId>,
}

impl fmt::Display for ClauseListDisplay<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut c = self.head;
    while let Some(cid) = c {
      let clause = self.clause_pool.get(cid);
      write!(f, "  Clause: ({:4.2})", clause.cost)?;
      for tid in clause_link_ids(self.tconn_pool, clause.links) {
        let t = self.tconn_pool.get(tid);
        if let ExpKind::Connector {
          desc, dir, multi, ..
        } = &self.exprs.get(t.exp).kind
        {
          write!(f, " ")?;
          if *multi {
            write!(f, "@")?;
          }
          write!(f, "{}{}", self.descs.get(*desc).string, dir.as_char())?;
        }
      }
      writeln!(f)?;
      c = clause.next;
    }
    Ok(())
  }
}
