use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::clause::{build_clause, Clause, ClauseContext, ClauseId, Tconnector};
use crate::connectors::{ChainDisplay, ConDescTable, Connector, ConnectorId};
use crate::errors::{CoreError, Result};
use crate::exprs::{Dir, ExpId, ExpKind, Exprs};
use crate::pool::{Id, Pool};
use crate::sentence::{GwordId, Sentence};

pub type DisjunctId = Id<Disjunct>;

/// One category a generated disjunct belongs to, with its cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
  pub num: u32,
  pub cost: f64,
}

/// What a disjunct stands for: a word spelling, or (during generation) the
/// categories it was derived from.
#[derive(Debug, Clone)]
pub enum DisjunctWord {
  Spelling(Arc<str>),
  Categories(Vec<Category>),
}

impl DisjunctWord {
  pub fn is_category(&self) -> bool {
    matches!(self, Self::Categories(_))
  }

  pub fn spelling(&self) -> Option<&Arc<str>> {
    match self {
      Self::Spelling(s) => Some(s),
      _ => None,
    }
  }
}

/// One legal set of connection requirements for a word occurrence.
#[derive(Debug, Clone)]
pub struct Disjunct {
  pub next: Option<DisjunctId>,
  pub left: Option<ConnectorId>,
  pub right: Option<ConnectorId>,
  pub word: DisjunctWord,
  pub cost: f64,
  pub originating_gword: Option<GwordId>,
}

/// Decode a category-encoded word string: a leading ASCII space followed by
/// a hexadecimal category number in (0, 65536).
fn decode_category(wstring: &str, cost: f64) -> Result<Vec<Category>> {
  let num = u32::from_str_radix(wstring[1..].trim(), 16)
    .map_err(|e| CoreError::CorruptDictionary(format!("bad category \"{}\": {}", wstring, e)))?;
  if num == 0 || num >= 64 * 1024 {
    return Err(CoreError::CorruptDictionary(format!(
      "insane category {}",
      num
    )));
  }
  let mut categories = Vec::with_capacity(4);
  categories.push(Category { num, cost });
  Ok(categories)
}

/// Build a disjunct list out of the clause list `clauses`.
///
/// Each clause's half-links are split into the left and right chains. When a
/// link's cache slot already holds a materialized connector, that whole
/// suffix is adopted and the direction is sealed: clauses deriving from the
/// same sub-expression end up sharing one connector chain by identity.
#[allow(clippy::too_many_arguments)]
fn build_disjunct(
  clause_pool: &Pool<Clause>,
  tconn_pool: &mut Pool<Tconnector>,
  connector_pool: &mut Pool<Connector>,
  disjunct_pool: &mut Pool<Disjunct>,
  exprs: &Exprs,
  clauses: Option<ClauseId>,
  wstring: &Arc<str>,
  generation: bool,
  gword: Option<GwordId>,
  cost_cutoff: f64,
) -> Result<Option<DisjunctId>> {
  let mut dis = None;

  let mut cl = clauses;
  while let Some(cid) = cl {
    let Clause {
      links, cost, next, ..
    } = *clause_pool.get(cid);
    cl = next;

    if links.is_none() {
      continue; // no connectors
    }
    if cost > cost_cutoff {
      continue;
    }

    let mut heads: [Option<ConnectorId>; 2] = [None, None];
    let mut tails: [Option<ConnectorId>; 2] = [None, None];
    let mut sealed = [false, false];

    let mut t = links;
    while let Some(tid) = t {
      let tconn = *tconn_pool.get(tid);
      t = tconn.next;

      let (desc, dir, multi, farthest_word) = match &exprs.get(tconn.exp).kind {
        ExpKind::Connector {
          desc,
          dir,
          multi,
          farthest_word,
        } => (*desc, *dir, *multi, *farthest_word),
        _ => {
          return Err(CoreError::MalformedExpression(
            "half-link wraps a non-connector node".to_string(),
          ))
        }
      };
      let idir = (dir == Dir::Right) as usize;

      if sealed[idir] {
        continue; // this direction is complete
      }
      if let Some(cached) = tconn.tracon {
        // Adopt the cached suffix wholesale and seal the direction.
        match tails[idir] {
          Some(tail) => connector_pool.get_mut(tail).next = Some(cached),
          None => heads[idir] = Some(cached),
        }
        sealed[idir] = true;
        continue;
      }

      let new = connector_pool.alloc(Connector {
        desc,
        multi,
        exp_pos: tconn.pos,
        farthest_word,
        nearest_word: 0,
        shallow: false,
        originating_gword: None,
        next: None,
      })?;
      tconn_pool.get_mut(tid).tracon = Some(new); // cache this tracon

      match tails[idir] {
        Some(tail) => connector_pool.get_mut(tail).next = Some(new),
        None => heads[idir] = Some(new),
      }
      tails[idir] = Some(new);
    }

    let word = if !generation || !wstring.starts_with(' ') {
      DisjunctWord::Spelling(wstring.clone())
    } else {
      DisjunctWord::Categories(decode_category(wstring, cost)?)
    };

    let ndis = disjunct_pool.alloc(Disjunct {
      next: dis,
      left: heads[0],
      right: heads[1],
      word,
      cost,
      originating_gword: gword,
    })?;
    dis = Some(ndis);
  }

  Ok(dis)
}

/// Turn one dictionary expression into the disjunct list for a word.
///
/// The scratch pools are reclaimed before returning; connectors and
/// disjuncts go to the sentence pools and live until sentence teardown.
/// When `max_disjuncts` is nonzero and the list is longer, it is thinned by
/// an approximate reservoir: the head is kept, every other entry survives
/// with probability `max_disjuncts / n`.
pub fn build_disjuncts_for_exp(
  sent: &mut Sentence,
  exprs: &Exprs,
  e: ExpId,
  wstring: &Arc<str>,
  gword: Option<GwordId>,
  cost_cutoff: f64,
  max_disjuncts: usize,
) -> Result<Option<DisjunctId>> {
  let Sentence {
    clause_pool,
    tconn_pool,
    connector_pool,
    disjunct_pool,
    generation,
    rand_state,
    ..
  } = sent;

  let mut exp_pos = 0;
  let mut ct = ClauseContext {
    clause_pool: &mut *clause_pool,
    tconn_pool: &mut *tconn_pool,
    exp_pos: &mut exp_pos,
  };
  let clauses = match build_clause(exprs, e, &mut ct) {
    Ok((head, _)) => head,
    Err(err) => {
      clause_pool.reuse();
      tconn_pool.reuse();
      return Err(err);
    }
  };

  let dis = build_disjunct(
    clause_pool,
    tconn_pool,
    connector_pool,
    disjunct_pool,
    exprs,
    clauses,
    wstring,
    *generation,
    gword,
    cost_cutoff,
  );
  clause_pool.reuse();
  tconn_pool.reuse();
  let dis = dis?;

  if max_disjuncts == 0 {
    return Ok(dis);
  }

  // If there are more than the allowed number of disjuncts, randomly discard
  // some of them, with uniform weighting; cost is not considered.
  let discnt = count_disjuncts(disjunct_pool, dis);
  if discnt < max_disjuncts {
    return Ok(dis);
  }

  let mut rng = match *rand_state {
    0 => StdRng::from_entropy(),
    seed => StdRng::seed_from_u64(seed),
  };

  let khead = dis.expect("counted disjuncts from an empty list");
  let mut ktail = khead;
  let mut d = disjunct_pool.get(khead).next;
  while let Some(did) = d {
    let next = disjunct_pool.get(did).next;
    if rng.gen_range(0..discnt) < max_disjuncts {
      disjunct_pool.get_mut(ktail).next = Some(did);
      ktail = did;
    }
    d = next;
  }
  disjunct_pool.get_mut(ktail).next = None;
  if *rand_state != 0 {
    *rand_state = rng.gen();
  }

  Ok(dis)
}

/// Number of disjuncts on the list starting at `head`.
pub fn count_disjuncts(pool: &Pool<Disjunct>, head: Option<DisjunctId>) -> usize {
  let mut n = 0;
  let mut d = head;
  while let Some(id) = d {
    n += 1;
    d = pool.get(id).next;
  }
  n
}

/// Catenate two disjunct lists, destructively: the tail of `d1` is linked to
/// `d2`.
pub fn catenate_disjuncts(
  pool: &mut Pool<Disjunct>,
  d1: Option<DisjunctId>,
  d2: Option<DisjunctId>,
) -> Option<DisjunctId> {
  let head = match d1 {
    None => return d2,
    Some(h) => h,
  };
  let mut tail = head;
  while let Some(next) = pool.get(tail).next {
    tail = next;
  }
  pool.get_mut(tail).next = d2;
  Some(head)
}

/// Collect the disjunct ids of a list in order.
pub fn disjunct_list_ids(pool: &Pool<Disjunct>, head: Option<DisjunctId>) -> Vec<DisjunctId> {
  let mut ids = Vec::new();
  let mut d = head;
  while let Some(id) = d {
    ids.push(id);
    d = pool.get(id).next;
  }
  ids
}

/// Helper struct for displaying a disjunct
pub struct DisjunctDisplay<'a> {
  pub connector_pool: &'a Pool<Connector>,
  pub disjunct_pool: &'a Pool<Disjunct>,
  pub descs: &'a ConDescTable,
  pub id: DisjunctId,
}

impl fmt::Display for DisjunctDisplay<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let d = self.disjunct_pool.get(self.id);
    match &d.word {
      DisjunctWord::Spelling(s) => write!(f, "{}", s)?,
      DisjunctWord::Categories(cats) => {
        write!(f, "{{")?;
        for (i, cat) in cats.iter().enumerate() {
          if i > 0 {
            write!(f, " ")?;
          }
          write!(f, "{:x}", cat.num)?;
        }
        write!(f, "}}")?;
      }
    }
    write!(f, ": ({:.2})", d.cost)?;
    for (head, dir) in [(d.left, Dir::Left), (d.right, Dir::Right)] {
      if head.is_some() {
        write!(
          f,
          " {}",
          ChainDisplay {
            pool: self.connector_pool,
            descs: self.descs,
            head,
            dir,
          }
        )?;
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::connectors::{chain_ids, chain_len};
  use crate::parse_exp::parse_exp;

  fn build_in(
    sent: &mut Sentence,
    s: &str,
    cutoff: f64,
    max_disjuncts: usize,
  ) -> (Exprs, ConDescTable, Option<DisjunctId>) {
    let mut exprs = Exprs::new();
    let mut descs = ConDescTable::new();
    let e = parse_exp(s, &mut exprs, &mut descs).unwrap();
    let word = sent.strings.intern("w");
    let dis =
      build_disjuncts_for_exp(sent, &exprs, e, &word, None, cutoff, max_disjuncts).unwrap();
    (exprs, descs, dis)
  }

  fn build(
    s: &str,
    cutoff: f64,
    max_disjuncts: usize,
  ) -> (Sentence, Exprs, ConDescTable, Option<DisjunctId>) {
    let mut sent = Sentence::new(2);
    let (exprs, descs, dis) = build_in(&mut sent, s, cutoff, max_disjuncts);
    (sent, exprs, descs, dis)
  }

  #[test]
  fn test_single_connector_disjunct() {
    let (sent, _, _, dis) = build("[A+]0.5", f64::INFINITY, 0);
    let ids = disjunct_list_ids(&sent.disjunct_pool, dis);
    assert_eq!(ids.len(), 1);
    let d = sent.disjunct_pool.get(ids[0]);
    assert!(d.left.is_none());
    assert_eq!(chain_len(&sent.connector_pool, d.right), 1);
    assert!((d.cost - 0.5).abs() < 1e-9);
  }

  #[test]
  fn test_left_and_right_chains_split() {
    let (sent, _, _, dis) = build("A- & B+", f64::INFINITY, 0);
    let ids = disjunct_list_ids(&sent.disjunct_pool, dis);
    assert_eq!(ids.len(), 1);
    let d = sent.disjunct_pool.get(ids[0]);
    assert_eq!(chain_len(&sent.connector_pool, d.left), 1);
    assert_eq!(chain_len(&sent.connector_pool, d.right), 1);
  }

  #[test]
  fn test_cost_cutoff_prunes_and_keeps_equal() {
    let (sent, _, _, dis) = build("[A+]1.0 or [B+]2.0", 1.5, 0);
    assert_eq!(count_disjuncts(&sent.disjunct_pool, dis), 1);

    // cutoff exactly equal to the accumulated cost keeps the clause
    let (sent, _, _, dis) = build("[A+]1.0 or [B+]2.0", 2.0, 0);
    assert_eq!(count_disjuncts(&sent.disjunct_pool, dis), 2);
  }

  #[test]
  fn test_empty_clause_is_discarded() {
    let (_, _, _, dis) = build("()", f64::INFINITY, 0);
    assert!(dis.is_none());

    let (sent, _, _, dis) = build("{A+}", f64::INFINITY, 0);
    assert_eq!(count_disjuncts(&sent.disjunct_pool, dis), 1);
  }

  #[test]
  fn test_shared_subexpression_shares_chain_identity() {
    // Both clauses of "A- & (X+ or Y+)" derive their left chain from the
    // same A- sub-expression: the materialized chain must be one object.
    let (sent, _, _, dis) = build("A- & (X+ or Y+)", f64::INFINITY, 0);
    let ids = disjunct_list_ids(&sent.disjunct_pool, dis);
    assert_eq!(ids.len(), 2);
    let d0 = sent.disjunct_pool.get(ids[0]);
    let d1 = sent.disjunct_pool.get(ids[1]);
    assert_eq!(d0.left, d1.left);
    assert!(d0.left.is_some());
    assert_ne!(d0.right, d1.right);
  }

  #[test]
  fn test_sealing_adopts_shared_suffix() {
    // "A- & (X- or Y-)": the A- entry is the shared tail of both clauses.
    // The second clause materializes its own X-/Y- head, then finds the
    // cached A- connector and adopts it, sealing the left direction.
    let (sent, _, _, dis) = build("A- & (X- or Y-)", f64::INFINITY, 0);
    let ids = disjunct_list_ids(&sent.disjunct_pool, dis);
    assert_eq!(ids.len(), 2);
    let chain0 = chain_ids(&sent.connector_pool, sent.disjunct_pool.get(ids[0]).left);
    let chain1 = chain_ids(&sent.connector_pool, sent.disjunct_pool.get(ids[1]).left);
    assert_eq!(chain0.len(), 2);
    assert_eq!(chain1.len(), 2);
    // distinct heads, one shared A- tail
    assert_ne!(chain0[0], chain1[0]);
    assert_eq!(chain0[1], chain1[1]);
  }

  #[test]
  fn test_category_encoded_word() {
    let mut sent = Sentence::new(2);
    sent.generation = true;
    let mut exprs = Exprs::new();
    let mut descs = ConDescTable::new();
    let e = parse_exp("[A+]0.25", &mut exprs, &mut descs).unwrap();
    let word = sent.strings.intern(" 1a");
    let dis =
      build_disjuncts_for_exp(&mut sent, &exprs, e, &word, None, f64::INFINITY, 0).unwrap();
    let ids = disjunct_list_ids(&sent.disjunct_pool, dis);
    assert_eq!(ids.len(), 1);
    let d = sent.disjunct_pool.get(ids[0]);
    match &d.word {
      DisjunctWord::Categories(cats) => {
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].num, 0x1a);
        assert!((cats[0].cost - 0.25).abs() < 1e-9);
      }
      _ => panic!("expected a category disjunct"),
    }
    assert!((d.cost - 0.25).abs() < 1e-9);
  }

  #[test]
  fn test_category_out_of_range_is_corrupt() {
    for bad in ["\u{20}0", " 10000", " zz"] {
      let mut sent = Sentence::new(2);
      sent.generation = true;
      let mut exprs = Exprs::new();
      let mut descs = ConDescTable::new();
      let e = parse_exp("A+", &mut exprs, &mut descs).unwrap();
      let word = sent.strings.intern(bad);
      let r = build_disjuncts_for_exp(&mut sent, &exprs, e, &word, None, f64::INFINITY, 0);
      assert!(
        matches!(r, Err(CoreError::CorruptDictionary(_))),
        "\"{}\" should be rejected",
        bad
      );
    }
  }

  #[test]
  fn test_space_prefix_without_generation_is_a_spelling() {
    let mut sent = Sentence::new(2);
    let mut exprs = Exprs::new();
    let mut descs = ConDescTable::new();
    let e = parse_exp("A+", &mut exprs, &mut descs).unwrap();
    let word = sent.strings.intern(" 1a");
    let dis =
      build_disjuncts_for_exp(&mut sent, &exprs, e, &word, None, f64::INFINITY, 0).unwrap();
    let ids = disjunct_list_ids(&sent.disjunct_pool, dis);
    assert!(!sent.disjunct_pool.get(ids[0]).word.is_category());
  }

  #[test]
  fn test_disjunct_display() {
    let (sent, _, descs, dis) = build("A- & B+", f64::INFINITY, 0);
    let ids = disjunct_list_ids(&sent.disjunct_pool, dis);
    let shown = format!(
      "{}",
      DisjunctDisplay {
        connector_pool: &sent.connector_pool,
        disjunct_pool: &sent.disjunct_pool,
        descs: &descs,
        id: ids[0],
      }
    );
    assert_eq!(shown, "w: (0.00) A- B+");
  }

  fn wide_expression() -> String {
    // 2^4 = 16 disjuncts
    "(A+ or B+) & (C+ or D+) & (E+ or F+) & (G+ or H+)".to_string()
  }

  #[test]
  fn test_downsample_disabled_when_zero() {
    let (sent, _, _, dis) = build(&wide_expression(), f64::INFINITY, 0);
    assert_eq!(count_disjuncts(&sent.disjunct_pool, dis), 16);
  }

  #[test]
  fn test_downsample_is_deterministic_with_seed() {
    let mut counts = Vec::new();
    let mut labels: Vec<Vec<u32>> = Vec::new();
    for _ in 0..2 {
      let mut sent = Sentence::new(2);
      sent.rand_state = 12345;
      let (_, _, dis) = build_in(&mut sent, &wide_expression(), f64::INFINITY, 4);
      let ids = disjunct_list_ids(&sent.disjunct_pool, dis);
      counts.push(ids.len());
      labels.push(
        ids
          .iter()
          .map(|id| {
            chain_ids(&sent.connector_pool, sent.disjunct_pool.get(*id).right)
              .first()
              .map(|c| sent.connector_pool.get(*c).exp_pos)
              .unwrap()
          })
          .collect(),
      );
    }
    assert_eq!(counts[0], counts[1]);
    assert_eq!(labels[0], labels[1]);
    // the head survives and the list shrank
    assert!(counts[0] >= 1);
    assert!(counts[0] < 16);
  }

  #[test]
  fn test_downsample_advances_rand_state() {
    let mut sent = Sentence::new(2);
    sent.rand_state = 777;
    let before = sent.rand_state;
    let mut exprs = Exprs::new();
    let mut descs = ConDescTable::new();
    let e = parse_exp(&wide_expression(), &mut exprs, &mut descs).unwrap();
    let word = sent.strings.intern("w");
    build_disjuncts_for_exp(&mut sent, &exprs, e, &word, None, f64::INFINITY, 4).unwrap();
    assert_ne!(sent.rand_state, 0);
    assert_ne!(sent.rand_state, before);
  }
}
