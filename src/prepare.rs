//! Pre-parse preparation: turn the sentence expressions into disjunct
//! lists, collapse duplicates, assign connector reach, prune disjuncts that
//! cannot link inside the sentence, and mark shallow connectors.

use std::time::Instant;

use tracing::{debug, warn};

use crate::connectors::{ConDescTable, Connector, ConnectorId};
use crate::dedup::eliminate_duplicate_disjuncts;
use crate::disjuncts::{build_disjuncts_for_exp, catenate_disjuncts, DisjunctWord};
use crate::errors::{CoreError, Result};
use crate::exprs::Exprs;
use crate::pool::Pool;
use crate::sentence::{ParseOptions, Sentence};

/// Set `nearest_word` down the chain: the head could at best link to the
/// adjacent word, each deeper connector reaches one word farther. Returns
/// the deepest assigned value (`w` itself for an empty chain).
fn set_dist_fields(
  pool: &mut Pool<Connector>,
  head: Option<ConnectorId>,
  w: i32,
  delta: i32,
) -> i32 {
  let mut value = w;
  let mut c = head;
  while let Some(id) = c {
    value += delta;
    let con = pool.get_mut(id);
    con.nearest_word = value;
    c = con.next;
  }
  value
}

/// Initialize the word fields of the connectors, eliminate those disjuncts
/// that are so long that they would need to connect past the end of the
/// sentence, and mark the shallow connectors.
fn setup_connectors(sent: &mut Sentence) {
  let length = sent.words.len() as i32;
  for w in 0..sent.words.len() {
    let mut head = None;

    let mut d = sent.words[w].disjuncts;
    while let Some(did) = d {
      let (xd, left, right) = {
        let dis = sent.disjunct_pool.get(did);
        (dis.next, dis.left, dis.right)
      };

      if set_dist_fields(&mut sent.connector_pool, left, w as i32, -1) < 0
        || set_dist_fields(&mut sent.connector_pool, right, w as i32, 1) >= length
      {
        // Skip this disjunct; release its category array now rather than at
        // sentence teardown.
        let dis = sent.disjunct_pool.get_mut(did);
        if dis.word.is_category() {
          dis.word = DisjunctWord::Categories(Vec::new());
        }
      } else {
        let dis = sent.disjunct_pool.get_mut(did);
        dis.next = head;
        head = Some(did);
        if let Some(l) = left {
          sent.connector_pool.get_mut(l).shallow = true;
        }
        if let Some(r) = right {
          sent.connector_pool.get_mut(r).shallow = true;
        }
      }
      d = xd;
    }
    sent.words[w].disjuncts = head;
  }
}

/// Record the wordgraph word in each of the connectors. It is used for
/// checking alternatives consistency.
pub fn gword_record_in_connector(sent: &mut Sentence) {
  for (_, d) in sent.disjunct_pool.iter() {
    for head in [d.left, d.right] {
      let mut c = head;
      while let Some(id) = c {
        let con = sent.connector_pool.get_mut(id);
        con.originating_gword = d.originating_gword;
        c = con.next;
      }
    }
  }
}

fn budget_exhausted(deadline: Option<Instant>) -> bool {
  deadline.map_or(false, |d| Instant::now() >= d)
}

/// Give up on the current stage: mark the sentence and surface `OverBudget`.
/// Whatever was built so far stays on the words; the caller decides whether
/// to keep the partial result.
fn over_budget(sent: &mut Sentence, stage: &str) -> CoreError {
  warn!(stage, "preparation ran out of budget");
  sent.over_budget = true;
  CoreError::OverBudget
}

/// Turn sentence expressions into disjuncts. Sentence expressions must have
/// been attached to the words before calling this routine.
///
/// A malformed expression is recorded on its word, which then has no
/// disjuncts; the remaining words proceed. Dictionary corruption and pool
/// exhaustion abort the sentence.
fn build_sentence_disjuncts(
  sent: &mut Sentence,
  exprs: &Exprs,
  opts: &ParseOptions,
  deadline: Option<Instant>,
) -> Result<()> {
  for w in 0..sent.words.len() {
    if budget_exhausted(deadline) {
      return Err(over_budget(sent, "disjunct build"));
    }

    let entries = sent.words[w].entries.clone();
    let mut d = None;
    let mut word_error = None;
    for entry in entries {
      match build_disjuncts_for_exp(
        sent,
        exprs,
        entry.exp,
        &entry.spelling,
        entry.gword,
        opts.disjunct_cost,
        opts.max_disjuncts,
      ) {
        Ok(dx) => d = catenate_disjuncts(&mut sent.disjunct_pool, dx, d),
        Err(e @ CoreError::MalformedExpression(_)) => {
          word_error = Some(e);
          d = None;
          break;
        }
        Err(e) => return Err(e),
      }
    }
    sent.words[w].disjuncts = d;
    sent.words[w].error = word_error;
  }
  Ok(())
}

/// Run the whole preparation pipeline on a sentence whose words carry their
/// dictionary entries. Assumes the sentence expression lists have been
/// generated.
pub fn prepare_to_parse(
  sent: &mut Sentence,
  exprs: &Exprs,
  descs: &ConDescTable,
  opts: &ParseOptions,
) -> Result<()> {
  let deadline = opts.max_parse_time.map(|budget| Instant::now() + budget);

  build_sentence_disjuncts(sent, exprs, opts, deadline)?;
  debug!(
    disjuncts = sent.disjunct_count(),
    "expanded expressions into disjuncts"
  );

  for w in 0..sent.words.len() {
    let head = sent.words[w].disjuncts;
    let head = eliminate_duplicate_disjuncts(
      &mut sent.disjunct_pool,
      &sent.connector_pool,
      descs,
      head,
      false,
    );
    sent.words[w].disjuncts = if sent.generation {
      // Also with different word-strings.
      eliminate_duplicate_disjuncts(
        &mut sent.disjunct_pool,
        &sent.connector_pool,
        descs,
        head,
        true,
      )
    } else {
      head
    };
  }
  debug!(
    disjuncts = sent.disjunct_count(),
    "eliminated duplicate disjuncts"
  );
  if budget_exhausted(deadline) {
    return Err(over_budget(sent, "connector setup"));
  }

  setup_connectors(sent);
  debug!(disjuncts = sent.disjunct_count(), "set up connectors");

  gword_record_in_connector(sent);
  Ok(())
}
