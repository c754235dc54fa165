use std::collections::hash_map::Entry;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::connectors::{ConDescTable, Connector, ConnectorId};
use crate::disjuncts::{Disjunct, DisjunctId, DisjunctWord};
use crate::pool::Pool;
use crate::tracon_set::TraconSet;

/// Key of one disjunct under structural equality: the canonical ids of its
/// two chains, plus the word spelling when word-strings are distinguished.
#[derive(Debug, PartialEq, Eq, Hash)]
struct DupKey {
  left: Option<u32>,
  right: Option<u32>,
  word: Option<Arc<str>>,
}

/// Collapse duplicate disjuncts on one word's list.
///
/// Two disjuncts are duplicates when their left chains and right chains are
/// pointwise equal (descriptor identity and multi flag); with `match_word`
/// set they must also carry the same word spelling. The lower-cost disjunct
/// wins, ties keeping the earlier one, and category arrays merge by union.
///
/// Near-linear: both chains are interned through a tracon set, so the key
/// comparison is two canonical ids rather than a chain walk.
pub fn eliminate_duplicate_disjuncts(
  disjunct_pool: &mut Pool<Disjunct>,
  connector_pool: &Pool<Connector>,
  descs: &ConDescTable,
  head: Option<DisjunctId>,
  match_word: bool,
) -> Option<DisjunctId> {
  let mut tracons = TraconSet::new();
  let mut winners: Vec<DisjunctId> = Vec::new();
  let mut by_key: FxHashMap<DupKey, usize> = FxHashMap::default();

  let mut canon = |c: Option<ConnectorId>| -> Option<u32> {
    c.map(|chain| tracons.intern(connector_pool, descs, chain).index())
  };

  let mut d = head;
  while let Some(did) = d {
    let (next, left, right) = {
      let dis = disjunct_pool.get(did);
      (dis.next, dis.left, dis.right)
    };
    let key = DupKey {
      left: canon(left),
      right: canon(right),
      word: if match_word {
        disjunct_pool.get(did).word.spelling().cloned()
      } else {
        None
      },
    };

    match by_key.entry(key) {
      Entry::Vacant(entry) => {
        entry.insert(winners.len());
        winners.push(did);
      }
      Entry::Occupied(entry) => {
        let slot = *entry.get();
        let kept = winners[slot];
        let (winner, loser) = if disjunct_pool.get(did).cost < disjunct_pool.get(kept).cost {
          (did, kept)
        } else {
          (kept, did)
        };
        winners[slot] = winner;
        merge(disjunct_pool, winner, loser);
      }
    }
    d = next;
  }

  // Relink the survivors in first-seen order.
  for i in 0..winners.len() {
    let next = winners.get(i + 1).copied();
    disjunct_pool.get_mut(winners[i]).next = next;
  }
  winners.first().copied()
}

/// Fold the loser into the winner: minimum cost, union of category arrays.
fn merge(pool: &mut Pool<Disjunct>, winner: DisjunctId, loser: DisjunctId) {
  let loser_cost = pool.get(loser).cost;
  let loser_cats = match &pool.get(loser).word {
    DisjunctWord::Categories(cats) => cats.clone(),
    _ => Vec::new(),
  };

  let kept = pool.get_mut(winner);
  if loser_cost < kept.cost {
    kept.cost = loser_cost;
  }
  if let DisjunctWord::Categories(cats) = &mut kept.word {
    for cat in loser_cats {
      match cats.iter_mut().find(|c| c.num == cat.num) {
        Some(existing) => {
          if cat.cost < existing.cost {
            existing.cost = cat.cost;
          }
        }
        None => cats.push(cat),
      }
    }
  }
}
