use std::sync::Arc;
use std::time::Duration;

use crate::clause::{Clause, Tconnector};
use crate::connectors::Connector;
use crate::disjuncts::{count_disjuncts, Disjunct, DisjunctId};
use crate::errors::CoreError;
use crate::exprs::ExpId;
use crate::pool::Pool;
use crate::string_set::StringSet;

/// If no cutoff is configured, disjuncts costlier than this are dropped.
pub const DEFAULT_MAX_DISJUNCT_COST: f64 = 2.7;

/// Opaque handle to the tokenizer's word-graph node that produced an entry.
/// The core only stamps it through onto disjuncts and connectors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GwordId(pub u32);

/// One dictionary entry of a sentence word: an expression and its spelling.
#[derive(Debug, Clone)]
pub struct WordEntry {
  pub exp: ExpId,
  pub spelling: Arc<str>,
  pub gword: Option<GwordId>,
}

#[derive(Debug, Default)]
pub struct Word {
  pub entries: Vec<WordEntry>,
  pub disjuncts: Option<DisjunctId>,
  /// Set when this word's expansion failed; the word then has no disjuncts.
  pub error: Option<CoreError>,
}

/// Per-sentence state: the word array and the pools every sentence-scoped
/// object lives in. Sentences must not share pools; teardown is dropping
/// the whole struct.
#[derive(Debug)]
pub struct Sentence {
  pub words: Vec<Word>,
  pub connector_pool: Pool<Connector>,
  pub disjunct_pool: Pool<Disjunct>,
  /// Scratch, reclaimed after every expression expansion.
  pub clause_pool: Pool<Clause>,
  /// Scratch, reclaimed after every expression expansion.
  pub tconn_pool: Pool<Tconnector>,
  pub strings: StringSet,
  /// Seed for the disjunct down-sampler. Nonzero makes it deterministic and
  /// is advanced on use; zero selects the system generator.
  pub rand_state: u64,
  /// Whether the dictionary is a generation-mode one (category-encoded
  /// word strings, word-string-discriminating duplicate elimination).
  pub generation: bool,
  /// Set when a stage ran out of budget and left a partial result.
  pub over_budget: bool,
}

impl Sentence {
  pub fn new(length: usize) -> Self {
    Self {
      words: (0..length).map(|_| Word::default()).collect(),
      connector_pool: Pool::with_capacity(8192),
      disjunct_pool: Pool::with_capacity(2048),
      clause_pool: Pool::with_capacity(4096),
      tconn_pool: Pool::with_capacity(32768),
      strings: StringSet::new(),
      rand_state: 0,
      generation: false,
      over_budget: false,
    }
  }

  pub fn len(&self) -> usize {
    self.words.len()
  }

  pub fn is_empty(&self) -> bool {
    self.words.is_empty()
  }

  /// Add a dictionary entry for word `w`, interning the spelling.
  pub fn add_entry(&mut self, w: usize, spelling: &str, exp: ExpId, gword: Option<GwordId>) {
    let spelling = self.strings.intern(spelling);
    self.words[w].entries.push(WordEntry {
      exp,
      spelling,
      gword,
    });
  }

  /// Total number of disjuncts currently on the per-word lists.
  pub fn disjunct_count(&self) -> usize {
    self
      .words
      .iter()
      .map(|word| count_disjuncts(&self.disjunct_pool, word.disjuncts))
      .sum()
  }
}

/// Knobs of the expansion and preparation stages.
#[derive(Debug, Clone)]
pub struct ParseOptions {
  /// Cost cutoff: clauses accumulating more than this are dropped.
  pub disjunct_cost: f64,
  /// Per-word disjunct cap for random down-sampling; 0 disables it.
  pub max_disjuncts: usize,
  /// Wall-clock budget for preparing one sentence; None means unlimited.
  pub max_parse_time: Option<Duration>,
}

impl Default for ParseOptions {
  fn default() -> Self {
    Self {
      disjunct_cost: DEFAULT_MAX_DISJUNCT_COST,
      max_disjuncts: 0,
      max_parse_time: None,
    }
  }
}
