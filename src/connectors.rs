use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::exprs::Dir;
use crate::pool::{Id, Pool};
use crate::sentence::GwordId;
use crate::string_set::StringSet;

/// Index of an interned connector descriptor.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ConDescId(pub u32);

/// Read-only descriptor for a connector name. The numeric forms are derived
/// from the name once, at intern time, and feed the tracon-set hashes.
#[derive(Debug)]
pub struct ConDesc {
  pub string: Arc<str>,
  /// Id of the upper-case portion of the name, shared by all subscripts of it.
  pub uc_num: u32,
  /// Lower-case subscript letters packed 5 bits apiece, low letters first.
  pub lc_letters: u32,
}

/// Interner for connector descriptors. Lookups after interning are by
/// `ConDescId` identity.
#[derive(Debug, Default)]
pub struct ConDescTable {
  by_name: FxHashMap<Arc<str>, ConDescId>,
  descs: Vec<ConDesc>,
  uc_ids: FxHashMap<String, u32>,
  strings: StringSet,
}

impl ConDescTable {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn intern(&mut self, name: &str) -> ConDescId {
    if let Some(id) = self.by_name.get(name) {
      return *id;
    }

    let string = self.strings.intern(name);
    let uc_len = name.bytes().take_while(|b| b.is_ascii_uppercase()).count();
    let next_uc = self.uc_ids.len() as u32;
    let uc_num = *self
      .uc_ids
      .entry(name[..uc_len].to_string())
      .or_insert(next_uc);

    let mut lc_letters = 0u32;
    for (i, b) in name.bytes().skip(uc_len).take(6).enumerate() {
      lc_letters |= ((b & 0x1f) as u32) << (5 * i);
    }

    let id = ConDescId(self.descs.len() as u32);
    self.by_name.insert(string.clone(), id);
    self.descs.push(ConDesc {
      string,
      uc_num,
      lc_letters,
    });
    id
  }

  /// Get a descriptor. Assumes valid, panics on OOB
  pub fn get(&self, id: ConDescId) -> &ConDesc {
    self.descs.get(id.0 as usize).expect("invalid ConDescId")
  }

  pub fn len(&self) -> usize {
    self.descs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.descs.is_empty()
  }
}

pub type ConnectorId = Id<Connector>;

/// One half-link on a disjunct chain. Lives in the sentence connector pool;
/// `next` forms the chain, whose direction is implied by which side of the
/// disjunct it hangs off.
#[derive(Debug, Clone)]
pub struct Connector {
  pub desc: ConDescId,
  pub multi: bool,
  /// Position of the originating CONNECTOR leaf within its expression.
  pub exp_pos: u32,
  pub farthest_word: u32,
  /// Closest word index this connector could link to; set during preparation.
  pub nearest_word: i32,
  /// True iff this is the first connector of its chain. Set during preparation.
  pub shallow: bool,
  pub originating_gword: Option<GwordId>,
  pub next: Option<ConnectorId>,
}

/// Number of connectors on the chain starting at `head`.
pub fn chain_len(pool: &Pool<Connector>, head: Option<ConnectorId>) -> usize {
  let mut n = 0;
  let mut c = head;
  while let Some(id) = c {
    n += 1;
    c = pool.get(id).next;
  }
  n
}

/// Collect the chain's ids in order. Chains are short; this is test and
/// display plumbing, not the hot path.
pub fn chain_ids(pool: &Pool<Connector>, head: Option<ConnectorId>) -> Vec<ConnectorId> {
  let mut ids = Vec::new();
  let mut c = head;
  while let Some(id) = c {
    ids.push(id);
    c = pool.get(id).next;
  }
  ids
}

/// Helper struct for displaying a connector chain as "A- @B-"
pub struct ChainDisplay<'a> {
  pub pool: &'a Pool<Connector>,
  pub descs: &'a ConDescTable,
  pub head: Option<ConnectorId>,
  pub dir: Dir,
}

impl fmt::Display for ChainDisplay<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut c = self.head;
    while let Some(id) = c {
      let con = self.pool.get(id);
      if con.multi {
        write!(f, "@")?;
      }
      write!(f, "{}{}", self.descs.get(con.desc).string, self.dir.as_char())?;
      c = con.next;
      if c.is_some() {
        write!(f, " ")?;
      }
    }
    Ok(())
  }
}
