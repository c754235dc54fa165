//! A hash set detecting unique connector trailing sequences (tracons).
//!
//! A tracon is identified by its first connector. `add` returns the slot for
//! a chain: if an equal chain was seen before, the slot already holds it;
//! otherwise the slot is empty and the caller must fill it with the
//! canonical chain. The shallow-discriminating mode keeps chains whose heads
//! differ in the `shallow` flag apart, which the power-pruning step depends
//! on. `reset` empties the slots but keeps the allocated table.

use crate::connectors::{ConDescTable, Connector, ConnectorId};
use crate::pool::Pool;

/// Table sizes cycle through primes just above powers of two.
const PRIMES: [usize; 26] = [
  53,
  97,
  193,
  389,
  769,
  1543,
  3079,
  6151,
  12289,
  24593,
  49157,
  98317,
  196613,
  393241,
  786433,
  1572869,
  3145739,
  6291469,
  12582917,
  25165843,
  50331653,
  100663319,
  201326611,
  402653189,
  805306457,
  1610612741,
];

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
  hash: u32,
  clist: Option<ConnectorId>,
}

#[derive(Debug)]
pub struct TraconSet {
  table: Vec<Slot>,
  prime_idx: usize,
  count: usize,
  shallow: bool,
}

impl Default for TraconSet {
  fn default() -> Self {
    Self::new()
  }
}

fn hash_connectors(
  k: u32,
  pool: &Pool<Connector>,
  descs: &ConDescTable,
  head: ConnectorId,
  shallow: bool,
) -> u32 {
  let mut accum: u32 = (shallow && pool.get(head).shallow) as u32;

  let mut c = Some(head);
  while let Some(id) = c {
    let con = pool.get(id);
    let desc = descs.get(con.desc);
    accum = k
      .wrapping_mul(accum)
      .wrapping_add(desc.uc_num << 18)
      .wrapping_add((con.multi as u32) << 31)
      .wrapping_add(desc.lc_letters);
    c = con.next;
  }

  accum
}

/// The connectors must be exactly equal: same descriptor and multi flag.
fn connector_equal(pool: &Pool<Connector>, c1: ConnectorId, c2: ConnectorId) -> bool {
  let (c1, c2) = (pool.get(c1), pool.get(c2));
  c1.desc == c2.desc && c1.multi == c2.multi
}

/// Return true iff the tracons are exactly the same.
fn connector_list_equal(
  pool: &Pool<Connector>,
  mut c1: Option<ConnectorId>,
  mut c2: Option<ConnectorId>,
) -> bool {
  while let (Some(i1), Some(i2)) = (c1, c2) {
    if !connector_equal(pool, i1, i2) {
      return false;
    }
    c1 = pool.get(i1).next;
    c2 = pool.get(i2).next;
  }
  c1.is_none() && c2.is_none()
}

impl TraconSet {
  pub fn new() -> Self {
    Self {
      table: vec![Slot::default(); PRIMES[0]],
      prime_idx: 0,
      count: 0,
      shallow: false,
    }
  }

  /// When set, tracons starting with a shallow connector are not considered
  /// the same as ones starting with a deep connector.
  pub fn set_shallow(&mut self, shallow: bool) {
    self.shallow = shallow;
  }

  pub fn len(&self) -> usize {
    self.count
  }

  pub fn is_empty(&self) -> bool {
    self.count == 0
  }

  /// Clear the slots; the table keeps its current size.
  pub fn reset(&mut self) {
    for slot in self.table.iter_mut() {
      *slot = Slot::default();
    }
    self.count = 0;
  }

  fn primary_hash(&self, pool: &Pool<Connector>, descs: &ConDescTable, c: ConnectorId) -> u32 {
    hash_connectors(7, pool, descs, c, self.shallow)
  }

  fn stride_hash(&self, pool: &Pool<Connector>, descs: &ConDescTable, c: ConnectorId) -> usize {
    let accum = hash_connectors(17, pool, descs, c, self.shallow) as usize % self.table.len();
    // this is the probe stride, so it must not be 0
    if accum == 0 {
      1
    } else {
      accum
    }
  }

  fn place_found(
    &self,
    pool: &Pool<Connector>,
    c: ConnectorId,
    key: usize,
    hash: u32,
  ) -> bool {
    let slot = &self.table[key];
    let head = match slot.clist {
      None => return true,
      Some(head) => head,
    };
    if hash != slot.hash {
      return false;
    }
    if !connector_list_equal(pool, Some(head), Some(c)) {
      return false;
    }
    if self.shallow && pool.get(head).shallow != pool.get(c).shallow {
      return false;
    }
    true
  }

  /// Find the index where the chain is, or where it should go.
  fn find_place(
    &self,
    pool: &Pool<Connector>,
    descs: &ConDescTable,
    c: ConnectorId,
    h: u32,
  ) -> usize {
    let size = self.table.len();
    let mut key = h as usize % size;
    if self.place_found(pool, c, key, h) {
      return key;
    }

    let stride = self.stride_hash(pool, descs, c);
    loop {
      key += stride;
      if key >= size {
        key %= size;
      }
      if self.place_found(pool, c, key, h) {
        return key;
      }
    }
  }

  fn grow_table(&mut self, pool: &Pool<Connector>, descs: &ConDescTable) {
    self.prime_idx += 1;
    let old = std::mem::replace(
      &mut self.table,
      vec![Slot::default(); PRIMES[self.prime_idx]],
    );
    for slot in old {
      if let Some(head) = slot.clist {
        let p = self.find_place(pool, descs, head, slot.hash);
        self.table[p] = slot;
      }
    }
  }

  /// Return the slot for `clist`. A filled slot holds the canonical equal
  /// chain seen earlier; an empty slot is claimed and the caller must assign
  /// the canonical chain to it.
  pub fn add(
    &mut self,
    pool: &Pool<Connector>,
    descs: &ConDescTable,
    clist: ConnectorId,
  ) -> &mut Option<ConnectorId> {
    // Keep the table sparse: more than 3/8 full is too big.
    if 8 * self.count > 3 * self.table.len() {
      self.grow_table(pool, descs);
    }

    let h = self.primary_hash(pool, descs, clist);
    let p = self.find_place(pool, descs, clist, h);

    if self.table[p].clist.is_some() {
      return &mut self.table[p].clist;
    }

    self.table[p].hash = h;
    self.count += 1;
    &mut self.table[p].clist
  }

  /// Look a chain up without claiming a slot.
  pub fn lookup(
    &self,
    pool: &Pool<Connector>,
    descs: &ConDescTable,
    clist: ConnectorId,
  ) -> Option<ConnectorId> {
    let h = self.primary_hash(pool, descs, clist);
    let p = self.find_place(pool, descs, clist, h);
    self.table[p].clist
  }

  /// Intern a chain: the canonical id for it, inserting if new.
  pub fn intern(
    &mut self,
    pool: &Pool<Connector>,
    descs: &ConDescTable,
    clist: ConnectorId,
  ) -> ConnectorId {
    let slot = self.add(pool, descs, clist);
    match slot {
      Some(canonical) => *canonical,
      None => {
        *slot = Some(clist);
        clist
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn chain(
    pool: &mut Pool<Connector>,
    descs: &mut ConDescTable,
    names: &[&str],
  ) -> ConnectorId {
    let mut head = None;
    for name in names.iter().rev() {
      let desc = descs.intern(name);
      let id = pool
        .alloc(Connector {
          desc,
          multi: false,
          exp_pos: 0,
          farthest_word: u32::MAX,
          nearest_word: 0,
          shallow: false,
          originating_gword: None,
          next: head,
        })
        .unwrap();
      head = Some(id);
    }
    head.unwrap()
  }

  #[test]
  fn test_equal_chains_share_a_slot() {
    let mut pool = Pool::new();
    let mut descs = ConDescTable::new();
    let c1 = chain(&mut pool, &mut descs, &["A", "B"]);
    let c2 = chain(&mut pool, &mut descs, &["A", "B"]);
    assert_ne!(c1, c2);

    let mut ts = TraconSet::new();
    assert_eq!(ts.intern(&pool, &descs, c1), c1);
    assert_eq!(ts.intern(&pool, &descs, c2), c1);
    assert_eq!(ts.len(), 1);
  }

  #[test]
  fn test_unequal_chains_get_their_own_slots() {
    let mut pool = Pool::new();
    let mut descs = ConDescTable::new();
    let c1 = chain(&mut pool, &mut descs, &["A", "B"]);
    let c2 = chain(&mut pool, &mut descs, &["A", "C"]);
    let c3 = chain(&mut pool, &mut descs, &["A"]);

    let mut ts = TraconSet::new();
    assert_eq!(ts.intern(&pool, &descs, c1), c1);
    assert_eq!(ts.intern(&pool, &descs, c2), c2);
    assert_eq!(ts.intern(&pool, &descs, c3), c3);
    assert_eq!(ts.len(), 3);
  }

  #[test]
  fn test_multi_flag_distinguishes() {
    let mut pool = Pool::new();
    let mut descs = ConDescTable::new();
    let c1 = chain(&mut pool, &mut descs, &["A"]);
    let c2 = chain(&mut pool, &mut descs, &["A"]);
    pool.get_mut(c2).multi = true;

    let mut ts = TraconSet::new();
    assert_eq!(ts.intern(&pool, &descs, c1), c1);
    assert_eq!(ts.intern(&pool, &descs, c2), c2);
  }

  #[test]
  fn test_shallow_mode_distinguishes_heads() {
    let mut pool = Pool::new();
    let mut descs = ConDescTable::new();
    let c1 = chain(&mut pool, &mut descs, &["A", "B"]);
    let c2 = chain(&mut pool, &mut descs, &["A", "B"]);
    pool.get_mut(c2).shallow = true;

    let mut plain = TraconSet::new();
    assert_eq!(plain.intern(&pool, &descs, c1), c1);
    assert_eq!(plain.intern(&pool, &descs, c2), c1);

    let mut ts = TraconSet::new();
    ts.set_shallow(true);
    assert_eq!(ts.intern(&pool, &descs, c1), c1);
    assert_eq!(ts.intern(&pool, &descs, c2), c2);
    assert_eq!(ts.len(), 2);
  }

  #[test]
  fn test_growth_preserves_entries() {
    let mut pool = Pool::new();
    let mut descs = ConDescTable::new();
    let mut heads = Vec::new();
    for i in 0..40 {
      let name = format!("A{}x", i); // distinct subscripts
      heads.push(chain(&mut pool, &mut descs, &[&name, "B"]));
    }

    let mut ts = TraconSet::new();
    for head in &heads {
      ts.intern(&pool, &descs, *head);
    }
    assert_eq!(ts.len(), 40);
    for head in &heads {
      assert_eq!(ts.lookup(&pool, &descs, *head), Some(*head));
    }
  }

  #[test]
  fn test_reset_clears_without_shrinking() {
    let mut pool = Pool::new();
    let mut descs = ConDescTable::new();
    let c1 = chain(&mut pool, &mut descs, &["A"]);

    let mut ts = TraconSet::new();
    ts.intern(&pool, &descs, c1);
    let size_before = ts.table.len();
    ts.reset();
    assert!(ts.is_empty());
    assert_eq!(ts.table.len(), size_before);
    assert_eq!(ts.lookup(&pool, &descs, c1), None);

    // reusable after reset
    assert_eq!(ts.intern(&pool, &descs, c1), c1);
  }
}
