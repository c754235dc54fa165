use std::sync::Arc;

use rustc_hash::FxHashSet;

/// A set of canonical strings. After interning, equal spellings share one
/// allocation, so identity comparison is enough.
#[derive(Debug, Default)]
pub struct StringSet {
  set: FxHashSet<Arc<str>>,
}

impl StringSet {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn intern(&mut self, s: &str) -> Arc<str> {
    if let Some(canonical) = self.set.get(s) {
      return canonical.clone();
    }
    let canonical: Arc<str> = Arc::from(s);
    self.set.insert(canonical.clone());
    canonical
  }

  pub fn len(&self) -> usize {
    self.set.len()
  }

  pub fn is_empty(&self) -> bool {
    self.set.is_empty()
  }
}
