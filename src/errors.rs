//! Error types for the disjunct-building core.

use thiserror::Error;

use crate::pool::PoolError;

/// Errors surfaced by the expansion and preparation stages.
#[derive(Debug, Error)]
pub enum CoreError {
  /// Structurally invalid expression tree; fatal for the affected word only.
  #[error("malformed expression: {0}")]
  MalformedExpression(String),

  /// Violated dictionary invariant (e.g. out-of-range category); sentence-fatal.
  #[error("corrupt dictionary: {0}")]
  CorruptDictionary(String),

  /// A pool could not grow; sentence-fatal.
  #[error("out of memory: {0}")]
  OutOfMemory(#[from] PoolError),

  /// The per-sentence resource budget was exhausted; the result is partial.
  #[error("resource budget exhausted")]
  OverBudget,
}

pub type Result<T> = std::result::Result<T, CoreError>;
