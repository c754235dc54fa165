//! Expression-to-disjunct expansion core for a link grammar parser.
//!
//! A dictionary expresses each word's connection requirements as a boolean
//! expression over typed half-links (connectors). This crate turns those
//! trees into the flat data the matching engine consumes, in four stages per
//! sentence:
//!
//! 1. expand each word's expression into AND-clauses ([`clause`]),
//! 2. materialize the clauses as disjuncts with left/right connector chains,
//!    sharing chains across clauses that derive from the same sub-expression
//!    ([`disjuncts`]),
//! 3. collapse structurally duplicate disjuncts ([`dedup`]),
//! 4. assign every connector its nearest reachable word, prune disjuncts
//!    that cannot link inside the sentence, and mark shallow connectors
//!    ([`prepare`]).
//!
//! Underneath sit three services: bump [`pool`]s for the sentence-scoped
//! records, a [`string_set`] interner for spellings, and the [`tracon_set`]
//! that gives every distinct connector suffix a single identity.
//!
//! ```
//! use linkgram::connectors::ConDescTable;
//! use linkgram::exprs::Exprs;
//! use linkgram::parse_exp::parse_exp;
//! use linkgram::{prepare_to_parse, ParseOptions, Sentence};
//!
//! let mut exprs = Exprs::new();
//! let mut descs = ConDescTable::new();
//! let det = parse_exp("D+", &mut exprs, &mut descs)?;
//! let noun = parse_exp("D- & S+", &mut exprs, &mut descs)?;
//! let verb = parse_exp("S-", &mut exprs, &mut descs)?;
//!
//! let mut sent = Sentence::new(3);
//! sent.add_entry(0, "the", det, None);
//! sent.add_entry(1, "dog", noun, None);
//! sent.add_entry(2, "runs", verb, None);
//! prepare_to_parse(&mut sent, &exprs, &descs, &ParseOptions::default())?;
//! assert_eq!(sent.disjunct_count(), 3);
//! # Ok::<(), linkgram::CoreError>(())
//! ```

#[macro_use]
extern crate lazy_static;

pub mod clause;
pub mod connectors;
pub mod dedup;
pub mod disjuncts;
pub mod errors;
pub mod exprs;
pub mod parse_exp;
pub mod pool;
pub mod prepare;
pub mod sentence;
pub mod string_set;
pub mod tracon_set;

pub use crate::errors::{CoreError, Result};
pub use crate::prepare::prepare_to_parse;
pub use crate::sentence::{ParseOptions, Sentence};
