use criterion::{black_box, criterion_group, criterion_main, Criterion};

use linkgram::connectors::ConDescTable;
use linkgram::exprs::{ExpId, Exprs};
use linkgram::parse_exp::parse_exp;
use linkgram::{prepare_to_parse, ParseOptions, Sentence};

// 3 * 3 * 2 * 2 alternatives per entry, before boundary pruning.
const WIDE_SRC: &str = "(A+ or B+ or C+) & (D- or E- or F-) & {G+ or H+} & {I- or J-}";

fn prepare(exprs: &Exprs, descs: &ConDescTable, root: ExpId) -> usize {
  let mut sent = Sentence::new(8);
  for w in 0..sent.len() {
    sent.add_entry(w, "w", root, None);
  }
  prepare_to_parse(&mut sent, exprs, descs, &ParseOptions::default()).unwrap();
  sent.disjunct_count()
}

fn criterion_benchmark(c: &mut Criterion) {
  let mut exprs = Exprs::new();
  let mut descs = ConDescTable::new();
  let root = parse_exp(WIDE_SRC, &mut exprs, &mut descs).unwrap();

  c.bench_function("prepare wide sentence", |b| {
    b.iter(|| prepare(black_box(&exprs), black_box(&descs), black_box(root)))
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
