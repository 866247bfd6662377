use std::collections::HashSet;

use tracing::{debug, debug_span};

use super::alignment::{Alignment, AlignmentBuilder, Graphone};
use super::gram_options::GramOptions;
use super::nbest::{backtrace, insert_top_k, KEntry};
use super::penalizer::{Penalizer, StepContext};
use super::prob_table::ProbTable;
use crate::word::{gram_len, Word};

/// A scored transition from x-position `start` over `x_len` symbols.
struct Edge {
    start: usize,
    x_len: usize,
    y_gram: String,
    gain: f64,
}

/// N-best pronunciation search for a spelling with no known target.
///
/// The state is the x-position alone. Each step consumes an x-gram that the
/// table already knows and emits one of the y-grams observed with it, so the
/// output never contains an x-gram outside the table's key domain.
pub struct AlignerInferencer<'a> {
    opts: &'a GramOptions,
    table: &'a ProbTable,
    penalizer: &'a dyn Penalizer,
}

impl<'a> AlignerInferencer<'a> {
    pub fn new(opts: &'a GramOptions, table: &'a ProbTable, penalizer: &'a dyn Penalizer) -> Self {
        Self {
            opts,
            table,
            penalizer,
        }
    }

    /// Up to `n_best` distinct guesses for `x`, best first. Empty when some
    /// stretch of `x` cannot be covered by known x-grams.
    pub fn infer(&self, x: &Word, n_best: usize) -> Vec<Alignment> {
        let m = x.unigram_count();
        let _span = debug_span!("infer", m, n_best).entered();
        if n_best == 0 || m == 0 {
            return Vec::new();
        }

        let edges = self.build_edges(x);
        let mut by_start: Vec<Vec<usize>> = vec![Vec::new(); m];
        for (idx, edge) in edges.iter().enumerate() {
            by_start[edge.start].push(idx);
        }

        let mut top_k: Vec<Vec<KEntry<usize>>> = vec![Vec::new(); m + 1];
        top_k[0].push(KEntry::seed(usize::MAX));

        for i in 0..m {
            if top_k[i].is_empty() {
                continue;
            }
            let sources: Vec<f64> = top_k[i].iter().map(|e| e.score).collect();
            for &edge_idx in &by_start[i] {
                let edge = &edges[edge_idx];
                let to = i + edge.x_len;
                for (rank, &score) in sources.iter().enumerate() {
                    insert_top_k(
                        &mut top_k[to],
                        n_best,
                        KEntry {
                            score: score + edge.gain,
                            prev: Some((i, rank)),
                            via: edge_idx,
                        },
                    );
                }
            }
        }

        let mut results: Vec<Alignment> = Vec::new();
        let mut seen: HashSet<Vec<Graphone>> = HashSet::new();
        for (rank, entry) in top_k[m].iter().enumerate() {
            let mut builder = AlignmentBuilder::new(x.clone(), entry.score);
            for (from, to, edge_idx) in backtrace(&top_k, m, rank) {
                let edge = &edges[edge_idx];
                builder.append(Graphone::new(x.gram(from, to - from), edge.y_gram.clone()));
            }
            let alignment = builder.finish();
            if seen.insert(alignment.graphones().to_vec()) {
                results.push(alignment);
            }
        }

        debug!(
            result_count = results.len(),
            best_score = results.first().map(Alignment::score)
        );
        results
    }

    /// All legal (x-gram, y-gram) steps over `x`, grouped by start position
    /// and span length, best gain first within each group.
    fn build_edges(&self, x: &Word) -> Vec<Edge> {
        let m = x.unigram_count();
        let mut edges = Vec::new();
        for start in 0..m {
            for a in self.opts.x_lengths() {
                if a == 0 {
                    continue;
                }
                if start + a > m {
                    break;
                }
                let x_gram = x.gram(start, a);
                let mut group: Vec<Edge> = self
                    .table
                    .y_grams_for(&x_gram)
                    .filter(|(y_gram, _)| self.opts.is_legal_pair(a, gram_len(y_gram)))
                    .map(|(y_gram, _)| {
                        let b = gram_len(y_gram);
                        let step = StepContext {
                            x_end: start + a,
                            y_end: 0,
                            x_len: a,
                            y_len: b,
                            x_total: m,
                            y_total: None,
                        };
                        let prob = self.table.lookup(&x_gram, y_gram);
                        Edge {
                            start,
                            x_len: a,
                            y_gram: y_gram.to_string(),
                            gain: self.penalizer.penalize(&x_gram, y_gram, prob, &step).ln(),
                        }
                    })
                    .collect();
                group.sort_by(|l, r| {
                    r.gain
                        .total_cmp(&l.gain)
                        .then_with(|| l.y_gram.cmp(&r.y_gram))
                });
                edges.extend(group);
            }
        }
        edges
    }
}
