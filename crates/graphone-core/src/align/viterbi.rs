use std::collections::HashSet;

use tracing::{debug, debug_span};

use super::alignment::{Alignment, AlignmentBuilder, Graphone};
use super::gram_options::GramOptions;
use super::nbest::{backtrace, insert_top_k, KEntry};
use super::penalizer::{Penalizer, StepContext};
use super::prob_table::ProbTable;
use crate::word::Word;

/// N-best alignment of a known spelling against a known pronunciation.
///
/// Searches the `(m + 1) x (n + 1)` grid of position pairs. Every state keeps
/// its `n_best` highest-scoring partial paths; a step consumes one legal
/// (x-span, y-span) pair and adds the log of its penalized probability.
pub struct AlignerViterbi<'a> {
    opts: &'a GramOptions,
    table: &'a ProbTable,
    penalizer: &'a dyn Penalizer,
}

impl<'a> AlignerViterbi<'a> {
    pub fn new(opts: &'a GramOptions, table: &'a ProbTable, penalizer: &'a dyn Penalizer) -> Self {
        Self {
            opts,
            table,
            penalizer,
        }
    }

    /// Up to `n_best` distinct alignments of `x` with `y`, best first.
    ///
    /// Returns an empty list when no path reaches `(m, n)` under the
    /// configured spans and window.
    pub fn align(&self, x: &Word, y: &Word, n_best: usize) -> Vec<Alignment> {
        let m = x.unigram_count();
        let n = y.unigram_count();
        let _span = debug_span!("viterbi_align", m, n, n_best).entered();
        if n_best == 0 || (m == 0 && n == 0) {
            return Vec::new();
        }

        let cols = n + 1;
        let mut top_k: Vec<Vec<KEntry<()>>> = vec![Vec::new(); (m + 1) * cols];
        top_k[0].push(KEntry::seed(()));

        let x_lens = self.opts.x_lengths();
        let y_lens = self.opts.y_lengths();

        // Every step moves to a state later in row-major order.
        for i in 0..=m {
            for j in 0..=n {
                let from = i * cols + j;
                if top_k[from].is_empty() {
                    continue;
                }
                let sources: Vec<f64> = top_k[from].iter().map(|e| e.score).collect();

                for &a in &x_lens {
                    if i + a > m {
                        break;
                    }
                    let x_gram = x.gram(i, a);
                    for &b in &y_lens {
                        if j + b > n {
                            break;
                        }
                        if !self.opts.is_legal_pair(a, b)
                            || !self.opts.in_window(i + a, j + b, m, n)
                        {
                            continue;
                        }
                        let y_gram = y.gram(j, b);
                        let step = StepContext {
                            x_end: i + a,
                            y_end: j + b,
                            x_len: a,
                            y_len: b,
                            x_total: m,
                            y_total: Some(n),
                        };
                        let prob = self.table.lookup(&x_gram, &y_gram);
                        let gain = self.penalizer.penalize(&x_gram, &y_gram, prob, &step).ln();

                        let to = (i + a) * cols + (j + b);
                        for (rank, &score) in sources.iter().enumerate() {
                            insert_top_k(
                                &mut top_k[to],
                                n_best,
                                KEntry {
                                    score: score + gain,
                                    prev: Some((from, rank)),
                                    via: (),
                                },
                            );
                        }
                    }
                }
            }
        }

        let end = m * cols + n;
        let mut results: Vec<Alignment> = Vec::new();
        let mut seen: HashSet<Vec<Graphone>> = HashSet::new();
        for (rank, entry) in top_k[end].iter().enumerate() {
            let mut builder = AlignmentBuilder::new(x.clone(), entry.score);
            for (from, to, ()) in backtrace(&top_k, end, rank) {
                let (fi, fj) = (from / cols, from % cols);
                let (ti, tj) = (to / cols, to % cols);
                builder.append(Graphone::new(x.gram(fi, ti - fi), y.gram(fj, tj - fj)));
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
}
