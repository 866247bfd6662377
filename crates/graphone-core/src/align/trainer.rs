use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use super::alignment::Alignment;
use super::gram_options::{GramOptions, GramOptionsError};
use super::model::AlignModel;
use super::penalizer::penalizer_for;
use super::prob_table::{GramCounts, ProbTable};
use super::viterbi::AlignerViterbi;
use crate::record::InputRecord;
use crate::settings::{self, SettingsError, TrainOptions};
use crate::word::Word;

/// How a record's unit mass is spread over its top-K candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateWeighting {
    /// Hard EM: the best candidate takes all the mass.
    #[default]
    TopOne,
    /// Soft EM: mass proportional to each candidate's probability
    /// (softmax over log scores).
    Proportional,
}

#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("invalid gram options: {0}")]
    Options(#[from] GramOptionsError),
    #[error("invalid training options: {0}")]
    Settings(#[from] SettingsError),
    #[error("failed to build E-step thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Externally imposed alignments, keyed by spelling.
///
/// A hint applies to a record when its y side spells the record's
/// pronunciation; it then receives `semi_supervised_factor` of that record's
/// mass in every E-step.
#[derive(Debug, Clone, Default)]
pub struct AlignHints {
    by_word: HashMap<Word, Vec<Alignment>>,
}

impl AlignHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_alignments<I: IntoIterator<Item = Alignment>>(alignments: I) -> Self {
        let mut hints = Self::new();
        for alignment in alignments {
            hints.insert(alignment);
        }
        hints
    }

    pub fn insert(&mut self, alignment: Alignment) {
        self.by_word
            .entry(alignment.input_word().clone())
            .or_default()
            .push(alignment);
    }

    pub fn get(&self, x_word: &Word) -> &[Alignment] {
        self.by_word.get(x_word).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The hint whose pronunciation matches `record`, if any.
    pub fn matching(&self, record: &InputRecord) -> Option<&Alignment> {
        self.get(&record.x_word)
            .iter()
            .find(|a| a.xy_word_pair().1 == record.y_word)
    }

    /// Number of spellings with at least one hint.
    pub fn len(&self) -> usize {
        self.by_word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_word.is_empty()
    }
}

/// Summary of one EM run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainReport {
    /// Completed M-steps.
    pub iterations: usize,
    pub converged: bool,
    /// Probability change measured by the last M-step.
    pub final_delta: f64,
    /// Corpus log-likelihood of the best candidates, one per iteration,
    /// measured against the table the E-step ran with.
    pub log_likelihoods: Vec<f64>,
    /// Records skipped in the last E-step.
    pub skipped: usize,
}

/// Per-worker E-step accumulator, merged at the end of each pass.
#[derive(Default)]
struct EStepTally {
    counts: GramCounts,
    aligned: usize,
    skipped: usize,
    log_likelihood: f64,
}

impl EStepTally {
    fn merge(self, other: EStepTally) -> EStepTally {
        EStepTally {
            counts: self.counts.merge(other.counts),
            aligned: self.aligned + other.aligned,
            skipped: self.skipped + other.skipped,
            log_likelihood: self.log_likelihood + other.log_likelihood,
        }
    }
}

/// Estimates a `ProbTable` from a corpus with EM over Viterbi alignments.
#[derive(Debug, Clone)]
pub struct AlignTrainer {
    options: TrainOptions,
    gram_opts: GramOptions,
    hints: AlignHints,
}

impl AlignTrainer {
    pub fn new(options: TrainOptions) -> Result<Self, TrainError> {
        settings::validate(&options)?;
        let gram_opts = options.make_gram_options()?;
        Ok(Self {
            options,
            gram_opts,
            hints: AlignHints::new(),
        })
    }

    pub fn with_hints(mut self, hints: AlignHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn options(&self) -> &TrainOptions {
        &self.options
    }

    pub fn gram_options(&self) -> &GramOptions {
        &self.gram_opts
    }

    pub fn train(&self, records: &[InputRecord]) -> Result<AlignModel, TrainError> {
        self.train_with_report(records).map(|(model, _)| model)
    }

    /// Train from a uniform seed over every legal graphone in the corpus.
    pub fn train_with_report(
        &self,
        records: &[InputRecord],
    ) -> Result<(AlignModel, TrainReport), TrainError> {
        let ordered = sorted_records(records);
        let table = self.seed_table(&ordered);
        self.run_em(table, &ordered)
    }

    /// Continue EM from an existing model's table instead of the seed.
    /// The trainer's own gram options govern the search.
    pub fn train_from(
        &self,
        model: AlignModel,
        records: &[InputRecord],
    ) -> Result<(AlignModel, TrainReport), TrainError> {
        let ordered = sorted_records(records);
        self.run_em(model.into_table(), &ordered)
    }

    /// Count 1 for every legal transition of every record's grid, then
    /// normalize.
    fn seed_table(&self, records: &[&InputRecord]) -> ProbTable {
        let opts = &self.gram_opts;
        let x_lens = opts.x_lengths();
        let y_lens = opts.y_lengths();
        let mut table = ProbTable::with_floor(self.options.table.floor_prob);

        for record in records {
            let (x, y) = record.xy_word_pair();
            let m = x.unigram_count();
            let n = y.unigram_count();
            for i in 0..=m {
                for j in 0..=n {
                    if !opts.in_window(i, j, m, n) {
                        continue;
                    }
                    for &a in &x_lens {
                        if i + a > m {
                            break;
                        }
                        for &b in &y_lens {
                            if j + b > n {
                                break;
                            }
                            if opts.is_legal_pair(a, b) && opts.in_window(i + a, j + b, m, n) {
                                table.accumulate(&x.gram(i, a), &y.gram(j, b), 1.0);
                            }
                        }
                    }
                }
            }
        }

        debug!(pairs = table.pending().len(), "seed counts");
        table.normalize_with(self.options.training.maximizer);
        table
    }

    fn run_em(
        &self,
        mut table: ProbTable,
        records: &[&InputRecord],
    ) -> Result<(AlignModel, TrainReport), TrainError> {
        let training = &self.options.training;
        let _span = info_span!("em", records = records.len()).entered();

        let pool = match training.threads {
            0 => None,
            threads => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()?,
            ),
        };

        let mut report = TrainReport::default();
        for iteration in 1..=training.max_iterations {
            let tally = match &pool {
                Some(pool) => pool.install(|| self.e_step(&table, records)),
                None => self.e_step(&table, records),
            };
            report.skipped = tally.skipped;

            if tally.counts.is_empty() {
                warn!(
                    iteration,
                    skipped = tally.skipped,
                    "E-step accumulated no mass; keeping previous table"
                );
                break;
            }

            table.absorb(tally.counts);
            let delta = table.normalize_with(training.maximizer);
            report.iterations = iteration;
            report.final_delta = delta;
            report.log_likelihoods.push(tally.log_likelihood);
            info!(
                iteration,
                delta,
                log_likelihood = tally.log_likelihood,
                aligned = tally.aligned,
                skipped = tally.skipped,
                "EM iteration"
            );

            if delta < training.convergence_threshold {
                report.converged = true;
                break;
            }
        }

        if report.converged {
            info!(iterations = report.iterations, "EM converged");
        } else {
            info!(iterations = report.iterations, "EM stopped without converging");
        }
        Ok((AlignModel::new(self.gram_opts.clone(), table), report))
    }

    /// Align every record against `table` and tally weighted graphone counts.
    fn e_step(&self, table: &ProbTable, records: &[&InputRecord]) -> EStepTally {
        let penalizer = penalizer_for(&self.gram_opts);
        let viterbi = AlignerViterbi::new(&self.gram_opts, table, penalizer.as_ref());
        records
            .par_iter()
            .fold(EStepTally::default, |tally, record| {
                self.tally_record(&viterbi, record, tally)
            })
            .reduce(EStepTally::default, EStepTally::merge)
    }

    fn tally_record(
        &self,
        viterbi: &AlignerViterbi<'_>,
        record: &InputRecord,
        mut tally: EStepTally,
    ) -> EStepTally {
        let training = &self.options.training;
        let candidates = viterbi.align(
            &record.x_word,
            &record.y_word,
            training.top_k_align_candidates,
        );
        if let Some(best) = candidates.first() {
            tally.log_likelihood += best.score();
        }

        let kept: Vec<&Alignment> = candidates
            .iter()
            .filter(|a| training.min_align_score.map_or(true, |min| a.score() >= min))
            .collect();
        let hint = self.hints.matching(record);

        let (hint_mass, candidate_mass) = match (hint, kept.is_empty()) {
            (None, true) => {
                debug!(
                    record = %record,
                    candidates = candidates.len(),
                    "no usable alignment; skipping"
                );
                tally.skipped += 1;
                return tally;
            }
            (None, false) => (0.0, 1.0),
            (Some(_), true) => (1.0, 0.0),
            (Some(_), false) => {
                let factor = training.semi_supervised_factor;
                (factor, 1.0 - factor)
            }
        };

        let weights = candidate_weights(&kept, training.weighting);
        for (alignment, weight) in kept.iter().zip(weights) {
            add_graphones(&mut tally.counts, alignment, weight * candidate_mass);
        }
        if let Some(hint) = hint {
            add_graphones(&mut tally.counts, hint, hint_mass);
        }
        tally.aligned += 1;
        tally
    }
}

fn sorted_records(records: &[InputRecord]) -> Vec<&InputRecord> {
    let mut ordered: Vec<&InputRecord> = records.iter().collect();
    ordered.sort();
    ordered
}

fn add_graphones(counts: &mut GramCounts, alignment: &Alignment, weight: f64) {
    for graphone in alignment.graphones() {
        counts.add(graphone.x_gram(), graphone.y_gram(), weight);
    }
}

/// Weights summing to 1 over `candidates` (sorted best first).
fn candidate_weights(candidates: &[&Alignment], weighting: CandidateWeighting) -> Vec<f64> {
    match weighting {
        CandidateWeighting::TopOne => (0..candidates.len())
            .map(|i| if i == 0 { 1.0 } else { 0.0 })
            .collect(),
        CandidateWeighting::Proportional => {
            let Some(best) = candidates.first().map(|a| a.score()) else {
                return Vec::new();
            };
            let exps: Vec<f64> = candidates
                .iter()
                .map(|a| (a.score() - best).exp())
                .collect();
            let sum: f64 = exps.iter().sum();
            if sum.is_finite() && sum > 0.0 {
                exps.into_iter().map(|e| e / sum).collect()
            } else {
                vec![1.0 / candidates.len() as f64; candidates.len()]
            }
        }
    }
}
