use rayon::prelude::*;

use super::alignment::Alignment;
use super::gram_options::GramOptions;
use super::inferencer::AlignerInferencer;
use super::penalizer::{penalizer_for, Penalizer};
use super::prob_table::ProbTable;
use super::viterbi::AlignerViterbi;
use crate::record::InputRecord;
use crate::word::Word;

/// Gram options plus a learned table: the unit that is trained, saved and
/// loaded. The penalizer is derived from the options and the search engines
/// are borrowed views, so neither is ever persisted.
///
/// Read-only after construction and safe to share across threads.
#[derive(Debug)]
pub struct AlignModel {
    opts: GramOptions,
    table: ProbTable,
    penalizer: Box<dyn Penalizer>,
}

impl AlignModel {
    pub fn new(opts: GramOptions, table: ProbTable) -> Self {
        let penalizer = penalizer_for(&opts);
        Self {
            opts,
            table,
            penalizer,
        }
    }

    /// Supervised n-best alignment of a known pair.
    pub fn align(&self, x: &Word, y: &Word, n_best: usize) -> Vec<Alignment> {
        self.viterbi().align(x, y, n_best)
    }

    /// N-best pronunciation guesses for an unseen spelling.
    pub fn infer_alignments(&self, x: &Word, n_best: usize) -> Vec<Alignment> {
        self.inferencer().infer(x, n_best)
    }

    /// The learned emission table.
    pub fn transitions(&self) -> &ProbTable {
        &self.table
    }

    pub fn gram_options(&self) -> &GramOptions {
        &self.opts
    }

    pub fn viterbi(&self) -> AlignerViterbi<'_> {
        AlignerViterbi::new(&self.opts, &self.table, self.penalizer.as_ref())
    }

    pub fn inferencer(&self) -> AlignerInferencer<'_> {
        AlignerInferencer::new(&self.opts, &self.table, self.penalizer.as_ref())
    }

    /// Align every record in parallel, keeping input order. Unalignable
    /// records map to an empty list.
    pub fn realign(&self, records: &[InputRecord], top_k: usize) -> Vec<Vec<Alignment>> {
        records
            .par_iter()
            .map(|r| self.align(&r.x_word, &r.y_word, top_k))
            .collect()
    }

    pub(crate) fn into_table(self) -> ProbTable {
        self.table
    }
}
