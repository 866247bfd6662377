//! Grapheme/phoneme alignment engine.
//!
//! `ProbTable` holds the learned (x-gram, y-gram) emission distribution.
//! `AlignerViterbi` aligns a known spelling with a known pronunciation,
//! `AlignerInferencer` searches pronunciations for a spelling alone, and
//! `AlignTrainer` estimates the table with EM over a corpus of records.

mod alignment;
mod gram_options;
mod inferencer;
mod model;
mod model_io;
mod nbest;
mod penalizer;
mod prob_table;
#[cfg(test)]
mod tests;
mod trainer;
mod viterbi;

pub use alignment::{Alignment, AlignmentError, Graphone};
pub use gram_options::{GramOptions, GramOptionsError, Side};
pub use inferencer::AlignerInferencer;
pub use model::AlignModel;
pub use penalizer::{penalizer_for, CityBlockPenalizer, NullPenalizer, Penalizer, StepContext};
pub use prob_table::{GramCounts, Maximizer, ProbTable, DEFAULT_FLOOR_PROB};
pub use trainer::{AlignHints, AlignTrainer, CandidateWeighting, TrainError, TrainReport};
pub use viterbi::AlignerViterbi;

use std::io;

/// Errors from encoding, decoding, saving or loading an `AlignModel` (G2PA).
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid header (too short)")]
    InvalidHeader,

    #[error("invalid magic bytes (expected G2PA)")]
    InvalidMagic,

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("serialization error: {0}")]
    Serialize(bincode::Error),

    #[error("deserialization error: {0}")]
    Deserialize(bincode::Error),

    #[error("invalid gram options: {0}")]
    InvalidOptions(#[from] GramOptionsError),

    #[error("invalid table: {0}")]
    InvalidTable(String),
}
