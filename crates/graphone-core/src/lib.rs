//! Grapheme-to-phoneme alignment.
//!
//! Learns a joint distribution over graphones (grapheme-gram, phoneme-gram
//! pairs) with EM, then uses n-best Viterbi search to realign known
//! spelling/pronunciation pairs or to infer a pronunciation for a new
//! spelling.

pub mod align;
pub mod record;
pub mod settings;
pub mod trace_init;
pub mod word;

pub use align::{
    AlignHints, AlignModel, AlignTrainer, Alignment, GramOptions, Graphone, ModelError,
    ProbTable, TrainError, TrainReport,
};
pub use record::InputRecord;
pub use settings::TrainOptions;
pub use word::Word;
