use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::word::Word;

/// One training exemplar for the aligner: a spelling and its pronunciation.
///
/// Equality, ordering and hashing look at `x_word` only, so a sorted corpus
/// groups every pronunciation variant of a spelling together and imposed
/// alignments can be looked up by spelling alone.
#[derive(Debug, Clone)]
pub struct InputRecord {
    pub x_word: Word,
    pub y_word: Word,
    /// Per-syllable stress marks, when the source lexicon carries them.
    pub stresses: Option<Vec<u8>>,
}

impl InputRecord {
    pub fn new(x_word: Word, y_word: Word) -> Self {
        Self {
            x_word,
            y_word,
            stresses: None,
        }
    }

    pub fn with_stresses(x_word: Word, y_word: Word, stresses: Vec<u8>) -> Self {
        Self {
            x_word,
            y_word,
            stresses: Some(stresses),
        }
    }

    /// Convenience constructor from space-separated symbol strings.
    pub fn from_strs(x: &str, y: &str) -> Self {
        Self::new(Word::from_space_string(x), Word::from_space_string(y))
    }

    pub fn xy_word_pair(&self) -> (&Word, &Word) {
        (&self.x_word, &self.y_word)
    }
}

impl PartialEq for InputRecord {
    fn eq(&self, other: &Self) -> bool {
        self.x_word == other.x_word
    }
}

impl Eq for InputRecord {}

impl PartialOrd for InputRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InputRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.x_word.cmp(&other.x_word)
    }
}

impl Hash for InputRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x_word.hash(state);
    }
}

impl fmt::Display for InputRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.x_word, self.y_word)?;
        if let Some(stresses) = &self.stresses {
            write!(f, " {stresses:?}")?;
        }
        Ok(())
    }
}
