use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::word::{Word, GRAM_SEPARATOR};

/// One (x-gram, y-gram) pair. Either side may be the epsilon gram `""`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Graphone {
    x_gram: String,
    y_gram: String,
}

impl Graphone {
    pub fn new(x_gram: impl Into<String>, y_gram: impl Into<String>) -> Self {
        Self {
            x_gram: x_gram.into(),
            y_gram: y_gram.into(),
        }
    }

    pub fn x_gram(&self) -> &str {
        &self.x_gram
    }

    pub fn y_gram(&self) -> &str {
        &self.y_gram
    }

    /// A letter span with no sound.
    pub fn is_silent(&self) -> bool {
        self.y_gram.is_empty()
    }

    /// A sound with no letter span.
    pub fn is_inserted(&self) -> bool {
        self.x_gram.is_empty()
    }

    pub fn x_symbols(&self) -> Vec<&str> {
        split_gram(&self.x_gram)
    }

    pub fn y_symbols(&self) -> Vec<&str> {
        split_gram(&self.y_gram)
    }
}

impl fmt::Display for Graphone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.x_gram, self.y_gram)
    }
}

fn split_gram(gram: &str) -> Vec<&str> {
    if gram.is_empty() {
        Vec::new()
    } else {
        gram.split(GRAM_SEPARATOR).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlignmentError {
    #[error("x-grams spell {actual:?}, expected {expected:?}")]
    Mismatch { expected: String, actual: String },

    #[error("expected {expected} graphones, got {actual}")]
    GraphoneCount { expected: usize, actual: usize },
}

/// A finished alignment of one word: graphones left to right plus a score.
///
/// The non-empty x-grams always spell the source word exactly. Equality and
/// hashing consider the graphone sequence only; use
/// [`compare_score`](Self::compare_score) to rank.
#[derive(Debug, Clone)]
pub struct Alignment {
    graphones: Vec<Graphone>,
    score: f64,
    input: Word,
    graphone_syllable_grams: Option<Vec<String>>,
    grapheme_syll_starts: Option<BTreeSet<usize>>,
}

/// Collects graphones during a backtrace, in reverse, then fixes the order.
pub(crate) struct AlignmentBuilder {
    reversed: Vec<Graphone>,
    score: f64,
    input: Word,
}

impl AlignmentBuilder {
    pub fn new(input: Word, score: f64) -> Self {
        Self {
            reversed: Vec::new(),
            score,
            input,
        }
    }

    pub fn append(&mut self, graphone: Graphone) {
        self.reversed.push(graphone);
    }

    /// Reverse into left-to-right order and check the x reconstruction.
    ///
    /// A mismatch means the search bookkeeping is broken, so it panics.
    pub fn finish(mut self) -> Alignment {
        self.reversed.reverse();
        let graphones = self.reversed;
        if let Err(e) = check_reconstruction(&graphones, &self.input) {
            panic!("search produced an invalid alignment: {e}");
        }
        Alignment {
            graphones,
            score: self.score,
            input: self.input,
            graphone_syllable_grams: None,
            grapheme_syll_starts: None,
        }
    }
}

fn check_reconstruction(graphones: &[Graphone], input: &Word) -> Result<(), AlignmentError> {
    let spelled: Vec<&str> = graphones.iter().flat_map(Graphone::x_symbols).collect();
    if spelled.iter().copied().ne(input.value().iter().map(String::as_str)) {
        return Err(AlignmentError::Mismatch {
            expected: input.as_space_string(),
            actual: spelled.join(GRAM_SEPARATOR),
        });
    }
    Ok(())
}

impl Alignment {
    /// Build from externally supplied graphones, such as imposed hints.
    pub fn from_graphones(
        input: Word,
        graphones: Vec<Graphone>,
        score: f64,
    ) -> Result<Self, AlignmentError> {
        check_reconstruction(&graphones, &input)?;
        Ok(Self {
            graphones,
            score,
            input,
            graphone_syllable_grams: None,
            grapheme_syll_starts: None,
        })
    }

    pub fn graphones(&self) -> &[Graphone] {
        &self.graphones
    }

    /// Per graphone, its x symbols and y symbols.
    pub fn graphones_split(&self) -> Vec<(Vec<&str>, Vec<&str>)> {
        self.graphones
            .iter()
            .map(|g| (g.x_symbols(), g.y_symbols()))
            .collect()
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn input_word(&self) -> &Word {
        &self.input
    }

    pub fn word_unigrams(&self) -> &[String] {
        self.input.value()
    }

    /// Non-empty x-grams in order.
    pub fn x_tokens(&self) -> Vec<&str> {
        self.graphones
            .iter()
            .map(Graphone::x_gram)
            .filter(|g| !g.is_empty())
            .collect()
    }

    /// Every x-gram, epsilons included, one per graphone.
    pub fn all_x_tokens(&self) -> Vec<&str> {
        self.graphones.iter().map(Graphone::x_gram).collect()
    }

    /// Non-empty y-grams in order.
    pub fn y_tokens(&self) -> Vec<&str> {
        self.graphones
            .iter()
            .map(Graphone::y_gram)
            .filter(|g| !g.is_empty())
            .collect()
    }

    pub fn all_y_tokens(&self) -> Vec<&str> {
        self.graphones.iter().map(Graphone::y_gram).collect()
    }

    /// One flag per x unigram: true on the last unigram of each x-gram span.
    pub fn x_boundary_marks(&self) -> Vec<bool> {
        let mut marks = Vec::with_capacity(self.input.unigram_count());
        for graphone in &self.graphones {
            let len = graphone.x_symbols().len();
            for k in 0..len {
                marks.push(k + 1 == len);
            }
        }
        marks
    }

    /// One flag per x unigram: true on the first unigram of each x-gram span.
    pub fn x_start_marks(&self) -> Vec<bool> {
        let mut marks = Vec::with_capacity(self.input.unigram_count());
        for graphone in &self.graphones {
            let len = graphone.x_symbols().len();
            for k in 0..len {
                marks.push(k == 0);
            }
        }
        marks
    }

    pub fn x_boundary_marks_string(&self) -> String {
        marks_string(&self.x_boundary_marks())
    }

    pub fn x_start_marks_string(&self) -> String {
        marks_string(&self.x_start_marks())
    }

    /// `"C|A|T"`: every x-gram, epsilons included, joined by `|`.
    pub fn x_as_pipe_string(&self) -> String {
        self.all_x_tokens().join("|")
    }

    pub fn y_as_pipe_string(&self) -> String {
        self.all_y_tokens().join("|")
    }

    /// The source word and the y side flattened back into a word.
    pub fn xy_word_pair(&self) -> (Word, Word) {
        let y_symbols = self.graphones.iter().flat_map(Graphone::y_symbols);
        (self.input.clone(), Word::from_grams(y_symbols))
    }

    /// Same x segmentation with one replacement y-gram per graphone.
    pub fn with_replaced_ys<S: AsRef<str>>(&self, ys: &[S]) -> Result<Self, AlignmentError> {
        if ys.len() != self.graphones.len() {
            return Err(AlignmentError::GraphoneCount {
                expected: self.graphones.len(),
                actual: ys.len(),
            });
        }
        let graphones = self
            .graphones
            .iter()
            .zip(ys)
            .map(|(g, y)| Graphone::new(g.x_gram.clone(), y.as_ref()))
            .collect();
        Ok(Self {
            graphones,
            ..self.clone()
        })
    }

    pub fn with_graphone_syllable_grams(mut self, grams: Vec<String>) -> Self {
        self.graphone_syllable_grams = Some(grams);
        self
    }

    pub fn with_grapheme_syll_starts(mut self, starts: BTreeSet<usize>) -> Self {
        self.grapheme_syll_starts = Some(starts);
        self
    }

    pub fn graphone_syllable_grams(&self) -> Option<&[String]> {
        self.graphone_syllable_grams.as_deref()
    }

    pub fn grapheme_syll_starts(&self) -> Option<&BTreeSet<usize>> {
        self.grapheme_syll_starts.as_ref()
    }

    /// Descending by score, for sorting best-first.
    pub fn compare_score(&self, other: &Self) -> Ordering {
        other.score.total_cmp(&self.score)
    }
}

fn marks_string(marks: &[bool]) -> String {
    marks.iter().map(|&m| if m { '1' } else { '0' }).collect()
}

impl PartialEq for Alignment {
    fn eq(&self, other: &Self) -> bool {
        self.graphones == other.graphones
    }
}

impl Eq for Alignment {}

impl Hash for Alignment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.graphones.hash(state);
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} (score {:.4})",
            self.x_as_pipe_string(),
            self.y_as_pipe_string(),
            self.score
        )
    }
}
