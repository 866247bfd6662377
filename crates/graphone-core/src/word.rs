use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between symbols inside a multigram (`"C K"`).
pub const GRAM_SEPARATOR: &str = " ";

/// An immutable, ordered sequence of single-symbol strings.
///
/// Grapheme words hold letters (`C A T`), phoneme words hold phone symbols
/// (`K AE T`). A gram spanning several symbols is rendered by joining them
/// with [`GRAM_SEPARATOR`]; the empty string is the epsilon gram.
///
/// Symbols are never empty and never contain whitespace, so a joined gram
/// always splits back into the symbols it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Word {
    grams: Vec<String>,
}

impl Word {
    /// Build from symbols. Whitespace inside a symbol splits it, and empty
    /// symbols are dropped.
    pub fn from_grams<I, S>(grams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut symbols = Vec::new();
        for gram in grams {
            let gram: String = gram.into();
            if !gram.is_empty() && !gram.contains(char::is_whitespace) {
                symbols.push(gram);
            } else {
                symbols.extend(gram.split_whitespace().map(String::from));
            }
        }
        Self { grams: symbols }
    }

    /// Parse a space-separated symbol string (`"K AE T"`).
    pub fn from_space_string(s: &str) -> Self {
        Self::from_grams(s.split_whitespace())
    }

    /// One symbol per non-whitespace character (`"cat"` -> `c a t`).
    pub fn from_chars(s: &str) -> Self {
        Self::from_grams(s.chars().map(String::from))
    }

    pub fn unigram_count(&self) -> usize {
        self.grams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grams.is_empty()
    }

    pub fn gram_at(&self, index: usize) -> &str {
        &self.grams[index]
    }

    pub fn value(&self) -> &[String] {
        &self.grams
    }

    /// The `len` symbols starting at `start`, joined into one gram.
    /// A zero-length span yields the epsilon gram `""`.
    pub fn gram(&self, start: usize, len: usize) -> String {
        self.grams[start..start + len].join(GRAM_SEPARATOR)
    }

    pub fn as_space_string(&self) -> String {
        self.grams.join(GRAM_SEPARATOR)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_space_string())
    }
}

impl From<Vec<String>> for Word {
    fn from(grams: Vec<String>) -> Self {
        Self::from_grams(grams)
    }
}

impl From<Word> for Vec<String> {
    fn from(word: Word) -> Self {
        word.grams
    }
}

/// Number of symbols in a gram string; the epsilon gram has none.
pub fn gram_len(gram: &str) -> usize {
    if gram.is_empty() {
        0
    } else {
        gram.split(GRAM_SEPARATOR).count()
    }
}
