use std::fmt;

use serde::{Deserialize, Serialize};

/// Which side of a graphone a bound applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    X,
    Y,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::X => f.write_str("x"),
            Side::Y => f.write_str("y"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GramOptionsError {
    #[error("inverted {side} gram bounds: min {min} > max {max}")]
    InvertedBounds { side: Side, min: usize, max: usize },

    #[error("{side} grams must allow at least one symbol (max is 0)")]
    NoSpan { side: Side },
}

/// Span, epsilon and pruning configuration shared by every search engine.
///
/// A span length of 0 is only legal through the matching epsilon flag:
/// `include_x_epsilons` lets an x-span pair with an empty y-gram (silent
/// letter), `include_epsilon_ys` lets an empty x-gram pair with a y-span
/// (inserted sound). A `min_*_gram` of 0 is read as 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GramOptions {
    min_x_gram: usize,
    max_x_gram: usize,
    min_y_gram: usize,
    max_y_gram: usize,
    include_x_epsilons: bool,
    include_epsilon_ys: bool,
    only_one_grams: bool,
    window_padding: Option<usize>,
    city_block_penalty: bool,
}

impl GramOptions {
    /// Bounds are inclusive. Epsilons, the one-gram restriction, windowing
    /// and the city-block penalty all start disabled.
    pub fn new(
        min_x_gram: usize,
        max_x_gram: usize,
        min_y_gram: usize,
        max_y_gram: usize,
    ) -> Result<Self, GramOptionsError> {
        let opts = Self {
            min_x_gram,
            max_x_gram,
            min_y_gram,
            max_y_gram,
            include_x_epsilons: false,
            include_epsilon_ys: false,
            only_one_grams: false,
            window_padding: None,
            city_block_penalty: false,
        };
        opts.validate()?;
        Ok(opts)
    }

    pub fn with_x_epsilons(mut self, include: bool) -> Self {
        self.include_x_epsilons = include;
        self
    }

    pub fn with_epsilon_ys(mut self, include: bool) -> Self {
        self.include_epsilon_ys = include;
        self
    }

    pub fn with_only_one_grams(mut self, only: bool) -> Self {
        self.only_one_grams = only;
        self
    }

    pub fn with_window_padding(mut self, padding: Option<usize>) -> Self {
        self.window_padding = padding;
        self
    }

    pub fn with_city_block_penalty(mut self, enabled: bool) -> Self {
        self.city_block_penalty = enabled;
        self
    }

    /// Check bound ordering. Also run on options decoded from a saved model.
    pub fn validate(&self) -> Result<(), GramOptionsError> {
        check_side(Side::X, self.min_x_gram, self.max_x_gram)?;
        check_side(Side::Y, self.min_y_gram, self.max_y_gram)
    }

    pub fn min_x_gram(&self) -> usize {
        self.min_x_gram
    }

    pub fn max_x_gram(&self) -> usize {
        self.max_x_gram
    }

    pub fn min_y_gram(&self) -> usize {
        self.min_y_gram
    }

    pub fn max_y_gram(&self) -> usize {
        self.max_y_gram
    }

    pub fn include_x_epsilons(&self) -> bool {
        self.include_x_epsilons
    }

    pub fn include_epsilon_ys(&self) -> bool {
        self.include_epsilon_ys
    }

    pub fn only_one_grams(&self) -> bool {
        self.only_one_grams
    }

    pub fn window_padding(&self) -> Option<usize> {
        self.window_padding
    }

    pub fn city_block_penalty(&self) -> bool {
        self.city_block_penalty
    }

    /// Legal x-span lengths in ascending order, 0 included when epsilon-ys
    /// are allowed.
    pub fn x_lengths(&self) -> Vec<usize> {
        span_lengths(self.min_x_gram, self.max_x_gram, self.include_epsilon_ys)
    }

    /// Legal y-span lengths in ascending order, 0 included when x-epsilons
    /// are allowed.
    pub fn y_lengths(&self) -> Vec<usize> {
        span_lengths(self.min_y_gram, self.max_y_gram, self.include_x_epsilons)
    }

    pub fn is_legal_x(&self, len: usize) -> bool {
        is_legal_len(len, self.min_x_gram, self.max_x_gram, self.include_epsilon_ys)
    }

    pub fn is_legal_y(&self, len: usize) -> bool {
        is_legal_len(len, self.min_y_gram, self.max_y_gram, self.include_x_epsilons)
    }

    /// Whether an x-span of `x_len` may pair with a y-span of `y_len`.
    pub fn is_legal_pair(&self, x_len: usize, y_len: usize) -> bool {
        if x_len == 0 && y_len == 0 {
            return false;
        }
        if self.only_one_grams && x_len > 1 && y_len > 1 {
            return false;
        }
        self.is_legal_x(x_len) && self.is_legal_y(y_len)
    }

    /// Band of y-positions allowed at x-position `i` when aligning words of
    /// length `m` and `n`, or `None` when no window applies.
    ///
    /// The band is `[floor(i*n/m) - pad, ceil(i*n/m) + pad]`, clamped to
    /// `[0, n]`.
    pub fn window(&self, i: usize, m: usize, n: usize) -> Option<(usize, usize)> {
        let pad = self.window_padding?;
        if m == 0 || n == 0 {
            return None;
        }
        let scaled = i * n;
        let lo = (scaled / m).saturating_sub(pad);
        let hi = (scaled.div_ceil(m) + pad).min(n);
        Some((lo, hi))
    }

    pub fn in_window(&self, i: usize, j: usize, m: usize, n: usize) -> bool {
        match self.window(i, m, n) {
            Some((lo, hi)) => lo <= j && j <= hi,
            None => true,
        }
    }
}

fn check_side(side: Side, min: usize, max: usize) -> Result<(), GramOptionsError> {
    if min > max {
        return Err(GramOptionsError::InvertedBounds { side, min, max });
    }
    if max == 0 {
        return Err(GramOptionsError::NoSpan { side });
    }
    Ok(())
}

fn span_lengths(min: usize, max: usize, epsilon: bool) -> Vec<usize> {
    let mut lens: Vec<usize> = (min.max(1)..=max).collect();
    if epsilon {
        lens.insert(0, 0);
    }
    lens
}

fn is_legal_len(len: usize, min: usize, max: usize, epsilon: bool) -> bool {
    if len == 0 {
        epsilon
    } else {
        min.max(1) <= len && len <= max
    }
}
