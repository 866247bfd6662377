use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Probability returned for graphones never observed in training.
pub const DEFAULT_FLOOR_PROB: f64 = 1e-10;

/// How accumulated counts become probabilities in the M-step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Maximizer {
    /// p(x, y): every count divided by the total mass.
    #[default]
    Joint,
    /// p(y | x): counts divided by the mass of their x-gram.
    Conditional,
}

/// Fractional graphone counts gathered during one E-step.
///
/// Each worker fills its own `GramCounts`; partials are combined with
/// [`GramCounts::merge`] before the table is normalized.
#[derive(Debug, Clone, Default)]
pub struct GramCounts {
    /// x-gram → (y-gram → count)
    counts: HashMap<String, HashMap<String, f64>>,
    total: f64,
}

impl GramCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `weight` to the (x, y) count. Non-positive and non-finite weights
    /// are ignored.
    pub fn add(&mut self, x_gram: &str, y_gram: &str, weight: f64) {
        if !(weight.is_finite() && weight > 0.0) {
            return;
        }
        *self
            .counts
            .entry(x_gram.to_string())
            .or_default()
            .entry(y_gram.to_string())
            .or_insert(0.0) += weight;
        self.total += weight;
    }

    /// Combine two partial tables, folding the smaller into the larger.
    pub fn merge(self, other: GramCounts) -> GramCounts {
        let (mut big, small) = if self.len() >= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        for (x_gram, inner) in small.counts {
            let target = big.counts.entry(x_gram).or_default();
            for (y_gram, count) in inner {
                *target.entry(y_gram).or_insert(0.0) += count;
            }
        }
        big.total += small.total;
        big
    }

    pub fn get(&self, x_gram: &str, y_gram: &str) -> f64 {
        self.counts
            .get(x_gram)
            .and_then(|inner| inner.get(y_gram))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// Number of distinct (x, y) pairs.
    pub fn len(&self) -> usize {
        self.counts.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Learned emission distribution over (x-gram, y-gram) pairs.
///
/// Lookups of unseen pairs return the floor so every search path keeps a
/// finite score. Counts added through [`accumulate`](Self::accumulate) or
/// [`absorb`](Self::absorb) stay pending and are invisible to lookups until
/// [`normalize`](Self::normalize) replaces the distribution.
#[derive(Debug, Clone)]
pub struct ProbTable {
    /// x-gram → (y-gram → probability)
    probs: HashMap<String, HashMap<String, f64>>,
    pending: GramCounts,
    floor: f64,
}

impl Default for ProbTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbTable {
    pub fn new() -> Self {
        Self::with_floor(DEFAULT_FLOOR_PROB)
    }

    pub fn with_floor(floor: f64) -> Self {
        Self {
            probs: HashMap::new(),
            pending: GramCounts::new(),
            floor,
        }
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Stored probability of the pair, or the floor if it was never observed.
    pub fn lookup(&self, x_gram: &str, y_gram: &str) -> f64 {
        self.probs
            .get(x_gram)
            .and_then(|inner| inner.get(y_gram))
            .copied()
            .filter(|&p| p > 0.0)
            .unwrap_or(self.floor)
    }

    pub fn contains(&self, x_gram: &str, y_gram: &str) -> bool {
        self.probs
            .get(x_gram)
            .is_some_and(|inner| inner.contains_key(y_gram))
    }

    /// Whether `x_gram` belongs to the table's key domain.
    pub fn has_x_gram(&self, x_gram: &str) -> bool {
        self.probs.contains_key(x_gram)
    }

    /// Every y-gram observed with `x_gram`, with its probability.
    pub fn y_grams_for<'a>(&'a self, x_gram: &str) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.probs
            .get(x_gram)
            .into_iter()
            .flat_map(|inner| inner.iter().map(|(y, &p)| (y.as_str(), p)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.probs.iter().flat_map(|(x, inner)| {
            inner
                .iter()
                .map(move |(y, &p)| (x.as_str(), y.as_str(), p))
        })
    }

    /// Entries ordered by (x-gram, y-gram).
    pub fn sorted_entries(&self) -> Vec<(&str, &str, f64)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        entries
    }

    pub fn len(&self) -> usize {
        self.probs.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    pub fn total_mass(&self) -> f64 {
        self.iter().map(|(_, _, p)| p).sum()
    }

    /// Pending counts not yet normalized.
    pub fn pending(&self) -> &GramCounts {
        &self.pending
    }

    /// E-step: add fractional weight to the pending count of (x, y).
    pub fn accumulate(&mut self, x_gram: &str, y_gram: &str, weight: f64) {
        self.pending.add(x_gram, y_gram, weight);
    }

    /// Merge a worker's partial counts into the pending counts.
    pub fn absorb(&mut self, counts: GramCounts) {
        let pending = std::mem::take(&mut self.pending);
        self.pending = pending.merge(counts);
    }

    /// M-step with the joint maximizer. See [`normalize_with`](Self::normalize_with).
    pub fn normalize(&mut self) -> f64 {
        self.normalize_with(Maximizer::Joint)
    }

    /// M-step: replace the distribution with the normalized pending counts
    /// and clear them. Returns the total absolute probability change.
    ///
    /// With no pending mass the current distribution is kept and 0 is
    /// returned.
    pub fn normalize_with(&mut self, maximizer: Maximizer) -> f64 {
        let pending = std::mem::take(&mut self.pending);
        if pending.total <= 0.0 {
            warn!("normalize called without accumulated counts; keeping current table");
            return 0.0;
        }

        let mut next: HashMap<String, HashMap<String, f64>> =
            HashMap::with_capacity(pending.counts.len());
        for (x_gram, inner) in pending.counts {
            let denom = match maximizer {
                Maximizer::Joint => pending.total,
                Maximizer::Conditional => inner.values().sum(),
            };
            let probs = inner
                .into_iter()
                .map(|(y_gram, count)| (y_gram, count / denom))
                .collect();
            next.insert(x_gram, probs);
        }

        let delta = prob_delta(&self.probs, &next);
        self.probs = next;
        delta
    }

    /// Rebuild a table from stored entries.
    pub(crate) fn from_entries<I>(floor: f64, entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String, f64)>,
    {
        let mut table = Self::with_floor(floor);
        for (x_gram, y_gram, prob) in entries {
            table.probs.entry(x_gram).or_default().insert(y_gram, prob);
        }
        table
    }
}

fn prob_delta(
    prev: &HashMap<String, HashMap<String, f64>>,
    next: &HashMap<String, HashMap<String, f64>>,
) -> f64 {
    let lookup = |table: &HashMap<String, HashMap<String, f64>>, x: &str, y: &str| {
        table
            .get(x)
            .and_then(|inner| inner.get(y))
            .copied()
            .unwrap_or(0.0)
    };
    let mut delta = 0.0;
    for (x, inner) in next {
        for (y, &p) in inner {
            delta += (p - lookup(prev, x, y)).abs();
        }
    }
    for (x, inner) in prev {
        for (y, &p) in inner {
            if !next.get(x).is_some_and(|n| n.contains_key(y)) {
                delta += p;
            }
        }
    }
    delta
}
