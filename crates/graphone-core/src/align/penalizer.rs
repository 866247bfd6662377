use std::fmt;

use super::gram_options::GramOptions;

/// Position of one search step, passed to the penalizer alongside the grams.
///
/// `x_end`/`y_end` are the grid coordinates reached by the step. `y_total` is
/// `None` during inference, where the target length is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepContext {
    pub x_end: usize,
    pub y_end: usize,
    pub x_len: usize,
    pub y_len: usize,
    pub x_total: usize,
    pub y_total: Option<usize>,
}

/// Scoring adjustment applied to every raw table probability during search.
///
/// Implementations must never return more than `prob`.
pub trait Penalizer: Send + Sync + fmt::Debug {
    fn penalize(&self, x_gram: &str, y_gram: &str, prob: f64, step: &StepContext) -> f64;
}

/// Returns the raw probability unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPenalizer;

impl Penalizer for NullPenalizer {
    fn penalize(&self, _x_gram: &str, _y_gram: &str, prob: f64, _step: &StepContext) -> f64 {
        prob
    }
}

/// Discounts steps that drift away from the proportional diagonal.
///
/// The probability is divided by `1 + weight * d`, where `d` is the
/// city-block distance (in symbols) between the step's end point and the
/// diagonal from `(0, 0)` to `(m, n)`. Without a known target the distance
/// falls back to the length difference of the two grams.
#[derive(Debug, Clone, Copy)]
pub struct CityBlockPenalizer {
    weight: f64,
}

impl CityBlockPenalizer {
    pub const DEFAULT_WEIGHT: f64 = 1.0;

    /// Negative or non-finite weights are clamped to 0.
    pub fn new(weight: f64) -> Self {
        let weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
        Self { weight }
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn distance(step: &StepContext) -> f64 {
        match step.y_total {
            Some(n) => {
                let m = step.x_total;
                let scale = m.max(n);
                if scale == 0 {
                    return 0.0;
                }
                let along_x = (step.x_end * n) as f64;
                let along_y = (step.y_end * m) as f64;
                (along_x - along_y).abs() / scale as f64
            }
            None => step.x_len.abs_diff(step.y_len) as f64,
        }
    }
}

impl Default for CityBlockPenalizer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WEIGHT)
    }
}

impl Penalizer for CityBlockPenalizer {
    fn penalize(&self, _x_gram: &str, _y_gram: &str, prob: f64, step: &StepContext) -> f64 {
        prob / (1.0 + self.weight * Self::distance(step))
    }
}

/// The penalizer policy implied by `opts`.
pub fn penalizer_for(opts: &GramOptions) -> Box<dyn Penalizer> {
    if opts.city_block_penalty() {
        Box::new(CityBlockPenalizer::default())
    } else {
        Box::new(NullPenalizer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(x_end: usize, y_end: usize, m: usize, n: Option<usize>) -> StepContext {
        StepContext {
            x_end,
            y_end,
            x_len: 1,
            y_len: 1,
            x_total: m,
            y_total: n,
        }
    }

    #[test]
    fn null_is_identity() {
        let s = step(1, 3, 4, Some(4));
        assert_eq!(NullPenalizer.penalize("A", "B", 0.25, &s), 0.25);
    }

    #[test]
    fn on_diagonal_is_unpenalized() {
        let p = CityBlockPenalizer::default();
        assert_eq!(p.penalize("A", "B", 0.5, &step(2, 2, 4, Some(4))), 0.5);
        assert_eq!(p.penalize("A", "B", 0.5, &step(2, 1, 4, Some(2))), 0.5);
    }

    #[test]
    fn off_diagonal_is_discounted() {
        let p = CityBlockPenalizer::default();
        // (3, 1) on a 4x4 grid is 2 symbols off
        let s = step(3, 1, 4, Some(4));
        assert_eq!(CityBlockPenalizer::distance(&s), 2.0);
        let adjusted = p.penalize("A B C", "X", 0.6, &s);
        assert!((adjusted - 0.2).abs() < 1e-12);
    }

    #[test]
    fn inference_uses_length_difference() {
        let s = StepContext {
            x_end: 2,
            y_end: 0,
            x_len: 2,
            y_len: 0,
            x_total: 3,
            y_total: None,
        };
        assert_eq!(CityBlockPenalizer::distance(&s), 2.0);
        assert!(CityBlockPenalizer::default().penalize("A B", "", 0.9, &s) < 0.9);
    }

    #[test]
    fn never_increases_probability() {
        let p = CityBlockPenalizer::new(-3.0);
        assert_eq!(p.weight(), 0.0);
        for (x, y) in [(0, 4), (4, 0), (1, 3)] {
            let s = step(x, y, 4, Some(4));
            assert!(CityBlockPenalizer::default().penalize("", "", 0.3, &s) <= 0.3);
        }
    }

    #[test]
    fn policy_follows_options() {
        let opts = GramOptions::new(1, 2, 1, 1).unwrap();
        assert!(format!("{:?}", penalizer_for(&opts)).contains("Null"));
        let opts = opts.with_city_block_penalty(true);
        assert!(format!("{:?}", penalizer_for(&opts)).contains("CityBlock"));
    }
}
