//! Training configuration loaded from TOML.
//!
//! - `defaults()` returns the embedded defaults (lazy-init singleton)
//! - `parse_settings_toml(toml)` parses and validates a custom configuration
//! - Default values are embedded via `include_str!("default_settings.toml")`

use std::sync::OnceLock;

use serde::Deserialize;

use crate::align::{CandidateWeighting, GramOptions, GramOptionsError, Maximizer};

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

/// The embedded default options.
pub fn defaults() -> &'static TrainOptions {
    static INSTANCE: OnceLock<TrainOptions> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        parse_settings_toml(DEFAULT_SETTINGS_TOML).expect("default settings TOML must be valid")
    })
}

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Flat configuration for one training run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrainOptions {
    pub gram: GramSettings,
    pub table: TableSettings,
    pub training: TrainingSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GramSettings {
    pub min_x_gram: usize,
    pub max_x_gram: usize,
    pub min_y_gram: usize,
    pub max_y_gram: usize,
    pub include_x_epsilons: bool,
    pub include_epsilon_ys: bool,
    pub only_one_grams: bool,
    /// Absent means no window pruning.
    #[serde(default)]
    pub window_padding: Option<usize>,
    pub city_block_penalty: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableSettings {
    pub floor_prob: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrainingSettings {
    pub max_iterations: usize,
    pub convergence_threshold: f64,
    pub top_k_align_candidates: usize,
    pub maximizer: Maximizer,
    pub weighting: CandidateWeighting,
    pub semi_supervised_factor: f64,
    /// Candidates scoring below this are ignored in the E-step.
    #[serde(default)]
    pub min_align_score: Option<f64>,
    /// E-step worker threads; 0 uses the global rayon pool.
    pub threads: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        defaults().clone()
    }
}

impl TrainOptions {
    pub fn from_toml(toml_str: &str) -> Result<Self, SettingsError> {
        parse_settings_toml(toml_str)
    }

    /// Validated span configuration for the search engines.
    pub fn make_gram_options(&self) -> Result<GramOptions, GramOptionsError> {
        let g = &self.gram;
        Ok(
            GramOptions::new(g.min_x_gram, g.max_x_gram, g.min_y_gram, g.max_y_gram)?
                .with_x_epsilons(g.include_x_epsilons)
                .with_epsilon_ys(g.include_epsilon_ys)
                .with_only_one_grams(g.only_one_grams)
                .with_window_padding(g.window_padding)
                .with_city_block_penalty(g.city_block_penalty),
        )
    }
}

pub fn parse_settings_toml(toml_str: &str) -> Result<TrainOptions, SettingsError> {
    let s: TrainOptions =
        toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn invalid(field: &str, reason: &str) -> SettingsError {
    SettingsError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

pub(crate) fn validate(s: &TrainOptions) -> Result<(), SettingsError> {
    macro_rules! check_positive_usize {
        ($section:ident . $field:ident) => {
            if s.$section.$field == 0 {
                return Err(invalid(
                    concat!(stringify!($section), ".", stringify!($field)),
                    "must be positive",
                ));
            }
        };
    }
    macro_rules! check_min_max {
        ($section:ident . $min:ident, $max:ident) => {
            if s.$section.$min > s.$section.$max {
                return Err(invalid(
                    concat!(stringify!($section), ".", stringify!($min)),
                    concat!("must not exceed ", stringify!($max)),
                ));
            }
        };
    }
    macro_rules! check_unit_range {
        ($section:ident . $field:ident) => {
            let v = s.$section.$field;
            if !(0.0..=1.0).contains(&v) {
                return Err(invalid(
                    concat!(stringify!($section), ".", stringify!($field)),
                    "must be in [0, 1]",
                ));
            }
        };
    }

    check_positive_usize!(gram.max_x_gram);
    check_positive_usize!(gram.max_y_gram);
    check_min_max!(gram.min_x_gram, max_x_gram);
    check_min_max!(gram.min_y_gram, max_y_gram);

    let floor = s.table.floor_prob;
    if !(floor > 0.0 && floor < 1.0) {
        return Err(invalid("table.floor_prob", "must be in (0, 1)"));
    }

    check_positive_usize!(training.max_iterations);
    check_positive_usize!(training.top_k_align_candidates);
    let threshold = s.training.convergence_threshold;
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(invalid(
            "training.convergence_threshold",
            "must be finite and non-negative",
        ));
    }
    check_unit_range!(training.semi_supervised_factor);
    if s.training.min_align_score.is_some_and(f64::is_nan) {
        return Err(invalid("training.min_align_score", "must be a number"));
    }

    Ok(())
}
