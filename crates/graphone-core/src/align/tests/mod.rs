mod model_io;
mod proptest_invariants;

use super::*;
use crate::record::InputRecord;
use crate::settings::TrainOptions;

/// Table normalized (joint) from raw counts.
fn table_from_counts(counts: &[(&str, &str, f64)]) -> ProbTable {
    let mut table = ProbTable::new();
    for &(x, y, c) in counts {
        table.accumulate(x, y, c);
    }
    table.normalize();
    table
}

/// x spans 1..=2, y spans exactly 1, no epsilons.
fn x12_y11() -> GramOptions {
    GramOptions::new(1, 2, 1, 1).unwrap()
}

fn pairs(alignment: &Alignment) -> Vec<(&str, &str)> {
    alignment
        .graphones()
        .iter()
        .map(|g| (g.x_gram(), g.y_gram()))
        .collect()
}

fn records(pairs: &[(&str, &str)]) -> Vec<InputRecord> {
    pairs
        .iter()
        .map(|&(x, y)| InputRecord::from_strs(x, y))
        .collect()
}

/// Defaults with epsilons off, so hand-computed seeds stay small.
fn plain_options() -> TrainOptions {
    let mut options = TrainOptions::default();
    options.gram.include_x_epsilons = false;
    options
}

/// "P H I" is ambiguous between P|H I and P H|I; the other two records
/// break the tie toward P H|I.
fn ph_corpus() -> Vec<InputRecord> {
    records(&[("P H", "F"), ("P H I", "F IH"), ("I", "IH")])
}
