//! Property-based tests for the search engines.
//!
//! Generates random words, span configurations and tables, and checks the
//! structural guarantees every alignment result must satisfy.

use std::collections::HashSet;

use proptest::prelude::*;

use super::*;
use crate::word::{gram_len, Word};

const X_SYMBOLS: &[&str] = &["A", "B", "C"];
const Y_SYMBOLS: &[&str] = &["P", "Q"];

fn arb_word(symbols: &'static [&'static str], max_len: usize) -> impl Strategy<Value = Word> {
    prop::collection::vec(prop::sample::select(symbols), 1..=max_len).prop_map(Word::from_grams)
}

fn arb_gram(symbols: &'static [&'static str]) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(symbols), 0..=2).prop_map(|s| s.join(" "))
}

fn arb_options() -> impl Strategy<Value = GramOptions> {
    (
        1usize..=3,
        1usize..=2,
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        prop::option::of(0usize..=2),
        any::<bool>(),
    )
        .prop_map(|(max_x, max_y, x_eps, eps_y, one, window, city)| {
            GramOptions::new(1, max_x, 1, max_y)
                .unwrap()
                .with_x_epsilons(x_eps)
                .with_epsilon_ys(eps_y)
                .with_only_one_grams(one)
                .with_window_padding(window)
                .with_city_block_penalty(city)
        })
}

fn arb_table() -> impl Strategy<Value = ProbTable> {
    prop::collection::vec((arb_gram(X_SYMBOLS), arb_gram(Y_SYMBOLS), 0.1f64..5.0), 0..12)
        .prop_map(|counts| {
            let mut table = ProbTable::new();
            for (x, y, c) in counts {
                table.accumulate(&x, &y, c);
            }
            table.normalize();
            table
        })
}

fn check_results(
    results: &[Alignment],
    x: &Word,
    opts: &GramOptions,
    n_best: usize,
) -> Result<(), TestCaseError> {
    prop_assert!(results.len() <= n_best);
    for w in results.windows(2) {
        prop_assert!(w[0].score() >= w[1].score());
    }
    let unique: HashSet<&Alignment> = results.iter().collect();
    prop_assert_eq!(unique.len(), results.len());

    for a in results {
        let spelled: Vec<&str> = a.x_tokens().iter().flat_map(|g| g.split(' ')).collect();
        let expected: Vec<&str> = x.value().iter().map(String::as_str).collect();
        prop_assert_eq!(spelled, expected);
        prop_assert_eq!(a.x_boundary_marks().len(), x.unigram_count());
        for g in a.graphones() {
            let (xl, yl) = (gram_len(g.x_gram()), gram_len(g.y_gram()));
            prop_assert!(opts.is_legal_pair(xl, yl), "illegal graphone {}", g);
            if opts.only_one_grams() {
                prop_assert!(!(xl > 1 && yl > 1));
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn viterbi_results_are_well_formed(
        x in arb_word(X_SYMBOLS, 6),
        y in arb_word(Y_SYMBOLS, 5),
        opts in arb_options(),
        table in arb_table(),
        n_best in 1usize..6,
    ) {
        let model = AlignModel::new(opts.clone(), table);
        let results = model.align(&x, &y, n_best);
        check_results(&results, &x, &opts, n_best)?;

        for a in &results {
            let (_, y_back) = a.xy_word_pair();
            prop_assert_eq!(&y_back, &y);
        }
    }

    #[test]
    fn inferencer_results_are_well_formed(
        x in arb_word(X_SYMBOLS, 6),
        opts in arb_options(),
        table in arb_table(),
        n_best in 1usize..6,
    ) {
        let model = AlignModel::new(opts.clone(), table);
        let results = model.infer_alignments(&x, n_best);
        check_results(&results, &x, &opts, n_best)?;

        for a in &results {
            for g in a.graphones() {
                prop_assert!(model.transitions().contains(g.x_gram(), g.y_gram()));
            }
        }
    }

    #[test]
    fn roundtrip_preserves_alignments(
        x in arb_word(X_SYMBOLS, 5),
        y in arb_word(Y_SYMBOLS, 4),
        opts in arb_options(),
        table in arb_table(),
    ) {
        let model = AlignModel::new(opts, table);
        let loaded = AlignModel::from_bytes(&model.to_bytes().unwrap()).unwrap();

        let before: Vec<String> = model.align(&x, &y, 3).iter().map(|a| a.to_string()).collect();
        let after: Vec<String> = loaded.align(&x, &y, 3).iter().map(|a| a.to_string()).collect();
        prop_assert_eq!(before, after);

        let before: Vec<String> = model.infer_alignments(&x, 3).iter().map(|a| a.to_string()).collect();
        let after: Vec<String> = loaded.infer_alignments(&x, 3).iter().map(|a| a.to_string()).collect();
        prop_assert_eq!(before, after);
    }
}
