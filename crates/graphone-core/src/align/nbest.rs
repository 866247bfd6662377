//! Top-K backpointer lists shared by both search engines.

/// One of the K best partial paths reaching a search state.
///
/// `prev` is `(state, rank)` of the entry this one extends; `via` records
/// whatever the engine needs to rebuild the step (span lengths, edge index).
#[derive(Debug, Clone, Copy)]
pub(crate) struct KEntry<T: Copy> {
    pub score: f64,
    pub prev: Option<(usize, usize)>,
    pub via: T,
}

impl<T: Copy> KEntry<T> {
    /// Entry for the start state: score 0, no predecessor.
    pub fn seed(via: T) -> Self {
        Self {
            score: 0.0,
            prev: None,
            via,
        }
    }
}

/// Insert into a list kept in descending score order, capped at `k`.
///
/// Equal scores go after existing entries so ties keep discovery order.
/// `prev` ranks index into finished predecessor lists, so entries are never
/// reordered after a state has been expanded.
pub(crate) fn insert_top_k<T: Copy>(list: &mut Vec<KEntry<T>>, k: usize, entry: KEntry<T>) {
    if entry.score.is_nan() {
        return;
    }
    let pos = list.partition_point(|e| e.score >= entry.score);
    if pos >= k {
        return;
    }
    list.insert(pos, entry);
    if list.len() > k {
        list.pop();
    }
}

/// Follow backpointers from `(end_state, end_rank)` to the seed.
///
/// Returns `(from_state, to_state, via)` per step, last step first.
pub(crate) fn backtrace<T: Copy>(
    top_k: &[Vec<KEntry<T>>],
    end_state: usize,
    end_rank: usize,
) -> Vec<(usize, usize, T)> {
    let mut steps = Vec::new();
    let mut state = end_state;
    let mut rank = end_rank;
    while let Some(entry) = top_k[state].get(rank) {
        match entry.prev {
            Some((prev_state, prev_rank)) => {
                steps.push((prev_state, state, entry.via));
                state = prev_state;
                rank = prev_rank;
            }
            None => break,
        }
    }
    steps
}
