//! Candidate scoring and the ranking used to pick winners.

use std::cmp::Ordering;

use crate::config::ScoringWeights;
use crate::hint::LayoutHint;
use crate::scanner::Candidate;

/// `base + layout bonus + proximity bonus` for one candidate.
pub fn score_candidate(
    candidate: &Candidate,
    hint: Option<&LayoutHint>,
    weights: &ScoringWeights,
) -> f64 {
    let base = if candidate.same_row() {
        weights.same_row_base
    } else {
        weights.adjacent_row_base
    };
    base + layout_bonus(candidate, hint, weights) + proximity_bonus(candidate, weights)
}

fn layout_bonus(candidate: &Candidate, hint: Option<&LayoutHint>, weights: &ScoringWeights) -> f64 {
    let Some(hint) = hint else {
        return 0.0;
    };
    let column = Some(candidate.address.column);
    let label_hit = candidate.looks_like_label && hint.label_column == column;
    let symbol_hit = candidate.looks_like_symbol && hint.symbol_column == column;
    if label_hit || symbol_hit {
        weights.layout_bonus
    } else {
        0.0
    }
}

fn proximity_bonus(candidate: &Candidate, weights: &ScoringWeights) -> f64 {
    if !candidate.same_row() {
        return 0.0;
    }
    let distance = f64::from(candidate.column_distance);
    ((weights.proximity_span - distance) * weights.proximity_step).max(0.0)
}

/// Fill in `score` for every candidate.
pub fn score_all(candidates: &mut [Candidate], hint: Option<&LayoutHint>, weights: &ScoringWeights) {
    for candidate in candidates.iter_mut() {
        candidate.score = score_candidate(candidate, hint, weights);
    }
}

/// Total order used to pick a winner: higher score, then same row, then
/// nearer column. Remaining ties keep scan order (callers take the first max).
pub fn rank(a: &Candidate, a_score: f64, b: &Candidate, b_score: f64) -> Ordering {
    a_score
        .total_cmp(&b_score)
        .then_with(|| a.same_row().cmp(&b.same_row()))
        .then_with(|| b.column_distance.cmp(&a.column_distance))
}
