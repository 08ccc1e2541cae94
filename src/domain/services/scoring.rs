use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Min-max scales scores into [0, 1].
///
/// When all scores are equal every output is 1.0: "all candidates equally
/// relevant", not a NaN from a zero range.
pub fn normalize_scores(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }

    let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    if max == min {
        return vec![1.0; scores.len()];
    }

    scores
        .iter()
        .map(|score| (score - min) / (max - min))
        .collect()
}

/// Removes duplicates while preserving order, first occurrence wins
pub fn deduplicate_preserving_order<T: Eq + Hash + Clone>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Merges two ranked lists with weights.
///
/// Scores for the same id sum across both lists (weighted), they never
/// replace each other. The result is sorted by descending combined score,
/// with ascending id as the deterministic tie-break.
pub fn merge_ranked(
    ranking_a: &[(String, f32)],
    ranking_b: &[(String, f32)],
    weight_a: f32,
    weight_b: f32,
) -> Vec<(String, f32)> {
    let mut score_map: HashMap<String, f32> = HashMap::new();

    for (id, score) in ranking_a {
        *score_map.entry(id.clone()).or_insert(0.0) += score * weight_a;
    }
    for (id, score) in ranking_b {
        *score_map.entry(id.clone()).or_insert(0.0) += score * weight_b;
    }

    let mut merged: Vec<(String, f32)> = score_map.into_iter().collect();
    merged.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_maps_min_to_zero_and_max_to_one() {
        let normalized = normalize_scores(&[0.2, 0.8, 0.5]);

        assert_eq!(normalized[0], 0.0);
        assert_eq!(normalized[1], 1.0);
        assert!(normalized.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn normalize_maps_all_equal_scores_to_one() {
        assert_eq!(normalize_scores(&[0.4, 0.4, 0.4]), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn normalize_on_empty_input_returns_empty() {
        assert!(normalize_scores(&[]).is_empty());
    }

    #[test]
    fn deduplicate_keeps_first_occurrence_and_order() {
        let items = vec!["a", "b", "a", "c", "b"];
        assert_eq!(deduplicate_preserving_order(items), vec!["a", "b", "c"]);
    }

    #[test]
    fn merge_sums_weighted_scores_for_the_same_id() {
        let merged = merge_ranked(
            &[("a".to_string(), 1.0)],
            &[("a".to_string(), 2.0)],
            0.5,
            0.5,
        );

        assert_eq!(merged, vec![("a".to_string(), 1.5)]);
    }

    #[test]
    fn merge_sorts_by_score_descending_with_id_tie_break() {
        let merged = merge_ranked(
            &[("b".to_string(), 1.0), ("c".to_string(), 3.0)],
            &[("a".to_string(), 1.0)],
            1.0,
            1.0,
        );

        assert_eq!(
            merged,
            vec![
                ("c".to_string(), 3.0),
                ("a".to_string(), 1.0),
                ("b".to_string(), 1.0),
            ]
        );
    }
}
