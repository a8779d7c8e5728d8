//! Softmax-weighted conversion of k-NN matches to per-class probabilities.
//!
//! Each match contributes its softmax weight (over cosine similarity,
//! scaled by a per-model temperature) to the class its metadata labels it
//! with. Matches without an extractable label are dropped before
//! weighting so they cannot dilute the distribution.

use crate::math::{renormalize_in_place, softmax_weights};
use crate::types::IndexMatch;

use super::labels::stage_label;

/// A per-model probability distribution with provenance.
#[derive(Debug, Clone)]
pub struct RetrievalScore {
    /// Per-class probabilities, index 0 = first stage. Sums to 1 when any
    /// match contributed; all zeros otherwise.
    pub probs: Vec<f32>,

    /// Number of matches that carried a usable stage label
    pub matches_used: usize,
}

/// Convert k-NN matches into a per-class probability distribution.
///
/// Returns the zero vector when `matches` is empty or no match carries a
/// usable label.
pub fn knn_to_probs(matches: &[IndexMatch], num_classes: usize, temperature: f32) -> Vec<f32> {
    score_matches(matches, num_classes, temperature).probs
}

/// Like [`knn_to_probs`], but also reports how many matches contributed.
pub fn score_matches(
    matches: &[IndexMatch],
    num_classes: usize,
    temperature: f32,
) -> RetrievalScore {
    let labeled: Vec<(usize, f32)> = matches
        .iter()
        .filter_map(|m| stage_label(&m.metadata, num_classes).map(|label| (label, m.score)))
        .collect();

    if labeled.len() < matches.len() {
        tracing::debug!(
            "Dropped {} of {} matches without a usable stage label",
            matches.len() - labeled.len(),
            matches.len()
        );
    }

    let mut probs = vec![0.0f32; num_classes];
    if labeled.is_empty() {
        return RetrievalScore {
            probs,
            matches_used: 0,
        };
    }

    let scores: Vec<f32> = labeled.iter().map(|(_, s)| *s).collect();
    let weights = softmax_weights(&scores, temperature);

    for ((label, _), w) in labeled.iter().zip(weights.iter()) {
        probs[label - 1] += w;
    }
    renormalize_in_place(&mut probs);

    RetrievalScore {
        probs,
        matches_used: labeled.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(id: &str, score: f32, stage: u32) -> IndexMatch {
        IndexMatch::with_label(id, score, "stage", stage.to_string())
    }

    #[test]
    fn test_probs_sum_to_one() {
        let matches = vec![m("a", 0.92, 3), m("b", 0.88, 3), m("c", 0.70, 2)];
        let probs = knn_to_probs(&matches, 7, 0.07);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_matches_zero_vector() {
        let probs = knn_to_probs(&[], 7, 0.07);
        assert_eq!(probs, vec![0.0; 7]);
    }

    #[test]
    fn test_unlabeled_matches_zero_vector() {
        let matches = vec![IndexMatch {
            id: "x".to_string(),
            score: 0.9,
            metadata: serde_json::Map::new(),
        }];
        let score = score_matches(&matches, 7, 0.07);
        assert_eq!(score.probs, vec![0.0; 7]);
        assert_eq!(score.matches_used, 0);
    }

    #[test]
    fn test_majority_class_wins() {
        let matches = vec![m("a", 0.90, 3), m("b", 0.89, 3), m("c", 0.60, 5)];
        let probs = knn_to_probs(&matches, 7, 0.07);
        let argmax = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0;
        assert_eq!(argmax, 2); // class 3 -> index 2
    }

    #[test]
    fn test_temperature_controls_concentration() {
        // A single strong match against a weak one: low temperature gives it
        // nearly all the mass, high temperature spreads it out.
        let matches = vec![m("a", 0.95, 4), m("b", 0.55, 1)];
        let sharp = knn_to_probs(&matches, 7, 0.02);
        let soft = knn_to_probs(&matches, 7, 1.0);
        assert!(sharp[3] > 0.99);
        assert!(soft[3] < 0.70);
    }

    #[test]
    fn test_unlabeled_matches_do_not_dilute() {
        let labeled = vec![m("a", 0.9, 2), m("b", 0.8, 2)];
        let mut mixed = labeled.clone();
        mixed.push(IndexMatch {
            id: "junk".to_string(),
            score: 0.99,
            metadata: serde_json::Map::new(),
        });

        // The unlabeled match is dropped before softmax, so both inputs
        // produce the same distribution.
        assert_eq!(
            knn_to_probs(&labeled, 7, 0.07),
            knn_to_probs(&mixed, 7, 0.07)
        );
    }

    #[test]
    fn test_matches_used_counts_labeled_only() {
        let matches = vec![
            m("a", 0.9, 1),
            IndexMatch {
                id: "junk".to_string(),
                score: 0.8,
                metadata: serde_json::Map::new(),
            },
        ];
        assert_eq!(score_matches(&matches, 7, 0.07).matches_used, 1);
    }

    #[test]
    fn test_idempotent() {
        let matches = vec![m("a", 0.91, 2), m("b", 0.87, 4), m("c", 0.73, 2)];
        assert_eq!(
            knn_to_probs(&matches, 7, 0.07),
            knn_to_probs(&matches, 7, 0.07)
        );
    }
}
