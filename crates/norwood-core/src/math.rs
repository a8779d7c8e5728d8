//! Shared math utilities.

/// L2-normalize a vector in place so its magnitude is 1.
pub fn l2_normalize_in_place(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// L2-normalize a slice, returning a new vector with unit magnitude.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let mut result = v.to_vec();
    l2_normalize_in_place(&mut result);
    result
}

/// Temperature-scaled softmax weights over raw scores.
///
/// Computed in the shifted form `exp((x - max) / t)` so large score/temperature
/// ratios cannot overflow. Returns an empty vector for empty input.
pub fn softmax_weights(scores: &[f32], temperature: f32) -> Vec<f32> {
    if scores.is_empty() {
        return vec![];
    }
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| ((s - max) / temperature).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Normalize a distribution in place so it sums to 1.
///
/// A zero (or numerically negligible) distribution is left untouched;
/// the zero vector is the defined result for "no evidence".
pub fn renormalize_in_place(probs: &mut [f32]) {
    let sum: f32 = probs.iter().sum();
    if sum > f32::EPSILON {
        for p in probs.iter_mut() {
            *p /= sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize() {
        let v = l2_normalize(&[3.0, 4.0]);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let v = l2_normalize(&[0.0, 0.0, 0.0]);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_softmax_weights_sum_to_one() {
        let w = softmax_weights(&[0.9, 0.7, 0.3], 0.07);
        let sum: f32 = w.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_softmax_weights_ordering() {
        // Higher score -> higher weight
        let w = softmax_weights(&[0.9, 0.7, 0.3], 0.07);
        assert!(w[0] > w[1]);
        assert!(w[1] > w[2]);
    }

    #[test]
    fn test_softmax_temperature_sharpens() {
        // Lower temperature concentrates mass on the top score
        let sharp = softmax_weights(&[0.9, 0.7], 0.01);
        let soft = softmax_weights(&[0.9, 0.7], 1.0);
        assert!(sharp[0] > soft[0]);
    }

    #[test]
    fn test_softmax_stable_for_large_ratios() {
        // score/temperature of 90 would overflow a naive exp()
        let w = softmax_weights(&[0.9, 0.1], 0.01);
        assert!(w.iter().all(|x| x.is_finite()));
        assert!((w.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_softmax_empty() {
        assert!(softmax_weights(&[], 0.07).is_empty());
    }

    #[test]
    fn test_renormalize() {
        let mut probs = vec![0.2, 0.2, 0.1];
        renormalize_in_place(&mut probs);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!((probs[0] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_renormalize_zero_untouched() {
        let mut probs = vec![0.0, 0.0];
        renormalize_in_place(&mut probs);
        assert_eq!(probs, vec![0.0, 0.0]);
    }
}
