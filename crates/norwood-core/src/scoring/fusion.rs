//! Late fusion across viewpoints and patient-profile priors.
//!
//! When both a top-down and a side image are available, each view is
//! scored and ensembled independently; the two fused distributions are
//! then combined here. A patient-profile prior can be blended in with a
//! configurable strength.

use crate::math::renormalize_in_place;
use crate::types::PatientProfile;

/// Age above which the prior starts shifting mass toward later stages.
const PRIOR_PIVOT_AGE: u32 = 40;

/// Weighted average of the two view distributions, renormalized.
pub fn fuse_views(top: &[f32], side: &[f32], top_weight: f32) -> Vec<f32> {
    let mut fused: Vec<f32> = top
        .iter()
        .zip(side.iter())
        .map(|(t, s)| top_weight * t + (1.0 - top_weight) * s)
        .collect();
    renormalize_in_place(&mut fused);
    fused
}

/// Build a per-class prior from the patient profile.
///
/// Uniform when the profile is empty. Age tilts mass linearly toward
/// later stages above the pivot age (and toward earlier stages below
/// it); a positive family history sharpens the tilt by squaring.
pub fn profile_prior(profile: &PatientProfile, num_classes: usize) -> Vec<f32> {
    let mut prior = vec![1.0f32; num_classes];

    if let Some(age) = profile.age {
        // slope in [-1, 1]: -1 well below the pivot, +1 well above it
        let slope = ((age as f32 - PRIOR_PIVOT_AGE as f32) / PRIOR_PIVOT_AGE as f32)
            .clamp(-1.0, 1.0);
        let span = (num_classes.saturating_sub(1)).max(1) as f32;
        for (c, p) in prior.iter_mut().enumerate() {
            let position = c as f32 / span - 0.5; // -0.5 first stage, +0.5 last
            *p = (1.0 + slope * position).max(0.0);
        }
    }

    if profile.family_history == Some(true) {
        for p in prior.iter_mut() {
            *p *= *p;
        }
    }

    renormalize_in_place(&mut prior);
    prior
}

/// Blend a prior into a distribution: `(1-strength)·probs + strength·prior`.
///
/// Strength 0 returns the input unchanged (renormalized).
pub fn apply_prior(probs: &[f32], prior: &[f32], strength: f32) -> Vec<f32> {
    let mut blended: Vec<f32> = probs
        .iter()
        .zip(prior.iter())
        .map(|(p, q)| (1.0 - strength) * p + strength * q)
        .collect();
    renormalize_in_place(&mut blended);
    blended
}
