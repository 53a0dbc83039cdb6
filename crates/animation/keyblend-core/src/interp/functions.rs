//! Interpolation helpers:
//! - lerp (scalars)
//! - track_alpha (per-track share of the blend with the `max(1, sum)` floor)
//! - contribution_weight (per-pose blend strength)

/// Linear interpolation of scalars.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Share of the blend owned by one track. The denominator is floored at 1, so
/// a lone track below full weight never reaches full strength.
#[inline]
pub fn track_alpha(weight_current: f64, total_weight: f64) -> f64 {
    weight_current / total_weight.max(1.0)
}

/// Strength applied when folding one pose into the output mapping.
#[inline]
pub fn contribution_weight(track_alpha: f64, left_weight: f64, right_weight: f64, t: f64) -> f64 {
    track_alpha * lerp(left_weight, right_weight, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_basics() {
        assert_eq!(lerp(2.0, 4.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 4.0, 0.5), 3.0);
        assert_eq!(lerp(2.0, 4.0, 1.0), 4.0);
    }

    #[test]
    fn alpha_floor_keeps_low_weights_low() {
        assert_eq!(track_alpha(0.3, 0.3), 0.3);
        assert_eq!(track_alpha(1.0, 2.0), 0.5);
    }

    #[test]
    fn contribution_blends_pose_weights_by_raw_ratio() {
        assert_eq!(contribution_weight(0.5, 1.0, 0.0, 0.25), 0.375);
    }
}
