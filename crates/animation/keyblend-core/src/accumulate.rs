//! Accumulation of per-track pose contributions into the step output.
//!
//! Contributions are folded in sequentially: each written pose moves the running
//! value toward the sampled transform by its contribution weight. Track order
//! therefore affects the result whenever more than one track touches a bone.

use crate::data::{Keyframe, Pose, PoseId};
use crate::interp::contribution_weight;
use crate::outputs::PoseTransforms;
use crate::transform::Transform;

/// Fold one sampled transform into `out[name]`, starting from identity when the
/// bone has not been written yet.
#[inline]
pub fn accumulate(out: &mut PoseTransforms, name: &str, sampled: &Transform, contribution: f64) {
    let slot = out.entry_ref(name).or_insert(Transform::IDENTITY);
    *slot = slot.lerp(sampled, contribution);
}

/// Blend the left/right keyframe pair of one track into `out`.
///
/// Only poses present in `left` are considered; a pose without a counterpart in
/// `right` holds its left transform and weight. `ease` maps the raw segment ratio through
/// the left pose's style and direction. `visit` sees every pose that was
/// written, in left-keyframe order.
pub fn blend_keyframes<E, V>(
    out: &mut PoseTransforms,
    left: &Keyframe,
    right: &Keyframe,
    ratio: f64,
    track_alpha: f64,
    mut ease: E,
    mut visit: V,
) where
    E: FnMut(&Pose, f64) -> f64,
    V: FnMut(&str, PoseId),
{
    for (id, key, left_pose) in left.iter() {
        let right_pose = right.pose_by_key(key).unwrap_or(left_pose);
        let eased = ease(left_pose, ratio);
        let sampled = left_pose.transform.lerp(&right_pose.transform, eased);
        let contribution =
            contribution_weight(track_alpha, left_pose.weight, right_pose.weight, ratio);
        accumulate(out, key, &sampled, contribution);
        visit(key, id);
    }
}
