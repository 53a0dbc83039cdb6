//! JSON import of hierarchical pose sources into keyframe sequences.

use serde::{Deserialize, Serialize};

use crate::data::{EasingDirection, Keyframe, KeyframeSequence, Pose, PoseId};
use crate::easing::LINEAR;
use crate::error::{BlendError, Result};
use crate::transform::Transform;

/// Public API: parse a hierarchical pose-source JSON document into a
/// [`KeyframeSequence`].
///
/// Notes:
/// - Poses nest through `children`; nesting becomes parent links in the keyframe arena.
/// - Pose keys are the pose names, so names must be unique within a keyframe.
/// - Keyframes are sorted ascending by time (stable for equal times).
pub fn parse_sequence_json(s: &str) -> Result<KeyframeSequence> {
    let source: SequenceSource = serde_json::from_str(s)?;
    KeyframeSequence::import(&source)
}

impl KeyframeSequence {
    /// Build a sequence from an externally supplied pose hierarchy.
    pub fn import(source: &SequenceSource) -> Result<Self> {
        let mut keyframes = Vec::with_capacity(source.keyframes.len());
        for kf in &source.keyframes {
            keyframes.push(import_keyframe(kf)?);
        }
        Ok(Self::new(source.name.clone(), source.looped, keyframes))
    }
}

fn import_keyframe(src: &KeyframeSource) -> Result<Keyframe> {
    if !src.time.is_finite() || src.time < 0.0 {
        return Err(BlendError::invalid(format!(
            "keyframe '{}' time must be finite and >= 0, got {}",
            src.name, src.time
        )));
    }
    let mut kf = Keyframe::new(src.name.clone(), src.time);
    // Depth-first with an explicit stack so deep rigs cannot overflow the call stack.
    let mut stack: Vec<(&PoseSource, Option<PoseId>)> =
        src.poses.iter().rev().map(|p| (p, None)).collect();
    while let Some((pose_src, parent)) = stack.pop() {
        let pose = Pose::new(pose_src.name.clone())
            .with_transform(Transform::from_components(pose_src.transform))
            .with_easing(pose_src.easing_style.clone(), pose_src.easing_direction)
            .with_weight(pose_src.weight);
        let id = kf.add_pose(pose_src.name.clone(), pose, parent)?;
        stack.extend(pose_src.children.iter().rev().map(|c| (c, Some(id))));
    }
    Ok(kf)
}

// ----- JSON schema (serde) -----

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceSource {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "loop")]
    pub looped: bool,
    #[serde(default)]
    pub keyframes: Vec<KeyframeSource>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyframeSource {
    #[serde(default)]
    pub name: String,
    pub time: f64,
    #[serde(default)]
    pub poses: Vec<PoseSource>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseSource {
    pub name: String,
    /// Position followed by the basis rows.
    #[serde(default = "identity_components")]
    pub transform: [f64; 12],
    #[serde(default)]
    pub easing_direction: EasingDirection,
    #[serde(default = "default_style")]
    pub easing_style: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub children: Vec<PoseSource>,
}

fn identity_components() -> [f64; 12] {
    Transform::IDENTITY.components()
}

fn default_style() -> String {
    LINEAR.to_string()
}

fn default_weight() -> f64 {
    1.0
}
