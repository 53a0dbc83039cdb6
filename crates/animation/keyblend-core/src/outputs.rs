//! Output contracts from the controller.
//!
//! A step produces a `PoseTransforms` mapping (bone name → blended transform).
//! Discrete notifications travel through [`crate::signal::Signal`]s carrying the
//! payloads below. Hosts apply the mapping to their own rig.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::ids::TrackId;
use crate::transform::Transform;

/// Bone name → blended transform for one step.
pub type PoseTransforms = HashMap<String, Transform>;

/// A track's active keyframe changed (or the track wrapped past its final keyframe).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyframeReached {
    pub track: TrackId,
    pub name: String,
    /// Position of the keyframe in its sequence.
    pub index: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackStepped {
    pub track: TrackId,
    pub delta_time: f64,
}

/// A stop transition completed and the track is no longer playing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackStopped {
    pub track: TrackId,
}

/// A non-looped track clamped at its final keyframe for the first time.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackEnded {
    pub track: TrackId,
    pub length: f64,
}

/// Fired once per controller step after every playing track was blended.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerStepped {
    pub delta_time: f64,
    #[serde(default)]
    pub transforms: PoseTransforms,
}
