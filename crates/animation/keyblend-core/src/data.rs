//! Keyframe sequence data model.
//!
//! Poses live in a per-keyframe arena (`IndexMap` keyed by pose key). A pose's
//! parent is a [`PoseId`] into the same keyframe, so the hierarchy is a set of
//! back-references and never an ownership chain. Roots have no parent; they hang
//! off the keyframe itself.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::easing::LINEAR;
use crate::error::{BlendError, Result};
use crate::transform::Transform;

/// Direction an easing style is applied in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EasingDirection {
    #[default]
    In,
    Out,
    InOut,
}

impl EasingDirection {
    /// Wire ordinal (In=0, Out=1, InOut=2).
    #[inline]
    pub fn ordinal(self) -> u32 {
        match self {
            Self::In => 0,
            Self::Out => 1,
            Self::InOut => 2,
        }
    }

    #[inline]
    pub fn from_ordinal(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::In),
            1 => Some(Self::Out),
            2 => Some(Self::InOut),
            _ => None,
        }
    }
}

/// Arena index of a pose inside its keyframe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoseId(pub usize);

/// A single named bone transform within a keyframe.
#[derive(Clone, Debug, PartialEq)]
pub struct Pose {
    pub name: String,
    pub transform: Transform,
    pub easing_direction: EasingDirection,
    pub easing_style: String,
    pub weight: f64,
    parent: Option<PoseId>,
}

impl Pose {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            easing_direction: EasingDirection::In,
            easing_style: LINEAR.to_string(),
            weight: 1.0,
            parent: None,
        }
    }

    #[inline]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    #[inline]
    pub fn with_easing(mut self, style: impl Into<String>, direction: EasingDirection) -> Self {
        self.easing_style = style.into();
        self.easing_direction = direction;
        self
    }

    #[inline]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Parent pose in the same keyframe; `None` for keyframe roots.
    #[inline]
    pub fn parent(&self) -> Option<PoseId> {
        self.parent
    }
}

/// A named point in time holding a set of poses.
#[derive(Clone, Debug, PartialEq)]
pub struct Keyframe {
    pub name: String,
    pub time: f64,
    poses: IndexMap<String, Pose>,
}

impl Keyframe {
    pub fn new(name: impl Into<String>, time: f64) -> Self {
        Self {
            name: name.into(),
            time,
            poses: IndexMap::new(),
        }
    }

    /// Insert a pose under `key`, parented to an already-present pose or to the
    /// keyframe root when `parent` is `None`.
    pub fn add_pose(
        &mut self,
        key: impl Into<String>,
        mut pose: Pose,
        parent: Option<PoseId>,
    ) -> Result<PoseId> {
        let key = key.into();
        if pose.name.is_empty() {
            return Err(BlendError::invalid(format!(
                "pose under key '{key}' in keyframe '{}' has an empty name",
                self.name
            )));
        }
        if !pose.weight.is_finite() || pose.weight < 0.0 {
            return Err(BlendError::invalid(format!(
                "pose '{}' weight must be finite and >= 0, got {}",
                pose.name, pose.weight
            )));
        }
        if let Some(PoseId(p)) = parent {
            if p >= self.poses.len() {
                return Err(BlendError::invalid(format!(
                    "parent index {p} out of range for keyframe '{}'",
                    self.name
                )));
            }
        }
        if self.poses.contains_key(&key) {
            return Err(BlendError::invalid(format!(
                "duplicate pose key '{key}' in keyframe '{}'",
                self.name
            )));
        }
        pose.parent = parent;
        let (idx, _) = self.poses.insert_full(key, pose);
        Ok(PoseId(idx))
    }

    /// Re-link a pose after all poses are present (decode second pass).
    pub(crate) fn set_parent(&mut self, id: PoseId, parent: Option<PoseId>) {
        if let Some((_, pose)) = self.poses.get_index_mut(id.0) {
            pose.parent = parent;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    #[inline]
    pub fn pose(&self, id: PoseId) -> Option<&Pose> {
        self.poses.get_index(id.0).map(|(_, p)| p)
    }

    #[inline]
    pub fn pose_by_key(&self, key: &str) -> Option<&Pose> {
        self.poses.get(key)
    }

    #[inline]
    pub fn pose_id(&self, key: &str) -> Option<PoseId> {
        self.poses.get_index_of(key).map(PoseId)
    }

    #[inline]
    pub fn key_of(&self, id: PoseId) -> Option<&str> {
        self.poses.get_index(id.0).map(|(k, _)| k.as_str())
    }

    /// Poses in insertion order with their keys.
    pub fn iter(&self) -> impl Iterator<Item = (PoseId, &str, &Pose)> {
        self.poses
            .iter()
            .enumerate()
            .map(|(i, (k, p))| (PoseId(i), k.as_str(), p))
    }

    #[inline]
    pub fn parent_of(&self, id: PoseId) -> Option<PoseId> {
        self.pose(id).and_then(Pose::parent)
    }

    pub fn children_of(&self, id: PoseId) -> impl Iterator<Item = PoseId> + '_ {
        self.iter()
            .filter(move |(_, _, p)| p.parent == Some(id))
            .map(|(child, _, _)| child)
    }

    pub fn roots(&self) -> impl Iterator<Item = PoseId> + '_ {
        self.iter()
            .filter(|(_, _, p)| p.parent.is_none())
            .map(|(id, _, _)| id)
    }
}

/// Ordered-by-time list of keyframes plus loop flag and name.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyframeSequence {
    pub name: String,
    pub looped: bool,
    keyframes: Vec<Keyframe>,
}

impl KeyframeSequence {
    /// Build a sequence; keyframes are stably sorted by time.
    pub fn new(name: impl Into<String>, looped: bool, mut keyframes: Vec<Keyframe>) -> Self {
        keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            name: name.into(),
            looped,
            keyframes,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, false, Vec::new())
    }

    #[inline]
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    #[inline]
    pub fn keyframe(&self, index: usize) -> Option<&Keyframe> {
        self.keyframes.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Time of the last keyframe, or 0 for an empty sequence.
    #[inline]
    pub fn length(&self) -> f64 {
        self.keyframes.last().map_or(0.0, |k| k.time)
    }

    /// Insert keeping time order (after keyframes with an equal time).
    /// Returns the insertion index.
    pub fn add_keyframe(&mut self, keyframe: Keyframe) -> usize {
        let idx = self
            .keyframes
            .partition_point(|k| k.time.total_cmp(&keyframe.time).is_le());
        self.keyframes.insert(idx, keyframe);
        idx
    }

    pub fn remove_keyframe(&mut self, index: usize) -> Option<Keyframe> {
        if index < self.keyframes.len() {
            Some(self.keyframes.remove(index))
        } else {
            None
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_loop(&mut self, looped: bool) {
        self.looped = looped;
    }
}
