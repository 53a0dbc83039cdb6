//! Keyblend Core (engine-agnostic)
//!
//! Keyframe-sequence playback and weighted multi-track pose blending. A host loads
//! [`KeyframeSequence`]s into a [`Controller`], starts tracks with fades, and calls
//! [`Controller::step`] once per frame to obtain a bone name → [`Transform`] map.
//! Sequences can be built programmatically, imported from a hierarchical JSON pose
//! source, or exchanged through a little-endian binary layout.

pub mod accumulate;
pub mod codec;
pub mod config;
pub mod controller;
pub mod data;
pub mod easing;
pub mod error;
pub mod ids;
pub mod import;
pub mod interp;
pub mod outputs;
pub mod search;
pub mod signal;
pub mod track;
pub mod transform;
pub mod transition;

// Re-exports for consumers (hosts)
pub use config::Config;
pub use controller::{Ancestors, CachedPose, Controller};
pub use data::{EasingDirection, Keyframe, KeyframeSequence, Pose, PoseId};
pub use easing::{EasingFn, EasingRegistry, LINEAR};
pub use error::{BlendError, Result};
pub use ids::TrackId;
pub use import::{parse_sequence_json, KeyframeSource, PoseSource, SequenceSource};
pub use outputs::{
    ControllerStepped, KeyframeReached, PoseTransforms, TrackEnded, TrackStepped, TrackStopped,
};
pub use search::{bounding_keyframes, Bounds, Segment};
pub use signal::{Signal, SubscriptionId};
pub use track::{PlayOptions, Track};
pub use transform::Transform;
pub use transition::{Completion, Transition, TransitionScheduler, TransitionTarget};
