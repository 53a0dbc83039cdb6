//! Scalar interpolation helpers shared by transitions and blending.

pub mod functions;

pub use functions::{contribution_weight, lerp, track_alpha};
