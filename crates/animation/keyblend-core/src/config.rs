//! Controller configuration.

use serde::{Deserialize, Serialize};

use crate::easing::LINEAR;

/// Defaults applied by the controller when the host does not specify them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fade duration (seconds) used by `play_options()` and `stop_all(None)`.
    pub default_transition_time: f64,
    pub default_speed: f64,
    pub default_weight: f64,

    /// Style used when a pose names an unregistered easing style.
    pub fallback_easing_style: String,

    /// Emit a `warn!` the first time an unregistered style is seen.
    pub warn_unknown_easing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_transition_time: 0.2,
            default_speed: 1.0,
            default_weight: 1.0,
            fallback_easing_style: LINEAR.to_string(),
            warn_unknown_easing: true,
        }
    }
}
