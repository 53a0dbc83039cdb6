//! Easing style registry.
//!
//! Styles are host-supplied pure functions `(alpha, direction) -> alpha` looked
//! up by name at blend time. `Linear` (identity) is always registered.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::data::EasingDirection;
use crate::error::{BlendError, Result};

/// Name of the always-present identity style.
pub const LINEAR: &str = "Linear";

pub type EasingFn = Arc<dyn Fn(f64, EasingDirection) -> f64 + Send + Sync>;

#[inline]
fn linear(alpha: f64, _direction: EasingDirection) -> f64 {
    alpha
}

/// Name → easing function strategy map.
#[derive(Clone)]
pub struct EasingRegistry {
    styles: HashMap<String, EasingFn>,
}

impl EasingRegistry {
    pub fn new() -> Self {
        let mut styles: HashMap<String, EasingFn> = HashMap::new();
        styles.insert(LINEAR.to_string(), Arc::new(linear));
        Self { styles }
    }

    /// Register or replace a style.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(f64, EasingDirection) -> f64 + Send + Sync + 'static,
    {
        self.styles.insert(name.into(), Arc::new(f));
    }

    /// Remove a host style. `Linear` cannot be removed.
    pub fn unregister(&mut self, name: &str) -> bool {
        if name == LINEAR {
            return false;
        }
        self.styles.remove(name).is_some()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.styles.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.styles.keys().map(String::as_str)
    }

    pub fn resolve(&self, name: &str) -> Result<&EasingFn> {
        self.styles
            .get(name)
            .ok_or_else(|| BlendError::UnknownEasingStyle {
                name: name.to_string(),
            })
    }

    /// Evaluate a registered style.
    pub fn ease(&self, name: &str, alpha: f64, direction: EasingDirection) -> Result<f64> {
        self.resolve(name).map(|f| f(alpha, direction))
    }

    /// Evaluate `name`, falling back to `fallback` and finally to identity.
    pub fn ease_or(
        &self,
        name: &str,
        fallback: &str,
        alpha: f64,
        direction: EasingDirection,
    ) -> f64 {
        match self.styles.get(name).or_else(|| self.styles.get(fallback)) {
            Some(f) => f(alpha, direction),
            None => linear(alpha, direction),
        }
    }
}

impl Default for EasingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EasingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("EasingRegistry")
            .field("styles", &names)
            .finish()
    }
}
