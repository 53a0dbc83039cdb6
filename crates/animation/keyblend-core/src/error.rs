//! Error types for sequence construction, playback control and decoding.

use thiserror::Error;

/// Errors surfaced at the keyblend API boundary.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum BlendError {
    /// A playback or construction parameter was non-finite or out of range.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// A track was requested over a sequence without keyframes.
    #[error("sequence '{name}' has no keyframes")]
    EmptySequence { name: String },

    /// Binary input was truncated or structurally invalid.
    #[error("malformed data at byte {offset}: {reason}")]
    MalformedData { offset: usize, reason: String },

    /// Easing style not present in the registry.
    #[error("unknown easing style '{name}'")]
    UnknownEasingStyle { name: String },

    /// Sequence could not be written to the binary layout.
    #[error("encode error: {reason}")]
    Encode { reason: String },

    /// Controller has no track with this id.
    #[error("track {track} not found")]
    TrackNotFound { track: u32 },

    /// Hierarchical pose source could not be parsed.
    #[error("import error: {reason}")]
    Import { reason: String },
}

impl BlendError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedData {
            offset,
            reason: reason.into(),
        }
    }

    /// Errors that leave playback running (a fallback was applied).
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnknownEasingStyle { .. })
    }

    /// Coarse category for log grouping.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. }
            | Self::EmptySequence { .. }
            | Self::TrackNotFound { .. } => "validation",
            Self::MalformedData { .. } => "decode",
            Self::Encode { .. } => "encode",
            Self::UnknownEasingStyle { .. } => "easing",
            Self::Import { .. } => "import",
        }
    }
}

impl From<serde_json::Error> for BlendError {
    fn from(err: serde_json::Error) -> Self {
        Self::Import {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for BlendError {
    fn from(err: std::io::Error) -> Self {
        Self::Encode {
            reason: err.to_string(),
        }
    }
}

/// keyblend result type
pub type Result<T> = core::result::Result<T, BlendError>;

/// Reject NaN and infinities for a named parameter.
pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(BlendError::invalid(format!("{name} must be finite, got {value}")))
    }
}
