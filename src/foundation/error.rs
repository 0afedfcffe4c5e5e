/// Convenience result type used across slidecast.
pub type SlidecastResult<T> = Result<T, SlidecastError>;

/// Why a capture device could not be acquired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceFailure {
    /// The OS or the user refused access to the device.
    PermissionDenied,
    /// The device does not exist, is busy, or stopped before producing data.
    Unavailable,
}

impl std::fmt::Display for DeviceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => f.write_str("permission denied"),
            Self::Unavailable => f.write_str("device unavailable"),
        }
    }
}

/// Top-level error taxonomy used by recorder APIs.
///
/// Errors raised inside a single draw tick are reported as [`SlidecastError::Composite`] and
/// never abort a running session. Errors raised by `start`/`stop` abort that attempt only.
#[derive(thiserror::Error, Debug)]
pub enum SlidecastError {
    /// A camera or microphone could not be acquired.
    #[error("device error ({failure}): {reason}")]
    Device {
        /// Failure class.
        failure: DeviceFailure,
        /// Human-readable detail.
        reason: String,
    },

    /// A document could not be rasterized or failed validation.
    #[error("decode error: {0}")]
    Decode(String),

    /// A requested page does not exist in the loaded document.
    #[error("not found: {0}")]
    NotFound(String),

    /// Encoder construction, readiness or finalization failed.
    #[error("encoder error: {0}")]
    Encoder(String),

    /// The encoder finished without producing any bytes.
    #[error("encoder error: no data generated")]
    EmptyOutput,

    /// A drawing fault inside a single tick.
    #[error("composite error: {0}")]
    Composite(String),

    /// `start` was called while a session is not idle.
    #[error("a recording session is already in progress")]
    AlreadyRecording,

    /// The operation is only allowed while the recorder is idle.
    #[error("recorder is busy: {0}")]
    SessionBusy(String),

    /// Invalid configuration or arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SlidecastError {
    /// Build a [`SlidecastError::Device`] for a permission refusal.
    pub fn permission_denied(reason: impl Into<String>) -> Self {
        Self::Device {
            failure: DeviceFailure::PermissionDenied,
            reason: reason.into(),
        }
    }

    /// Build a [`SlidecastError::Device`] for a missing or broken device.
    pub fn device_unavailable(reason: impl Into<String>) -> Self {
        Self::Device {
            failure: DeviceFailure::Unavailable,
            reason: reason.into(),
        }
    }

    /// Build a [`SlidecastError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`SlidecastError::Decode`] value for an unsupported input format.
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::Decode(format!("unsupported format: {}", msg.into()))
    }

    /// Build a [`SlidecastError::NotFound`] value.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`SlidecastError::Encoder`] value.
    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }

    /// Build a [`SlidecastError::Composite`] value.
    pub fn composite(msg: impl Into<String>) -> Self {
        Self::Composite(msg.into())
    }

    /// Build a [`SlidecastError::SessionBusy`] value.
    pub fn busy(msg: impl Into<String>) -> Self {
        Self::SessionBusy(msg.into())
    }

    /// Build a [`SlidecastError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Return the device failure class if this is a device error.
    pub fn device_failure(&self) -> Option<DeviceFailure> {
        match self {
            Self::Device { failure, .. } => Some(*failure),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
