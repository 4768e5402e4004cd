use thiserror::Error;
use wasapi_core::ComError;

/// Errors raised while listing devices or running a capture stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("device not available")]
    DeviceNotAvailable,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("unsupported stream format: {0}")]
    UnsupportedFormat(String),

    #[error("capture already running")]
    AlreadyRunning,

    #[error(transparent)]
    Com(#[from] ComError),

    #[error("capture thread failed: {0}")]
    Thread(String),
}
