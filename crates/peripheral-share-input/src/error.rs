//! Input subsystem errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("capture failed: {0}")]
    Capture(String),

    #[error("failed to inject event: {0}")]
    Inject(String),

    #[error("capture is not running")]
    NotCapturing,

    #[error("backend not available on this platform")]
    Unavailable,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
