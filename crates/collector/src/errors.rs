use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Failed to open capture {0}: {1}")]
    Open(String, String),

    #[error("Unrecognized capture format: {0}")]
    Format(String),

    #[error("Capture read error: {0}")]
    Read(String),
}

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Timeframe allocation failed: {0}")]
    FrameAlloc(#[from] TryReserveError),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}
