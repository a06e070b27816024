use thiserror::Error;

use crate::source::SourceError;
use crate::telemetry::OperatorId;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PermissionError {
    #[error("Foreground location is required!")]
    Foreground,
    #[error("Background location is required!")]
    Background,
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Please enter a bus ID before starting.")]
    Validation,
    #[error("permission denied: {0}")]
    Permission(#[from] PermissionError),
    #[error("already tracking {0}")]
    AlreadyTracking(OperatorId),
    #[error("location source error: {0}")]
    Source(#[from] SourceError),
}
