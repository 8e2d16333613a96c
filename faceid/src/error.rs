use facecv_vecstore::{Handle, VecError};
use thiserror::Error;

use crate::capability::CapabilityError;

/// Errors returned by faceid operations.
#[derive(Debug, Error)]
pub enum FaceIdError {
    #[error("faceid: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("faceid: component {index} is not a finite number")]
    NonFiniteComponent { index: usize },

    /// The index and the identity table disagree about a handle.
    #[error("faceid: unknown index handle {0}")]
    UnknownHandle(Handle),

    #[error("faceid: identity name must not be empty")]
    InvalidName,

    #[error("faceid: invalid config: {0}")]
    InvalidConfig(String),

    #[error("faceid: malformed persisted state: {0}")]
    MalformedPersistedState(String),

    #[error("faceid: persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("faceid: enrollment for {name:?} already has {sample_count} samples")]
    SessionComplete { name: String, sample_count: usize },

    #[error("faceid: {0}")]
    Capability(#[from] CapabilityError),
}

impl From<VecError> for FaceIdError {
    fn from(e: VecError) -> Self {
        match e {
            VecError::DimensionMismatch { got, want } => FaceIdError::DimensionMismatch {
                expected: want,
                got,
            },
            VecError::UnknownHandle(h) => FaceIdError::UnknownHandle(h),
            VecError::InvalidEntries(msg) => FaceIdError::MalformedPersistedState(msg),
        }
    }
}
