use thiserror::Error;

use crate::vecstore::Handle;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VecError {
    #[error("vecstore: dimension mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    #[error("vecstore: unknown handle {0}")]
    UnknownHandle(Handle),

    #[error("vecstore: invalid entries: {0}")]
    InvalidEntries(String),
}
