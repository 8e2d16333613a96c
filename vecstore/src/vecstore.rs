use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VecError;

/// Handle is an opaque, stable reference to one entry of a [`VecIndex`].
///
/// Handles are issued in strictly increasing order and never reused, so
/// comparing two handles compares their creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(u64);

impl Handle {
    /// Wraps a raw handle value, e.g. one read back from persisted state.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value for persistence.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Match is a single result from a vector similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Handle of the matched entry.
    pub handle: Handle,

    /// Squared Euclidean distance between the query and the matched vector.
    /// Lower values indicate higher similarity.
    pub distance: f32,
}

/// VecIndex is the interface for nearest-neighbor search over dense float32
/// vectors of one fixed dimension.
///
/// An index is exclusively owned; mutation goes through `&mut self` and no
/// internal locking is done.
pub trait VecIndex {
    /// Vector dimension accepted by this index.
    fn dim(&self) -> usize;

    /// Insert a vector and return its newly issued handle.
    fn add(&mut self, vector: &[f32]) -> Result<Handle, VecError>;

    /// Remove the entry behind `handle`. Every other handle keeps resolving
    /// to its original vector.
    fn remove(&mut self, handle: Handle) -> Result<(), VecError>;

    /// Return up to `top_k` nearest entries ordered by ascending distance.
    /// Equal distances are ordered by ascending handle.
    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Match>, VecError>;

    /// Resolve a handle to its stored vector.
    fn get(&self, handle: Handle) -> Option<&[f32]>;

    /// Return the number of vectors in the index.
    fn len(&self) -> usize;

    /// Return true if the index contains no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
