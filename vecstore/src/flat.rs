use std::collections::BTreeMap;

use crate::error::VecError;
use crate::l2::squared_l2;
use crate::vecstore::{Handle, Match, VecIndex};

/// FlatIndex is an exact VecIndex using brute-force squared L2 distance.
///
/// Entries are kept ordered by handle, which is also creation order.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dim: usize,
    next: u64,
    vectors: BTreeMap<Handle, Vec<f32>>,
}

impl FlatIndex {
    /// Creates an empty index. Panics if `dim` is 0.
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "vecstore: FlatIndex dim must be positive");
        Self {
            dim,
            next: 0,
            vectors: BTreeMap::new(),
        }
    }

    /// Rebuilds an index from persisted entries.
    ///
    /// `next_handle` is the value the next [`VecIndex::add`] will issue; every
    /// entry handle must be below it so that removed handles are never
    /// reissued.
    pub fn from_entries<I>(dim: usize, next_handle: u64, entries: I) -> Result<Self, VecError>
    where
        I: IntoIterator<Item = (Handle, Vec<f32>)>,
    {
        if dim == 0 {
            return Err(VecError::InvalidEntries("dimension 0".into()));
        }
        let mut vectors = BTreeMap::new();
        for (handle, vector) in entries {
            if vector.len() != dim {
                return Err(VecError::DimensionMismatch {
                    got: vector.len(),
                    want: dim,
                });
            }
            if handle.raw() >= next_handle {
                return Err(VecError::InvalidEntries(format!(
                    "handle {handle} not below next handle {next_handle}"
                )));
            }
            if vectors.insert(handle, vector).is_some() {
                return Err(VecError::InvalidEntries(format!("duplicate handle {handle}")));
            }
        }
        Ok(Self {
            dim,
            next: next_handle,
            vectors,
        })
    }

    /// Raw value of the handle the next insert will receive.
    pub fn next_handle(&self) -> u64 {
        self.next
    }

    /// Iterates all entries in creation order.
    pub fn entries(&self) -> impl Iterator<Item = (Handle, &[f32])> + '_ {
        self.vectors.iter().map(|(h, v)| (*h, v.as_slice()))
    }

    fn check_dim(&self, vector: &[f32]) -> Result<(), VecError> {
        if vector.len() != self.dim {
            return Err(VecError::DimensionMismatch {
                got: vector.len(),
                want: self.dim,
            });
        }
        Ok(())
    }
}

impl VecIndex for FlatIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn add(&mut self, vector: &[f32]) -> Result<Handle, VecError> {
        self.check_dim(vector)?;
        let handle = Handle::from_raw(self.next);
        self.next += 1;
        self.vectors.insert(handle, vector.to_vec());
        Ok(handle)
    }

    fn remove(&mut self, handle: Handle) -> Result<(), VecError> {
        match self.vectors.remove(&handle) {
            Some(_) => Ok(()),
            None => Err(VecError::UnknownHandle(handle)),
        }
    }

    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Match>, VecError> {
        self.check_dim(query)?;
        if self.vectors.is_empty() || top_k == 0 {
            return Ok(vec![]);
        }

        let mut results: Vec<Match> = self
            .vectors
            .iter()
            .map(|(handle, vec)| Match {
                handle: *handle,
                distance: squared_l2(query, vec),
            })
            .collect();

        // Stable sort keeps the BTreeMap's handle order among equal distances.
        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        results.truncate(top_k);
        Ok(results)
    }

    fn get(&self, handle: Handle) -> Option<&[f32]> {
        self.vectors.get(&handle).map(|v| v.as_slice())
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}
