//! Persisted record schema.
//!
//! The on-disk record is a JSON document tagged with its schema version:
//!
//! ```text
//! {"schema": "facecv/v2", "dim": 128, "next_handle": 7,
//!  "index": [[handle, [f32; dim]], ...],
//!  "identities": [{"name": "...", "handle": h, "samples": [[f32; dim], ...]}, ...]}
//! ```
//!
//! Older versions are decoded and migrated to [`Snapshot`]; [`encode`]
//! always writes the newest version.

use facecv_vecstore::Handle;
use serde::{Deserialize, Serialize};

use crate::error::FaceIdError;

/// Full state of an [`IdentityStore`](crate::IdentityStore): index entries
/// plus every identity's retained samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub dim: usize,
    pub next_handle: u64,
    /// Index entries in creation order.
    pub index: Vec<(Handle, Vec<f32>)>,
    /// Identities in creation order.
    pub identities: Vec<IdentityRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub name: String,
    pub handle: Handle,
    pub samples: Vec<Vec<f32>>,
}

/// First schema: one vector per identity, names matched to index entries by
/// position, no sample history.
#[derive(Debug, Deserialize)]
struct RecordV1 {
    dim: usize,
    index: Vec<(Handle, Vec<f32>)>,
    names: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "schema")]
enum PersistedRecord {
    #[serde(rename = "facecv/v1")]
    V1(RecordV1),
    #[serde(rename = "facecv/v2")]
    V2(Snapshot),
}

#[derive(Serialize)]
#[serde(tag = "schema")]
enum CurrentRecord<'a> {
    #[serde(rename = "facecv/v2")]
    V2(&'a Snapshot),
}

/// Serializes a snapshot as the current record version.
pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>, FaceIdError> {
    serde_json::to_vec(&CurrentRecord::V2(snapshot))
        .map_err(|e| FaceIdError::PersistenceFailure(format!("encode snapshot: {e}")))
}

/// Parses any known record version into a current [`Snapshot`].
pub fn decode(bytes: &[u8]) -> Result<Snapshot, FaceIdError> {
    let record: PersistedRecord = serde_json::from_slice(bytes)
        .map_err(|e| FaceIdError::MalformedPersistedState(e.to_string()))?;
    match record {
        PersistedRecord::V1(r) => migrate_v1(r),
        PersistedRecord::V2(s) => Ok(s),
    }
}

/// Each legacy identity's indexed vector becomes its sole retained sample.
fn migrate_v1(r: RecordV1) -> Result<Snapshot, FaceIdError> {
    if r.index.len() != r.names.len() {
        return Err(FaceIdError::MalformedPersistedState(format!(
            "v1 record has {} index entries but {} names",
            r.index.len(),
            r.names.len()
        )));
    }
    let next_handle = r
        .index
        .iter()
        .map(|(h, _)| h.raw() + 1)
        .max()
        .unwrap_or(0);
    let identities = r
        .names
        .into_iter()
        .zip(r.index.iter())
        .map(|(name, (handle, vector))| IdentityRecord {
            name,
            handle: *handle,
            samples: vec![vector.clone()],
        })
        .collect();
    Ok(Snapshot {
        dim: r.dim,
        next_handle,
        index: r.index,
        identities,
    })
}
