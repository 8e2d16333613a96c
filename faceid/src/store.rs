use std::collections::HashMap;
use std::fmt;

use facecv_vecstore::{FlatIndex, Handle, VecIndex};
use tracing::{debug, info, warn};

use crate::error::FaceIdError;
use crate::persist::{PersistPolicy, SnapshotStore};
use crate::snapshot::{self, IdentityRecord, Snapshot};

/// Largest per-component gap tolerated between a persisted centroid and the
/// mean recomputed from its samples.
const CENTROID_TOLERANCE: f32 = 1e-5;

/// One enrolled person: every retained sample and their mean.
#[derive(Clone, PartialEq)]
pub struct Identity {
    name: String,
    samples: Vec<Vec<f32>>,
    centroid: Vec<f32>,
    handle: Handle,
}

impl Identity {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[Vec<f32>] {
        &self.samples
    }

    /// Elementwise mean of [`Identity::samples`].
    pub fn centroid(&self) -> &[f32] {
        &self.centroid
    }

    /// Index entry currently holding the centroid.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .field("samples", &self.samples.len())
            .field("handle", &self.handle)
            .finish()
    }
}

/// Result of a nearest-identity search.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityMatch {
    pub name: String,
    /// Squared L2 distance from the query to the identity's centroid.
    pub distance: f32,
}

struct Persistence {
    backend: Box<dyn SnapshotStore>,
    policy: PersistPolicy,
    dirty: usize,
}

/// Maps identity names to their samples and centroid, and keeps exactly one
/// index entry per identity pointing at that centroid.
///
/// Vectors are stored as given; normalization is the caller's concern.
pub struct IdentityStore {
    index: FlatIndex,
    identities: Vec<Identity>,
    by_name: HashMap<String, usize>,
    by_handle: HashMap<Handle, usize>,
    persistence: Option<Persistence>,
}

impl IdentityStore {
    /// Creates an empty, non-persistent store.
    pub fn new(dim: usize) -> Result<Self, FaceIdError> {
        if dim == 0 {
            return Err(FaceIdError::InvalidConfig("dim must be positive".into()));
        }
        Ok(Self::from_index(FlatIndex::new(dim)))
    }

    fn from_index(index: FlatIndex) -> Self {
        Self {
            index,
            identities: Vec::new(),
            by_name: HashMap::new(),
            by_handle: HashMap::new(),
            persistence: None,
        }
    }

    /// Loads the store persisted in `backend`, or starts empty.
    ///
    /// An unreadable or inconsistent record is logged and replaced by an
    /// empty store on the next write. A backend read error is
    /// `PersistenceFailure`; a valid record of another dimension is
    /// `InvalidConfig` and leaves the backend untouched.
    pub fn open(
        dim: usize,
        backend: Box<dyn SnapshotStore>,
        policy: PersistPolicy,
    ) -> Result<Self, FaceIdError> {
        let mut store = match backend.load()? {
            None => {
                info!("no existing face database found, starting fresh");
                Self::new(dim)?
            }
            Some(bytes) => match Self::load_record(dim, &bytes) {
                Err(e @ FaceIdError::InvalidConfig(_)) => return Err(e),
                Ok(store) => {
                    info!(
                        identities = store.len(),
                        samples = store.sample_count(),
                        "loaded face database"
                    );
                    store
                }
                Err(e) => {
                    warn!(error = %e, "unrecognized face database record, starting fresh");
                    Self::new(dim)?
                }
            },
        };
        store.persistence = Some(Persistence {
            backend,
            policy,
            dirty: 0,
        });
        Ok(store)
    }

    fn load_record(dim: usize, bytes: &[u8]) -> Result<Self, FaceIdError> {
        let snapshot = snapshot::decode(bytes)?;
        if snapshot.dim != dim {
            return Err(FaceIdError::InvalidConfig(format!(
                "face database has dimension {}, configured {dim}",
                snapshot.dim
            )));
        }
        Self::restore(snapshot)
    }

    pub fn dim(&self) -> usize {
        self.index.dim()
    }

    /// Number of identities.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Total retained samples across all identities.
    pub fn sample_count(&self) -> usize {
        self.identities.iter().map(Identity::sample_count).sum()
    }

    /// Handle the next indexed centroid will receive.
    pub fn next_handle(&self) -> u64 {
        self.index.next_handle()
    }

    pub fn identity(&self, name: &str) -> Option<&Identity> {
        self.by_name.get(name).map(|&i| &self.identities[i])
    }

    /// All identities in creation order.
    pub fn identities(&self) -> impl Iterator<Item = &Identity> + '_ {
        self.identities.iter()
    }

    /// Adds one sample for `name`, creating the identity on first use.
    ///
    /// For an existing identity the centroid is recomputed as the mean of
    /// all its samples and its index entry is replaced. On
    /// `DimensionMismatch`, `NonFiniteComponent` or `InvalidName` nothing
    /// changes. A
    /// `PersistenceFailure` is reported after the in-memory update has been
    /// applied; the write is retried by the next flush.
    pub fn add_sample(&mut self, name: &str, vector: &[f32]) -> Result<(), FaceIdError> {
        if name.is_empty() {
            return Err(FaceIdError::InvalidName);
        }
        check_vector(self.dim(), vector)?;

        match self.by_name.get(name).copied() {
            Some(pos) => {
                let ident = &self.identities[pos];
                let centroid = mean(
                    self.dim(),
                    ident.samples.iter().map(Vec::as_slice).chain([vector]),
                );
                let old = ident.handle;
                self.index.remove(old)?;
                let handle = self.index.add(&centroid)?;

                self.by_handle.remove(&old);
                self.by_handle.insert(handle, pos);
                let ident = &mut self.identities[pos];
                ident.samples.push(vector.to_vec());
                ident.centroid = centroid;
                ident.handle = handle;
                debug!(name, samples = ident.samples.len(), %handle, "updated identity centroid");
            }
            None => {
                let handle = self.index.add(vector)?;
                let pos = self.identities.len();
                self.identities.push(Identity {
                    name: name.to_string(),
                    samples: vec![vector.to_vec()],
                    centroid: vector.to_vec(),
                    handle,
                });
                self.by_name.insert(name.to_string(), pos);
                self.by_handle.insert(handle, pos);
                info!(name, %handle, "enrolled new identity");
            }
        }

        self.mark_dirty()
    }

    /// Returns the closest identity, or `None` when nothing is enrolled.
    pub fn best_match(&self, vector: &[f32]) -> Result<Option<IdentityMatch>, FaceIdError> {
        Ok(self.search(vector, 1)?.into_iter().next())
    }

    /// Returns up to `k` closest identities by ascending distance.
    pub fn search(&self, vector: &[f32], k: usize) -> Result<Vec<IdentityMatch>, FaceIdError> {
        let matches = self.index.search(vector, k)?;
        matches
            .into_iter()
            .map(|m| {
                let pos = self
                    .by_handle
                    .get(&m.handle)
                    .ok_or(FaceIdError::UnknownHandle(m.handle))?;
                Ok(IdentityMatch {
                    name: self.identities[*pos].name.clone(),
                    distance: m.distance,
                })
            })
            .collect()
    }

    /// Captures the full state for persistence.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            dim: self.dim(),
            next_handle: self.index.next_handle(),
            index: self
                .index
                .entries()
                .map(|(h, v)| (h, v.to_vec()))
                .collect(),
            identities: self
                .identities
                .iter()
                .map(|ident| IdentityRecord {
                    name: ident.name.clone(),
                    handle: ident.handle,
                    samples: ident.samples.clone(),
                })
                .collect(),
        }
    }

    /// Rebuilds a non-persistent store from a snapshot.
    ///
    /// Fails with `MalformedPersistedState` unless every identity owns
    /// exactly one index entry and that entry equals the mean of its
    /// samples.
    pub fn restore(snapshot: Snapshot) -> Result<Self, FaceIdError> {
        let Snapshot {
            dim,
            next_handle,
            index,
            identities,
        } = snapshot;
        let malformed = FaceIdError::MalformedPersistedState;

        let index = FlatIndex::from_entries(dim, next_handle, index)
            .map_err(|e| malformed(e.to_string()))?;
        if identities.len() != index.len() {
            return Err(malformed(format!(
                "{} index entries for {} identities",
                index.len(),
                identities.len()
            )));
        }

        let mut store = Self::from_index(index);
        for rec in identities {
            if rec.name.is_empty() {
                return Err(malformed("identity with empty name".into()));
            }
            if store.by_name.contains_key(&rec.name) {
                return Err(malformed(format!("duplicate identity {:?}", rec.name)));
            }
            if rec.samples.is_empty() {
                return Err(malformed(format!("identity {:?} has no samples", rec.name)));
            }
            if let Some(e) = rec.samples.iter().find_map(|s| check_vector(dim, s).err()) {
                return Err(malformed(format!("identity {:?}: {e}", rec.name)));
            }
            if store.by_handle.contains_key(&rec.handle) {
                return Err(malformed(format!("handle {} shared by two identities", rec.handle)));
            }
            let indexed = store
                .index
                .get(rec.handle)
                .ok_or_else(|| malformed(format!("identity {:?} points at missing {}", rec.name, rec.handle)))?;
            let expected = mean(dim, rec.samples.iter().map(Vec::as_slice));
            let drift = indexed
                .iter()
                .zip(&expected)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0f32, f32::max);
            if drift > CENTROID_TOLERANCE {
                return Err(malformed(format!(
                    "identity {:?} centroid differs from sample mean by {drift}",
                    rec.name
                )));
            }

            let pos = store.identities.len();
            store.by_name.insert(rec.name.clone(), pos);
            store.by_handle.insert(rec.handle, pos);
            store.identities.push(Identity {
                centroid: indexed.to_vec(),
                name: rec.name,
                samples: rec.samples,
                handle: rec.handle,
            });
        }
        Ok(store)
    }

    /// Writes pending mutations to the attached backend, if any.
    pub fn flush(&mut self) -> Result<(), FaceIdError> {
        if !self.is_dirty() {
            return Ok(());
        }
        let record = snapshot::encode(&self.snapshot())?;
        if let Some(p) = self.persistence.as_mut() {
            p.backend.save(&record)?;
            debug!(bytes = record.len(), mutations = p.dirty, "face database saved");
            p.dirty = 0;
        }
        Ok(())
    }

    /// True when mutations have not reached the backend yet.
    pub fn is_dirty(&self) -> bool {
        self.persistence.as_ref().is_some_and(|p| p.dirty > 0)
    }

    fn mark_dirty(&mut self) -> Result<(), FaceIdError> {
        let Some(p) = self.persistence.as_mut() else {
            return Ok(());
        };
        p.dirty += 1;
        if p.policy.flush_every > 0 && p.dirty >= p.policy.flush_every {
            self.flush()?;
        }
        Ok(())
    }
}

impl fmt::Debug for IdentityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityStore")
            .field("dim", &self.dim())
            .field("identities", &self.identities.len())
            .field("persistent", &self.persistence.is_some())
            .finish()
    }
}

/// Checks the length and that every component is finite. JSON has no
/// encoding for NaN or infinities, so such a sample could not be persisted.
pub(crate) fn check_vector(dim: usize, vector: &[f32]) -> Result<(), FaceIdError> {
    if vector.len() != dim {
        return Err(FaceIdError::DimensionMismatch {
            expected: dim,
            got: vector.len(),
        });
    }
    if let Some(index) = vector.iter().position(|x| !x.is_finite()) {
        return Err(FaceIdError::NonFiniteComponent { index });
    }
    Ok(())
}

/// Elementwise mean with f64 accumulation.
fn mean<'a>(dim: usize, samples: impl IntoIterator<Item = &'a [f32]>) -> Vec<f32> {
    let mut acc = vec![0.0f64; dim];
    let mut n = 0usize;
    for s in samples {
        for (a, &x) in acc.iter_mut().zip(s) {
            *a += x as f64;
        }
        n += 1;
    }
    if n == 0 {
        return vec![0.0; dim];
    }
    acc.into_iter().map(|a| (a / n as f64) as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemorySnapshotStore;

    fn approx_eq(a: &[f32], b: &[f32]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-6)
    }

    #[test]
    fn new_rejects_zero_dim() {
        assert!(matches!(
            IdentityStore::new(0),
            Err(FaceIdError::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_store_has_no_match() {
        let store = IdentityStore::new(4).unwrap();
        assert_eq!(store.best_match(&[1.0, 0.0, 0.0, 0.0]).unwrap(), None);
    }

    #[test]
    fn first_sample_matches_itself() {
        let mut store = IdentityStore::new(3).unwrap();
        let v = [0.2, -0.4, 0.9];
        store.add_sample("A", &v).unwrap();

        let m = store.best_match(&v).unwrap().unwrap();
        assert_eq!(m.name, "A");
        assert!(m.distance.abs() < 1e-6);
        assert_eq!(store.identity("A").unwrap().centroid(), &v);
    }

    #[test]
    fn alice_two_samples() {
        let mut store = IdentityStore::new(4).unwrap();
        store.add_sample("Alice", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        store.add_sample("Alice", &[0.0, 1.0, 0.0, 0.0]).unwrap();

        let alice = store.identity("Alice").unwrap();
        assert_eq!(alice.centroid(), &[0.5, 0.5, 0.0, 0.0]);
        assert_eq!(alice.sample_count(), 2);
        assert_eq!(store.len(), 1);

        let m = store.best_match(&[0.5, 0.5, 0.0, 0.0]).unwrap().unwrap();
        assert_eq!(m.name, "Alice");
        assert_eq!(m.distance, 0.0);

        let far = store.best_match(&[0.0, 0.0, 1.0, 0.0]).unwrap().unwrap();
        assert!((far.distance - 1.5).abs() < 1e-6);
        assert!(far.distance >= 0.1, "would be rejected at threshold 0.1");
    }

    #[test]
    fn centroid_is_order_independent() {
        let samples: [[f32; 4]; 3] = [
            [1.0, 0.0, 0.0, 0.5],
            [0.0, 1.0, 0.0, 0.25],
            [0.0, 0.0, 2.0, -0.75],
        ];
        let orders = [[0, 1, 2], [2, 1, 0], [1, 2, 0], [2, 0, 1]];

        let mut centroids = Vec::new();
        for order in orders {
            let mut store = IdentityStore::new(4).unwrap();
            for i in order {
                store.add_sample("A", &samples[i]).unwrap();
            }
            centroids.push(store.identity("A").unwrap().centroid().to_vec());
        }
        for c in &centroids {
            assert_eq!(c, &centroids[0]);
        }
        assert!(approx_eq(&centroids[0], &[1.0 / 3.0, 1.0 / 3.0, 2.0 / 3.0, 0.0]));
    }

    #[test]
    fn centroid_is_true_mean_not_running_average() {
        let mut store = IdentityStore::new(1).unwrap();
        for x in [0.0, 0.0, 0.0, 4.0] {
            store.add_sample("A", &[x]).unwrap();
        }
        assert_eq!(store.identity("A").unwrap().centroid(), &[1.0]);
    }

    #[test]
    fn updating_one_identity_keeps_others_reachable() {
        let mut store = IdentityStore::new(2).unwrap();
        store.add_sample("a", &[1.0, 0.0]).unwrap();
        store.add_sample("b", &[0.0, 1.0]).unwrap();
        store.add_sample("c", &[-1.0, 0.0]).unwrap();

        // Re-indexing "a" must not shift b or c.
        store.add_sample("a", &[0.8, 0.2]).unwrap();
        store.add_sample("a", &[0.9, 0.1]).unwrap();

        for (name, v) in [("b", [0.0, 1.0]), ("c", [-1.0, 0.0])] {
            let m = store.best_match(&v).unwrap().unwrap();
            assert_eq!(m.name, name);
            assert_eq!(m.distance, 0.0);
            let ident = store.identity(name).unwrap();
            assert_eq!(store.index.get(ident.handle()), Some(&v[..]));
        }
        let a = store.identity("a").unwrap();
        assert_eq!(store.index.get(a.handle()), Some(a.centroid()));
        assert_eq!(store.index.len(), 3);
    }

    #[test]
    fn search_top_k() {
        let mut store = IdentityStore::new(2).unwrap();
        store.add_sample("near", &[1.0, 0.0]).unwrap();
        store.add_sample("mid", &[0.0, 1.0]).unwrap();
        store.add_sample("far", &[-1.0, 0.0]).unwrap();

        let names: Vec<String> = store
            .search(&[0.9, 0.1], 2)
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["near", "mid"]);
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut store = IdentityStore::new(1).unwrap();
        store.add_sample("alice", &[1.0]).unwrap();
        store.add_sample("Alice", &[3.0]).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.identity("alice").unwrap().centroid(), &[1.0]);
    }

    #[test]
    fn dimension_mismatch_leaves_store_unchanged() {
        let mut store = IdentityStore::new(3).unwrap();
        store.add_sample("A", &[1.0, 0.0, 0.0]).unwrap();
        let before = store.snapshot();

        let err = store.add_sample("A", &[1.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            FaceIdError::DimensionMismatch { expected: 3, got: 2 }
        ));
        assert!(store.add_sample("B", &[1.0; 4]).is_err());
        assert_eq!(store.snapshot(), before);

        assert!(matches!(
            store.best_match(&[1.0]),
            Err(FaceIdError::DimensionMismatch { expected: 3, got: 1 })
        ));
    }

    #[test]
    fn empty_name_rejected() {
        let mut store = IdentityStore::new(1).unwrap();
        assert!(matches!(
            store.add_sample("", &[1.0]),
            Err(FaceIdError::InvalidName)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let mut store = IdentityStore::new(3).unwrap();
        store.add_sample("a", &[1.0, 0.0, 0.0]).unwrap();
        store.add_sample("b", &[0.0, 1.0, 0.0]).unwrap();
        store.add_sample("a", &[0.5, 0.5, 0.0]).unwrap();
        store.add_sample("c", &[0.1, 0.2, 0.3]).unwrap();

        let restored = IdentityStore::restore(store.snapshot()).unwrap();
        assert_eq!(restored.snapshot(), store.snapshot());
        for ident in store.identities() {
            let other = restored.identity(ident.name()).unwrap();
            assert_eq!(other, ident);
        }
        for q in [[1.0, 0.0, 0.0], [0.0, 0.9, 0.1], [0.2, 0.2, 0.2]] {
            assert_eq!(restored.best_match(&q).unwrap(), store.best_match(&q).unwrap());
        }
    }

    #[test]
    fn restore_survives_encoding() {
        let mut store = IdentityStore::new(2).unwrap();
        store.add_sample("a", &[0.1, 0.7]).unwrap();
        store.add_sample("a", &[0.3, 0.2]).unwrap();
        store.add_sample("a", &[0.123_456_7, 0.9]).unwrap();

        let bytes = snapshot::encode(&store.snapshot()).unwrap();
        let restored = IdentityStore::restore(snapshot::decode(&bytes).unwrap()).unwrap();
        assert_eq!(restored.snapshot(), store.snapshot());
    }

    #[test]
    fn restore_rejects_inconsistent_snapshots() {
        let mut store = IdentityStore::new(2).unwrap();
        store.add_sample("a", &[1.0, 0.0]).unwrap();
        store.add_sample("b", &[0.0, 1.0]).unwrap();
        let good = store.snapshot();

        let mut orphan = good.clone();
        orphan.identities.pop();

        let mut drifted = good.clone();
        drifted.identities[0].samples[0] = vec![0.5, 0.5];

        let mut duplicate = good.clone();
        duplicate.identities[1].name = "a".into();

        let mut shared = good.clone();
        shared.identities[1].handle = shared.identities[0].handle;

        let mut no_samples = good.clone();
        no_samples.identities[0].samples.clear();

        let mut nan_sample = good.clone();
        nan_sample.identities[1].samples.push(vec![f32::NAN, 1.0]);

        for bad in [orphan, drifted, duplicate, shared, no_samples, nan_sample] {
            assert!(matches!(
                IdentityStore::restore(bad),
                Err(FaceIdError::MalformedPersistedState(_))
            ));
        }
    }

    #[test]
    fn open_persists_every_mutation_by_default() {
        let backend = MemorySnapshotStore::new();
        let mut store =
            IdentityStore::open(2, Box::new(backend.clone()), PersistPolicy::default()).unwrap();
        assert!(store.is_empty());

        store.add_sample("a", &[1.0, 0.0]).unwrap();
        store.add_sample("a", &[0.0, 1.0]).unwrap();
        assert_eq!(backend.saves(), 2);
        assert!(!store.is_dirty());

        let reopened =
            IdentityStore::open(2, Box::new(backend.clone()), PersistPolicy::default()).unwrap();
        assert_eq!(reopened.snapshot(), store.snapshot());
    }

    #[test]
    fn write_behind_batches_until_flush() {
        let backend = MemorySnapshotStore::new();
        let policy = PersistPolicy { flush_every: 0 };
        let mut store = IdentityStore::open(1, Box::new(backend.clone()), policy).unwrap();

        store.add_sample("a", &[1.0]).unwrap();
        store.add_sample("b", &[2.0]).unwrap();
        assert_eq!(backend.saves(), 0);
        assert!(store.is_dirty());

        store.flush().unwrap();
        assert_eq!(backend.saves(), 1);
        store.flush().unwrap();
        assert_eq!(backend.saves(), 1, "clean flush writes nothing");
    }

    #[test]
    fn flush_every_n() {
        let backend = MemorySnapshotStore::new();
        let policy = PersistPolicy { flush_every: 3 };
        let mut store = IdentityStore::open(1, Box::new(backend.clone()), policy).unwrap();
        for i in 0..7 {
            store.add_sample("a", &[i as f32]).unwrap();
        }
        assert_eq!(backend.saves(), 2);
        assert!(store.is_dirty());
    }

    #[test]
    fn persistence_failure_keeps_memory_state() {
        let backend = MemorySnapshotStore::new();
        let mut store =
            IdentityStore::open(1, Box::new(backend.clone()), PersistPolicy::default()).unwrap();
        backend.set_fail_writes(true);

        let err = store.add_sample("a", &[1.0]).unwrap_err();
        assert!(matches!(err, FaceIdError::PersistenceFailure(_)));
        assert_eq!(store.identity("a").unwrap().sample_count(), 1);
        assert!(store.is_dirty());

        backend.set_fail_writes(false);
        store.flush().unwrap();
        assert!(!store.is_dirty());
        let saved = snapshot::decode(&backend.record().unwrap()).unwrap();
        assert_eq!(saved, store.snapshot());
    }

    #[test]
    fn open_migrates_legacy_record() {
        let legacy = br#"{
            "schema": "facecv/v1",
            "dim": 2,
            "index": [[0, [1.0, 0.0]], [1, [0.0, 1.0]]],
            "names": ["bob", "alice"]
        }"#;
        let backend = MemorySnapshotStore::with_record(legacy.to_vec());
        let mut store =
            IdentityStore::open(2, Box::new(backend.clone()), PersistPolicy::default()).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.identity("alice").unwrap().samples(), &[vec![0.0, 1.0]]);

        store.add_sample("alice", &[0.0, 0.0]).unwrap();
        assert_eq!(store.identity("alice").unwrap().centroid(), &[0.0, 0.5]);
        assert_eq!(store.best_match(&[1.0, 0.0]).unwrap().unwrap().name, "bob");

        let saved: serde_json::Value = serde_json::from_slice(&backend.record().unwrap()).unwrap();
        assert_eq!(saved["schema"], "facecv/v2");
    }

    #[test]
    fn open_recovers_from_malformed_record() {
        for record in [&b"not json"[..], br#"{"schema": "facecv/v7"}"#] {
            let backend = MemorySnapshotStore::with_record(record.to_vec());
            let store =
                IdentityStore::open(2, Box::new(backend), PersistPolicy::default()).unwrap();
            assert!(store.is_empty());
        }
    }

    #[test]
    fn open_rejects_dimension_change() {
        let mut old = IdentityStore::new(3).unwrap();
        old.add_sample("a", &[1.0, 0.0, 0.0]).unwrap();
        let record = snapshot::encode(&old.snapshot()).unwrap();

        let backend = MemorySnapshotStore::with_record(record.clone());
        assert!(matches!(
            IdentityStore::open(2, Box::new(backend.clone()), PersistPolicy::default()),
            Err(FaceIdError::InvalidConfig(_))
        ));
        assert_eq!(backend.record(), Some(record));
        assert_eq!(backend.saves(), 0);

        let store = IdentityStore::open(3, Box::new(backend), PersistPolicy::default()).unwrap();
        assert_eq!(store.identity("a").unwrap().sample_count(), 1);
    }

    #[test]
    fn non_finite_sample_is_rejected() {
        let mut store = IdentityStore::new(2).unwrap();
        store.add_sample("a", &[1.0, 0.0]).unwrap();
        let before = store.snapshot();

        for bad in [[f32::NAN, 0.0], [0.0, f32::INFINITY], [f32::NEG_INFINITY, 1.0]] {
            assert!(matches!(
                store.add_sample("a", &bad),
                Err(FaceIdError::NonFiniteComponent { .. })
            ));
            assert!(store.add_sample("c", &bad).is_err());
        }
        assert!(matches!(
            store.add_sample("c", &[0.0, f32::NAN]),
            Err(FaceIdError::NonFiniteComponent { index: 1 })
        ));
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.identity("a").unwrap().centroid(), &[1.0, 0.0]);
    }

    #[test]
    fn non_finite_sample_does_not_reach_backend() {
        let backend = MemorySnapshotStore::new();
        let mut store =
            IdentityStore::open(2, Box::new(backend.clone()), PersistPolicy::default()).unwrap();
        store.add_sample("alice", &[1.0, 0.0]).unwrap();
        store.add_sample("bob", &[0.0, 1.0]).unwrap();
        assert!(store.add_sample("carol", &[f32::NAN, 0.0]).is_err());
        assert_eq!(backend.saves(), 2);
        assert!(!store.is_dirty());

        let reopened =
            IdentityStore::open(2, Box::new(backend), PersistPolicy::default()).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.snapshot(), store.snapshot());
    }
}
