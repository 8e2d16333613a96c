//! Face identity matching over a stable-handle vector index.
//!
//! Works on embeddings produced elsewhere: detection and embedding are
//! host-supplied capabilities ([`Detector`], [`Embedder`]).
//!
//! # Usage
//!
//! ```
//! use facecv_faceid::{Config, Recognition, RecognitionEngine};
//!
//! let mut engine = RecognitionEngine::in_memory(Config { dim: 4, ..Config::default() }).unwrap();
//!
//! // Unknown faces trigger an enrollment prompt (debounced).
//! assert_eq!(engine.query(&[1.0, 0.0, 0.0, 0.0]).unwrap(), Recognition::EnrollPrompt);
//!
//! let mut session = engine.begin_enrollment("alice", 2).unwrap();
//! session.submit(&[1.0, 0.0, 0.0, 0.0]).unwrap();
//! session.submit(&[0.9, 0.1, 0.0, 0.0]).unwrap();
//! assert!(session.is_complete());
//!
//! let r = engine.query(&[1.0, 0.02, 0.0, 0.0]).unwrap();
//! assert_eq!(r.name(), Some("alice"));
//! ```
//!
//! # Design
//!
//! Each identity keeps every sample it was enrolled with and indexes only
//! the mean of those samples. The index hands out opaque handles that never
//! shift when another entry is removed, so replacing one identity's centroid
//! cannot re-point another identity.

mod capability;
mod config;
mod debounce;
mod engine;
mod enroll;
mod error;
mod persist;
mod pipeline;
mod snapshot;
mod store;

pub use capability::{BoundingBox, CapabilityError, Detector, Embedder, FaceDetection, Point};
pub use config::Config;
pub use debounce::DebounceCache;
pub use engine::{Recognition, RecognitionEngine};
pub use enroll::EnrollmentSession;
pub use error::FaceIdError;
pub use persist::{
    FileSnapshotStore, MemorySnapshotStore, PersistPolicy, RedbSnapshotStore, SnapshotStore,
};
pub use pipeline::{FaceOutcome, FramePipeline};
pub use snapshot::{decode, encode, IdentityRecord, Snapshot};
pub use store::{Identity, IdentityMatch, IdentityStore};

pub use facecv_vecstore::Handle;
