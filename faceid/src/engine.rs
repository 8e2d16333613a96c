use std::borrow::Cow;
use std::time::Instant;

use facecv_vecstore::l2_normalize;
use tracing::debug;

use crate::config::Config;
use crate::debounce::DebounceCache;
use crate::enroll::EnrollmentSession;
use crate::error::FaceIdError;
use crate::store::{check_vector, IdentityStore};

/// Outcome of one recognition query.
#[derive(Debug, Clone, PartialEq)]
pub enum Recognition {
    /// The nearest identity is closer than the threshold.
    Matched { name: String, distance: f32 },

    /// Unknown face, not seen recently: the host should offer enrollment.
    EnrollPrompt,

    /// Unknown face that was already prompted for within the debounce window.
    EnrollSuppressed,
}

impl Recognition {
    pub fn is_match(&self) -> bool {
        matches!(self, Recognition::Matched { .. })
    }

    /// Matched identity name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Recognition::Matched { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Decides, one query at a time, whether an embedding is a known identity
/// or an enrollment candidate.
///
/// Owns the [`IdentityStore`]. Enrollment sessions borrow the engine
/// mutably, so queries and enrollment never interleave.
pub struct RecognitionEngine {
    cfg: Config,
    store: IdentityStore,
    debounce: DebounceCache,
}

impl RecognitionEngine {
    /// Creates an engine over `store`, whose dimension must match `cfg.dim`.
    pub fn new(cfg: Config, store: IdentityStore) -> Result<Self, FaceIdError> {
        cfg.validate()?;
        if store.dim() != cfg.dim {
            return Err(FaceIdError::InvalidConfig(format!(
                "store dimension {} differs from configured {}",
                store.dim(),
                cfg.dim
            )));
        }
        let debounce = DebounceCache::new(cfg.debounce_ttl(), cfg.debounce_radius);
        Ok(Self {
            cfg,
            store,
            debounce,
        })
    }

    /// Creates an engine with an empty, non-persistent store.
    pub fn in_memory(cfg: Config) -> Result<Self, FaceIdError> {
        cfg.validate()?;
        let store = IdentityStore::new(cfg.dim)?;
        Self::new(cfg, store)
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn store(&self) -> &IdentityStore {
        &self.store
    }

    /// Recognizes `vector` using the current time for debouncing.
    pub fn query(&mut self, vector: &[f32]) -> Result<Recognition, FaceIdError> {
        self.query_at(vector, Instant::now())
    }

    pub fn query_at(&mut self, vector: &[f32], now: Instant) -> Result<Recognition, FaceIdError> {
        let v = prepare(&self.cfg, vector)?;

        if let Some(m) = self.store.best_match(&v)? {
            if m.distance < self.cfg.threshold {
                debug!(name = %m.name, distance = m.distance, "face recognized");
                return Ok(Recognition::Matched {
                    name: m.name,
                    distance: m.distance,
                });
            }
            debug!(
                closest = %m.name,
                distance = m.distance,
                threshold = self.cfg.threshold,
                "face not recognized"
            );
        }

        if self.debounce.should_prompt_at(&v, now) {
            Ok(Recognition::EnrollPrompt)
        } else {
            Ok(Recognition::EnrollSuppressed)
        }
    }

    /// Starts collecting `sample_count` samples for `name`.
    pub fn begin_enrollment(
        &mut self,
        name: &str,
        sample_count: usize,
    ) -> Result<EnrollmentSession<'_>, FaceIdError> {
        EnrollmentSession::begin(&mut self.store, &self.cfg, name, sample_count)
    }

    /// Writes pending store mutations to its backend.
    pub fn flush(&mut self) -> Result<(), FaceIdError> {
        self.store.flush()
    }

    pub fn into_store(self) -> IdentityStore {
        self.store
    }
}

/// Validates the vector and applies the configured normalization.
pub(crate) fn prepare<'a>(cfg: &Config, vector: &'a [f32]) -> Result<Cow<'a, [f32]>, FaceIdError> {
    check_vector(cfg.dim, vector)?;
    if !cfg.normalize {
        return Ok(Cow::Borrowed(vector));
    }
    let mut v = vector.to_vec();
    l2_normalize(&mut v);
    Ok(Cow::Owned(v))
}
