use tracing::{debug, info};

use crate::config::Config;
use crate::engine::prepare;
use crate::error::FaceIdError;
use crate::store::IdentityStore;

/// Collects a fixed number of samples for one name.
///
/// Every accepted sample goes straight into the store, so an abandoned
/// session keeps the samples submitted so far.
pub struct EnrollmentSession<'a> {
    store: &'a mut IdentityStore,
    cfg: &'a Config,
    name: String,
    sample_count: usize,
    submitted: usize,
}

impl<'a> EnrollmentSession<'a> {
    pub(crate) fn begin(
        store: &'a mut IdentityStore,
        cfg: &'a Config,
        name: &str,
        sample_count: usize,
    ) -> Result<Self, FaceIdError> {
        if name.is_empty() {
            return Err(FaceIdError::InvalidName);
        }
        if sample_count == 0 {
            return Err(FaceIdError::InvalidConfig(
                "enrollment needs at least one sample".into(),
            ));
        }
        debug!(name, sample_count, "enrollment started");
        Ok(Self {
            store,
            cfg,
            name: name.to_string(),
            sample_count,
            submitted: 0,
        })
    }

    /// Adds one sample. A rejected sample does not count toward the total.
    ///
    /// A `PersistenceFailure` still counts: the sample is in the store and
    /// will be written by the next flush.
    pub fn submit(&mut self, vector: &[f32]) -> Result<(), FaceIdError> {
        if self.is_complete() {
            return Err(FaceIdError::SessionComplete {
                name: self.name.clone(),
                sample_count: self.sample_count,
            });
        }
        let v = prepare(self.cfg, vector)?;
        let result = self.store.add_sample(&self.name, &v);
        if matches!(result, Ok(()) | Err(FaceIdError::PersistenceFailure(_))) {
            self.submitted += 1;
            info!(
                name = %self.name,
                "collected {}/{} samples",
                self.submitted,
                self.sample_count
            );
        }
        result
    }

    pub fn is_complete(&self) -> bool {
        self.submitted >= self.sample_count
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn submitted(&self) -> usize {
        self.submitted
    }

    pub fn remaining(&self) -> usize {
        self.sample_count - self.submitted
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }
}
