use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::FaceIdError;
use crate::persist::PersistPolicy;

/// Controls recognition, debounce and persistence behavior.
///
/// All distances are squared L2, the unit the index reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Embedding dimension. Default: 128.
    pub dim: usize,

    /// A best match strictly below this distance is a recognition.
    /// Default: 0.3.
    pub threshold: f32,

    /// L2-normalize every vector before it is searched or enrolled.
    /// Default: true.
    pub normalize: bool,

    /// How long an unknown face stays suppressed after prompting.
    /// Default: 5000.
    pub debounce_ttl_ms: u64,

    /// Two unknown vectors within this distance count as the same face for
    /// debouncing. 0 requires an exact repeat. Default: 0.05.
    pub debounce_radius: f32,

    /// Write a snapshot after this many mutations; 0 writes only on an
    /// explicit flush. Default: 1.
    pub flush_every: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dim: 128,
            threshold: 0.3,
            normalize: true,
            debounce_ttl_ms: 5000,
            debounce_radius: 0.05,
            flush_every: 1,
        }
    }
}

impl Config {
    /// Rejects values that cannot produce a working engine.
    pub fn validate(&self) -> Result<(), FaceIdError> {
        if self.dim == 0 {
            return Err(FaceIdError::InvalidConfig("dim must be positive".into()));
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(FaceIdError::InvalidConfig(format!(
                "threshold must be a positive squared distance, got {}",
                self.threshold
            )));
        }
        if !self.debounce_radius.is_finite() || self.debounce_radius < 0.0 {
            return Err(FaceIdError::InvalidConfig(format!(
                "debounce_radius must be non-negative, got {}",
                self.debounce_radius
            )));
        }
        Ok(())
    }

    pub fn debounce_ttl(&self) -> Duration {
        Duration::from_millis(self.debounce_ttl_ms)
    }

    pub fn persist_policy(&self) -> PersistPolicy {
        PersistPolicy {
            flush_every: self.flush_every,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.dim, 128);
        assert_eq!(cfg.debounce_ttl(), Duration::from_secs(5));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"dim": 512, "threshold": 0.8}"#).unwrap();
        assert_eq!(cfg.dim, 512);
        assert_eq!(cfg.threshold, 0.8);
        assert!(cfg.normalize);
        assert_eq!(cfg.flush_every, 1);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let bad = [
            Config { dim: 0, ..Config::default() },
            Config { threshold: 0.0, ..Config::default() },
            Config { threshold: f32::NAN, ..Config::default() },
            Config { debounce_radius: -1.0, ..Config::default() },
        ];
        for cfg in bad {
            assert!(
                matches!(cfg.validate(), Err(FaceIdError::InvalidConfig(_))),
                "{cfg:?} should be rejected"
            );
        }
    }
}
