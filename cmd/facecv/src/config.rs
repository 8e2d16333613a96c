//! Configuration loading.
//!
//! Configuration is stored in ~/.facecv/config.yaml:
//!
//! ```yaml
//! backend: file          # or redb
//! db_path: /data/faces.json
//! engine:
//!   dim: 128
//!   threshold: 0.3
//!   debounce_ttl_ms: 5000
//!   flush_every: 1
//! ```

use std::path::{Path, PathBuf};

use facecv_faceid::{
    Config, FileSnapshotStore, IdentityStore, RecognitionEngine, RedbSnapshotStore, SnapshotStore,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Cli;

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".facecv";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Where the face database is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One JSON file, replaced atomically on each save.
    #[default]
    File,
    /// A redb database file.
    Redb,
}

impl Backend {
    fn default_file_name(self) -> &'static str {
        match self {
            Backend::File => "faces.json",
            Backend::Redb => "faces.redb",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Face database path (default: ~/.facecv/faces.json or faces.redb).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,

    pub backend: Backend,

    pub engine: Config,
}

impl AppConfig {
    /// Gets the default config directory.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR))
    }

    /// Gets the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_dir().map(|dir| dir.join(DEFAULT_CONFIG_FILE))
    }

    /// Applies command-line overrides.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(db) = &cli.db {
            self.db_path = Some(PathBuf::from(db));
        }
        if let Some(backend) = cli.backend {
            self.backend = backend;
        }
        self
    }

    pub fn db_path(&self) -> anyhow::Result<PathBuf> {
        match &self.db_path {
            Some(p) => Ok(p.clone()),
            None => Self::default_dir()
                .map(|dir| dir.join(self.backend.default_file_name()))
                .ok_or_else(|| anyhow::anyhow!("cannot determine database path")),
        }
    }

    /// Opens the configured backend and loads the engine from it.
    pub fn open_engine(&self) -> anyhow::Result<RecognitionEngine> {
        let path = self.db_path()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), backend = ?self.backend, "opening face database");

        let backend: Box<dyn SnapshotStore> = match self.backend {
            Backend::File => Box::new(FileSnapshotStore::new(&path)),
            Backend::Redb => Box::new(RedbSnapshotStore::open(&path)?),
        };
        let store = IdentityStore::open(self.engine.dim, backend, self.engine.persist_policy())?;
        Ok(RecognitionEngine::new(self.engine.clone(), store)?)
    }
}

/// Loads configuration from `custom_path`, or from the default path.
///
/// A missing default config file is created with default values; a missing
/// custom path is an error.
pub fn load_config(custom_path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config_path = match custom_path {
        Some(p) => {
            if !p.exists() {
                anyhow::bail!("config file '{}' not found", p.display());
            }
            p.to_path_buf()
        }
        None => AppConfig::default_config_path()
            .ok_or_else(|| anyhow::anyhow!("cannot determine config path"))?,
    };

    let cfg = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        serde_yaml::from_str(&content)?
    } else {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let cfg = AppConfig::default();
        std::fs::write(&config_path, serde_yaml::to_string(&cfg)?)?;
        cfg
    };

    Ok(cfg)
}

/// Loads configuration with the global command-line overrides applied.
pub fn from_cli(cli: &Cli) -> anyhow::Result<AppConfig> {
    let cfg = load_config(cli.config.as_deref().map(Path::new))?;
    cfg.engine.validate()?;
    Ok(cfg.with_overrides(cli))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_partial_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "backend: redb\nengine:\n  dim: 4\n  threshold: 0.1\n",
        )
        .unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.backend, Backend::Redb);
        assert_eq!(cfg.engine.dim, 4);
        assert_eq!(cfg.engine.threshold, 0.1);
        assert_eq!(cfg.engine.debounce_ttl_ms, 5000);
        assert!(cfg.db_path.is_none());
    }

    #[test]
    fn missing_custom_path_is_error() {
        let dir = tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.yaml"))).is_err());
    }

    #[test]
    fn open_engine_with_each_backend() {
        let dir = tempdir().unwrap();
        for (backend, file) in [(Backend::File, "faces.json"), (Backend::Redb, "faces.redb")] {
            let cfg = AppConfig {
                db_path: Some(dir.path().join("db").join(file)),
                backend,
                engine: Config {
                    dim: 2,
                    ..Config::default()
                },
            };
            {
                let mut engine = cfg.open_engine().unwrap();
                engine
                    .begin_enrollment("a", 1)
                    .unwrap()
                    .submit(&[1.0, 0.0])
                    .unwrap();
            }
            let engine = cfg.open_engine().unwrap();
            assert_eq!(engine.store().len(), 1, "{backend:?} should persist");
        }
    }
}
