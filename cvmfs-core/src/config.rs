//! Layout of a CVMFS server installation.
//!
//! Every path and artifact name the repository layer touches is carried by a
//! [`CvmfsConfig`] value instead of process-wide constants, so callers (and
//! tests) can point the layer at any configuration root or REST prefix.
//! The defaults match a stock `cvmfs_server` install.

use crate::error::{RepositoryError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for locating and reading CVMFS repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvmfsConfig {
    /// Directory holding one configuration directory per local repository.
    pub config_root: PathBuf,
    /// Name of the `KEY=value` file inside each repository's config directory.
    pub server_config_name: String,
    /// Name of the signed manifest at the storage root.
    pub manifest_name: String,
    /// Marker written after each completed replication.
    pub last_replication_name: String,
    /// Marker present while a replication run is in progress.
    pub replicating_name: String,
    /// Path prefix of the REST control API, relative to the repository URL.
    pub rest_connector: String,
    /// Version reported for local repositories that do not record one.
    pub server_version: String,
}

impl Default for CvmfsConfig {
    fn default() -> Self {
        Self {
            config_root: PathBuf::from("/etc/cvmfs/repositories.d"),
            server_config_name: "server.conf".to_string(),
            manifest_name: ".cvmfspublished".to_string(),
            last_replication_name: ".cvmfs_last_snapshot".to_string(),
            replicating_name: ".cvmfs_is_snapshotting".to_string(),
            rest_connector: "control".to_string(),
            server_version: "unknown".to_string(),
        }
    }
}

impl CvmfsConfig {
    /// Load a configuration from a TOML file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        toml::from_str(&data)
            .map_err(|e| RepositoryError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from `path` if given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Replace the configuration root.
    pub fn with_config_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config_root = root.into();
        self
    }

    /// Configuration directory of the repository named `fqrn`.
    pub fn repository_config_dir(&self, fqrn: &str) -> PathBuf {
        self.config_root.join(fqrn)
    }

    /// Path of the server configuration file of the repository named `fqrn`.
    pub fn server_config_path(&self, fqrn: &str) -> PathBuf {
        self.repository_config_dir(fqrn).join(&self.server_config_name)
    }
}
