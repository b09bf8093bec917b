//! Reader for a repository's `server.conf`.
//!
//! The file is a list of `KEY=value` lines as written by `cvmfs_server mkfs`.
//! Lookups take the first line starting with the key; there is no quoting
//! or escaping.

use crate::error::{RepositoryError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Handle on a server configuration file of one repository.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    fqrn: String,
    path: PathBuf,
}

impl ServerConfig {
    pub fn new(fqrn: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            fqrn: fqrn.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up `field`; the file is re-read on each call.
    pub fn read(&self, field: &str) -> Result<String> {
        let file = File::open(&self.path)?;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.starts_with(field) {
                // skip the key and its separator
                let value = line.get(field.len() + 1..).unwrap_or("");
                return Ok(value.trim().to_string());
            }
        }
        Err(RepositoryError::ConfigurationNotFound {
            repository: self.fqrn.clone(),
            field: field.to_string(),
        })
    }

    /// Like [`read`](Self::read), but an absent field yields `None`.
    pub fn read_optional(&self, field: &str) -> Result<Option<String>> {
        match self.read(field) {
            Ok(value) => Ok(Some(value)),
            Err(RepositoryError::ConfigurationNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Parsed `CVMFS_UPSTREAM_STORAGE` value: `backend,scratch_dir,backend_config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamStorage {
    pub backend: String,
    pub scratch_dir: String,
    pub backend_config: String,
}

impl UpstreamStorage {
    pub fn parse(fqrn: &str, value: &str) -> Result<Self> {
        let parts: Vec<&str> = value.split(',').collect();
        match parts.as_slice() {
            [backend, scratch_dir, backend_config] => Ok(Self {
                backend: backend.to_string(),
                scratch_dir: scratch_dir.to_string(),
                backend_config: backend_config.to_string(),
            }),
            _ => Err(RepositoryError::InvalidUpstreamStorage {
                fqrn: fqrn.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn is_local(&self) -> bool {
        self.backend == "local"
    }
}
