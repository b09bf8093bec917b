//! Enumeration of the repositories installed on this machine.

use crate::config::CvmfsConfig;
use crate::error::{RepositoryError, Result};
use crate::local::LocalRepository;
use crate::repository::{Repository, RepositoryType};
use std::fs;
use tracing::debug;

/// Open every repository configured under the configuration root.
///
/// Fails as a whole if any single repository cannot be opened.
pub fn all_local(config: &CvmfsConfig) -> Result<Vec<LocalRepository>> {
    let root = &config.config_root;
    if !root.is_dir() {
        return Err(RepositoryError::CvmfsNotInstalled {
            config_root: root.clone(),
        });
    }

    let mut repositories = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name();
        let fqrn = name.to_string_lossy();
        debug!("Found repository configuration {}", fqrn);
        repositories.push(LocalRepository::open(&fqrn, config)?);
    }
    Ok(repositories)
}

/// All local repositories that are stratum0s.
pub fn all_local_stratum0(config: &CvmfsConfig) -> Result<Vec<LocalRepository>> {
    Ok(all_local(config)?
        .into_iter()
        .filter(|repo| repo.repository_type() == RepositoryType::Stratum0)
        .collect())
}
