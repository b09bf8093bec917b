//! Repositories hosted on this machine.

use crate::config::CvmfsConfig;
use crate::error::{RepositoryError, Result};
use crate::repository::{ArtifactSource, Repository, RepositoryState, RepositoryType};
use crate::server_config::{ServerConfig, UpstreamStorage};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const REPOSITORY_TYPE_FIELD: &str = "CVMFS_REPOSITORY_TYPE";
const UPSTREAM_STORAGE_FIELD: &str = "CVMFS_UPSTREAM_STORAGE";
const CREATOR_VERSION_FIELD: &str = "CVMFS_CREATOR_VERSION";

/// Artifact access on the local backend storage of a repository.
#[derive(Debug, Clone)]
struct LocalStorage {
    fqrn: String,
    root: PathBuf,
    location: String,
}

impl ArtifactSource for LocalStorage {
    fn storage_location(&self) -> &str {
        &self.location
    }

    fn retrieve_file(&self, file_name: &str) -> Result<File> {
        let path = self.root.join(file_name);
        if !path.exists() {
            return Err(RepositoryError::FileNotFoundInRepository {
                repository: self.fqrn.clone(),
                file_name: file_name.to_string(),
            });
        }
        debug!("Opening {:?}", path);
        Ok(File::open(&path)?)
    }
}

/// A repository configured under the local CVMFS configuration root.
pub struct LocalRepository {
    server_config: ServerConfig,
    storage: LocalStorage,
    state: RepositoryState,
}

impl LocalRepository {
    /// Open the repository configured as `fqrn`.
    pub fn open(fqrn: &str, config: &CvmfsConfig) -> Result<Self> {
        let config_dir = config.repository_config_dir(fqrn);
        if !config_dir.is_dir() {
            return Err(RepositoryError::RepositoryNotFound {
                location: fqrn.to_string(),
            });
        }

        let server_config = ServerConfig::new(fqrn, config.server_config_path(fqrn));
        let declared = server_config.read(REPOSITORY_TYPE_FIELD)?;
        let repository_type = match declared.parse() {
            Ok(t @ (RepositoryType::Stratum0 | RepositoryType::Stratum1)) => t,
            _ => {
                return Err(RepositoryError::UnknownRepositoryType {
                    fqrn: fqrn.to_string(),
                    kind: declared,
                });
            }
        };

        let root = storage_root(fqrn, &server_config)?;
        let storage = LocalStorage {
            fqrn: fqrn.to_string(),
            location: root.display().to_string(),
            root,
        };

        let version = server_config
            .read_optional(CREATOR_VERSION_FIELD)?
            .unwrap_or_else(|| config.server_version.clone());

        let mut state = RepositoryState::discover(&storage, config, repository_type, version)?;
        // the configured name is authoritative for local repositories
        state.fqrn = fqrn.to_string();

        info!(
            "Opened local {} repository {} at {}",
            state.repository_type, fqrn, storage.location
        );

        Ok(Self {
            server_config,
            storage,
            state,
        })
    }

    /// Look up a field of this repository's `server.conf`.
    pub fn read_server_config(&self, field: &str) -> Result<String> {
        self.server_config.read(field)
    }

    pub fn server_config_path(&self) -> &Path {
        self.server_config.path()
    }

    /// Directory the repository's artifacts are stored in.
    pub fn storage_root(&self) -> &Path {
        &self.storage.root
    }
}

/// Resolve the backend storage directory from `CVMFS_UPSTREAM_STORAGE`.
fn storage_root(fqrn: &str, server_config: &ServerConfig) -> Result<PathBuf> {
    let value = server_config.read(UPSTREAM_STORAGE_FIELD)?;
    let upstream = UpstreamStorage::parse(fqrn, &value)?;
    if !upstream.is_local() {
        return Err(RepositoryError::UnknownRepositoryType {
            fqrn: fqrn.to_string(),
            kind: upstream.backend,
        });
    }
    Ok(PathBuf::from(upstream.backend_config))
}

impl ArtifactSource for LocalRepository {
    fn storage_location(&self) -> &str {
        self.storage.storage_location()
    }

    fn retrieve_file(&self, file_name: &str) -> Result<File> {
        self.storage.retrieve_file(file_name)
    }
}

impl Repository for LocalRepository {
    fn state(&self) -> &RepositoryState {
        &self.state
    }
}

impl fmt::Display for LocalRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.fqrn())
    }
}

impl fmt::Debug for LocalRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Local Repository {}>", self.fqrn())
    }
}
