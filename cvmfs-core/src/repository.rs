//! Shared repository contract.
//!
//! A repository is reachable through some transport that can hand out named
//! artifacts ([`ArtifactSource`]). Identity and replication state are derived
//! from the same three artifacts regardless of transport, see
//! [`RepositoryState::discover`].

use crate::config::CvmfsConfig;
use crate::error::{RepositoryError, Result};
use crate::manifest::Manifest;
use crate::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::str::FromStr;
use tracing::debug;

/// Role of a repository within the CVMFS distribution hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryType {
    /// Origin where the repository is authored
    Stratum0,
    /// Replica of a stratum0
    Stratum1,
    Unknown,
}

impl RepositoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stratum0 => "stratum0",
            Self::Stratum1 => "stratum1",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Self::Unknown
    }
}

impl fmt::Display for RepositoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepositoryType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "stratum0" => Ok(Self::Stratum0),
            "stratum1" => Ok(Self::Stratum1),
            "unknown" => Ok(Self::Unknown),
            other => Err(other.to_string()),
        }
    }
}

/// Anything that can hand out named artifacts of a repository.
pub trait ArtifactSource {
    /// Path or URL the artifacts are served from.
    fn storage_location(&self) -> &str;

    /// Open the artifact `file_name`.
    ///
    /// The returned file is positioned at its start and owned by the caller;
    /// it is released when dropped. A missing artifact is reported as
    /// [`RepositoryError::FileNotFoundInRepository`].
    fn retrieve_file(&self, file_name: &str) -> Result<File>;
}

/// Identity and replication state of a repository, fixed at construction.
#[derive(Debug, Clone)]
pub struct RepositoryState {
    pub(crate) fqrn: String,
    pub(crate) repository_type: RepositoryType,
    pub(crate) version: String,
    pub(crate) manifest: Manifest,
    pub(crate) last_replication: DateTime<Utc>,
    pub(crate) replicating_since: Option<DateTime<Utc>>,
}

impl RepositoryState {
    /// Derive repository state from its artifacts.
    ///
    /// 1. The manifest must exist, otherwise the repository is not found.
    /// 2. A last-replication marker sets the replication time, and marks a
    ///    repository of unknown type as a stratum1.
    /// 3. A replicating marker records when the running replication started.
    pub fn discover(
        source: &dyn ArtifactSource,
        config: &CvmfsConfig,
        repository_type: RepositoryType,
        version: String,
    ) -> Result<Self> {
        let manifest = match source.retrieve_file(&config.manifest_name) {
            Ok(file) => Manifest::from_reader(file)?,
            Err(RepositoryError::FileNotFoundInRepository { .. }) => {
                return Err(RepositoryError::RepositoryNotFound {
                    location: source.storage_location().to_string(),
                });
            }
            Err(e) => return Err(e),
        };
        let fqrn = manifest.repository_name.clone();

        let mut repository_type = repository_type;
        let last_replication = match read_marker(source, &config.last_replication_name)? {
            Some(ts) => {
                if !repository_type.is_known() {
                    repository_type = RepositoryType::Stratum1;
                }
                ts
            }
            None => timestamp::epoch(),
        };

        let replicating_since = read_marker(source, &config.replicating_name)?;

        debug!(
            "Discovered {} at {}: type={}, last_replication={}, replicating={}",
            fqrn,
            source.storage_location(),
            repository_type,
            last_replication,
            replicating_since.is_some()
        );

        Ok(Self {
            fqrn,
            repository_type,
            version,
            manifest,
            last_replication,
            replicating_since,
        })
    }
}

/// Read a marker timestamp, `None` if the marker does not exist.
fn read_marker(source: &dyn ArtifactSource, name: &str) -> Result<Option<DateTime<Utc>>> {
    match source.retrieve_file(name) {
        Ok(file) => timestamp::read_timestamp(file).map(Some),
        Err(RepositoryError::FileNotFoundInRepository { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// A fully initialized repository, local or remote.
pub trait Repository: ArtifactSource {
    fn state(&self) -> &RepositoryState;

    /// Fully qualified repository name.
    fn fqrn(&self) -> &str {
        &self.state().fqrn
    }

    fn repository_type(&self) -> RepositoryType {
        self.state().repository_type
    }

    fn version(&self) -> &str {
        &self.state().version
    }

    fn manifest(&self) -> &Manifest {
        &self.state().manifest
    }

    /// Time of the last completed replication, the Unix epoch if there was none.
    fn last_replication(&self) -> DateTime<Utc> {
        self.state().last_replication
    }

    fn has_been_replicated(&self) -> bool {
        self.state().last_replication != timestamp::epoch()
    }

    fn replicating(&self) -> bool {
        self.state().replicating_since.is_some()
    }

    fn replicating_since(&self) -> Option<DateTime<Utc>> {
        self.state().replicating_since
    }
}
