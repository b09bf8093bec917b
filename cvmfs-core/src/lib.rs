//! CVMFS Core Library
//!
//! Access to CernVM-FS repositories, either hosted locally (stratum0) or
//! reachable over HTTP (stratum1):
//! - Unified artifact retrieval over the local filesystem and HTTP
//! - Repository identity and replication state from marker files
//! - REST control API client (capability probe, replication trigger)
//! - Discovery of locally configured repositories

pub mod config;
pub mod discovery;
pub mod error;
pub mod local;
pub mod manifest;
pub mod remote;
pub mod repository;
pub mod server_config;
pub mod timestamp;

pub use config::CvmfsConfig;
pub use discovery::{all_local, all_local_stratum0};
pub use error::{RepositoryError, Result};
pub use local::LocalRepository;
pub use manifest::Manifest;
pub use remote::{RemoteRepository, ReplicationResponse, RestInfo};
pub use repository::{ArtifactSource, Repository, RepositoryState, RepositoryType};
pub use server_config::{ServerConfig, UpstreamStorage};
