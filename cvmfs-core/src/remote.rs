//! HTTP access to a published repository, typically a stratum1 replica.
//!
//! Artifacts are fetched with plain GET requests relative to the repository
//! URL. Servers that run the CVMFS control API additionally answer REST
//! calls below `<url>/<rest_connector>/`:
//! - `info`: repository type and server version
//! - `replicate`: trigger a replication run

use crate::config::CvmfsConfig;
use crate::error::{RepositoryError, Result};
use crate::repository::{ArtifactSource, Repository, RepositoryState, RepositoryType};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::fmt;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Response of the REST `info` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestInfo {
    #[serde(rename = "type")]
    pub repository_type: String,
    pub version: String,
}

/// Response of the REST `replicate` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationResponse {
    #[serde(default)]
    pub result: Option<String>,
}

impl ReplicationResponse {
    pub fn is_ok(&self) -> bool {
        self.result.as_deref() == Some("ok")
    }
}

/// HTTP transport for one repository URL.
struct RemoteStorage {
    base_url: String,
    rest_connector: String,
    http: Client,
    /// Whether the REST API answered the capability probe; probed once.
    rest_api: OnceCell<bool>,
}

impl RemoteStorage {
    fn new(repo_url: &str, config: &CvmfsConfig) -> Result<Self> {
        let url = url::Url::parse(repo_url)?;
        Ok(Self {
            base_url: url.as_str().trim_end_matches('/').to_string(),
            rest_connector: config.rest_connector.trim_matches('/').to_string(),
            http: Client::builder().timeout(None::<Duration>).build()?,
            rest_api: OnceCell::new(),
        })
    }

    fn rest_url(&self, method: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.rest_connector, method)
    }

    fn has_rest_api(&self) -> Result<bool> {
        if let Some(cached) = self.rest_api.get() {
            return Ok(*cached);
        }
        let url = self.rest_url("info");
        debug!("HEAD {}", url);
        let available = self.http.head(&url).send()?.status() == StatusCode::OK;
        if !available {
            warn!("No REST API at {}", url);
        }
        let _ = self.rest_api.set(available);
        Ok(available)
    }

    fn rest_request<T: DeserializeOwned>(&self, request: RequestBuilder, url: &str) -> Result<T> {
        let response = request
            .send()
            .and_then(|r| r.error_for_status())
            .inspect_err(|e| debug!("REST call {} failed: {}", url, e))?;
        let body = response.bytes()?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn rest_get<T: DeserializeOwned>(&self, method: &str) -> Result<T> {
        let url = self.rest_url(method);
        debug!("GET {}", url);
        self.rest_request(self.http.get(&url), &url)
    }

    fn rest_post<T: DeserializeOwned>(&self, method: &str) -> Result<T> {
        let url = self.rest_url(method);
        debug!("POST {}", url);
        self.rest_request(self.http.post(&url), &url)
    }

    /// Repository type and version as reported by the REST API, if any.
    fn repository_information(&self) -> Result<(RepositoryType, String)> {
        if !self.has_rest_api()? {
            return Ok((RepositoryType::Unknown, "unknown".to_string()));
        }
        let info: RestInfo = self.rest_get("info")?;
        let repository_type = info.repository_type.parse().unwrap_or_else(|other| {
            warn!("{} reports unrecognized repository type {:?}", self.base_url, other);
            RepositoryType::Unknown
        });
        Ok((repository_type, info.version))
    }
}

impl ArtifactSource for RemoteStorage {
    fn storage_location(&self) -> &str {
        &self.base_url
    }

    fn retrieve_file(&self, file_name: &str) -> Result<File> {
        let file_url = format!("{}/{}", self.base_url, file_name);
        debug!("GET {}", file_url);
        let mut response = self.http.get(&file_url).send()?;
        if !response.status().is_success() {
            return Err(RepositoryError::FileNotFoundInRepository {
                repository: self.base_url.clone(),
                file_name: file_url,
            });
        }
        let mut file = tempfile::tempfile()?;
        response.copy_to(&mut file)?;
        file.seek(SeekFrom::Start(0))?;
        Ok(file)
    }
}

/// A repository reachable over HTTP.
pub struct RemoteRepository {
    storage: RemoteStorage,
    state: RepositoryState,
}

impl RemoteRepository {
    /// Connect to the repository published at `repo_url`.
    pub fn open(repo_url: &str, config: &CvmfsConfig) -> Result<Self> {
        let storage = RemoteStorage::new(repo_url, config)?;
        let (repository_type, version) = storage.repository_information()?;
        let state = RepositoryState::discover(&storage, config, repository_type, version)?;

        info!(
            "Opened remote {} repository {} at {}",
            state.repository_type, state.fqrn, storage.base_url
        );

        Ok(Self { storage, state })
    }

    /// Whether the server answers the REST control API.
    pub fn has_rest_api(&self) -> Result<bool> {
        self.storage.has_rest_api()
    }

    /// GET a REST method and decode its JSON response.
    pub fn rest_get<T: DeserializeOwned>(&self, method: &str) -> Result<T> {
        self.storage.rest_get(method)
    }

    /// POST to a REST method and decode its JSON response.
    pub fn rest_post<T: DeserializeOwned>(&self, method: &str) -> Result<T> {
        self.storage.rest_post(method)
    }

    /// Ask the server to start replicating from its stratum0.
    pub fn start_replication(&self) -> Result<()> {
        let response: ReplicationResponse = self.rest_post("replicate")?;
        if !response.is_ok() {
            return Err(RepositoryError::CannotReplicate {
                repository: self.storage.base_url.clone(),
            });
        }
        info!("Started replication of {}", self.fqrn());
        Ok(())
    }

    pub fn url(&self) -> &str {
        &self.storage.base_url
    }
}

impl ArtifactSource for RemoteRepository {
    fn storage_location(&self) -> &str {
        self.storage.storage_location()
    }

    fn retrieve_file(&self, file_name: &str) -> Result<File> {
        self.storage.retrieve_file(file_name)
    }
}

impl Repository for RemoteRepository {
    fn state(&self) -> &RepositoryState {
        &self.state
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage.base_url)
    }
}

impl fmt::Debug for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Remote Repository {} at {}>", self.fqrn(), self.storage.base_url)
    }
}
