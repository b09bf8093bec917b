//! Integration tests for HTTP-reachable repositories
//!
//! These tests validate:
//! - Type/version discovery through the REST `info` call
//! - Type inference from replication markers when there is no REST API
//! - Replication trigger handling
//! - Artifact retrieval over HTTP

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use cvmfs_core::{
    ArtifactSource, CvmfsConfig, RemoteRepository, Repository, RepositoryError, RepositoryType,
};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;

const REPO_PATH: &str = "/cvmfs/example.org";

/// A fake stratum serving canned responses keyed by method and path.
#[derive(Default)]
struct FakeStratum {
    routes: HashMap<(Method, String), (StatusCode, String)>,
    info_probes: AtomicUsize,
    replicate_calls: AtomicUsize,
}

impl FakeStratum {
    fn with_manifest() -> Self {
        let mut stratum = Self::default();
        stratum.file(".cvmfspublished", "Cabcdef\nNexample.org\nS7\n--\nsignature");
        stratum
    }

    fn file(&mut self, name: &str, body: &str) {
        self.route(Method::GET, &format!("{}/{}", REPO_PATH, name), StatusCode::OK, body);
    }

    fn rest(&mut self, method: Method, name: &str, status: StatusCode, body: &str) {
        self.route(method, &format!("{}/control/{}", REPO_PATH, name), status, body);
    }

    fn route(&mut self, method: Method, path: &str, status: StatusCode, body: &str) {
        self.routes
            .insert((method, path.to_string()), (status, body.to_string()));
    }

    fn handle(&self, req: Request<Incoming>) -> Response<Full<Bytes>> {
        let path = req.uri().path().to_string();
        let is_head = req.method() == Method::HEAD;
        let lookup = if is_head { Method::GET } else { req.method().clone() };

        if path.ends_with("/control/info") && is_head {
            self.info_probes.fetch_add(1, Ordering::SeqCst);
        }
        if path.ends_with("/control/replicate") {
            self.replicate_calls.fetch_add(1, Ordering::SeqCst);
        }

        let (status, body) = self
            .routes
            .get(&(lookup, path))
            .cloned()
            .unwrap_or((StatusCode::NOT_FOUND, "not found".to_string()));
        let body = if is_head { Bytes::new() } else { Bytes::from(body) };
        Response::builder()
            .status(status)
            .body(Full::new(body))
            .unwrap()
    }
}

/// Serve `stratum` on a background runtime. Returns the listen address.
fn spawn_test_server(stratum: Arc<FakeStratum>) -> SocketAddr {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(s) => s,
                    Err(_) => continue,
                };
                let stratum = stratum.clone();
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |req| {
                        let stratum = stratum.clone();
                        async move { Ok::<_, Infallible>(stratum.handle(req)) }
                    });
                    let _ = http1::Builder::new().serve_connection(io, service).await;
                });
            }
        });
    });
    rx.recv().unwrap()
}

fn repo_url(addr: SocketAddr) -> String {
    format!("http://{}{}", addr, REPO_PATH)
}

fn open(stratum: FakeStratum) -> (Arc<FakeStratum>, cvmfs_core::Result<RemoteRepository>) {
    let stratum = Arc::new(stratum);
    let addr = spawn_test_server(stratum.clone());
    let repo = RemoteRepository::open(&repo_url(addr), &CvmfsConfig::default());
    (stratum, repo)
}

#[test]
fn test_stratum1_with_rest_api() {
    let mut stratum = FakeStratum::with_manifest();
    stratum.rest(
        Method::GET,
        "info",
        StatusCode::OK,
        r#"{"type":"stratum1","version":"2.1"}"#,
    );
    stratum.file(".cvmfs_last_snapshot", "2020-01-01T00:00:00Z\n");

    let (stratum, repo) = open(stratum);
    let repo = repo.unwrap();

    assert_eq!(repo.fqrn(), "example.org");
    assert_eq!(repo.repository_type(), RepositoryType::Stratum1);
    assert_eq!(repo.version(), "2.1");
    assert_eq!(
        repo.last_replication(),
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    );
    assert!(!repo.replicating());
    assert_eq!(repo.manifest().revision, Some(7));

    // the capability probe is cached
    assert!(repo.has_rest_api().unwrap());
    assert!(repo.has_rest_api().unwrap());
    assert_eq!(stratum.info_probes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stratum0_reported_by_rest_api() {
    let mut stratum = FakeStratum::with_manifest();
    stratum.rest(
        Method::GET,
        "info",
        StatusCode::OK,
        r#"{"type":"stratum0","version":"2.11.0"}"#,
    );
    stratum.file(".cvmfs_last_snapshot", "2020-01-01T00:00:00Z\n");

    let (_stratum, repo) = open(stratum);
    let repo = repo.unwrap();
    assert_eq!(repo.repository_type(), RepositoryType::Stratum0);
}

#[test]
fn test_no_rest_api_marker_infers_stratum1() {
    let mut stratum = FakeStratum::with_manifest();
    stratum.file(".cvmfs_last_snapshot", "Wed Jan  1 00:00:00 UTC 2020\n");

    let (_stratum, repo) = open(stratum);
    let repo = repo.unwrap();
    assert!(!repo.has_rest_api().unwrap());
    assert_eq!(repo.repository_type(), RepositoryType::Stratum1);
    assert_eq!(repo.version(), "unknown");
    assert!(repo.has_been_replicated());
}

#[test]
fn test_rest_reported_unknown_is_overridden_by_marker() {
    let mut stratum = FakeStratum::with_manifest();
    stratum.rest(
        Method::GET,
        "info",
        StatusCode::OK,
        r#"{"type":"unknown","version":"2.1"}"#,
    );
    stratum.file(".cvmfs_last_snapshot", "2020-01-01T00:00:00Z\n");

    let (_stratum, repo) = open(stratum);
    assert_eq!(repo.unwrap().repository_type(), RepositoryType::Stratum1);
}

#[test]
fn test_no_rest_api_no_marker() {
    let (_stratum, repo) = open(FakeStratum::with_manifest());
    let repo = repo.unwrap();
    assert_eq!(repo.repository_type(), RepositoryType::Unknown);
    assert_eq!(repo.version(), "unknown");
    assert_eq!(repo.last_replication().timestamp(), 0);
    assert!(!repo.has_been_replicated());
}

#[test]
fn test_missing_manifest_is_not_found() {
    let mut stratum = FakeStratum::default();
    stratum.file(".cvmfs_last_snapshot", "2020-01-01T00:00:00Z\n");

    let (_stratum, repo) = open(stratum);
    match repo.unwrap_err() {
        RepositoryError::RepositoryNotFound { location } => {
            assert!(location.ends_with(REPO_PATH))
        }
        e => panic!("unexpected error: {}", e),
    }
}

#[test]
fn test_replicating_marker() {
    let mut stratum = FakeStratum::with_manifest();
    stratum.file(".cvmfs_last_snapshot", "2020-01-01T00:00:00Z\n");
    stratum.file(".cvmfs_is_snapshotting", "2020-01-02T03:04:05Z\n");

    let (_stratum, repo) = open(stratum);
    let repo = repo.unwrap();
    assert!(repo.replicating());
    assert_eq!(
        repo.replicating_since(),
        Some(Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap())
    );
}

#[test]
fn test_start_replication_ok() {
    let mut stratum = FakeStratum::with_manifest();
    stratum.rest(Method::GET, "info", StatusCode::OK, r#"{"type":"stratum1","version":"2.1"}"#);
    stratum.rest(Method::POST, "replicate", StatusCode::OK, r#"{"result":"ok"}"#);

    let (stratum, repo) = open(stratum);
    repo.unwrap().start_replication().unwrap();
    assert_eq!(stratum.replicate_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_start_replication_refused() {
    let mut stratum = FakeStratum::with_manifest();
    stratum.rest(Method::GET, "info", StatusCode::OK, r#"{"type":"stratum1","version":"2.1"}"#);
    stratum.rest(Method::POST, "replicate", StatusCode::OK, r#"{"result":"fail"}"#);

    let (_stratum, repo) = open(stratum);
    let repo = repo.unwrap();
    let before = format!("{:?}", repo);

    match repo.start_replication().unwrap_err() {
        RepositoryError::CannotReplicate { repository } => assert_eq!(repository, repo.url()),
        e => panic!("unexpected error: {}", e),
    }
    assert_eq!(format!("{:?}", repo), before);
    assert_eq!(repo.repository_type(), RepositoryType::Stratum1);
    assert!(!repo.replicating());
}

#[test]
fn test_start_replication_http_error() {
    let mut stratum = FakeStratum::with_manifest();
    stratum.rest(
        Method::POST,
        "replicate",
        StatusCode::INTERNAL_SERVER_ERROR,
        "boom",
    );

    let (_stratum, repo) = open(stratum);
    assert!(matches!(
        repo.unwrap().start_replication(),
        Err(RepositoryError::Http(_))
    ));
}

#[test]
fn test_retrieve_file() {
    let mut stratum = FakeStratum::with_manifest();
    stratum.file(".cvmfswhitelist", "20200101000000\nE20300101000000\n");

    let (_stratum, repo) = open(stratum);
    let repo = repo.unwrap();

    let mut content = String::new();
    repo.retrieve_file(".cvmfswhitelist")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "20200101000000\nE20300101000000\n");

    match repo.retrieve_file("data/missing").unwrap_err() {
        RepositoryError::FileNotFoundInRepository { file_name, .. } => {
            assert!(file_name.ends_with("/cvmfs/example.org/data/missing"))
        }
        e => panic!("unexpected error: {}", e),
    }
}

#[test]
fn test_display_and_debug() {
    let stratum = Arc::new(FakeStratum::with_manifest());
    let addr = spawn_test_server(stratum);
    let url = format!("{}/", repo_url(addr));

    let repo = RemoteRepository::open(&url, &CvmfsConfig::default()).unwrap();
    assert_eq!(repo.to_string(), repo_url(addr));
    assert_eq!(
        format!("{:?}", repo),
        format!("<Remote Repository example.org at {}>", repo_url(addr))
    );
}
