//! Integration tests for the parish portal client.
//!
//! Each test starts a [`TestBackend`], an in-process axum server that
//! stands in for the parish REST API, and drives the real client against it
//! over HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p parish-integration-tests
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use parish_client::{ApiClient, ClientConfig, MemoryStorage, Storage};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// A stub backend serving a router under `/api`.
pub struct TestBackend {
    addr: SocketAddr,
    server: JoinHandle<()>,
}

impl TestBackend {
    /// Bind an ephemeral port and serve `routes` under `/api`.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start(routes: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("failed to bind stub backend: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("stub backend has no address: {e}"));
        let app = Router::new().nest("/api", routes);
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { addr, server }
    }

    /// The API root, ending in `/`.
    ///
    /// # Panics
    ///
    /// Never in practice; the address always forms a valid URL.
    #[must_use]
    pub fn api_url(&self) -> Url {
        Url::parse(&format!("http://{}/api/", self.addr))
            .unwrap_or_else(|e| panic!("invalid stub URL: {e}"))
    }

    /// Configuration pointing at this backend.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::for_api_url(self.api_url())
    }

    /// A client over fresh in-memory storage.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn client(&self) -> (ApiClient, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let shared: Arc<dyn Storage> = storage.clone();
        let api = ApiClient::new(&self.config(), shared)
            .unwrap_or_else(|e| panic!("failed to build client: {e}"));
        (api, storage)
    }
}

impl Drop for TestBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Shared request counter for stub handlers.
#[derive(Debug, Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one hit and return the count before it.
    pub fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
