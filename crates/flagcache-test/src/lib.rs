//! Helpers for testing the feature client against a live HTTP endpoint.
//!
//! When writing tests, keep the following points in mind:
//!
//!  - In every test, call [`setup`]. This will set up the logger so that all
//!    console output is captured by the test runner.
//!
//!  - When using [`FeatureServer`], make sure that the server is held until
//!    all requests to it have been made. If the server is dropped, the port
//!    is closed and connections to it will fail. To avoid this, assign it to
//!    a variable in the test function: `let server = FeatureServer::new();`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::fmt;
use url::Url;

/// Setup the test environment.
///
///  - Initializes logs: The logger only captures logs from the `flagcache`
///    crate and mutes all others.
pub fn setup() {
    fmt()
        .with_env_filter(EnvFilter::new("flagcache=trace"))
        .with_target(false)
        .pretty()
        .with_test_writer()
        .try_init()
        .ok();
}

/// How the mock server answers feature requests.
enum ResponseMode {
    /// A well-formed feature envelope wrapping the given definitions.
    Features(serde_json::Value),
    /// A bare status code with an empty body.
    Status(StatusCode),
    /// A raw body, useful for serving deliberately malformed payloads.
    Raw(String),
}

struct ServerState {
    mode: Mutex<ResponseMode>,
    hits: AtomicUsize,
}

/// A mock feature delivery API bound to a random local port.
///
/// This server requires a `tokio` runtime and is supposed to be run in a
/// `tokio::test`. It automatically stops serving when dropped.
pub struct FeatureServer {
    handle: tokio::task::JoinHandle<()>,
    socket: SocketAddr,
    state: Arc<ServerState>,
}

impl FeatureServer {
    /// Spawns a server answering `GET /api/features/{client_key}` with an
    /// empty feature envelope until told otherwise.
    pub fn new() -> Self {
        let state = Arc::new(ServerState {
            mode: Mutex::new(ResponseMode::Features(serde_json::json!({}))),
            hits: AtomicUsize::new(0),
        });

        let router = Router::new()
            .route("/api/features/:key", get(features))
            .with_state(Arc::clone(&state));

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let socket = listener.local_addr().unwrap();
        let listener = tokio::net::TcpListener::from_std(listener).unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            handle,
            socket,
            state,
        }
    }

    /// The base URL of the API, for use as an `api_host`.
    pub fn api_host(&self) -> Url {
        format!("http://127.0.0.1:{}/", self.socket.port())
            .parse()
            .unwrap()
    }

    /// Number of feature requests served so far.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::Relaxed)
    }

    /// Serves `features` as the `features` field of the response envelope.
    pub fn set_features(&self, features: serde_json::Value) {
        *self.state.mode.lock().unwrap() = ResponseMode::Features(features);
    }

    /// Answers every request with `status` and an empty body.
    pub fn respond_with_status(&self, status: u16) {
        let status = StatusCode::from_u16(status).unwrap();
        *self.state.mode.lock().unwrap() = ResponseMode::Status(status);
    }

    /// Answers every request with a raw body instead of a feature envelope.
    pub fn respond_raw(&self, body: impl Into<String>) {
        *self.state.mode.lock().unwrap() = ResponseMode::Raw(body.into());
    }
}

impl Default for FeatureServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FeatureServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn features(State(state): State<Arc<ServerState>>, Path(_key): Path<String>) -> Response {
    state.hits.fetch_add(1, Ordering::Relaxed);

    match &*state.mode.lock().unwrap() {
        ResponseMode::Features(features) => {
            axum::Json(serde_json::json!({ "features": features })).into_response()
        }
        ResponseMode::Status(status) => (*status).into_response(),
        ResponseMode::Raw(body) => body.clone().into_response(),
    }
}
