//! Exposes an in-process fake storefront for use in integration tests.
//!
//! ```
//! use hatload_test::server::TestServer;
//!
//! #[tokio::main]
//! async fn main() {
//!    let server = TestServer::new().await;
//!    let url = server.url("/list");
//!    // send requests to the URL, then inspect `server.requests()`...
//! }
//! ```

use std::collections::BTreeSet;
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};

use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde::{Deserialize, Serialize};

/// Hats known to the storefront unless configured otherwise.
const DEFAULT_STYLES: &[&str] = &[
    "baby",
    "bucket",
    "beach",
    "spinner",
    "cartoon",
    "skull",
    "blob",
    "santa",
    "st-patricks",
    "graduation",
    "pirate",
    "pokemon",
    "clown",
    "spy",
    "mario",
    "tophat",
    "pilot",
    "construction",
    "turkey",
    "shark",
    "alien",
    "penguin",
    "tinyhat",
    "cat-ears",
    "spicy",
    "food",
];

#[derive(Clone, Debug)]
struct StoreState {
    styles: Arc<BTreeSet<String>>,
    requests: Arc<Mutex<Vec<String>>>,
}

#[derive(Debug, Serialize)]
struct Hat {
    style: String,
}

#[derive(Debug, Deserialize)]
struct HatParams {
    style: Option<String>,
}

/// An in-process storefront for use in integration tests.
///
/// Serves `/`, `/list` and `/hatme` like the real storefront and records the path and query of
/// every request it receives. Styles are matched case-insensitively. Unknown styles are answered
/// with `400 Bad Request`. It listens on a random available port on localhost.
#[derive(Debug)]
pub struct TestServer {
    handle: tokio::task::JoinHandle<()>,
    socket: SocketAddr,
    state: StoreState,
}

impl TestServer {
    /// Starts a storefront that knows every built-in hat style.
    pub async fn new() -> Self {
        Self::with_styles(DEFAULT_STYLES).await
    }

    /// Starts a storefront that only knows the given styles.
    pub async fn with_styles(styles: &[&str]) -> Self {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = TcpListener::bind(addr).unwrap();
        listener.set_nonblocking(true).unwrap();
        let socket = listener.local_addr().unwrap();

        let state = StoreState {
            styles: Arc::new(styles.iter().map(|s| s.to_lowercase()).collect()),
            requests: Default::default(),
        };

        let app = Router::new()
            .route("/", routing::get(index))
            .route("/list", routing::get(list))
            .route("/hatme", routing::get(hatme))
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            handle,
            socket,
            state,
        }
    }

    /// Returns the base URL of the server, without a trailing slash.
    ///
    /// This URL uses `localhost` as hostname.
    pub fn host(&self) -> String {
        format!("http://localhost:{}", self.socket.port())
    }

    /// Returns a full URL pointing to the given path.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.host(), path)
    }

    /// Path and query of every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn record(State(state): State<StoreState>, request: Request, next: Next) -> Response {
    let uri = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    tracing::trace!(uri = %uri, "request received");
    state.requests.lock().unwrap().push(uri);

    next.run(request).await
}

async fn index() -> impl IntoResponse {
    "Welcome to the hat storefront"
}

async fn list(State(state): State<StoreState>) -> impl IntoResponse {
    let hats: Vec<_> = state
        .styles
        .iter()
        .map(|style| Hat {
            style: style.clone(),
        })
        .collect();
    Json(hats)
}

async fn hatme(State(state): State<StoreState>, Query(params): Query<HatParams>) -> Response {
    let style = match params.style {
        Some(style) => style.to_lowercase(),
        None => match state.styles.iter().next() {
            Some(style) => style.clone(),
            None => return (StatusCode::NOT_FOUND, "No hats available").into_response(),
        },
    };

    if !state.styles.contains(&style) {
        tracing::debug!(style = %style, "invalid hat style");
        return (StatusCode::BAD_REQUEST, "Invalid hat style").into_response();
    }

    format!("Here is your {style} hat").into_response()
}
