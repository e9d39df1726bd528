//! Local stand-ins for the `OpenAI` and Pinecone HTTP endpoints.
//!
//! A [`StubServer`] runs an `axum` router on its own thread and runtime, so
//! async client tests and blocking binary tests can share it. Each request is
//! recorded before the canned [`Reply`] for its path is sent.

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use sre_core::IgnoreLock as _;
use std::collections::HashMap;
use std::future::pending;
use std::net::TcpListener as StdListener;
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::net::TcpListener;
use tokio::runtime::Builder;
use tokio::sync::oneshot;
use tracing::{debug, error};

/// Chat reply served by [`provider_routes`].
pub const REPLY: &str = "Check the ingress controller logs for TLS errors.";

/// What the server sends back for a path.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Respond with a status and a JSON body
    Json {
        /// Response status
        status: StatusCode,
        /// Response body, sent as `application/json`
        body: String,
    },
    /// Accept the request and never respond
    Hang,
}

impl Reply {
    /// JSON reply with the given status code.
    ///
    /// # Panics
    /// Panics if `status` is not a valid HTTP status code
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        let status = StatusCode::from_u16(status)
            .unwrap_or_else(|err| panic!("invalid status {status}: {err}"));
        Self::Json {
            status,
            body: body.into(),
        }
    }

    /// `200 OK` with `value` as the body.
    pub fn ok(value: &Value) -> Self {
        Self::Json {
            status: StatusCode::OK,
            body: value.to_string(),
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Self::Json { status, body } => {
                (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
            }
            Self::Hang => StatusCode::GATEWAY_TIMEOUT.into_response(),
        }
    }
}

/// Replies keyed by request path, with a fallback for everything else.
#[derive(Debug, Clone)]
pub struct Routes {
    /// Exact-path replies
    by_path: HashMap<String, Reply>,
    /// Reply for unrouted paths
    fallback: Reply,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            by_path: HashMap::new(),
            fallback: Reply::json(404, json!({"error": "no route"}).to_string()),
        }
    }
}

impl Routes {
    /// Serves `reply` for requests to exactly `path`.
    #[must_use]
    pub fn route(mut self, path: impl Into<String>, reply: Reply) -> Self {
        self.by_path.insert(path.into(), reply);
        self
    }

    /// Serves `reply` for every path without its own route.
    #[must_use]
    pub fn fallback(mut self, reply: Reply) -> Self {
        self.fallback = reply;
        self
    }

    fn reply_for(&self, path: &str) -> &Reply {
        self.by_path.get(path).unwrap_or(&self.fallback)
    }
}

/// Healthy `OpenAI` and Pinecone endpoints sharing one base URL.
///
/// Embeddings have `dimension` components, the index returns one match and
/// the chat model answers [`REPLY`]. `OpenAI` routes live under `/v1`.
pub fn provider_routes(dimension: usize) -> Routes {
    Routes::default()
        .route(
            "/v1/embeddings",
            Reply::ok(&json!({"data": [{"index": 0, "embedding": vec![0.25; dimension]}]})),
        )
        .route(
            "/query",
            Reply::ok(&json!({
                "matches": [{
                    "id": "inc-2048",
                    "score": 0.88,
                    "metadata": {"content": "Ingress 502s after cert rotation."}
                }]
            })),
        )
        .route(
            "/v1/chat/completions",
            Reply::ok(&json!({
                "choices": [{"index": 0, "message": {"role": "assistant", "content": REPLY}}]
            })),
        )
}

/// A request received by [`StubServer`].
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    /// HTTP method
    pub method: Method,
    /// Request target
    pub uri: Uri,
    /// Request headers
    pub headers: HeaderMap,
    /// Raw request body
    pub body: String,
}

impl CapturedRequest {
    /// Request path, e.g. `/v1/embeddings`.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Value of header `name`, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Body parsed as JSON.
    ///
    /// # Panics
    /// Panics if the body is not valid JSON
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body)
            .unwrap_or_else(|err| panic!("request body is not JSON ({err}): {}", self.body))
    }
}

/// Shared between the handler and the owning [`StubServer`].
#[derive(Clone)]
struct StubState {
    /// Canned replies
    routes: Arc<Routes>,
    /// Requests received so far
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

/// HTTP server on an ephemeral local port.
///
/// Dropping the server stops accepting connections.
pub struct StubServer {
    /// Base URL, e.g. `http://127.0.0.1:40123`
    pub base_url: String,
    /// Requests received so far
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    /// Stops the accept loop when sent or dropped
    shutdown: Option<oneshot::Sender<()>>,
}

impl StubServer {
    /// Starts a server answering every request with `status` and `body`.
    ///
    /// # Panics
    /// Panics if no local port can be bound
    pub fn respond(status: u16, body: impl Into<String>) -> Self {
        Self::start(Routes::default().fallback(Reply::json(status, body)))
    }

    /// Starts a server that accepts every request and never responds.
    ///
    /// # Panics
    /// Panics if no local port can be bound
    pub fn hang() -> Self {
        Self::start(Routes::default().fallback(Reply::Hang))
    }

    /// Starts a server answering from `routes`.
    ///
    /// # Panics
    /// Panics if no local port can be bound
    pub fn start(routes: Routes) -> Self {
        let listener = StdListener::bind("127.0.0.1:0")
            .unwrap_or_else(|err| panic!("bind failed: {err}"));
        listener
            .set_nonblocking(true)
            .unwrap_or_else(|err| panic!("nonblocking listener: {err}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|err| panic!("no local addr: {err}"));

        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            routes: Arc::new(routes),
            requests: Arc::clone(&requests),
        };
        let (shutdown, signal) = oneshot::channel();
        thread::spawn(move || serve(listener, state, signal));

        Self {
            base_url: format!("http://{addr}"),
            requests,
            shutdown: Some(shutdown),
        }
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.with_lock(|requests| requests.clone())
    }

    /// Requests received for `path`.
    pub fn requests_to(&self, path: &str) -> Vec<CapturedRequest> {
        self.requests.with_lock(|requests| {
            requests
                .iter()
                .filter(|request| request.path() == path)
                .cloned()
                .collect()
        })
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take()
            && shutdown.send(()).is_err()
        {
            debug!("stub server at {} already stopped", self.base_url);
        }
    }
}

/// A base URL nothing listens on.
///
/// # Panics
/// Panics if no local port can be bound
pub fn closed_url() -> String {
    let addr = StdListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .unwrap_or_else(|err| panic!("bind failed: {err}"));
    format!("http://{addr}")
}

/// Runs the router until `signal` fires or its sender is dropped.
fn serve(listener: StdListener, state: StubState, signal: oneshot::Receiver<()>) {
    let runtime = match Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("stub server runtime failed to start: {err}");
            return;
        }
    };

    runtime.block_on(async move {
        let listener = match TcpListener::from_std(listener) {
            Ok(listener) => listener,
            Err(err) => {
                error!("stub server listener unusable: {err}");
                return;
            }
        };
        let app = Router::new().fallback(handle).with_state(state);
        let stopped = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _stop = signal.await;
            })
            .await;
        if let Err(err) = stopped {
            error!("stub server stopped: {err}");
        }
    });
}

async fn handle(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let reply = state.routes.reply_for(uri.path()).clone();
    state.requests.with_lock(|requests| {
        requests.push(CapturedRequest {
            method,
            uri,
            headers,
            body,
        });
    });

    if matches!(reply, Reply::Hang) {
        pending::<()>().await;
    }
    reply.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrouted_path_uses_fallback() {
        let routes = Routes::default().route("/query", Reply::Hang);
        assert!(matches!(routes.reply_for("/query"), Reply::Hang));
        assert!(matches!(
            routes.reply_for("/elsewhere"),
            Reply::Json { status, .. } if *status == StatusCode::NOT_FOUND
        ));
    }

    #[test]
    fn test_provider_routes_cover_every_endpoint() {
        let routes = provider_routes(3);
        for path in ["/v1/embeddings", "/query", "/v1/chat/completions"] {
            assert!(
                matches!(routes.reply_for(path), Reply::Json { status, .. } if *status == StatusCode::OK),
                "missing route {path}"
            );
        }
    }
}
