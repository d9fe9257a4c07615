//! In-process stand-ins for the auth, registry and relay services.
//!
//! All three are served from one axum router on an ephemeral port, so a
//! single base URL can be used for every service.

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use probe_core::{ApiConfig, WELCOME_MESSAGE};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::TcpListener as StdTcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::runtime::Builder;
use tokio::sync::oneshot;

/// Token the stub auth service issues for `admin/admin`.
pub const ISSUED_TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.stub-payload.stub-signature";

/// What the relay does after accepting a connection with a valid token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayMode {
    /// Sends the welcome text frame.
    #[default]
    Welcome,
    /// Sends nothing.
    Silent,
    /// Sends a close frame right away.
    CloseImmediately,
    /// Sends a binary frame first.
    Binary,
}

/// How the relay treats a connection with an empty token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnonymousPolicy {
    /// Answers the upgrade with 401.
    #[default]
    Refuse,
    /// Upgrades, then closes at once.
    AcceptThenClose,
    /// Upgrades and greets like an authenticated peer.
    AcceptAndGreet,
}

/// How the relay answers the client's close frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseStyle {
    /// Drops the socket without a close reply.
    #[default]
    Drop,
    /// Sends the close reply, then drops the socket.
    Echo,
}

/// Behavior switches for the stub services.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubOptions {
    pub relay_mode: RelayMode,
    pub anonymous: AnonymousPolicy,
    pub close_style: CloseStyle,
    /// Every login answers 401.
    pub reject_all_logins: bool,
    /// Register answers 200 with a body that is not JSON.
    pub malformed_register: bool,
}

/// One request seen by the stub.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub bearer: Option<String>,
    pub body: String,
}

#[derive(Clone)]
struct StubState {
    options: StubOptions,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Handle for the running stub; dropping it shuts the server down.
pub struct ServiceStub {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<thread::JoinHandle<()>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ServiceStub {
    /// Starts the stub with default behavior.
    pub fn spawn() -> Result<Self> {
        Self::spawn_with(StubOptions::default())
    }

    /// Starts the stub on its own runtime thread.
    pub fn spawn_with(options: StubOptions) -> Result<Self> {
        let listener = StdTcpListener::bind("127.0.0.1:0").context("stub bind failed")?;
        listener
            .set_nonblocking(true)
            .context("stub listener nonblocking failed")?;
        let addr = listener.local_addr().context("stub local addr failed")?;

        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            options,
            requests: Arc::clone(&requests),
        };
        let app = router(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let join = thread::spawn(move || {
            let Ok(runtime) = Builder::new_current_thread().enable_all().build() else {
                return;
            };
            runtime.block_on(async move {
                let Ok(listener) = tokio::net::TcpListener::from_std(listener) else {
                    return;
                };
                let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                });
                let _ = server.await;
            });
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            shutdown: Some(shutdown_tx),
            join: Some(join),
            requests,
        })
    }

    /// Base URL serving all three services.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map_or_else(|_| Vec::new(), |entries| entries.clone())
    }

    /// Requests whose path ends with `suffix`.
    pub fn requests_to(&self, suffix: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.ends_with(suffix))
            .collect()
    }
}

impl Drop for ServiceStub {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Base URL on which nothing listens.
pub fn unreachable_url() -> String {
    let addr = StdTcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "127.0.0.1:9".to_string());
    format!("http://{addr}")
}

fn router(state: StubState) -> Router {
    let api = ApiConfig::default();
    let auth = format!("/api/{}/auth", api.auth_version);
    let registry = format!("/api/{}/registry", api.registry_version);

    Router::new()
        .route(&format!("{auth}/login"), post(login))
        .route(&format!("{registry}/register"), post(register))
        .route(&format!("{registry}/heartbeat"), post(heartbeat))
        .route(&format!("{registry}/allocate"), post(allocate))
        .route(&format!("{registry}/disconnect"), post(disconnect))
        .route("/ws", get(relay))
        .with_state(state)
}

fn record(state: &StubState, uri: &Uri, headers: &HeaderMap, body: &Bytes) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(ToString::to_string);
    if let Ok(mut entries) = state.requests.lock() {
        entries.push(RecordedRequest {
            path: uri.path().to_string(),
            bearer: bearer.clone(),
            body: String::from_utf8_lossy(body).into_owned(),
        });
    }
    bearer
}

fn json_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
}

async fn login(
    State(state): State<StubState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(&state, &uri, &headers, &body);
    let request = json_body(&body);
    let valid = request["username"] == "admin" && request["password"] == "admin";
    if !valid || state.options.reject_all_logins {
        return unauthorized("invalid credentials");
    }
    Json(json!({ "token": ISSUED_TOKEN, "refreshToken": "stub-refresh" })).into_response()
}

async fn register(
    State(state): State<StubState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(&state, &uri, &headers, &body);
    if state.options.malformed_register {
        return (StatusCode::OK, "<html>registered</html>").into_response();
    }
    let request = json_body(&body);
    Json(json!({
        "message": "Server registered",
        "serverId": request["serverId"],
        "heartbeatInterval": 30,
    }))
    .into_response()
}

async fn heartbeat(
    State(state): State<StubState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(&state, &uri, &headers, &body);
    Json(json!({ "message": "Heartbeat received" })).into_response()
}

async fn allocate(
    State(state): State<StubState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let bearer = record(&state, &uri, &headers, &body);
    if bearer.as_deref() != Some(ISSUED_TOKEN) {
        return unauthorized("missing or invalid token");
    }
    Json(json!({
        "serverId": "test-server-1",
        "host": "game",
        "port": 7777,
        "message": "Server allocated",
    }))
    .into_response()
}

async fn disconnect(
    State(state): State<StubState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if record(&state, &uri, &headers, &body).is_none() {
        return unauthorized("missing token");
    }
    Json(json!({ "message": "Disconnected" })).into_response()
}

#[derive(Debug, Deserialize)]
struct RelayParams {
    #[serde(default)]
    token: String,
}

async fn relay(
    State(state): State<StubState>,
    Query(params): Query<RelayParams>,
    uri: Uri,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    record(&state, &uri, &headers, &Bytes::new());

    let close_style = state.options.close_style;
    if params.token.is_empty() {
        let mode = match state.options.anonymous {
            AnonymousPolicy::Refuse => return unauthorized("missing token"),
            AnonymousPolicy::AcceptThenClose => RelayMode::CloseImmediately,
            AnonymousPolicy::AcceptAndGreet => RelayMode::Welcome,
        };
        return ws.on_upgrade(move |socket| serve_relay(socket, mode, close_style));
    }
    if params.token != ISSUED_TOKEN {
        return unauthorized("invalid token");
    }

    let mode = state.options.relay_mode;
    ws.on_upgrade(move |socket| serve_relay(socket, mode, close_style))
}

async fn serve_relay(mut socket: WebSocket, mode: RelayMode, close_style: CloseStyle) {
    let first = match mode {
        RelayMode::Welcome => Some(Message::Text(WELCOME_MESSAGE.to_string())),
        RelayMode::Silent => None,
        RelayMode::CloseImmediately => Some(Message::Close(Some(CloseFrame {
            code: 1008,
            reason: "unauthorized".into(),
        }))),
        RelayMode::Binary => Some(Message::Binary(vec![0xde, 0xad, 0xbe, 0xef])),
    };
    if let Some(message) = first {
        if socket.send(message).await.is_err() {
            return;
        }
    }

    // Hold the connection until the client closes it.
    while let Some(Ok(message)) = socket.recv().await {
        if matches!(message, Message::Close(_)) {
            if close_style == CloseStyle::Echo {
                // Flushes the queued close reply.
                let _ = socket.close().await;
            }
            return;
        }
    }
}
