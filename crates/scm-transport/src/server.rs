//! SSE transport server using Axum.
//!
//! `GET /mcp` opens a push stream and announces a per-session intake
//! address. `POST /mcp/message?sessionId=…` accepts one exchange for that
//! session and delivers the response on the stream. `POST /mcp` without a
//! session answers synchronously.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{
        IntoResponse, Json, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures_util::stream::{self, Stream, StreamExt};
use scm_protocol::{
    AuthConfig, Events, ExchangeError, ExchangeResponse, Headers, RequestContext, RequestId,
};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::auth::ApiKeyAuthenticator;
use crate::negotiate::Negotiator;
use crate::session::{SessionGuard, SessionStore};

/// Stream-open and synchronous exchange path.
pub const MCP_PATH: &str = "/mcp";
/// Per-session intake path announced in the `endpoint` event.
pub const MESSAGE_PATH: &str = "/mcp/message";

/// Trait implemented by the dispatcher. The transport calls this once for
/// every intake message that passed negotiation.
pub trait RequestHandler: Send + Sync + 'static {
    /// Turn one raw intake message into exactly one response.
    fn handle_exchange(
        &self,
        ctx: RequestContext,
        raw: Bytes,
    ) -> impl std::future::Future<Output = ExchangeResponse> + Send;
}

/// Transport server configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Hostname to bind to
    pub host: String,
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// API keys; `None` disables authentication
    pub auth: Option<AuthConfig>,
    /// Maximum concurrently open streams
    pub max_sessions: Option<usize>,
    /// Sessions without traffic for this long are closed (zero disables)
    pub idle_timeout: Duration,
    /// Interval between SSE keep-alive comments
    pub keep_alive: Duration,
    /// Per-session outbound buffer
    pub channel_capacity: usize,
    /// Largest accepted request body
    pub max_body_bytes: usize,
    /// Enable permissive CORS
    pub enable_cors: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            auth: None,
            max_sessions: Some(1024),
            idle_timeout: Duration::from_secs(30 * 60),
            keep_alive: Duration::from_secs(15),
            channel_capacity: 64,
            max_body_bytes: 16 * 1024 * 1024,
            enable_cors: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// Readiness flag plus the session store; shared by the routes and the
/// owning [`TransportServer`].
#[derive(Clone)]
pub struct Lifecycle {
    sessions: SessionStore,
    draining: Arc<AtomicBool>,
}

impl Lifecycle {
    fn new(channel_capacity: usize) -> Self {
        Self {
            sessions: SessionStore::new(channel_capacity),
            draining: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Flip readiness and close every open stream.
    pub fn begin_drain(&self) -> usize {
        self.draining.store(true, Ordering::SeqCst);
        self.sessions.close_all()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }
}

/// Shared state behind every route.
pub struct TransportState<H: RequestHandler> {
    handler: Arc<H>,
    config: TransportConfig,
    negotiator: Negotiator,
    lifecycle: Lifecycle,
}

impl<H: RequestHandler> TransportState<H> {
    pub fn new(config: TransportConfig, handler: Arc<H>) -> Arc<Self> {
        let authenticator = config.auth.as_ref().map(ApiKeyAuthenticator::new);
        Arc::new(Self {
            handler,
            negotiator: Negotiator::new(&config.host, authenticator),
            lifecycle: Lifecycle::new(config.channel_capacity),
            config,
        })
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

/// Build the router. Exposed separately from [`TransportServer`] so tests
/// can drive it in-process.
pub fn router<H: RequestHandler>(state: Arc<TransportState<H>>) -> Router {
    let app = Router::new()
        .route(MCP_PATH, get(stream_handler::<H>).post(sync_handler::<H>))
        .route(MESSAGE_PATH, post(intake_handler::<H>))
        .route("/health", get(health_handler::<H>))
        .route("/ready", get(ready_handler::<H>))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes));

    let app = if state.config.enable_cors {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers([header::HeaderName::from_static(Headers::SESSION_ID)]),
        )
    } else {
        app
    };

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// The transport server. Owns the listener task and the session reaper.
pub struct TransportServer {
    lifecycle: Lifecycle,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    reaper: Option<JoinHandle<()>>,
    port: u16,
}

impl TransportServer {
    /// Start the transport server with the given request handler.
    pub async fn start<H: RequestHandler>(
        config: TransportConfig,
        handler: H,
    ) -> Result<Self, TransportError> {
        Self::start_with_handler(config, Arc::new(handler)).await
    }

    /// Start with a shared handler.
    pub async fn start_with_handler<H: RequestHandler>(
        config: TransportConfig,
        handler: Arc<H>,
    ) -> Result<Self, TransportError> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|source| TransportError::Bind {
                addr: format!("{}:{}", config.host, config.port),
                source,
            })?;
        let actual_port = listener
            .local_addr()
            .map_err(TransportError::LocalAddr)?
            .port();

        let state = TransportState::new(config.clone(), handler);
        let lifecycle = state.lifecycle().clone();
        let reaper = lifecycle.sessions().spawn_reaper(config.idle_timeout);
        let app = router(state);

        info!(
            "Transport listening on http://{}:{}{MCP_PATH} (auth {})",
            config.host,
            actual_port,
            if config.auth.is_some() { "enabled" } else { "disabled" }
        );

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
            {
                error!("Transport server error: {e}");
            }
        });

        Ok(Self {
            lifecycle,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            reaper,
            port: actual_port,
        })
    }

    /// Get the actual bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn session_count(&self) -> usize {
        self.lifecycle.sessions().len()
    }

    /// Gracefully stop the server. Open streams are closed first so the
    /// graceful shutdown does not wait on them.
    pub async fn stop(&mut self) {
        let closed = self.lifecycle.begin_drain();
        if closed > 0 {
            info!("Closed {closed} open session(s)");
        }
        if let Some(reaper) = self.reaper.take() {
            reaper.abort();
        }
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("Transport server stopped");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn stream_handler<H: RequestHandler>(
    State(state): State<Arc<TransportState<H>>>,
    headers: HeaderMap,
) -> Response {
    let negotiated = match state.negotiator.negotiate(&headers) {
        Ok(n) => n,
        Err(e) => return e.into_response(),
    };

    if state.lifecycle.is_draining() {
        return (StatusCode::SERVICE_UNAVAILABLE, "server is shutting down").into_response();
    }
    let sessions = &state.lifecycle.sessions;
    let opened = match state.config.max_sessions {
        Some(max) => sessions.try_open(negotiated.protocol_version, negotiated.client_session_id, max),
        None => Some(sessions.open(negotiated.protocol_version, negotiated.client_session_id)),
    };
    let Some((session, rx)) = opened else {
        warn!(
            "Stream rejected: max sessions reached ({})",
            state.config.max_sessions.unwrap_or_default()
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "too many sessions").into_response();
    };
    let guard = sessions.guard(&session.id);
    info!(
        session = %session.id,
        version = session.protocol_version,
        "Stream opened (total: {})",
        sessions.len()
    );

    let endpoint = Event::default()
        .event(Events::ENDPOINT)
        .data(format!("{MESSAGE_PATH}?sessionId={}", session.id));

    let body = stream::once(async move { Ok::<_, Infallible>(endpoint) })
        .chain(session_events(rx, guard));

    (
        [(Headers::SESSION_ID, session.id)],
        Sse::new(body).keep_alive(KeepAlive::new().interval(state.config.keep_alive)),
    )
        .into_response()
}

/// Pump a session's channel onto the wire. The guard travels with the
/// stream, so dropping the stream removes the session.
fn session_events(
    rx: mpsc::Receiver<String>,
    guard: SessionGuard,
) -> impl Stream<Item = Result<Event, Infallible>> + Send {
    stream::unfold((rx, guard), |(mut rx, guard)| async move {
        match rx.recv().await {
            Some(message) => {
                let event = Event::default().event(Events::MESSAGE).data(message);
                Some((Ok(event), (rx, guard)))
            }
            None => {
                debug!(session = %guard.id(), "Stream closed by server");
                None
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct IntakeQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

async fn intake_handler<H: RequestHandler>(
    State(state): State<Arc<TransportState<H>>>,
    Query(query): Query<IntakeQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let negotiated = match state.negotiator.negotiate(&headers) {
        Ok(n) => n,
        Err(e) => return e.into_response(),
    };

    let Some(session_id) = query.session_id.filter(|s| !s.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "missing sessionId").into_response();
    };
    let Some(session) = state.lifecycle.sessions.get(&session_id) else {
        debug!(session = %session_id, "Intake for unknown session");
        return (StatusCode::NOT_FOUND, "session not found").into_response();
    };
    state.lifecycle.sessions.touch(&session_id);

    let version_declared = negotiated.version_declared;
    let mut ctx = negotiated.into_context(Some(session_id.clone()));
    if !version_declared {
        ctx.protocol_version = session.protocol_version;
    }

    let handler = state.handler.clone();
    let sessions = state.lifecycle.sessions.clone();
    tokio::spawn(async move {
        let response = dispatch_guarded(handler, ctx, body).await;
        if !sessions.deliver(&session_id, response.to_json()).await {
            debug!(
                session = %session_id,
                id = ?response.id(),
                "Response discarded, session closed"
            );
        }
    });

    StatusCode::ACCEPTED.into_response()
}

async fn sync_handler<H: RequestHandler>(
    State(state): State<Arc<TransportState<H>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let negotiated = match state.negotiator.negotiate(&headers) {
        Ok(n) => n,
        Err(e) => return e.into_response(),
    };

    let response = dispatch_guarded(state.handler.clone(), negotiated.into_context(None), body).await;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        response.to_json(),
    )
        .into_response()
}

async fn health_handler<H: RequestHandler>(
    State(state): State<Arc<TransportState<H>>>,
) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "sessions": state.lifecycle.sessions.len(),
    }))
}

async fn ready_handler<H: RequestHandler>(
    State(state): State<Arc<TransportState<H>>>,
) -> impl IntoResponse {
    if state.lifecycle.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "draining"})))
    } else {
        (StatusCode::OK, Json(json!({"status": "ready"})))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Run one exchange on its own task. A panic inside the handler still
/// yields an `internal` response carrying the request id when recoverable.
pub(crate) async fn dispatch_guarded<H: RequestHandler>(
    handler: Arc<H>,
    ctx: RequestContext,
    raw: Bytes,
) -> ExchangeResponse {
    let task = tokio::spawn({
        let raw = raw.clone();
        async move { handler.handle_exchange(ctx, raw).await }
    });

    match task.await {
        Ok(response) => response,
        Err(e) => {
            error!("Exchange task failed: {e}");
            ExchangeResponse::failure(
                recover_id(&raw),
                ExchangeError::internal("internal error while handling request"),
            )
        }
    }
}

fn recover_id(raw: &[u8]) -> Option<RequestId> {
    let value: Value = serde_json::from_slice(raw).ok()?;
    serde_json::from_value(value.get("id")?.clone()).ok()
}
