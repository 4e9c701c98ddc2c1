//! simple-content-mcp Transport Layer
//!
//! Provides the SSE streaming transport and a stdio transport.
//! The transport layer handles:
//! - Protocol negotiation (version, origin, API key)
//! - Session lifecycle (open, idle reaping, close on disconnect)
//! - Routing intake messages to the session that receives the response
//! - Liveness and readiness probes
//!
//! The transport is decoupled from dispatch via the `RequestHandler` trait.

pub mod auth;
pub mod negotiate;
pub mod server;
pub mod session;
pub mod stdio;

pub use auth::ApiKeyAuthenticator;
pub use axum::body::Bytes;
pub use negotiate::{Negotiated, NegotiationError, Negotiator};
pub use server::{
    Lifecycle, MCP_PATH, MESSAGE_PATH, RequestHandler, TransportConfig, TransportError,
    TransportServer, TransportState, router,
};
pub use session::{Session, SessionGuard, SessionStore};
pub use stdio::{serve_lines, serve_stdio};
