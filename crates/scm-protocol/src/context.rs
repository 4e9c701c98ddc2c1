//! Request context: per-exchange state threaded through dispatch.
//!
//! Built by the transport after negotiation. The session ids are carried for
//! logging and result routing only; handlers read `auth` to enforce
//! ownership without re-deriving it from the credential.

use crate::auth::AuthContext;
use crate::version::DEFAULT_VERSION;

/// Context for a single exchange.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Server-allocated session the response is delivered to (`None` for
    /// synchronous and stdio exchanges).
    pub session_id: Option<String>,
    /// Advisory `Mcp-Session-Id` supplied by the client, unchanged.
    pub client_session_id: Option<String>,
    /// Negotiated protocol version.
    pub protocol_version: &'static str,
    /// Identity, present only when authentication is enabled.
    pub auth: Option<AuthContext>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            session_id: None,
            client_session_id: None,
            protocol_version: DEFAULT_VERSION,
            auth: None,
        }
    }
}
