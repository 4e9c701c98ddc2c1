//! Server-sent event names and the HTTP header names of the transport.

/// SSE event names pushed on an open stream.
pub struct Events;

impl Events {
    /// First event on every stream; data is the session's intake address.
    pub const ENDPOINT: &str = "endpoint";
    /// One exchange response.
    pub const MESSAGE: &str = "message";
}

/// Header names understood by the transport.
pub struct Headers;

impl Headers {
    pub const PROTOCOL_VERSION: &str = "mcp-protocol-version";
    pub const SESSION_ID: &str = "mcp-session-id";
    pub const API_KEY: &str = "x-api-key";
    pub const AUTHORIZATION: &str = "authorization";
    pub const ORIGIN: &str = "origin";
}
