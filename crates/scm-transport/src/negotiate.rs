//! Protocol negotiation.
//!
//! Runs on every request before a session is created or a body is parsed.
//! Failures surface as plain HTTP statuses, never as exchange errors.

use std::net::IpAddr;

use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use scm_protocol::{AuthContext, Headers, RequestContext, negotiate_version};
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::auth::ApiKeyAuthenticator;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    #[error("Unsupported MCP protocol version: {0}")]
    UnsupportedVersion(String),
    #[error("Forbidden origin: {0}")]
    ForbiddenOrigin(String),
    #[error("API key required")]
    MissingCredential,
    #[error("Invalid API key")]
    InvalidCredential,
}

impl NegotiationError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedVersion(_) => StatusCode::BAD_REQUEST,
            Self::ForbiddenOrigin(_) => StatusCode::FORBIDDEN,
            Self::MissingCredential | Self::InvalidCredential => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for NegotiationError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Accepted connection metadata.
#[derive(Debug, Clone)]
pub struct Negotiated {
    pub protocol_version: &'static str,
    /// Whether the client sent a version header at all.
    pub version_declared: bool,
    pub client_session_id: Option<String>,
    pub auth: Option<AuthContext>,
}

impl Negotiated {
    /// Build the dispatch context for one exchange.
    pub fn into_context(self, session_id: Option<String>) -> RequestContext {
        RequestContext {
            session_id,
            client_session_id: self.client_session_id,
            protocol_version: self.protocol_version,
            auth: self.auth,
        }
    }
}

/// Header checks shared by every endpoint.
#[derive(Debug, Clone)]
pub struct Negotiator {
    loopback_only: bool,
    authenticator: Option<ApiKeyAuthenticator>,
}

impl Negotiator {
    /// `bind_host` decides whether origins are restricted to loop-back.
    pub fn new(bind_host: &str, authenticator: Option<ApiKeyAuthenticator>) -> Self {
        Self {
            loopback_only: is_loopback_host(bind_host),
            authenticator,
        }
    }

    pub fn negotiate(&self, headers: &HeaderMap) -> Result<Negotiated, NegotiationError> {
        let declared = match header_text(headers, Headers::PROTOCOL_VERSION) {
            HeaderText::Absent => None,
            HeaderText::Present(version) => Some(version),
            HeaderText::Invalid(raw) => return Err(unsupported_version(raw)),
        };
        let protocol_version = negotiate_version(declared)
            .ok_or_else(|| unsupported_version(declared.unwrap_or_default().to_string()))?;

        if self.loopback_only {
            let rejected = match header_text(headers, Headers::ORIGIN) {
                HeaderText::Absent => None,
                HeaderText::Present(origin) if is_loopback_origin(origin) => None,
                HeaderText::Present(origin) => Some(origin.to_string()),
                HeaderText::Invalid(raw) => Some(raw),
            };
            if let Some(origin) = rejected {
                warn!(%origin, "Rejected non-loopback origin");
                return Err(NegotiationError::ForbiddenOrigin(origin));
            }
        }

        let auth = match &self.authenticator {
            Some(authenticator) => Some(authenticator.authenticate(headers)?),
            None => None,
        };

        Ok(Negotiated {
            protocol_version,
            version_declared: declared.is_some_and(|v| !v.is_empty()),
            client_session_id: header_text(headers, Headers::SESSION_ID)
                .present()
                .map(str::to_string),
            auth,
        })
    }
}

fn unsupported_version(requested: String) -> NegotiationError {
    warn!(version = %requested, "Rejected unsupported protocol version");
    NegotiationError::UnsupportedVersion(requested)
}

/// A request header, distinguishing "not sent" from "sent but unreadable".
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HeaderText<'a> {
    Absent,
    /// Not visible ASCII; holds a lossy rendering for diagnostics.
    Invalid(String),
    /// Trimmed value.
    Present(&'a str),
}

impl<'a> HeaderText<'a> {
    pub(crate) fn present(self) -> Option<&'a str> {
        match self {
            Self::Present(value) => Some(value),
            _ => None,
        }
    }
}

pub(crate) fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> HeaderText<'a> {
    match headers.get(name) {
        None => HeaderText::Absent,
        Some(value) => match value.to_str() {
            Ok(text) => HeaderText::Present(text.trim()),
            Err(_) => HeaderText::Invalid(lossy(value)),
        },
    }
}

fn lossy(value: &HeaderValue) -> String {
    String::from_utf8_lossy(value.as_bytes()).into_owned()
}

pub fn is_loopback_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

fn is_loopback_origin(origin: &str) -> bool {
    Url::parse(origin)
        .ok()
        .and_then(|url| url.host_str().map(is_loopback_host))
        .unwrap_or(false)
}
