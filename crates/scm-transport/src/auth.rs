//! API-key check at the transport boundary.

use std::collections::HashMap;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use scm_protocol::{AuthConfig, AuthContext, Headers, KeyInfo};
use tracing::warn;

use crate::negotiate::{HeaderText, NegotiationError, header_text};

/// Validates credentials against the configured keys.
#[derive(Debug, Clone)]
pub struct ApiKeyAuthenticator {
    keys: HashMap<String, KeyInfo>,
}

impl ApiKeyAuthenticator {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            keys: config
                .keys
                .iter()
                .map(|k| (k.key.clone(), k.clone()))
                .collect(),
        }
    }

    /// Authenticate a request from its headers.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, NegotiationError> {
        let key = extract_credential(headers)?;
        self.verify(key, Utc::now())
    }

    pub fn verify(&self, key: &str, now: DateTime<Utc>) -> Result<AuthContext, NegotiationError> {
        match self.keys.get(key) {
            Some(info) if info.is_expired_at(now) => {
                warn!(owner = %info.owner_id, "Rejected expired API key");
                Err(NegotiationError::InvalidCredential)
            }
            Some(info) => Ok(info.context()),
            None => {
                warn!("Rejected unknown API key");
                Err(NegotiationError::InvalidCredential)
            }
        }
    }
}

/// `X-API-Key`, else `Authorization` with an optional `Bearer` scheme.
///
/// An unreadable header counts as a wrong credential, not a missing one.
fn extract_credential(headers: &HeaderMap) -> Result<&str, NegotiationError> {
    match header_text(headers, Headers::API_KEY) {
        HeaderText::Present(key) if !key.is_empty() => return Ok(key),
        HeaderText::Invalid(_) => return Err(NegotiationError::InvalidCredential),
        _ => {}
    }
    match header_text(headers, Headers::AUTHORIZATION) {
        HeaderText::Present(value) => match strip_bearer(value) {
            "" => Err(NegotiationError::MissingCredential),
            key => Ok(key),
        },
        HeaderText::Invalid(_) => Err(NegotiationError::InvalidCredential),
        HeaderText::Absent => Err(NegotiationError::MissingCredential),
    }
}

/// Drop a leading `Bearer` scheme, matched case-insensitively as a whole word.
fn strip_bearer(value: &str) -> &str {
    const SCHEME: &str = "bearer";
    if let Some(scheme) = value.get(..SCHEME.len())
        && scheme.eq_ignore_ascii_case(SCHEME)
        && let Some(rest) = value.get(SCHEME.len()..)
        && rest.chars().next().is_none_or(char::is_whitespace)
    {
        return rest.trim();
    }
    value.trim()
}
