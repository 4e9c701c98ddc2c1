//! Credentials and the authentication context threaded through dispatch.
//!
//! Credential format (configuration time, never on the wire):
//!
//! ```text
//! key:ownerId:tenantId?:expiresAt?
//! ```
//!
//! `ownerId` and `tenantId` are UUIDs, `expiresAt` is RFC 3339. The last two
//! fields may be empty or omitted.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::error::ExchangeError;

// ─────────────────────────────────────────────────────────────────────────────
// Key material
// ─────────────────────────────────────────────────────────────────────────────

/// A configured API key and the identity it grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    pub key: String,
    pub owner_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("credential must have at least 'key:ownerId'")]
    MissingFields,
    #[error("credential key must not be empty")]
    EmptyKey,
    #[error("invalid owner id '{0}'")]
    InvalidOwner(String),
    #[error("invalid tenant id '{0}'")]
    InvalidTenant(String),
    #[error("invalid expiry '{0}' (expected RFC 3339)")]
    InvalidExpiry(String),
}

impl KeyInfo {
    /// Parse a `key:ownerId:tenantId?:expiresAt?` credential.
    ///
    /// The expiry may itself contain colons; only the first three separate
    /// fields.
    pub fn parse(value: &str) -> Result<Self, CredentialError> {
        let mut parts = value.trim().splitn(4, ':');

        let key = parts.next().unwrap_or_default();
        let owner = parts.next().ok_or(CredentialError::MissingFields)?;
        if key.is_empty() {
            return Err(CredentialError::EmptyKey);
        }

        let owner_id =
            Uuid::parse_str(owner).map_err(|_| CredentialError::InvalidOwner(owner.to_string()))?;

        let tenant_id = match parts.next() {
            Some(t) if !t.is_empty() => Some(
                Uuid::parse_str(t).map_err(|_| CredentialError::InvalidTenant(t.to_string()))?,
            ),
            _ => None,
        };

        let expires_at = match parts.next() {
            Some(e) if !e.is_empty() => Some(
                DateTime::parse_from_rfc3339(e)
                    .map_err(|_| CredentialError::InvalidExpiry(e.to_string()))?
                    .with_timezone(&Utc),
            ),
            _ => None,
        };

        Ok(Self {
            key: key.to_string(),
            owner_id,
            tenant_id,
            expires_at,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now > exp)
    }

    pub fn context(&self) -> AuthContext {
        AuthContext {
            owner_id: self.owner_id,
            tenant_id: self.tenant_id,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-request identity
// ─────────────────────────────────────────────────────────────────────────────

/// Identity derived once per request from a validated credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub owner_id: Uuid,
    pub tenant_id: Option<Uuid>,
}

impl AuthContext {
    /// The caller may only act on its own owner id.
    pub fn enforce_owner(&self, owner_id: Uuid) -> Result<(), ExchangeError> {
        if self.owner_id == owner_id {
            Ok(())
        } else {
            Err(ExchangeError::forbidden("access denied: owner mismatch"))
        }
    }

    /// A key bound to a tenant may only act inside that tenant.
    pub fn enforce_tenant(&self, tenant_id: Option<Uuid>) -> Result<(), ExchangeError> {
        match self.tenant_id {
            Some(own) if Some(own) != tenant_id => {
                Err(ExchangeError::forbidden("access denied: tenant mismatch"))
            }
            _ => Ok(()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication configuration for the transport.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Keys accepted at the transport boundary.
    pub keys: Vec<KeyInfo>,
}
