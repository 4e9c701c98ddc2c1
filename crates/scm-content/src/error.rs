//! Typed failures of the content boundary and their mapping into the
//! exchange error taxonomy.

use scm_protocol::{ErrorCategory, ExchangeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("invalid parameter '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("access denied")]
    Forbidden,

    /// Untyped failure from a backend; classified by its message.
    #[error("{0}")]
    Backend(String),
}

impl ContentError {
    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound {
            resource: "content",
            id: id.to_string(),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Category this failure maps to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Storage(_) => ErrorCategory::Storage,
            Self::Unauthorized => ErrorCategory::Unauthorized,
            Self::Forbidden => ErrorCategory::Forbidden,
            Self::Backend(message) => classify_message(message),
        }
    }
}

/// Classify an untyped backend message by the words it contains.
///
/// Order matters: the first matching group wins.
pub fn classify_message(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["not found"]) {
        ErrorCategory::NotFound
    } else if has(&["validation", "invalid"]) {
        ErrorCategory::Validation
    } else if has(&["storage", "blob", "s3"]) {
        ErrorCategory::Storage
    } else if has(&["unauthorized", "authentication"]) {
        ErrorCategory::Unauthorized
    } else if has(&["forbidden", "permission"]) {
        ErrorCategory::Forbidden
    } else {
        ErrorCategory::Internal
    }
}

impl From<ContentError> for ExchangeError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Validation { field, reason } => ExchangeError::validation(field, reason),
            other => ExchangeError::new(other.category(), other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_variants_map_directly() {
        let err: ExchangeError = ContentError::not_found("abc").into();
        assert_eq!(err.category, ErrorCategory::NotFound);
        assert_eq!(err.message, "content not found: abc");

        let err: ExchangeError = ContentError::validation("name", "required").into();
        assert_eq!(err.category, ErrorCategory::Validation);
        assert_eq!(err.field.as_deref(), Some("name"));

        let err: ExchangeError = ContentError::Storage("disk full".into()).into();
        assert_eq!(err.category, ErrorCategory::Storage);

        assert_eq!(ContentError::Forbidden.category(), ErrorCategory::Forbidden);
        assert_eq!(ContentError::Unauthorized.category(), ErrorCategory::Unauthorized);
    }

    #[test]
    fn backend_messages_are_classified() {
        let cases = [
            ("record Not Found in table", ErrorCategory::NotFound),
            ("invalid checksum", ErrorCategory::Validation),
            ("schema validation failed", ErrorCategory::Validation),
            ("S3 PutObject timed out", ErrorCategory::Storage),
            ("blob write failed", ErrorCategory::Storage),
            ("authentication token rejected", ErrorCategory::Unauthorized),
            ("permission denied", ErrorCategory::Forbidden),
            ("connection reset by peer", ErrorCategory::Internal),
        ];
        for (message, expected) in cases {
            let err: ExchangeError = ContentError::Backend(message.into()).into();
            assert_eq!(err.category, expected, "{message}");
            assert_eq!(err.message, message);
        }
    }
}
