//! Error taxonomy and stable error codes.
//!
//! Every failure that reaches a client carries an [`ErrorCategory`]. Numeric
//! codes reuse the JSON-RPC 2.0 space for the generic categories and a
//! private range for the domain ones.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category attached to every error written back to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The intake message was not a well-formed exchange.
    Decode,
    /// No operation descriptor is registered under the requested name.
    UnknownOperation,
    /// Arguments violated the operation's contract.
    Validation,
    /// No usable credential was presented.
    Unauthorized,
    /// The credential is valid but does not grant access to the target.
    Forbidden,
    /// The referenced entity does not exist.
    NotFound,
    /// The backing store failed.
    Storage,
    /// A batch request carried more items than allowed.
    BatchSizeExceeded,
    /// Anything else.
    Internal,
}

impl ErrorCategory {
    pub fn code(&self) -> i32 {
        match self {
            Self::Decode => -32700,
            Self::UnknownOperation => -32601,
            Self::Validation => -32602,
            Self::Internal => -32603,
            Self::Unauthorized => -32010,
            Self::Forbidden => -32011,
            Self::NotFound => -32020,
            Self::Storage => -32021,
            Self::BatchSizeExceeded => -32022,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            -32700 => Self::Decode,
            -32601 => Self::UnknownOperation,
            -32602 => Self::Validation,
            -32010 => Self::Unauthorized,
            -32011 => Self::Forbidden,
            -32020 => Self::NotFound,
            -32021 => Self::Storage,
            -32022 => Self::BatchSizeExceeded,
            _ => Self::Internal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::UnknownOperation => "unknown_operation",
            Self::Validation => "validation",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Storage => "storage",
            Self::BatchSizeExceeded => "batch_size_exceeded",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error object carried in `{id, error}` responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeError {
    pub category: ErrorCategory,
    pub message: String,
    pub code: i32,
    /// Offending argument path for validation failures (e.g. `items[2].name`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ExchangeError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            code: category.code(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Decode, message)
    }

    pub fn unknown_operation(operation: &str) -> Self {
        Self::new(
            ErrorCategory::UnknownOperation,
            format!("Unknown operation: {operation}"),
        )
    }

    /// Validation failure naming the offending field.
    pub fn validation(field: impl Into<String>, reason: impl fmt::Display) -> Self {
        let field = field.into();
        Self::new(
            ErrorCategory::Validation,
            format!("invalid parameter '{field}': {reason}"),
        )
        .with_field(field)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Forbidden, message)
    }

    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::new(ErrorCategory::NotFound, format!("{resource} not found: {id}"))
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Storage, message)
    }

    pub fn batch_size_exceeded(size: usize, max: usize) -> Self {
        Self::new(
            ErrorCategory::BatchSizeExceeded,
            format!("batch size {size} exceeds maximum {max}"),
        )
        .with_field("items")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, message)
    }
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.category, self.code, self.message)
    }
}

impl std::error::Error for ExchangeError {}
