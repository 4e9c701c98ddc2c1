//! simple-content-mcp: Protocol Types
//!
//! Wire types shared by the transport, the dispatcher, and the content
//! boundary. This crate is the single source of truth for operation names,
//! event and header names, protocol versions, and the error taxonomy.

pub mod auth;
pub mod batch;
pub mod context;
pub mod error;
pub mod events;
pub mod exchange;
pub mod operations;
pub mod version;

pub use auth::{AuthConfig, AuthContext, CredentialError, KeyInfo};
pub use batch::{BatchOutcome, BatchReport};
pub use context::RequestContext;
pub use error::{ErrorCategory, ExchangeError};
pub use events::{Events, Headers};
pub use exchange::{ExchangeRequest, ExchangeResponse, HandlerResult, RequestId};
pub use operations::{Operations, is_builtin_operation};
pub use version::{DEFAULT_VERSION, SUPPORTED_VERSIONS, negotiate_version};
