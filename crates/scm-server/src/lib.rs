//! simple-content-mcp Server
//!
//! Everything between a decoded intake message and the content service:
//! - `registry`: immutable operation table built at startup
//! - `contract`: argument checking against each operation's input schema
//! - `dispatcher`: decode, resolve, validate, invoke
//! - `batch`: per-item fan-out with index-ordered reports
//! - `catalog`: the content operations

pub mod batch;
pub mod catalog;
pub mod contract;
pub mod dispatcher;
pub mod registry;

pub use batch::BatchEngine;
pub use catalog::{CatalogConfig, ConfigError, build_registry, register_catalog};
pub use contract::{ArgumentContract, ArgumentViolation, ContractError};
pub use dispatcher::Dispatcher;
pub use registry::{HandlerFuture, OperationDescriptor, OperationRegistry, RegistryBuilder, RegistryError};
