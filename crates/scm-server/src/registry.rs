//! OperationRegistry: immutable name → descriptor table built at startup.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use scm_protocol::{HandlerResult, RequestContext, is_builtin_operation};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::info;

use crate::contract::{ArgumentContract, ContractError};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("operation '{0}' is already registered")]
    DuplicateOperation(String),
    #[error("operation name '{0}' is reserved")]
    ReservedName(String),
    #[error("operation name must not be empty")]
    EmptyName,
    #[error("invalid schema for operation '{operation}': {source}")]
    InvalidSchema {
        operation: String,
        #[source]
        source: ContractError,
    },
}

/// Boxed future returned by every handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'static>>;

/// Object-safe handler. Any `Fn(RequestContext, Map<String, Value>) ->
/// impl Future<Output = HandlerResult>` closure qualifies; arguments have
/// already passed the operation's contract.
trait OperationHandlerDyn: Send + Sync {
    fn call_dyn(&self, ctx: RequestContext, args: Map<String, Value>) -> HandlerFuture;
}

impl<F, Fut> OperationHandlerDyn for F
where
    F: Fn(RequestContext, Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call_dyn(&self, ctx: RequestContext, args: Map<String, Value>) -> HandlerFuture {
        Box::pin(self(ctx, args))
    }
}

/// Name, contract and handler of one callable operation.
pub struct OperationDescriptor {
    name: String,
    description: String,
    contract: ArgumentContract,
    handler: Box<dyn OperationHandlerDyn>,
}

impl std::fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl OperationDescriptor {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Value,
        handler: F,
    ) -> Result<Self, RegistryError>
    where
        F: Fn(RequestContext, Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let contract =
            ArgumentContract::from_schema(schema).map_err(|source| RegistryError::InvalidSchema {
                operation: name.clone(),
                source,
            })?;
        Ok(Self {
            name,
            description: description.into(),
            contract,
            handler: Box::new(handler),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn contract(&self) -> &ArgumentContract {
        &self.contract
    }

    /// Run the handler. The returned future owns everything it needs.
    pub fn invoke(&self, ctx: RequestContext, args: Map<String, Value>) -> HandlerFuture {
        self.handler.call_dyn(ctx, args)
    }

    fn describe(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.contract.schema(),
        })
    }
}

/// Collects descriptors, then freezes them into an [`OperationRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    operations: Vec<OperationDescriptor>,
    index: HashMap<String, usize>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: OperationDescriptor) -> Result<&mut Self, RegistryError> {
        if is_builtin_operation(descriptor.name()) {
            return Err(RegistryError::ReservedName(descriptor.name));
        }
        if self.index.contains_key(descriptor.name()) {
            return Err(RegistryError::DuplicateOperation(descriptor.name));
        }
        self.index
            .insert(descriptor.name.clone(), self.operations.len());
        self.operations.push(descriptor);
        Ok(self)
    }

    /// Shorthand for [`OperationDescriptor::new`] + [`register`](Self::register).
    pub fn operation<F, Fut>(
        &mut self,
        name: &str,
        description: &str,
        schema: Value,
        handler: F,
    ) -> Result<&mut Self, RegistryError>
    where
        F: Fn(RequestContext, Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(OperationDescriptor::new(name, description, schema, handler)?)
    }

    pub fn build(self) -> OperationRegistry {
        info!("Operation registry built ({} operations)", self.operations.len());
        OperationRegistry {
            operations: self.operations.into_iter().map(Arc::new).collect(),
            index: self.index,
        }
    }
}

/// Read-only operation table. Has no mutation API; share it behind an
/// `Arc`.
#[derive(Debug)]
pub struct OperationRegistry {
    operations: Vec<Arc<OperationDescriptor>>,
    index: HashMap<String, usize>,
}

impl OperationRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<Arc<OperationDescriptor>> {
        self.index.get(name).map(|&i| self.operations[i].clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.iter().map(|op| op.name())
    }

    /// Catalog listing in registration order.
    pub fn describe(&self) -> Vec<Value> {
        self.operations.iter().map(|op| op.describe()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scm_protocol::{ExchangeError, Operations};

    fn echo_schema() -> Value {
        json!({
            "type": "object",
            "properties": {"message": {"type": "string"}},
            "required": ["message"]
        })
    }

    fn builder_with_echo() -> RegistryBuilder {
        let mut builder = RegistryBuilder::new();
        builder
            .operation("echo", "Echo back", echo_schema(), |_ctx, args| async move {
                Ok(Value::Object(args))
            })
            .unwrap();
        builder
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut builder = builder_with_echo();
        let err = builder
            .operation("echo", "again", json!({}), |_ctx, _args| async {
                Ok(Value::Null)
            })
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateOperation(name) if name == "echo"));
    }

    #[test]
    fn builtin_name_is_reserved() {
        let mut builder = RegistryBuilder::new();
        let err = builder
            .operation(Operations::LIST_OPERATIONS, "", json!({}), |_ctx, _args| async {
                Ok(Value::Null)
            })
            .unwrap_err();
        assert!(matches!(err, RegistryError::ReservedName(_)));
    }

    #[test]
    fn invalid_schema_rejected() {
        let mut builder = RegistryBuilder::new();
        let err = builder
            .operation("bad", "", json!({"type": "array"}), |_ctx, _args| async {
                Ok(Value::Null)
            })
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidSchema { ref operation, .. } if operation == "bad"));
    }

    #[tokio::test]
    async fn lookup_and_invoke() {
        let registry = builder_with_echo().build();
        assert!(registry.contains("echo"));
        assert!(registry.get("missing").is_none());

        let op = registry.get("echo").unwrap();
        let args = op
            .contract()
            .validate(Some(json!({"message": "hi"})))
            .unwrap();
        let result = op.invoke(RequestContext::default(), args).await.unwrap();
        assert_eq!(result, json!({"message": "hi"}));
    }

    #[tokio::test]
    async fn handler_errors_pass_through() {
        let mut builder = RegistryBuilder::new();
        builder
            .operation("fail", "", json!({}), |_ctx, _args| async {
                Err(ExchangeError::storage("disk gone"))
            })
            .unwrap();
        let registry = builder.build();
        let err = registry
            .get("fail")
            .unwrap()
            .invoke(RequestContext::default(), Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.message, "disk gone");
    }

    #[test]
    fn describe_lists_in_registration_order() {
        let mut builder = builder_with_echo();
        builder
            .operation("second", "Second op", json!({}), |_ctx, _args| async {
                Ok(Value::Null)
            })
            .unwrap();
        let registry = builder.build();
        let listing = registry.describe();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0]["name"], "echo");
        assert_eq!(listing[0]["inputSchema"], echo_schema());
        assert_eq!(listing[1]["description"], "Second op");
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["echo", "second"]);
    }
}
