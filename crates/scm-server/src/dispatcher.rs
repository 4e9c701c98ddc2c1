//! Dispatcher: decodes an intake message, resolves its operation, checks
//! the arguments and runs the handler.
//!
//! Every call produces exactly one [`ExchangeResponse`].

use std::sync::Arc;
use std::time::Instant;

use scm_protocol::{
    ExchangeError, ExchangeRequest, ExchangeResponse, HandlerResult, Operations, RequestContext,
};
use scm_transport::{Bytes, RequestHandler};
use serde_json::json;
use tracing::{Instrument, debug, info_span, warn};

use crate::registry::OperationRegistry;

pub struct Dispatcher {
    registry: Arc<OperationRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<OperationRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    /// Dispatch one raw intake message.
    pub async fn dispatch(&self, ctx: RequestContext, raw: &[u8]) -> ExchangeResponse {
        let request = match ExchangeRequest::decode(raw) {
            Ok(request) => request,
            Err((id, err)) => {
                warn!(session = ?ctx.session_id, "Rejected malformed exchange: {}", err.message);
                return ExchangeResponse::failure(id, err);
            }
        };

        let span = info_span!(
            "exchange",
            operation = %request.operation,
            id = %request.id,
            session = ctx.session_id.as_deref().unwrap_or("-"),
        );

        async move {
            let started = Instant::now();
            let ExchangeRequest {
                id,
                operation,
                arguments,
            } = request;

            let result = self.execute(ctx, &operation, arguments).await;
            match &result {
                Ok(_) => debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Exchange completed"),
                Err(e) => debug!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    category = %e.category,
                    "Exchange failed: {}",
                    e.message
                ),
            }
            ExchangeResponse::from_result(id, result)
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        ctx: RequestContext,
        operation: &str,
        arguments: Option<serde_json::Value>,
    ) -> HandlerResult {
        if operation == Operations::LIST_OPERATIONS {
            return Ok(json!({ "operations": self.registry.describe() }));
        }

        let Some(descriptor) = self.registry.get(operation) else {
            warn!("Unknown operation: {operation}");
            return Err(ExchangeError::unknown_operation(operation));
        };

        let args = descriptor.contract().validate(arguments)?;
        descriptor.invoke(ctx, args).await
    }
}

impl RequestHandler for Dispatcher {
    async fn handle_exchange(&self, ctx: RequestContext, raw: Bytes) -> ExchangeResponse {
        self.dispatch(ctx, &raw).await
    }
}
