//! Batch engine: fan an item list out to one task per item and fan the
//! outcomes back in by index.

use std::future::Future;

use scm_protocol::{BatchOutcome, BatchReport, ExchangeError, HandlerResult};
use tokio::task::JoinHandle;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy)]
pub struct BatchEngine {
    max_batch_size: usize,
}

impl BatchEngine {
    pub fn new(max_batch_size: usize) -> Self {
        Self { max_batch_size }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Shape and size check, run before any unit starts.
    pub fn check_size(&self, len: usize) -> Result<(), ExchangeError> {
        if len == 0 {
            return Err(ExchangeError::validation(
                "items",
                "must contain at least one item",
            ));
        }
        if len > self.max_batch_size {
            return Err(ExchangeError::batch_size_exceeded(len, self.max_batch_size));
        }
        Ok(())
    }

    /// Run `unit` once per item, each on its own task.
    ///
    /// Units never cancel each other. Slot `i` of the report always holds
    /// the outcome of item `i`; a panicking unit fills its slot with an
    /// `internal` failure.
    pub async fn run<T, F, Fut>(&self, items: Vec<T>, mut unit: F) -> Result<BatchReport, ExchangeError>
    where
        T: Send + 'static,
        F: FnMut(usize, T) -> Fut,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.check_size(items.len())?;
        debug!(items = items.len(), "Batch started");

        let handles: Vec<JoinHandle<HandlerResult>> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| tokio::spawn(unit(index, item)))
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (index, handle) in handles.into_iter().enumerate() {
            let outcome = match handle.await {
                Ok(Ok(value)) => BatchOutcome::ok(index, value),
                Ok(Err(err)) => BatchOutcome::failed(index, err),
                Err(e) => {
                    error!(index, "Batch unit failed: {e}");
                    BatchOutcome::failed(index, ExchangeError::internal("batch item task failed"))
                }
            };
            results.push(outcome);
        }

        let report = BatchReport::from_outcomes(results);
        debug!(
            total = report.total,
            successful = report.successful,
            failed = report.failed,
            "Batch finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use scm_protocol::ErrorCategory;
    use serde_json::json;

    #[tokio::test]
    async fn empty_batch_is_a_shape_error() {
        let engine = BatchEngine::new(3);
        let err = engine
            .run(Vec::<u32>::new(), |_, _| async { Ok(json!(null)) })
            .await
            .unwrap_err();
        assert_eq!(err.category, ErrorCategory::Validation);
        assert_eq!(err.field.as_deref(), Some("items"));
    }

    #[tokio::test]
    async fn oversized_batch_runs_nothing() {
        let engine = BatchEngine::new(3);
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        let err = engine
            .run(vec![1, 2, 3, 4], move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(json!(null)) }
            })
            .await
            .unwrap_err();
        assert_eq!(err.category, ErrorCategory::BatchSizeExceeded);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn batch_of_exactly_max_size_is_accepted() {
        let engine = BatchEngine::new(3);
        assert!(engine.check_size(3).is_ok());
        let report = engine
            .run(vec![0, 1, 2], |_, n| async move { Ok(json!(n)) })
            .await
            .unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.successful, 3);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn outcomes_follow_input_order_not_completion_order() {
        let engine = BatchEngine::new(10);
        // Earlier items sleep longer, so they finish last.
        let report = engine
            .run((0..6u64).collect(), |_, n| async move {
                tokio::time::sleep(Duration::from_millis((6 - n) * 20)).await;
                Ok(json!(n * 10))
            })
            .await
            .unwrap();

        assert_eq!(report.total, 6);
        for (i, outcome) in report.results.iter().enumerate() {
            assert_eq!(outcome.index, i);
            assert_eq!(outcome.value, Some(json!(i as u64 * 10)));
        }
    }

    #[tokio::test]
    async fn failures_do_not_cancel_siblings() {
        let engine = BatchEngine::new(10);
        let report = engine
            .run(vec![0, 1, 2, 3, 4], |_, n| async move {
                if n == 2 {
                    Err(ExchangeError::validation("items[2].name", "required"))
                } else {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok(json!(n))
                }
            })
            .await
            .unwrap();

        assert_eq!((report.total, report.successful, report.failed), (5, 4, 1));
        assert!(!report.results[2].success);
        assert_eq!(
            report.results[2].error.as_ref().unwrap().field.as_deref(),
            Some("items[2].name")
        );
        assert_eq!(report.results[4].value, Some(json!(4)));
    }

    #[tokio::test]
    async fn panicking_unit_fills_its_slot() {
        let engine = BatchEngine::new(10);
        let report = engine
            .run(vec![0, 1, 2], |_, n| async move {
                if n == 1 {
                    panic!("unit exploded");
                }
                Ok(json!(n))
            })
            .await
            .unwrap();

        assert_eq!(report.successful, 2);
        let err = report.results[1].error.as_ref().unwrap();
        assert_eq!(err.category, ErrorCategory::Internal);
    }
}
