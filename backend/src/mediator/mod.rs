//! In-process request dispatch
//!
//! Every command and query is a [`Request`] with exactly one
//! [`RequestHandler`]. [`Mediator::send`] validates the request, looks the
//! handler up by type and runs it inside a tracing span.

mod registry;

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use registry::HandlerRegistry;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, warn, Instrument};
use validator::Validate;

/// A command or query
pub trait Request: Validate + Send + 'static {
    /// Name used in logs and metrics
    const NAME: &'static str;

    type Response: Send + 'static;
}

#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync {
    async fn handle(&self, request: R) -> ApiResult<R::Response>;
}

/// Collects handlers before the mediator is frozen
#[derive(Default)]
pub struct MediatorBuilder {
    registry: HandlerRegistry,
}

impl MediatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `R`; a later registration replaces an earlier one
    pub fn register<R, H>(mut self, handler: H) -> Self
    where
        R: Request,
        H: RequestHandler<R> + 'static,
    {
        if self.registry.insert::<R>(Arc::new(handler)) {
            warn!(request = R::NAME, "Replacing previously registered handler");
        }
        self
    }

    pub fn build(self) -> Mediator {
        debug!(handlers = ?self.registry.names(), "Mediator built");
        Mediator {
            registry: Arc::new(self.registry),
        }
    }
}

/// Dispatches requests to their handlers; cheap to clone
#[derive(Clone)]
pub struct Mediator {
    registry: Arc<HandlerRegistry>,
}

impl Mediator {
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::new()
    }

    /// Validate `request` and run its handler
    ///
    /// Invalid requests fail with [`ApiError::Validation`] without reaching
    /// the handler. A request type with no handler is an internal error.
    pub async fn send<R: Request>(&self, request: R) -> ApiResult<R::Response> {
        request.validate()?;

        let handler = self.registry.get::<R>().ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!("No handler registered for {}", R::NAME))
        })?;

        let span = info_span!("mediator.send", request = R::NAME);
        let started = Instant::now();
        let result = handler.handle(request).instrument(span.clone()).await;
        let elapsed = started.elapsed();

        metrics::histogram!("mediator_request_duration_seconds", "request" => R::NAME)
            .record(elapsed.as_secs_f64());

        let _entered = span.enter();
        match &result {
            Ok(_) => debug!(elapsed_ms = elapsed.as_millis() as u64, "Request handled"),
            Err(e) => {
                metrics::counter!("mediator_request_failures_total", "request" => R::NAME)
                    .increment(1);
                debug!(elapsed_ms = elapsed.as_millis() as u64, error = %e, "Request failed");
            }
        }

        result
    }

    pub fn has_handler<R: Request>(&self) -> bool {
        self.registry.contains::<R>()
    }

    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Validate)]
    struct Echo {
        #[validate(length(min = 1, max = 10))]
        text: String,
    }

    impl Request for Echo {
        const NAME: &'static str = "Echo";
        type Response = String;
    }

    #[derive(Debug)]
    struct Unhandled;

    impl Validate for Unhandled {
        fn validate(&self) -> Result<(), validator::ValidationErrors> {
            Ok(())
        }
    }

    impl Request for Unhandled {
        const NAME: &'static str = "Unhandled";
        type Response = ();
    }

    #[derive(Default)]
    struct EchoHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RequestHandler<Echo> for EchoHandler {
        async fn handle(&self, request: Echo) -> ApiResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(request.text)
        }
    }

    struct ShoutHandler;

    #[async_trait]
    impl RequestHandler<Echo> for ShoutHandler {
        async fn handle(&self, request: Echo) -> ApiResult<String> {
            Ok(request.text.to_uppercase())
        }
    }

    #[tokio::test]
    async fn test_dispatches_to_registered_handler() {
        let mediator = Mediator::builder().register(EchoHandler::default()).build();

        let reply = mediator
            .send(Echo {
                text: "squat".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(reply, "squat");
        assert!(mediator.has_handler::<Echo>());
        assert_eq!(mediator.handler_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mediator = Mediator::builder()
            .register(EchoHandler {
                calls: calls.clone(),
            })
            .build();

        let result = mediator
            .send(Echo {
                text: String::new(),
            })
            .await;

        assert!(matches!(result, Err(ApiError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_handler_is_internal_error() {
        let mediator = Mediator::builder().build();
        let result = mediator.send(Unhandled).await;
        assert!(matches!(result, Err(ApiError::Internal(_))));
    }

    #[tokio::test]
    async fn test_second_registration_replaces_first() {
        let mediator = Mediator::builder()
            .register(EchoHandler::default())
            .register(ShoutHandler)
            .build();

        let reply = mediator
            .send(Echo {
                text: "lunge".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(reply, "LUNGE");
        assert_eq!(mediator.handler_count(), 1);
    }
}
