//! Tower Service implementation for Moesif request logging.

use crate::dispatch::Dispatcher;
use crate::future::MoesifFuture;
use lambda_runtime::LambdaEvent;
use serde::Serialize;
use serde_json::Value;
use std::task::{Context, Poll};
use tower::Service;

/// Tower service that records each invocation of the inner service.
///
/// On every call this service:
/// 1. Gives the sampling configuration a chance to refresh
/// 2. Captures the event and Lambda context
/// 3. Invokes the inner service with the original event
/// 4. Assembles and dispatches a record once the inner service completes
#[derive(Clone)]
pub struct MoesifService<S> {
    inner: S,
    dispatcher: Dispatcher,
}

impl<S> MoesifService<S> {
    pub(crate) fn new(inner: S, dispatcher: Dispatcher) -> Self {
        Self { inner, dispatcher }
    }
}

impl<S, T> Service<LambdaEvent<T>> for MoesifService<S>
where
    S: Service<LambdaEvent<T>>,
    S::Response: Serialize,
    S::Error: std::fmt::Display,
    T: Serialize,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = MoesifFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, event: LambdaEvent<T>) -> Self::Future {
        self.dispatcher.config_manager.try_refresh();

        let payload = serde_json::to_value(&event.payload).unwrap_or_else(|e| {
            tracing::warn!(target: "moesif", error = %e, "Failed to capture event");
            Value::Null
        });
        let lambda_ctx = event.context.clone();

        self.dispatcher.options.log_debug(
            "call",
            format_args!("invocation {}", lambda_ctx.request_id),
        );

        let future = self.inner.call(event);

        MoesifFuture::new(future, payload, lambda_ctx, self.dispatcher.clone())
    }
}
