//! Future that records an invocation once the handler completes.

use crate::assembler::assemble;
use crate::dispatch::Dispatcher;
use crate::error::AssembleError;
use lambda_runtime::Context as LambdaContext;
use pin_project::pin_project;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future that wraps a handler and logs its outcome.
///
/// The handler's result is returned on the same poll that produced it.
/// Record assembly runs synchronously before that, the collector call does
/// not: it is spawned and never awaited here.
#[pin_project]
pub struct MoesifFuture<F> {
    #[pin]
    inner: F,
    invocation: Option<Invocation>,
}

struct Invocation {
    event: Value,
    context: LambdaContext,
    dispatcher: Dispatcher,
}

impl<F> MoesifFuture<F> {
    pub(crate) fn new(
        inner: F,
        event: Value,
        context: LambdaContext,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            inner,
            invocation: Some(Invocation {
                event,
                context,
                dispatcher,
            }),
        }
    }
}

impl<F, T, E> Future for MoesifFuture<F>
where
    F: Future<Output = Result<T, E>>,
    T: Serialize,
    E: std::fmt::Display,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        let result = match this.inner.poll(cx) {
            Poll::Ready(result) => result,
            Poll::Pending => return Poll::Pending,
        };

        if let Some(invocation) = this.invocation.take() {
            let response = match &result {
                Ok(response) => serde_json::to_value(response)
                    .inspect_err(|e| {
                        tracing::warn!(target: "moesif", error = %e, "Failed to capture response");
                    })
                    .ok(),
                Err(e) => {
                    invocation
                        .dispatcher
                        .options
                        .log_debug("poll", format_args!("handler failed: {}", e));
                    None
                }
            };
            invocation.record(response.as_ref());
        }

        Poll::Ready(result)
    }
}

impl Invocation {
    fn record(self, response: Option<&Value>) {
        let options = &self.dispatcher.options;

        match assemble(&self.event, &self.context, response, options) {
            Ok(log_data) => {
                options.log_debug(
                    "record",
                    format_args!("assembled record for {}", self.context.request_id),
                );
                self.dispatcher
                    .maybe_send(log_data, &self.event, &self.context);
            }
            Err(AssembleError::MalformedEvent) => {
                options.log_debug(
                    "record",
                    format_args!("not an API Gateway proxy event, nothing logged"),
                );
            }
            Err(e) => {
                tracing::error!(
                    target: "moesif",
                    request_id = %self.context.request_id,
                    error = %e,
                    "Discarding invalid record"
                );
            }
        }
    }
}
