//! Sampling decision and fire-and-forget submission of assembled records.

use crate::options::Options;
use lambda_runtime::Context as LambdaContext;
use moesif_api::{ConfigManager, LogData, MoesifApi};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Number of real events one sampled record stands for.
///
/// A rate of zero still yields a weight of one, as does any rate above 100.
pub fn weight_for_rate(rate: u32) -> u32 {
    if rate == 0 { 1 } else { (100 / rate).max(1) }
}

/// Collaborators needed to send a record.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    pub(crate) options: Arc<Options>,
    pub(crate) api: Arc<dyn MoesifApi>,
    pub(crate) config_manager: Arc<dyn ConfigManager>,
}

impl Dispatcher {
    /// Sends `log_data` unless the invocation is skipped or sampled out.
    ///
    /// The send runs as a detached task; the returned handle is only useful
    /// to callers that want to observe completion.
    pub(crate) fn maybe_send(
        &self,
        mut log_data: LogData,
        event: &Value,
        context: &LambdaContext,
    ) -> Option<JoinHandle<()>> {
        if self.options.skip(event, context) || self.options.ignore_route(event, context) {
            self.options
                .log_debug("maybe_send", format_args!("skipped by strategy"));
            return None;
        }

        let user_id = log_data.user_id.as_deref();
        let company_id = log_data.company_id.as_deref();

        if !self.config_manager.should_send(user_id, company_id) {
            self.options
                .log_debug("maybe_send", format_args!("not sampled"));
            return None;
        }

        let rate = self.config_manager.sample_rate(user_id, company_id);
        log_data.weight = Some(weight_for_rate(rate));

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(target: "moesif", "No tokio runtime, dropping event");
            return None;
        };

        let api = Arc::clone(&self.api);
        let options = Arc::clone(&self.options);
        let config_manager = Arc::clone(&self.config_manager);

        Some(handle.spawn(async move {
            match api.create_event(&log_data).await {
                Ok(etag) => {
                    options.log_debug("create_event", format_args!("event sent"));
                    if let Some(etag) = etag {
                        config_manager.observe_etag(&etag);
                    }
                    options.notify(Ok(()), &log_data);
                }
                Err(e) => {
                    tracing::warn!(target: "moesif", error = %e, "Failed to send event");
                    options.notify(Err(&e), &log_data);
                }
            }
        }))
    }
}
