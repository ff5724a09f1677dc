//! Middleware options and their normalisation.
//!
//! Every extraction hook is a named slot holding a closure. Slots left empty
//! are filled from [`defaults`] when the options are built, so the rest of
//! the middleware never needs a fallback of its own.

use crate::config::MoesifConfig;
use crate::error::{ConfigurationError, Result};
use lambda_runtime::Context as LambdaContext;
use moesif_api::{ApiConfig, ApiError, LogData};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable consulted when no application id is configured.
pub const APPLICATION_ID_ENV: &str = "MOESIF_APPLICATION_ID";

/// Derives an optional string from the event and Lambda context.
pub type IdentifyFn = Arc<dyn Fn(&Value, &LambdaContext) -> Option<String> + Send + Sync>;

/// Derives the metadata document from the event and Lambda context.
pub type MetadataFn = Arc<dyn Fn(&Value, &LambdaContext) -> Value + Send + Sync>;

/// Decides something about an invocation from the event and Lambda context.
pub type PredicateFn = Arc<dyn Fn(&Value, &LambdaContext) -> bool + Send + Sync>;

/// Rewrites an assembled record before validation and dispatch.
pub type MaskFn = Arc<dyn Fn(LogData) -> LogData + Send + Sync>;

/// Receives the outcome of each event submission.
pub type CompletionFn = Arc<dyn Fn(std::result::Result<(), &ApiError>, &LogData) + Send + Sync>;

/// Default extraction strategies.
pub mod defaults {
    use super::LambdaContext;
    use crate::fields::lookup_str;
    use moesif_api::LogData;
    use serde_json::{Value, json};

    /// First non-empty of: authorizer principal, top-level principal, the
    /// request identity's Cognito id, the Lambda context's Cognito id, the
    /// request identity's user, top-level user.
    pub fn identify_user(event: &Value, context: &LambdaContext) -> Option<String> {
        lookup_str(event, &["requestContext", "authorizer", "principalId"])
            .or_else(|| lookup_str(event, &["principalId"]))
            .or_else(|| lookup_str(event, &["requestContext", "identity", "cognitoIdentityId"]))
            .or_else(|| {
                context
                    .identity
                    .as_ref()
                    .map(|identity| identity.identity_id.as_str())
                    .filter(|id| !id.is_empty())
            })
            .or_else(|| lookup_str(event, &["requestContext", "identity", "user"]))
            .or_else(|| lookup_str(event, &["user"]))
            .map(str::to_string)
    }

    /// Companies are never identified unless a strategy is supplied.
    pub fn identify_company(_event: &Value, _context: &LambdaContext) -> Option<String> {
        None
    }

    /// The API key API Gateway matched for the request.
    pub fn get_session_token(event: &Value, _context: &LambdaContext) -> Option<String> {
        lookup_str(event, &["requestContext", "identity", "apiKey"]).map(str::to_string)
    }

    /// Request id, function name and the raw request context.
    pub fn get_metadata(event: &Value, context: &LambdaContext) -> Value {
        json!({
            "trace_id": context.request_id,
            "function_name": context.env_config.function_name,
            "request_context": event.get("requestContext").cloned().unwrap_or(Value::Null),
        })
    }

    pub fn get_tags(_event: &Value, _context: &LambdaContext) -> Option<String> {
        None
    }

    /// The deployed function version.
    pub fn get_api_version(_event: &Value, context: &LambdaContext) -> Option<String> {
        Some(context.env_config.version.clone()).filter(|v| !v.is_empty())
    }

    pub fn mask_content(log_data: LogData) -> LogData {
        log_data
    }

    pub fn ignore_route(_event: &Value, _context: &LambdaContext) -> bool {
        false
    }

    pub fn skip(_event: &Value, _context: &LambdaContext) -> bool {
        false
    }
}

/// Normalised middleware options. Every strategy slot is filled.
#[derive(Clone)]
pub struct Options {
    application_id: String,
    base_uri: String,
    log_body: bool,
    debug: bool,
    timeout: Duration,
    config_refresh_interval: Duration,
    identify_user: IdentifyFn,
    identify_company: IdentifyFn,
    get_session_token: IdentifyFn,
    get_metadata: MetadataFn,
    get_tags: IdentifyFn,
    get_api_version: IdentifyFn,
    mask_content: MaskFn,
    ignore_route: PredicateFn,
    skip: PredicateFn,
    callback: Option<CompletionFn>,
}

impl Options {
    /// Creates a builder starting from default configuration.
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::new()
    }

    /// Normalises caller-supplied options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingOptions`] for `None`, otherwise
    /// whatever [`OptionsBuilder::build`] returns.
    pub fn normalize(options: Option<OptionsBuilder>) -> Result<Self> {
        options.ok_or(ConfigurationError::MissingOptions)?.build()
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn log_body(&self) -> bool {
        self.log_body
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn config_refresh_interval(&self) -> Duration {
        self.config_refresh_interval
    }

    /// Collector client settings derived from these options.
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            application_id: self.application_id.clone(),
            base_uri: self.base_uri.clone(),
            timeout: self.timeout,
        }
    }

    pub fn identify_user(&self, event: &Value, context: &LambdaContext) -> Option<String> {
        (self.identify_user)(event, context)
    }

    pub fn identify_company(&self, event: &Value, context: &LambdaContext) -> Option<String> {
        (self.identify_company)(event, context)
    }

    pub fn get_session_token(&self, event: &Value, context: &LambdaContext) -> Option<String> {
        (self.get_session_token)(event, context)
    }

    pub fn get_metadata(&self, event: &Value, context: &LambdaContext) -> Value {
        (self.get_metadata)(event, context)
    }

    pub fn get_tags(&self, event: &Value, context: &LambdaContext) -> Option<String> {
        (self.get_tags)(event, context)
    }

    pub fn get_api_version(&self, event: &Value, context: &LambdaContext) -> Option<String> {
        (self.get_api_version)(event, context)
    }

    pub fn mask_content(&self, log_data: LogData) -> LogData {
        (self.mask_content)(log_data)
    }

    pub fn ignore_route(&self, event: &Value, context: &LambdaContext) -> bool {
        (self.ignore_route)(event, context)
    }

    pub fn skip(&self, event: &Value, context: &LambdaContext) -> bool {
        (self.skip)(event, context)
    }

    pub(crate) fn notify(&self, outcome: std::result::Result<(), &ApiError>, log_data: &LogData) {
        if let Some(callback) = &self.callback {
            callback(outcome, log_data);
        }
    }

    /// Emits a diagnostic event when debug output is enabled.
    pub(crate) fn log_debug(&self, function: &str, message: fmt::Arguments<'_>) {
        if self.debug {
            tracing::debug!(target: "moesif", function, "{}", message);
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("application_id", &self.application_id)
            .field("base_uri", &self.base_uri)
            .field("log_body", &self.log_body)
            .field("debug", &self.debug)
            .field("timeout", &self.timeout)
            .field("config_refresh_interval", &self.config_refresh_interval)
            .field("callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Options`].
///
/// # Example
///
/// ```
/// use moesif_lambda_tower::Options;
///
/// let options = Options::builder()
///     .application_id("my-application-id")
///     .identify_company(|event, _ctx| {
///         event["headers"]["X-Organization-Id"].as_str().map(str::to_string)
///     })
///     .build()
///     .unwrap();
///
/// assert_eq!(options.application_id(), "my-application-id");
/// ```
#[must_use = "builders do nothing unless .build() is called"]
#[derive(Default)]
pub struct OptionsBuilder {
    config: MoesifConfig,
    application_id: Option<String>,
    identify_user: Option<IdentifyFn>,
    identify_company: Option<IdentifyFn>,
    get_session_token: Option<IdentifyFn>,
    get_metadata: Option<MetadataFn>,
    get_tags: Option<IdentifyFn>,
    get_api_version: Option<IdentifyFn>,
    mask_content: Option<MaskFn>,
    ignore_route: Option<PredicateFn>,
    skip: Option<PredicateFn>,
    callback: Option<CompletionFn>,
}

impl OptionsBuilder {
    /// Creates a builder with default configuration and no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses loaded configuration as the base for data settings.
    pub fn config(mut self, config: MoesifConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the application id, taking precedence over configuration and environment.
    pub fn application_id(mut self, application_id: impl Into<String>) -> Self {
        self.application_id = Some(application_id.into());
        self
    }

    /// Sets the collector base URI.
    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.config.base_uri = base_uri.into();
        self
    }

    /// Sets whether bodies are captured.
    ///
    /// Default: `true`
    pub fn log_body(mut self, log_body: bool) -> Self {
        self.config.log_body = log_body;
        self
    }

    /// Sets whether diagnostic events are emitted.
    ///
    /// Default: `false`
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Sets the collector request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Sets the minimum interval between sampling configuration fetches.
    pub fn config_refresh_interval(mut self, interval: Duration) -> Self {
        self.config.config_refresh_interval = interval;
        self
    }

    pub fn identify_user<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &LambdaContext) -> Option<String> + Send + Sync + 'static,
    {
        self.identify_user = Some(Arc::new(f));
        self
    }

    pub fn identify_company<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &LambdaContext) -> Option<String> + Send + Sync + 'static,
    {
        self.identify_company = Some(Arc::new(f));
        self
    }

    pub fn get_session_token<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &LambdaContext) -> Option<String> + Send + Sync + 'static,
    {
        self.get_session_token = Some(Arc::new(f));
        self
    }

    pub fn get_metadata<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &LambdaContext) -> Value + Send + Sync + 'static,
    {
        self.get_metadata = Some(Arc::new(f));
        self
    }

    pub fn get_tags<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &LambdaContext) -> Option<String> + Send + Sync + 'static,
    {
        self.get_tags = Some(Arc::new(f));
        self
    }

    pub fn get_api_version<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &LambdaContext) -> Option<String> + Send + Sync + 'static,
    {
        self.get_api_version = Some(Arc::new(f));
        self
    }

    /// Sets the mask strategy. It has the final say over the record and may
    /// strip fields, but a record without request time, verb, URI or a
    /// response is discarded.
    pub fn mask_content<F>(mut self, f: F) -> Self
    where
        F: Fn(LogData) -> LogData + Send + Sync + 'static,
    {
        self.mask_content = Some(Arc::new(f));
        self
    }

    pub fn ignore_route<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &LambdaContext) -> bool + Send + Sync + 'static,
    {
        self.ignore_route = Some(Arc::new(f));
        self
    }

    pub fn skip<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &LambdaContext) -> bool + Send + Sync + 'static,
    {
        self.skip = Some(Arc::new(f));
        self
    }

    /// Sets a callback run after every event submission, with the record that was sent.
    pub fn callback<F>(mut self, f: F) -> Self
    where
        F: Fn(std::result::Result<(), &ApiError>, &LogData) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(f));
        self
    }

    /// Resolves the application id and fills every empty strategy slot.
    ///
    /// The application id is taken from, in order: [`Self::application_id`],
    /// the configuration, then the `MOESIF_APPLICATION_ID` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingApplicationId`] when none of those is set.
    pub fn build(self) -> Result<Options> {
        crate::start_time::init();

        let application_id = self
            .application_id
            .filter(|id| !id.is_empty())
            .or(self.config.application_id.filter(|id| !id.is_empty()))
            .or_else(|| {
                std::env::var(APPLICATION_ID_ENV)
                    .ok()
                    .filter(|id| !id.is_empty())
            })
            .ok_or(ConfigurationError::MissingApplicationId)?;

        let options = Options {
            application_id,
            base_uri: self.config.base_uri,
            log_body: self.config.log_body,
            debug: self.config.debug,
            timeout: self.config.timeout,
            config_refresh_interval: self.config.config_refresh_interval,
            identify_user: self
                .identify_user
                .unwrap_or_else(|| Arc::new(defaults::identify_user)),
            identify_company: self
                .identify_company
                .unwrap_or_else(|| Arc::new(defaults::identify_company)),
            get_session_token: self
                .get_session_token
                .unwrap_or_else(|| Arc::new(defaults::get_session_token)),
            get_metadata: self
                .get_metadata
                .unwrap_or_else(|| Arc::new(defaults::get_metadata)),
            get_tags: self.get_tags.unwrap_or_else(|| Arc::new(defaults::get_tags)),
            get_api_version: self
                .get_api_version
                .unwrap_or_else(|| Arc::new(defaults::get_api_version)),
            mask_content: self
                .mask_content
                .unwrap_or_else(|| Arc::new(defaults::mask_content)),
            ignore_route: self
                .ignore_route
                .unwrap_or_else(|| Arc::new(defaults::ignore_route)),
            skip: self.skip.unwrap_or_else(|| Arc::new(defaults::skip)),
            callback: self.callback,
        };

        options.log_debug("build", format_args!("normalised options {:?}", options));

        Ok(options)
    }
}
