//! Example Lambda function logged to Moesif.
//!
//! This crate demonstrates wiring the Moesif middleware into an API Gateway
//! REST API (proxy integration) handler:
//!
//! - `moesif-lambda-tower` - Tower middleware that records each invocation
//! - `moesif-api` - profile models used by the `/profile` route
//!
//! ## Example
//!
//! ```ignore
//! use moesif_lambda_example::{build_layer, create_http_service, init_tracing};
//! use lambda_runtime::run;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lambda_runtime::Error> {
//!     init_tracing();
//!     let layer = build_layer()?;
//!     run(create_http_service(layer)).await
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use aws_lambda_events::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use aws_lambda_events::encodings::Body;
use http::HeaderValue;
use http::header::CONTENT_TYPE;
use lambda_runtime::LambdaEvent;
use moesif_api::UserModel;
use moesif_lambda_tower::{ConfigurationError, MoesifConfig, MoesifLayer, Options};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower::ServiceBuilder;
use tracing_subscriber::EnvFilter;

/// Header carrying the caller's organisation, reported as the company id.
pub const ORGANIZATION_HEADER: &str = "X-Organization-Id";

/// Request payload extracted from the HTTP body.
#[derive(Debug, Deserialize, Default)]
pub struct RequestBody {
    /// The input message to process.
    #[serde(default)]
    pub message: String,

    /// Optional flag to simulate an error.
    #[serde(default)]
    pub simulate_error: bool,

    /// Optional delay in milliseconds to simulate work.
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

/// Response payload from the Lambda function.
#[derive(Debug, Serialize)]
pub struct Response {
    /// The processed message.
    pub message: String,

    /// The request ID from Lambda.
    pub request_id: String,
}

/// Installs a `tracing` subscriber writing to stdout.
///
/// Filtering follows `RUST_LOG`, defaulting to `info` with the middleware's
/// own diagnostics at `debug`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,moesif=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .without_time()
        .try_init();
}

/// Builds the middleware layer from `/var/task/moesif.toml` and `MOESIF_*` variables.
///
/// Companies are identified by the [`ORGANIZATION_HEADER`] header and the
/// `Authorization` header is masked out of every record.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded or no application id is set.
pub fn build_layer() -> Result<MoesifLayer, ConfigurationError> {
    let options = Options::builder()
        .config(MoesifConfig::load()?)
        .identify_company(|event, _ctx| {
            event
                .get("headers")
                .and_then(|headers| headers.as_object())
                .and_then(|headers| {
                    headers
                        .iter()
                        .find(|(name, _)| name.eq_ignore_ascii_case(ORGANIZATION_HEADER))
                })
                .and_then(|(_, value)| value.as_str())
                .map(str::to_string)
        })
        .mask_content(|mut log_data| {
            if let Some(request) = log_data.request.as_mut() {
                request
                    .headers
                    .retain(|name, _| !name.eq_ignore_ascii_case("authorization"));
            }
            log_data
        })
        .build()?;

    MoesifLayer::new(options)
}

/// Creates a logged HTTP handler service.
///
/// This returns a Tower service that:
/// 1. Calls the inner handler with the original event
/// 2. Returns the handler's response unchanged
/// 3. Sends a record of the request/response pair to Moesif in the background
pub fn create_http_service(
    layer: MoesifLayer,
) -> impl tower::Service<
    LambdaEvent<ApiGatewayProxyRequest>,
    Response = ApiGatewayProxyResponse,
    Error = lambda_runtime::Error,
    Future = impl std::future::Future<Output = Result<ApiGatewayProxyResponse, lambda_runtime::Error>>
                 + Send,
> + Clone {
    let profiles = layer.clone();

    ServiceBuilder::new()
        .layer(layer)
        .service_fn(move |event| http_handler(event, profiles.clone()))
}

/// HTTP handler function.
///
/// `POST /profile` upserts the caller's user profile through the middleware's
/// collector client. Every other route echoes the message from the body.
pub async fn http_handler(
    event: LambdaEvent<ApiGatewayProxyRequest>,
    profiles: MoesifLayer,
) -> Result<ApiGatewayProxyResponse, lambda_runtime::Error> {
    let (request, context) = event.into_parts();
    let request_id = context.request_id.clone();

    tracing::info!(
        request_id = %request_id,
        method = %request.http_method,
        path = ?request.path,
        "Processing HTTP request"
    );

    if request.http_method == http::Method::POST && request.path.as_deref() == Some("/profile") {
        return update_profile(&request, &profiles).await;
    }

    let body = request.body.as_deref().unwrap_or("{}");
    let payload: RequestBody = serde_json::from_str(body).unwrap_or_default();

    if let Some(delay) = payload.delay_ms {
        tracing::debug!(delay_ms = delay, "Simulating work");
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if payload.simulate_error {
        tracing::error!("Simulated error requested");
        return json_response(500, &serde_json::json!({"error": "Simulated error"}));
    }

    let response_message = if payload.message.is_empty() {
        "Hello from Lambda!".to_string()
    } else {
        format!("Processed: {}", payload.message)
    };

    json_response(
        200,
        &Response {
            message: response_message,
            request_id,
        },
    )
}

async fn update_profile(
    request: &ApiGatewayProxyRequest,
    profiles: &MoesifLayer,
) -> Result<ApiGatewayProxyResponse, lambda_runtime::Error> {
    let body = request.body.as_deref().unwrap_or("{}");
    let user: UserModel = match serde_json::from_str(body) {
        Ok(user) => user,
        Err(e) => {
            return json_response(400, &serde_json::json!({"error": e.to_string()}));
        }
    };

    match profiles.update_user(&user).await {
        Ok(()) => json_response(202, &serde_json::json!({"userId": user.user_id})),
        Err(e) => {
            tracing::warn!(error = %e, "Profile update rejected");
            json_response(400, &serde_json::json!({"error": e.to_string()}))
        }
    }
}

fn json_response<T: Serialize>(
    status_code: i64,
    body: &T,
) -> Result<ApiGatewayProxyResponse, lambda_runtime::Error> {
    let mut response = ApiGatewayProxyResponse::default();
    response.status_code = status_code;
    response.body = Some(Body::Text(serde_json::to_string(body)?));
    response
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}
