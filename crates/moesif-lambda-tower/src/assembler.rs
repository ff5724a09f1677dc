//! Builds a [`LogData`] record from one handler invocation.
//!
//! Assembly reads the event and handler result structurally, so any proxy
//! integration payload works as long as it carries `httpMethod` and `headers`.
//! The mask strategy runs after the request and response halves are filled
//! and before identity fields are attached. Those fields are therefore
//! never visible to it.

use crate::body::capture_body;
use crate::client_ip::client_ip;
use crate::error::AssembleError;
use crate::fields::{headers, lookup, string_map};
use crate::options::Options;
use crate::start_time::process_start_time;
use crate::uri::build_uri;
use chrono::{DateTime, Utc};
use lambda_runtime::Context as LambdaContext;
use moesif_api::{Direction, EventRequest, EventResponse, LogData};
use serde_json::Value;

/// Status recorded when the handler produced no usable status code.
pub const MISSING_STATUS: u16 = 599;

/// Assembles and validates the record for one invocation.
///
/// `result` is the serialised handler response, or `None` when the handler failed.
///
/// # Errors
///
/// - [`AssembleError::MalformedEvent`] if the event has no non-empty `httpMethod` or no
///   `headers` object.
/// - [`AssembleError::InvalidRecord`] if a required field is missing after masking.
pub fn assemble(
    event: &Value,
    context: &LambdaContext,
    result: Option<&Value>,
    options: &Options,
) -> Result<LogData, AssembleError> {
    let verb = event
        .get("httpMethod")
        .and_then(Value::as_str)
        .filter(|method| !method.is_empty())
        .ok_or(AssembleError::MalformedEvent)?;
    let request_headers = headers(event).ok_or(AssembleError::MalformedEvent)?;

    let request_time = request_time(event).unwrap_or_else(process_start_time);

    let mut request = EventRequest {
        time: Some(request_time),
        uri: build_uri(event),
        verb: verb.to_string(),
        api_version: options.get_api_version(event, context),
        ip_address: client_ip(event),
        headers: string_map(Some(request_headers)),
        ..Default::default()
    };

    let metadata = options.get_metadata(event, context);

    if options.log_body() {
        let is_base64 = flag(event, "isBase64Encoded");
        if let Some(decoded) = capture_body(event.get("body"), is_base64) {
            request.body = Some(decoded.body);
            request.transfer_encoding = decoded.transfer_encoding;
        }
    }

    let mut response = EventResponse {
        time: request_time.max(Utc::now()),
        status: result.map_or(MISSING_STATUS, status_code),
        headers: string_map(result.and_then(|r| r.get("headers")).and_then(Value::as_object)),
        ..Default::default()
    };

    if let Some(result) = result.filter(|_| options.log_body()) {
        let is_base64 = flag(result, "isBase64Encoded");
        if let Some(decoded) = capture_body(result.get("body"), is_base64) {
            response.body = Some(decoded.body);
            response.transfer_encoding = decoded.transfer_encoding;
        }
    }

    let log_data = LogData {
        request: Some(request),
        response: Some(response),
        metadata,
        ..Default::default()
    };

    let mut log_data = options.mask_content(log_data);

    log_data.user_id = options.identify_user(event, context);
    log_data.company_id = options.identify_company(event, context);
    log_data.session_token = options.get_session_token(event, context);
    log_data.tags = options.get_tags(event, context);
    log_data.direction = Direction::Incoming;

    validate(&log_data)?;

    Ok(log_data)
}

/// Checks the fields the collector requires on every event.
pub fn validate(log_data: &LogData) -> Result<(), AssembleError> {
    let request = log_data
        .request
        .as_ref()
        .ok_or(AssembleError::InvalidRecord("request"))?;

    if request.time.is_none() {
        return Err(AssembleError::InvalidRecord("request.time"));
    }
    if request.verb.is_empty() {
        return Err(AssembleError::InvalidRecord("request.verb"));
    }
    if request.uri.is_empty() {
        return Err(AssembleError::InvalidRecord("request.uri"));
    }
    if log_data.response.is_none() {
        return Err(AssembleError::InvalidRecord("response"));
    }

    Ok(())
}

/// `requestContext.requestTimeEpoch`, in milliseconds. Zero counts as absent.
fn request_time(event: &Value) -> Option<DateTime<Utc>> {
    let epoch = lookup(event, &["requestContext", "requestTimeEpoch"])?;
    let millis = match epoch {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|ms| *ms > 0)?;
    DateTime::from_timestamp_millis(millis)
}

fn status_code(result: &Value) -> u16 {
    let parsed = match result.get("statusCode") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };

    parsed
        .and_then(|code| u16::try_from(code).ok())
        .unwrap_or(MISSING_STATUS)
}

fn flag(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}
