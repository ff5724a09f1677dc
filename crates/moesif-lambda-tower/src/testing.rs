//! Shared fixtures for unit tests.

use lambda_runtime::{Config, Context as LambdaContext};
use serde_json::{Value, json};
use std::sync::Arc;

pub(crate) fn lambda_context() -> LambdaContext {
    let mut config = Config::default();
    config.function_name = "orders-fn".to_string();
    config.version = "7".to_string();

    let mut context = LambdaContext::default();
    context.request_id = "req-1".to_string();
    context.env_config = Arc::new(config);
    context
}

pub(crate) fn proxy_event() -> Value {
    json!({
        "resource": "/v1/orders",
        "path": "/v1/orders",
        "httpMethod": "POST",
        "headers": {
            "Host": "api.x.com",
            "X-Forwarded-Proto": "https",
            "X-Forwarded-For": "203.0.113.9, 10.0.0.1",
            "Authorization": "Bearer token",
            "Content-Type": "application/json"
        },
        "queryStringParameters": {"page": "2"},
        "body": "{\"item\":\"book\"}",
        "isBase64Encoded": false,
        "requestContext": {
            "requestTimeEpoch": 1_700_000_000_000_i64,
            "stage": "prod",
            "authorizer": {"principalId": "principal-1"},
            "identity": {"apiKey": "key-1", "sourceIp": "198.51.100.1"}
        },
        "user": "top-level-user"
    })
}
