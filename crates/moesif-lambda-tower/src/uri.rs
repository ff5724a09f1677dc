//! Request URL reconstruction from proxy event fields.

use crate::fields::{header, headers};
use serde_json::Value;
use url::{Position, Url, form_urlencoded};

const FALLBACK_URI: &str = "/";

/// Rebuilds the fully-qualified request URL of a proxy event.
///
/// The scheme comes from `X-Forwarded-Proto` (default `http`), the authority
/// from `Host`, then `path` and the percent-encoded `queryStringParameters`.
/// No `/` is added when the event has no path, and spaces in the query are
/// written as `%20`. Returns `"/"` when the URL cannot be built.
pub fn build_uri(event: &Value) -> String {
    try_build_uri(event).unwrap_or_else(|| FALLBACK_URI.to_string())
}

fn try_build_uri(event: &Value) -> Option<String> {
    let headers = headers(event)?;

    let protocol = header(headers, "x-forwarded-proto")
        .and_then(|proto| proto.split(',').next())
        .map(str::trim)
        .filter(|proto| !proto.is_empty())
        .unwrap_or("http");
    let host = header(headers, "host").filter(|host| !host.is_empty())?;

    let mut url = Url::parse(&format!("{}://{}", protocol, host)).ok()?;

    let path = event
        .get("path")
        .and_then(Value::as_str)
        .filter(|path| !path.is_empty());
    if let Some(path) = path {
        url.set_path(path);
    }

    if let Some(query) = query_string(event) {
        url.set_query(Some(&query));
    }

    if path.is_some() {
        Some(url.into())
    } else {
        Some(format!("{}{}", &url[..Position::AfterPort], &url[Position::AfterPath..]))
    }
}

fn query_string(event: &Value) -> Option<String> {
    let query = event
        .get("queryStringParameters")
        .and_then(Value::as_object)
        .filter(|query| !query.is_empty())?;

    let mut pairs = form_urlencoded::Serializer::new(String::new());
    for (key, value) in query {
        match value {
            Value::Array(items) => {
                for item in items {
                    pairs.append_pair(key, &query_value(item));
                }
            }
            other => {
                pairs.append_pair(key, &query_value(other));
            }
        }
    }

    // A literal '+' is already escaped as %2B, so any '+' left is a space.
    Some(pairs.finish().replace('+', "%20"))
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builds_uri_with_query() {
        let event = json!({
            "httpMethod": "GET",
            "headers": {"Host": "api.x.com"},
            "path": "/v1/users",
            "queryStringParameters": {"id": "5"}
        });
        assert_eq!(build_uri(&event), "http://api.x.com/v1/users?id=5");
    }

    #[test]
    fn test_forwarded_proto_case_insensitive() {
        let event = json!({
            "headers": {"host": "api.x.com", "x-forwarded-proto": "https"},
            "path": "/items"
        });
        assert_eq!(build_uri(&event), "https://api.x.com/items");
    }

    #[test]
    fn test_null_query_has_no_question_mark() {
        let event = json!({
            "headers": {"Host": "api.x.com"},
            "path": "/ping",
            "queryStringParameters": null
        });
        assert_eq!(build_uri(&event), "http://api.x.com/ping");
    }

    #[test]
    fn test_query_values_are_encoded() {
        let event = json!({
            "headers": {"Host": "api.x.com"},
            "path": "/search",
            "queryStringParameters": {"q": "a&b"}
        });
        assert_eq!(build_uri(&event), "http://api.x.com/search?q=a%26b");
    }

    #[test]
    fn test_spaces_in_query_are_percent_encoded() {
        let event = json!({
            "headers": {"Host": "api.x.com"},
            "path": "/search",
            "queryStringParameters": {"q": "red shoes", "tag": "a+b"}
        });
        assert_eq!(
            build_uri(&event),
            "http://api.x.com/search?q=red%20shoes&tag=a%2Bb"
        );
    }

    #[test]
    fn test_no_path_adds_no_slash() {
        let event = json!({"headers": {"Host": "api.x.com"}});
        assert_eq!(build_uri(&event), "http://api.x.com");

        let event = json!({
            "headers": {"Host": "api.x.com:8443", "X-Forwarded-Proto": "https"},
            "queryStringParameters": {"id": "5"}
        });
        assert_eq!(build_uri(&event), "https://api.x.com:8443?id=5");
    }

    #[test]
    fn test_multi_value_query() {
        let event = json!({
            "headers": {"Host": "api.x.com"},
            "path": "/items",
            "queryStringParameters": {"id": ["1", "2"]}
        });
        assert_eq!(build_uri(&event), "http://api.x.com/items?id=1&id=2");
    }

    #[test]
    fn test_missing_host_falls_back() {
        let event = json!({"headers": {}, "path": "/v1"});
        assert_eq!(build_uri(&event), "/");
    }

    #[test]
    fn test_missing_headers_falls_back() {
        assert_eq!(build_uri(&json!({"path": "/v1"})), "/");
    }

    #[test]
    fn test_malformed_host_falls_back() {
        let event = json!({"headers": {"Host": "bad host with spaces"}});
        assert_eq!(build_uri(&event), "/");
    }
}
