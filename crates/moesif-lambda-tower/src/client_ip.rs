//! Client address resolution for proxy events.
//!
//! Forwarding headers are consulted in the order proxies and CDNs commonly set
//! them, then API Gateway's own `requestContext.identity.sourceIp`.

use crate::fields::{header, headers, lookup_str};
use serde_json::Value;
use std::net::{IpAddr, SocketAddr};

const SINGLE_ADDRESS_HEADERS: [&str; 5] = [
    "cf-connecting-ip",
    "fastly-client-ip",
    "true-client-ip",
    "x-real-ip",
    "x-cluster-client-ip",
];

const LIST_HEADERS: [&str; 3] = ["x-forwarded", "forwarded-for", "forwarded"];

/// Resolves the client address of a proxy event.
pub fn client_ip(event: &Value) -> Option<String> {
    from_headers(event).or_else(|| {
        lookup_str(event, &["requestContext", "identity", "sourceIp"])
            .and_then(parse_ip)
            .map(|ip| ip.to_string())
    })
}

fn from_headers(event: &Value) -> Option<String> {
    let headers = headers(event)?;

    if let Some(ip) = header(headers, "x-client-ip").and_then(parse_ip) {
        return Some(ip.to_string());
    }

    if let Some(ip) = header(headers, "x-forwarded-for").and_then(first_in_list) {
        return Some(ip.to_string());
    }

    SINGLE_ADDRESS_HEADERS
        .iter()
        .find_map(|name| header(headers, name).and_then(parse_ip))
        .or_else(|| {
            LIST_HEADERS
                .iter()
                .find_map(|name| header(headers, name).and_then(first_in_list))
        })
        .map(|ip| ip.to_string())
}

fn first_in_list(list: &str) -> Option<IpAddr> {
    list.split(',').find_map(parse_ip)
}

fn parse_ip(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_forwarded_for_takes_first_valid() {
        let event = json!({
            "headers": {"X-Forwarded-For": "unknown, 203.0.113.7, 10.0.0.1"}
        });
        assert_eq!(client_ip(&event).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_client_ip_header_wins() {
        let event = json!({
            "headers": {"x-client-ip": "198.51.100.2", "x-forwarded-for": "203.0.113.7"}
        });
        assert_eq!(client_ip(&event).as_deref(), Some("198.51.100.2"));
    }

    #[test]
    fn test_port_is_stripped() {
        let event = json!({"headers": {"x-real-ip": "198.51.100.9:443"}});
        assert_eq!(client_ip(&event).as_deref(), Some("198.51.100.9"));
    }

    #[test]
    fn test_falls_back_to_source_ip() {
        let event = json!({
            "headers": {"Host": "api.x.com"},
            "requestContext": {"identity": {"sourceIp": "192.0.2.44"}}
        });
        assert_eq!(client_ip(&event).as_deref(), Some("192.0.2.44"));
    }

    #[test]
    fn test_invalid_values_ignored() {
        let event = json!({
            "headers": {"x-real-ip": "not-an-ip"},
            "requestContext": {"identity": {"sourceIp": "test-invoke-source-ip"}}
        });
        assert!(client_ip(&event).is_none());
    }

    #[test]
    fn test_ipv6() {
        let event = json!({"headers": {"cf-connecting-ip": "2001:db8::1"}});
        assert_eq!(client_ip(&event).as_deref(), Some("2001:db8::1"));
    }
}
