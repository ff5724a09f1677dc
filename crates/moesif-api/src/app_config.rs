//! Application configuration served by the collector's `/v1/config` endpoint.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const FULL_SAMPLE_RATE: u32 = 100;

/// Sampling table for one application.
///
/// Rates are percentages. A per-user rate wins over a per-company rate, which
/// wins over the application-wide rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application-wide sample rate.
    pub sample_rate: u32,
    /// Overrides keyed by user id.
    pub user_sample_rate: HashMap<String, u32>,
    /// Overrides keyed by company id.
    pub company_sample_rate: HashMap<String, u32>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sample_rate: FULL_SAMPLE_RATE,
            user_sample_rate: HashMap::new(),
            company_sample_rate: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Resolves the sample rate for a user/company pair, clamped to `0..=100`.
    pub fn sample_rate_for(&self, user_id: Option<&str>, company_id: Option<&str>) -> u32 {
        let rate = user_id
            .and_then(|id| self.user_sample_rate.get(id))
            .or_else(|| company_id.and_then(|id| self.company_sample_rate.get(id)))
            .copied()
            .unwrap_or(self.sample_rate);

        rate.min(FULL_SAMPLE_RATE)
    }
}

/// An [`AppConfig`] together with the ETag it was served under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfigResponse {
    pub config: AppConfig,
    pub etag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            sample_rate: 50,
            user_sample_rate: HashMap::from([("alice".to_string(), 10)]),
            company_sample_rate: HashMap::from([("acme".to_string(), 25)]),
        }
    }

    #[test]
    fn test_default_sends_everything() {
        assert_eq!(AppConfig::default().sample_rate_for(None, None), 100);
    }

    #[test]
    fn test_user_rate_wins_over_company() {
        assert_eq!(config().sample_rate_for(Some("alice"), Some("acme")), 10);
    }

    #[test]
    fn test_company_rate_when_user_unlisted() {
        assert_eq!(config().sample_rate_for(Some("bob"), Some("acme")), 25);
    }

    #[test]
    fn test_global_rate_fallback() {
        assert_eq!(config().sample_rate_for(Some("bob"), None), 50);
    }

    #[test]
    fn test_rate_is_clamped() {
        let config = AppConfig {
            sample_rate: 250,
            ..Default::default()
        };
        assert_eq!(config.sample_rate_for(None, None), 100);
    }

    #[test]
    fn test_deserialize_partial_document() {
        let config: AppConfig =
            serde_json::from_str(r#"{"user_sample_rate": {"u": 5}}"#).unwrap();
        assert_eq!(config.sample_rate, 100);
        assert_eq!(config.sample_rate_for(Some("u"), None), 5);
    }
}
