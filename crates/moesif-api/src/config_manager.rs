//! Remote sampling configuration with best-effort background refresh.
//!
//! The middleware never waits on configuration. [`ConfigManager::try_refresh`]
//! only starts a fetch; sampling decisions read whatever copy is cached at
//! that moment, falling back to [`AppConfig::default`] (send everything)
//! until the first fetch lands.

use crate::app_config::AppConfig;
use crate::client::MoesifApi;
use parking_lot::RwLock;
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Default interval between configuration fetches.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Sampling decisions backed by remote configuration.
pub trait ConfigManager: Send + Sync + 'static {
    /// Starts a refresh if one is due. Must not block.
    fn try_refresh(&self);

    /// Decides whether an event for this user/company pair should be sent.
    fn should_send(&self, user_id: Option<&str>, company_id: Option<&str>) -> bool;

    /// Sample rate (0..=100) applied to this user/company pair.
    fn sample_rate(&self, user_id: Option<&str>, company_id: Option<&str>) -> u32;

    /// Records the configuration ETag reported alongside a submitted event.
    fn observe_etag(&self, _etag: &str) {}
}

#[derive(Debug, Default)]
struct CachedConfig {
    config: AppConfig,
    etag: Option<String>,
    last_attempt: Option<Instant>,
}

/// [`ConfigManager`] that polls the collector's `/v1/config` endpoint.
pub struct RemoteConfigManager {
    api: Arc<dyn MoesifApi>,
    state: Arc<RwLock<CachedConfig>>,
    in_flight: Arc<AtomicBool>,
    refresh_interval: Duration,
}

impl RemoteConfigManager {
    /// Creates a manager that fetches through `api` at most once per `refresh_interval`.
    pub fn new(api: Arc<dyn MoesifApi>, refresh_interval: Duration) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(CachedConfig::default())),
            in_flight: Arc::new(AtomicBool::new(false)),
            refresh_interval,
        }
    }

    /// Returns a copy of the cached configuration.
    pub fn current(&self) -> AppConfig {
        self.state.read().config.clone()
    }

    /// Returns the ETag of the cached configuration, if any was served.
    pub fn etag(&self) -> Option<String> {
        self.state.read().etag.clone()
    }

    /// Fetches the configuration now and stores it on success.
    pub async fn refresh(&self) {
        refresh_into(self.api.as_ref(), &self.state).await;
    }

    fn is_due(&self) -> bool {
        match self.state.read().last_attempt {
            Some(at) => at.elapsed() >= self.refresh_interval,
            None => true,
        }
    }
}

impl ConfigManager for RemoteConfigManager {
    fn try_refresh(&self) {
        if !self.is_due() {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(target: "moesif", "No tokio runtime, skipping config refresh");
            return;
        };

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        let in_flight = Arc::clone(&self.in_flight);

        handle.spawn(async move {
            refresh_into(api.as_ref(), &state).await;
            in_flight.store(false, Ordering::Release);
        });
    }

    fn should_send(&self, user_id: Option<&str>, company_id: Option<&str>) -> bool {
        let rate = self.sample_rate(user_id, company_id);
        rand::thread_rng().gen_range(0..100) < rate
    }

    fn sample_rate(&self, user_id: Option<&str>, company_id: Option<&str>) -> u32 {
        self.state.read().config.sample_rate_for(user_id, company_id)
    }

    /// A tag different from the cached one makes the next [`try_refresh`](Self::try_refresh) fetch.
    fn observe_etag(&self, etag: &str) {
        if self.state.read().etag.as_deref() == Some(etag) {
            return;
        }

        let mut cached = self.state.write();
        if cached.etag.as_deref() != Some(etag) && cached.last_attempt.is_some() {
            tracing::debug!(target: "moesif", etag, "Application config changed upstream");
            cached.last_attempt = None;
        }
    }
}

async fn refresh_into(api: &dyn MoesifApi, state: &RwLock<CachedConfig>) {
    let result = api.get_app_config().await;

    let mut cached = state.write();
    cached.last_attempt = Some(Instant::now());

    match result {
        Ok(response) => {
            tracing::debug!(
                target: "moesif",
                etag = ?response.etag,
                sample_rate = response.config.sample_rate,
                "Fetched application config"
            );
            cached.config = response.config;
            cached.etag = response.etag;
        }
        Err(e) => {
            tracing::warn!(target: "moesif", error = %e, "Failed to fetch application config");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::AppConfigResponse;
    use crate::error::{ApiError, Result};
    use crate::models::{CompanyModel, LogData, UserModel};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    struct StaticConfigApi {
        fetches: AtomicUsize,
        config: Option<AppConfig>,
    }

    impl StaticConfigApi {
        fn new(config: Option<AppConfig>) -> Arc<Self> {
            Arc::new(Self {
                fetches: AtomicUsize::new(0),
                config,
            })
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MoesifApi for StaticConfigApi {
        async fn create_event(&self, _event: &LogData) -> Result<Option<String>> {
            Ok(None)
        }

        async fn update_user(&self, _user: &UserModel) -> Result<()> {
            Ok(())
        }

        async fn update_users_batch(&self, _users: &[UserModel]) -> Result<()> {
            Ok(())
        }

        async fn update_company(&self, _company: &CompanyModel) -> Result<()> {
            Ok(())
        }

        async fn update_companies_batch(&self, _companies: &[CompanyModel]) -> Result<()> {
            Ok(())
        }

        async fn get_app_config(&self) -> Result<AppConfigResponse> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            match &self.config {
                Some(config) => Ok(AppConfigResponse {
                    config: config.clone(),
                    etag: Some("etag-1".to_string()),
                }),
                None => Err(ApiError::status(503, "unavailable")),
            }
        }
    }

    fn sampled_config() -> AppConfig {
        AppConfig {
            sample_rate: 0,
            user_sample_rate: HashMap::from([("vip".to_string(), 100)]),
            company_sample_rate: HashMap::new(),
        }
    }

    #[test]
    fn test_defaults_send_everything_before_first_fetch() {
        let manager =
            RemoteConfigManager::new(StaticConfigApi::new(None), DEFAULT_REFRESH_INTERVAL);
        assert_eq!(manager.sample_rate(None, None), 100);
        assert!(manager.should_send(Some("anyone"), None));
    }

    #[test]
    fn test_try_refresh_without_runtime_is_noop() {
        let api = StaticConfigApi::new(Some(sampled_config()));
        let manager = RemoteConfigManager::new(api.clone(), DEFAULT_REFRESH_INTERVAL);
        manager.try_refresh();
        assert_eq!(api.fetches(), 0);
    }

    #[tokio::test]
    async fn test_refresh_applies_rates() {
        let api = StaticConfigApi::new(Some(sampled_config()));
        let manager = RemoteConfigManager::new(api.clone(), DEFAULT_REFRESH_INTERVAL);

        manager.refresh().await;

        assert_eq!(manager.etag().as_deref(), Some("etag-1"));
        assert_eq!(manager.sample_rate(Some("vip"), None), 100);
        assert_eq!(manager.sample_rate(Some("other"), None), 0);
        assert!(manager.should_send(Some("vip"), None));
        assert!(!manager.should_send(Some("other"), None));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_config() {
        let api = StaticConfigApi::new(None);
        let manager = RemoteConfigManager::new(api.clone(), DEFAULT_REFRESH_INTERVAL);

        manager.refresh().await;

        assert_eq!(api.fetches(), 1);
        assert_eq!(manager.current(), AppConfig::default());
        assert!(manager.etag().is_none());
    }

    #[tokio::test]
    async fn test_try_refresh_fetches_once_per_interval() {
        let api = StaticConfigApi::new(Some(sampled_config()));
        let manager = RemoteConfigManager::new(api.clone(), Duration::from_secs(3600));

        manager.try_refresh();
        manager.try_refresh();

        tokio::time::timeout(Duration::from_secs(2), async {
            while manager.etag().is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("config was not fetched");

        manager.try_refresh();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(api.fetches(), 1);
    }

    #[tokio::test]
    async fn test_changed_etag_makes_refresh_due() {
        let api = StaticConfigApi::new(Some(sampled_config()));
        let manager = RemoteConfigManager::new(api.clone(), Duration::from_secs(3600));

        manager.refresh().await;
        assert!(!manager.is_due());

        manager.observe_etag("etag-1");
        assert!(!manager.is_due());

        manager.observe_etag("etag-2");
        assert!(manager.is_due());

        manager.try_refresh();
        tokio::time::timeout(Duration::from_secs(2), async {
            while api.fetches() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("config was not refetched after etag change");
    }

    #[tokio::test]
    async fn test_try_refresh_refetches_when_due() {
        let api = StaticConfigApi::new(Some(sampled_config()));
        let manager = RemoteConfigManager::new(api.clone(), Duration::ZERO);

        manager.refresh().await;
        manager.try_refresh();

        tokio::time::timeout(Duration::from_secs(2), async {
            while api.fetches() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("config was not refetched");
    }
}
