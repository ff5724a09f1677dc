//! Collector API trait and its HTTP implementation.
//!
//! [`MoesifApi`] is the seam the middleware talks to. [`MoesifClient`] is the
//! `reqwest` implementation that posts JSON to the collector. There are no
//! retries: a failed call is reported once and the payload is dropped.

use crate::app_config::{AppConfig, AppConfigResponse};
use crate::error::{ApiError, Result};
use crate::models::{CompanyModel, LogData, UserModel};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Default collector base URI.
pub const DEFAULT_BASE_URI: &str = "https://api.moesif.net";

const APPLICATION_ID_HEADER: &str = "X-Moesif-Application-Id";
const CONFIG_ETAG_HEADER: &str = "X-Moesif-Config-ETag";
const USER_AGENT: &str = concat!("moesif-lambda-rust/", env!("CARGO_PKG_VERSION"));

/// Remote operations offered by the collector.
#[async_trait]
pub trait MoesifApi: Send + Sync + 'static {
    /// Submits one event record.
    ///
    /// Returns the configuration ETag the collector reported, if any.
    async fn create_event(&self, event: &LogData) -> Result<Option<String>>;

    /// Creates or updates one user profile.
    async fn update_user(&self, user: &UserModel) -> Result<()>;

    /// Creates or updates several user profiles in one call.
    async fn update_users_batch(&self, users: &[UserModel]) -> Result<()>;

    /// Creates or updates one company profile.
    async fn update_company(&self, company: &CompanyModel) -> Result<()>;

    /// Creates or updates several company profiles in one call.
    async fn update_companies_batch(&self, companies: &[CompanyModel]) -> Result<()>;

    /// Fetches the application's sampling configuration.
    async fn get_app_config(&self) -> Result<AppConfigResponse>;
}

/// Connection settings for [`MoesifClient`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Application id sent with every request.
    pub application_id: String,
    /// Collector base URI, without a trailing slash.
    pub base_uri: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ApiConfig {
    /// Creates settings for the given application id with default endpoint and timeout.
    pub fn new(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            base_uri: DEFAULT_BASE_URI.to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// HTTP client for the Moesif collector.
#[derive(Debug, Clone)]
pub struct MoesifClient {
    config: ApiConfig,
    client: Client,
}

impl MoesifClient {
    /// Creates a client for the given settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the application id is empty or the HTTP client
    /// cannot be created.
    pub fn new(config: ApiConfig) -> Result<Self> {
        if config.application_id.is_empty() {
            return Err(ApiError::MissingApplicationId);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { config, client })
    }

    /// Returns the configured base URI.
    pub fn base_uri(&self) -> &str {
        &self.config.base_uri
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_uri.trim_end_matches('/'), path)
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, payload: &T) -> Result<()> {
        self.post(path, payload).await.map(drop)
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.url(path))
            .header(APPLICATION_ID_HEADER, &self.config.application_id)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::status(status.as_u16(), body))
        }
    }
}

#[async_trait]
impl MoesifApi for MoesifClient {
    async fn create_event(&self, event: &LogData) -> Result<Option<String>> {
        let response = self.post("/v1/events", event).await?;
        Ok(config_etag(&response))
    }

    async fn update_user(&self, user: &UserModel) -> Result<()> {
        self.post_json("/v1/users", user).await
    }

    async fn update_users_batch(&self, users: &[UserModel]) -> Result<()> {
        self.post_json("/v1/users/batch", users).await
    }

    async fn update_company(&self, company: &CompanyModel) -> Result<()> {
        self.post_json("/v1/companies", company).await
    }

    async fn update_companies_batch(&self, companies: &[CompanyModel]) -> Result<()> {
        self.post_json("/v1/companies/batch", companies).await
    }

    async fn get_app_config(&self) -> Result<AppConfigResponse> {
        let response = self
            .client
            .get(self.url("/v1/config"))
            .header(APPLICATION_ID_HEADER, &self.config.application_id)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::status(status.as_u16(), body));
        }

        let etag = config_etag(&response);

        let bytes = response.bytes().await?;
        let config: AppConfig = serde_json::from_slice(&bytes)?;

        Ok(AppConfigResponse { config, etag })
    }
}

fn config_etag(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(CONFIG_ETAG_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
