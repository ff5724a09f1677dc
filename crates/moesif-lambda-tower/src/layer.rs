//! Tower Layer implementation for Moesif request logging.

use crate::dispatch::Dispatcher;
use crate::entity;
use crate::error::{EntityError, Result};
use crate::options::Options;
use crate::service::MoesifService;
use moesif_api::{
    CompanyModel, ConfigManager, MoesifApi, MoesifClient, RemoteConfigManager, UserModel,
};
use std::sync::Arc;
use tower::Layer;

/// Tower layer that logs API Gateway proxy invocations to Moesif.
///
/// Each invocation is passed through to the wrapped handler untouched. When
/// the handler completes, a record is assembled from the event, the Lambda
/// context and the handler's response, then sent in the background. The
/// handler's result is returned as soon as it is available.
///
/// The layer also exposes the user and company update calls so a handler can
/// keep profiles current with the same client.
///
/// # Example
///
/// ```ignore
/// use moesif_lambda_tower::{MoesifLayer, Options};
/// use tower::ServiceBuilder;
///
/// let layer = MoesifLayer::new(Options::builder().application_id("my-app-id").build()?)?;
///
/// let service = ServiceBuilder::new()
///     .layer(layer)
///     .service(my_handler);
/// ```
#[derive(Clone)]
pub struct MoesifLayer {
    dispatcher: Dispatcher,
}

impl MoesifLayer {
    /// Creates a layer that talks to the collector named in `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if the collector client cannot be created.
    pub fn new(options: Options) -> Result<Self> {
        Self::builder(options).build()
    }

    /// Creates a builder for supplying custom collaborators.
    pub fn builder(options: Options) -> MoesifLayerBuilder {
        MoesifLayerBuilder::new(options)
    }

    /// The normalised options in use.
    pub fn options(&self) -> &Options {
        &self.dispatcher.options
    }

    /// Creates or updates a user profile.
    ///
    /// # Errors
    ///
    /// Returns a validation error without calling the collector if `user_id`
    /// is empty, otherwise the collector's error.
    pub async fn update_user(&self, user: &UserModel) -> std::result::Result<(), EntityError> {
        entity::update_user(self.dispatcher.api.as_ref(), user).await
    }

    /// Creates or updates several user profiles in one call.
    ///
    /// # Errors
    ///
    /// Every element must carry a `user_id`; the first that does not is reported.
    pub async fn update_users_batch(
        &self,
        users: &[UserModel],
    ) -> std::result::Result<(), EntityError> {
        entity::update_users_batch(self.dispatcher.api.as_ref(), users).await
    }

    /// Creates or updates a company profile.
    ///
    /// # Errors
    ///
    /// Returns a validation error without calling the collector if
    /// `company_id` is empty, otherwise the collector's error.
    pub async fn update_company(
        &self,
        company: &CompanyModel,
    ) -> std::result::Result<(), EntityError> {
        entity::update_company(self.dispatcher.api.as_ref(), company).await
    }

    /// Creates or updates several company profiles in one call.
    ///
    /// # Errors
    ///
    /// Every element must carry a `company_id`; the first that does not is reported.
    pub async fn update_companies_batch(
        &self,
        companies: &[CompanyModel],
    ) -> std::result::Result<(), EntityError> {
        entity::update_companies_batch(self.dispatcher.api.as_ref(), companies).await
    }
}

impl<S> Layer<S> for MoesifLayer {
    type Service = MoesifService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MoesifService::new(inner, self.dispatcher.clone())
    }
}

/// Builder for configuring a [`MoesifLayer`].
///
/// # Example
///
/// ```ignore
/// use moesif_lambda_tower::{MoesifLayer, Options};
/// use std::sync::Arc;
///
/// let layer = MoesifLayer::builder(options)
///     .api(Arc::new(my_client))
///     .build()?;
/// ```
#[must_use = "builders do nothing unless .build() is called"]
pub struct MoesifLayerBuilder {
    options: Options,
    api: Option<Arc<dyn MoesifApi>>,
    config_manager: Option<Arc<dyn ConfigManager>>,
}

impl MoesifLayerBuilder {
    /// Creates a new builder with the given options.
    pub fn new(options: Options) -> Self {
        Self {
            options,
            api: None,
            config_manager: None,
        }
    }

    /// Sets the collector API used for events and profile updates.
    ///
    /// If not set, a [`MoesifClient`] is created from the options.
    pub fn api(mut self, api: Arc<dyn MoesifApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Sets the source of sampling decisions.
    ///
    /// If not set, a [`RemoteConfigManager`] polling the collector API is used.
    pub fn config_manager(mut self, config_manager: Arc<dyn ConfigManager>) -> Self {
        self.config_manager = Some(config_manager);
        self
    }

    /// Builds the configured layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the default collector client cannot be created.
    pub fn build(self) -> Result<MoesifLayer> {
        crate::start_time::init();

        let api: Arc<dyn MoesifApi> = match self.api {
            Some(api) => api,
            None => Arc::new(MoesifClient::new(self.options.api_config())?),
        };

        let config_manager = self.config_manager.unwrap_or_else(|| {
            Arc::new(RemoteConfigManager::new(
                Arc::clone(&api),
                self.options.config_refresh_interval(),
            ))
        });

        tracing::debug!(
            target: "moesif",
            base_uri = self.options.base_uri(),
            log_body = self.options.log_body(),
            "Moesif middleware ready"
        );

        Ok(MoesifLayer {
            dispatcher: Dispatcher {
                options: Arc::new(self.options),
                api,
                config_manager,
            },
        })
    }
}
