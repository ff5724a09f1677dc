//! Error types for the Moesif middleware.

use moesif_api::ApiError;
use thiserror::Error;

/// A specialised Result type for middleware setup.
pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// Setup-time failures. These are fatal to building the middleware.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// No options were supplied at all.
    #[error("options are required by the Moesif middleware")]
    MissingOptions,

    /// Neither the options, the config sources nor the environment named an application id.
    #[error("a Moesif application id is required; set it in the options or MOESIF_APPLICATION_ID")]
    MissingApplicationId,

    /// A configuration source supplied data where a function is required.
    #[error("{field} should be a function")]
    NotCallable {
        /// The offending option name.
        field: &'static str,
    },

    /// Configuration sources could not be parsed.
    #[error("failed to load configuration")]
    Load(#[source] Box<figment::Error>),

    /// The collector client could not be created.
    #[error("failed to create collector client")]
    Client(#[from] ApiError),
}

impl From<figment::Error> for ConfigurationError {
    fn from(err: figment::Error) -> Self {
        ConfigurationError::Load(Box::new(err))
    }
}

/// Per-invocation failures while building a record. Never reach the caller.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssembleError {
    /// The event is not an API Gateway proxy integration event.
    #[error("expected an API Gateway proxy event with httpMethod and headers")]
    MalformedEvent,

    /// The record lost a required field, almost always through the mask strategy.
    #[error("{0} is required; check that mask_content does not remove it")]
    InvalidRecord(&'static str),
}

/// Invalid entity update payloads.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A user profile without a user id.
    #[error("to update a user, a userId field is required")]
    MissingUserId,

    /// A company profile without a company id.
    #[error("to update a company, a companyId field is required")]
    MissingCompanyId,

    /// A batch element without a user id.
    #[error("to update users, a userId field is required (missing at index {index})")]
    MissingUserIdInBatch {
        /// Position of the first offending element.
        index: usize,
    },

    /// A batch element without a company id.
    #[error("to update companies, a companyId field is required (missing at index {index})")]
    MissingCompanyIdInBatch {
        /// Position of the first offending element.
        index: usize,
    },
}

/// Failure of an entity update call.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EntityError {
    /// The payload was rejected before any remote call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The collector call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}
