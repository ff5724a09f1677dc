//! Client for the Moesif collector API.
//!
//! This crate holds the remote collaborators of the Lambda middleware:
//!
//! - [`MoesifApi`] and its HTTP implementation [`MoesifClient`], which submit
//!   event records and user/company profile updates
//! - [`ConfigManager`] and [`RemoteConfigManager`], which cache the
//!   application's sampling configuration and make per-event send decisions
//! - the wire models ([`LogData`], [`UserModel`], [`CompanyModel`])
//!
//! Delivery is single-shot. Nothing here retries, queues, or persists.

#![forbid(unsafe_code)]

mod app_config;
mod client;
mod config_manager;
mod error;
mod models;

pub use app_config::{AppConfig, AppConfigResponse};
pub use client::{ApiConfig, DEFAULT_BASE_URI, MoesifApi, MoesifClient};
pub use config_manager::{ConfigManager, DEFAULT_REFRESH_INTERVAL, RemoteConfigManager};
pub use error::{ApiError, Result};
pub use models::{
    CompanyModel, Direction, EventRequest, EventResponse, LogData, TransferEncoding, UserModel,
};
