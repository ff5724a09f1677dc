//! Moesif Tower middleware for AWS Lambda.
//!
//! This crate provides a Tower middleware layer that logs API Gateway proxy
//! invocations to Moesif. Every request/response pair handled by the wrapped
//! function is normalised into a [`moesif_api::LogData`] record, sampled
//! against the application's remote configuration and submitted in the
//! background. The handler's result is never delayed or altered by logging.
//!
//! # Usage
//!
//! ```no_run
//! use lambda_runtime::{run, service_fn, Error, LambdaEvent};
//! use moesif_lambda_tower::{MoesifConfig, MoesifLayer, Options};
//! use serde_json::{json, Value};
//! use tower::ServiceBuilder;
//!
//! async fn handler(event: LambdaEvent<Value>) -> Result<Value, Error> {
//!     Ok(json!({"statusCode": 200, "body": "{\"ok\":true}"}))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let options = Options::builder()
//!         .config(MoesifConfig::load()?)
//!         .identify_company(|event, _ctx| {
//!             event["headers"]["X-Organization-Id"].as_str().map(str::to_string)
//!         })
//!         .build()?;
//!
//!     let service = ServiceBuilder::new()
//!         .layer(MoesifLayer::new(options)?)
//!         .service(service_fn(handler));
//!
//!     run(service).await
//! }
//! ```
//!
//! # Record assembly
//!
//! Events are read structurally. Anything carrying `httpMethod` and a
//! `headers` object is treated as a proxy integration event; anything else is
//! passed through without a record. Extraction of user, company, session
//! token, metadata, tags and API version is delegated to strategies on
//! [`Options`], each with a default in [`options::defaults`].
//!
//! # Configuration
//!
//! Data settings load from `/var/task/moesif.toml` and `MOESIF_*` environment
//! variables via [`MoesifConfig`]. Strategies are closures and can only be
//! set on [`OptionsBuilder`].

#![forbid(unsafe_code)]

mod assembler;
mod body;
mod client_ip;
mod config;
mod dispatch;
mod entity;
mod error;
mod fields;
mod future;
mod layer;
mod service;
mod start_time;
mod uri;

pub mod options;

#[cfg(test)]
mod testing;

pub use assembler::{MISSING_STATUS, assemble, validate};
pub use body::{DecodedBody, decode_body};
pub use client_ip::client_ip;
pub use config::MoesifConfig;
pub use dispatch::weight_for_rate;
pub use error::{AssembleError, ConfigurationError, EntityError, Result, ValidationError};
pub use future::MoesifFuture;
pub use layer::{MoesifLayer, MoesifLayerBuilder};
pub use options::{Options, OptionsBuilder};
pub use service::MoesifService;
pub use start_time::process_start_time;
pub use uri::build_uri;
