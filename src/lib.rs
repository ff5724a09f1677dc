//! Moesif Lambda Workspace - end-to-end tests for the Moesif Lambda middleware.
//!
//! This is a virtual package that provides workspace-level integration tests.
//! The actual functionality is provided by the workspace member crates:
//!
//! - `moesif-api`: Collector client, wire models and sampling configuration
//! - `moesif-lambda-tower`: Tower middleware that logs API Gateway invocations
//! - `moesif-lambda-example`: Example function wired through the middleware
