//! HTTP handler Lambda runtime logged to Moesif.
//!
//! Environment variables:
//! - `AWS_LAMBDA_RUNTIME_API` - Required, set by the Lambda service
//! - `MOESIF_APPLICATION_ID` - Collector application id, unless set in `/var/task/moesif.toml`
//! - `MOESIF_BASE_URI` - Collector endpoint (default: https://api.moesif.net)
//! - `RUST_LOG` - Log filter (default: `info,moesif=debug`)

use lambda_runtime::Runtime;
use moesif_lambda_example::{build_layer, create_http_service, init_tracing};

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    init_tracing();

    let layer = build_layer()?;
    let service = create_http_service(layer);

    Runtime::new(service).run().await
}
