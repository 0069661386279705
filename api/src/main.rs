//! CAP API Server Binary
//!
//! Entry point for the CAP tenant management API server.

#![deny(unsafe_code)]

use anyhow::Result;
use shared::observability::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let config = api::Config::from_env()?;
    init_logging(&config.logging)?;

    api::run_server_with_config(config).await
}
