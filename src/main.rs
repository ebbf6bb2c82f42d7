use std::sync::Arc;

use anyhow::{Context, Result};
use tourplan::{Orchestrator, TourPlanConfig, telemetry, web};

#[tokio::main]
async fn main() -> Result<()> {
    let config = TourPlanConfig::load().context("Failed to load configuration")?;
    telemetry::init(&config.logging)?;

    tracing::info!(version = tourplan::VERSION, "TourPlan starting");

    let orchestrator =
        Orchestrator::from_config(&config).context("Failed to set up upstream clients")?;
    web::run(Arc::new(orchestrator), &config.server).await
}
