//! ECS Advisor - scaling recommendation service
//!
//! Accepts per-service CloudWatch metrics and log lines, produces scaling
//! recommendations (model-backed when a text-generation endpoint is
//! configured, rule-based otherwise) and serves them over HTTP.

use advisor_lib::{
    health::HealthRegistry,
    observability::StructuredLogger,
    recommender::AnalysisPipeline,
    store::InMemoryStore,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod model;

const ADVISOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// How often expired recommendations are dropped from memory
const PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting ecs-advisor");

    let config = config::AdvisorConfig::load()?;
    info!(
        instance = %config.instance_name,
        api_port = config.api_port,
        model_configured = config.model_endpoint.is_some(),
        "Advisor configured"
    );

    let health_registry = HealthRegistry::new();
    let logger = StructuredLogger::new(&config.instance_name);
    let store = Arc::new(InMemoryStore::new());

    let mut pipeline = AnalysisPipeline::new(config.pipeline_config(), store.clone())
        .context("Invalid analysis configuration")?
        .with_health(health_registry.clone())
        .with_logger(logger.clone());

    match &config.model_endpoint {
        Some(endpoint) => {
            let generator = model::HttpTextGenerator::new(
                endpoint,
                config.model_api_token.clone(),
                Duration::from_secs(config.model_timeout_secs),
            )?;
            pipeline = pipeline.with_generator(Arc::new(generator));
        }
        None => warn!("No model endpoint configured, recommendations will be rule-based"),
    }

    pipeline.register_components().await;
    logger.log_startup(ADVISOR_VERSION, pipeline.has_generator());

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        Arc::new(pipeline),
    ));

    // Mark advisor as ready after initialization
    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let purge_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            store.purge_expired();
        }
    });

    tokio::select! {
        result = api_handle => {
            purge_handle.abort();
            match result {
                Ok(Err(e)) => return Err(e.context("API server failed")),
                Err(e) => return Err(anyhow::Error::new(e).context("API server task panicked")),
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
            purge_handle.abort();
        }
    }

    info!("Shutting down");
    Ok(())
}
