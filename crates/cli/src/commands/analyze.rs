//! Offline commands: run the pipeline locally without a service

use anyhow::{Context, Result};
use std::sync::Arc;

use super::recommendations::print_records;
use crate::output::{print_error, print_json, OutputFormat};
use advisor_lib::models::ServiceAnalysisRequest;
use advisor_lib::recommender::{AnalysisPipeline, PipelineConfig};
use advisor_lib::store::InMemoryStore;
use advisor_lib::AnalysisConfig;
use chrono::Utc;

fn offline_pipeline(analysis: AnalysisConfig) -> Result<AnalysisPipeline> {
    let config = PipelineConfig {
        analysis,
        ..Default::default()
    };
    AnalysisPipeline::new(config, Arc::new(InMemoryStore::new()))
        .context("Invalid analysis configuration")
}

/// Classify services locally with the rule-based path
pub async fn analyze(
    requests: Vec<ServiceAnalysisRequest>,
    analysis: AnalysisConfig,
    format: OutputFormat,
) -> Result<()> {
    let pipeline = Arc::new(offline_pipeline(analysis)?);
    let outcomes = pipeline.analyze_batch(requests, Utc::now()).await;

    let mut records = Vec::with_capacity(outcomes.len());
    let mut failures = 0usize;
    for outcome in outcomes {
        match outcome.result {
            Ok(record) => records.push(record),
            Err(e) => {
                failures += 1;
                print_error(&format!("{}: {}", outcome.key, e));
            }
        }
    }

    print_records(records, format)?;
    if failures > 0 {
        anyhow::bail!("{} service(s) could not be analyzed", failures);
    }
    Ok(())
}

/// Print the model request that would be sent for each service
pub fn prompt(
    requests: Vec<ServiceAnalysisRequest>,
    analysis: AnalysisConfig,
    render: bool,
) -> Result<()> {
    let pipeline = offline_pipeline(analysis)?;

    for request in &requests {
        let (_, _, payload) = pipeline
            .prepare(request)
            .with_context(|| format!("Invalid metrics for {}", request.key()))?;
        if render {
            println!("{}", payload.render());
        } else {
            print_json(&payload)?;
        }
    }
    Ok(())
}
