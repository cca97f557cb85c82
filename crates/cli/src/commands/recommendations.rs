//! Commands that talk to the advisor service

use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_health, color_priority, color_source, format_capacity, format_timestamp, print_error,
    print_info, print_json, print_success, print_warning, OutputFormat,
};
use advisor_lib::models::{
    Priority, RecommendationRecord, ServiceAnalysisRequest, ServiceHealth, ServiceKey,
};
use advisor_lib::store::{sort_for_dashboard, AccountOverview};
use serde::Deserialize;

/// Row for recommendations table
#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Cluster")]
    cluster: String,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Health")]
    health: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Capacity")]
    capacity: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Generated")]
    generated_at: String,
}

impl From<&RecommendationRecord> for RecommendationRow {
    fn from(r: &RecommendationRecord) -> Self {
        Self {
            cluster: r.key.cluster_name.clone(),
            service: r.key.service_name.clone(),
            health: color_health(r.service_health),
            action: r.scaling_action.to_string(),
            priority: color_priority(r.priority),
            capacity: format_capacity(r.suggested_capacity.as_ref()),
            source: color_source(r.source),
            generated_at: format_timestamp(&r.generated_at),
        }
    }
}

/// Row for distribution tables
#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Services")]
    count: usize,
}

/// One entry of a batch response
#[derive(Debug, Deserialize, serde::Serialize)]
struct BatchItem {
    #[serde(flatten)]
    service: ServiceKey,
    status: String,
    #[serde(default)]
    record: Option<RecommendationRecord>,
    #[serde(default)]
    error: Option<String>,
}

/// Render records sorted by priority, then health
pub fn print_records(mut records: Vec<RecommendationRecord>, format: OutputFormat) -> Result<()> {
    sort_for_dashboard(&mut records);

    match format {
        OutputFormat::Json => print_json(&records)?,
        OutputFormat::Table => {
            if records.is_empty() {
                print_warning("No recommendations found");
                return Ok(());
            }

            let rows: Vec<RecommendationRow> = records.iter().map(RecommendationRow::from).collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} recommendations", records.len());
        }
    }

    Ok(())
}

/// Render one record with its reason and action items
pub fn print_record(record: &RecommendationRecord, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(record)?,
        OutputFormat::Table => {
            println!("Service:   {}", record.key);
            println!(
                "Health:    {}   Action: {}   Priority: {}",
                color_health(record.service_health),
                record.scaling_action,
                color_priority(record.priority)
            );
            println!("Capacity:  {}", format_capacity(record.suggested_capacity.as_ref()));
            println!(
                "Source:    {} ({})",
                color_source(record.source),
                format_timestamp(&record.generated_at)
            );
            if !record.reason.is_empty() {
                println!("\n{}", record.reason);
            }
            if !record.recommendations.is_empty() {
                println!("\nRecommendations:");
                for (i, item) in record.recommendations.iter().enumerate() {
                    println!("  {}. {}", i + 1, item);
                }
            }
        }
    }
    Ok(())
}

/// List an account's recommendations
pub async fn get_recommendations(
    client: &ApiClient,
    account: &str,
    health: Option<ServiceHealth>,
    priority: Option<Priority>,
    format: OutputFormat,
) -> Result<()> {
    let mut query = Vec::new();
    if let Some(h) = health {
        query.push(("health", h.to_string()));
    }
    if let Some(p) = priority {
        query.push(("priority", p.to_string()));
    }

    let records: Vec<RecommendationRecord> =
        client.get(&["recommendations", account], &query).await?;
    print_records(records, format)
}

/// Show one service's recommendation
pub async fn get_recommendation(
    client: &ApiClient,
    account: &str,
    cluster: &str,
    service: &str,
    format: OutputFormat,
) -> Result<()> {
    match client
        .get_optional::<RecommendationRecord>(&["recommendations", account, cluster, service])
        .await?
    {
        Some(record) => print_record(&record, format),
        None => {
            print_warning(&format!(
                "No current recommendation for {}/{}/{}",
                account, cluster, service
            ));
            Ok(())
        }
    }
}

/// Show an account's health, action and priority distributions
pub async fn get_overview(client: &ApiClient, account: &str, format: OutputFormat) -> Result<()> {
    let overview: AccountOverview = client.get(&["accounts", account, "overview"], &[]).await?;

    match format {
        OutputFormat::Json => print_json(&overview)?,
        OutputFormat::Table => {
            print_info(&format!(
                "Account {}: {} services, {} high priority",
                overview.account_id,
                overview.total_services,
                overview.urgent()
            ));
            for (title, distribution) in [
                ("Health", &overview.health_distribution),
                ("Scaling action", &overview.scaling_distribution),
                ("Priority", &overview.priority_distribution),
                ("Source", &overview.source_distribution),
            ] {
                let rows: Vec<CountRow> = distribution
                    .iter()
                    .map(|(value, count)| CountRow {
                        value: value.clone(),
                        count: *count,
                    })
                    .collect();
                println!("\n{}", title);
                println!(
                    "{}",
                    tabled::Table::new(rows).with(tabled::settings::Style::rounded())
                );
            }
            if let Some(ts) = &overview.last_generated_at {
                println!("\nLast analysis: {}", format_timestamp(ts));
            }
        }
    }

    Ok(())
}

/// Submit requests to the service for analysis
pub async fn submit(
    client: &ApiClient,
    requests: Vec<ServiceAnalysisRequest>,
    format: OutputFormat,
) -> Result<()> {
    if let [request] = requests.as_slice() {
        let record: RecommendationRecord = client.post(&["analyze"], request).await?;
        if let OutputFormat::Table = format {
            print_success(&format!("Analyzed {}", record.key));
        }
        return print_record(&record, format);
    }

    let items: Vec<BatchItem> = client.post(&["analyze", "batch"], &requests).await?;
    if let OutputFormat::Json = format {
        return print_json(&items);
    }

    let mut records = Vec::new();
    for item in items {
        match (item.record, item.error) {
            (Some(record), _) => records.push(record),
            (None, error) => print_error(&format!(
                "{}: {}",
                item.service,
                error.unwrap_or_else(|| item.status.clone())
            )),
        }
    }
    print_records(records, format)
}
