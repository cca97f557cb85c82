//! Output formatting utilities

use advisor_lib::models::{
    Priority, RecommendationSource, ServiceHealth, SuggestedCapacity,
};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn color_health(health: ServiceHealth) -> String {
    let label = health.as_str();
    match health {
        ServiceHealth::Good => label.green().to_string(),
        ServiceHealth::Warning => label.yellow().to_string(),
        ServiceHealth::Critical => label.red().bold().to_string(),
        ServiceHealth::Error => label.magenta().to_string(),
    }
}

pub fn color_priority(priority: Priority) -> String {
    let label = priority.as_str();
    match priority {
        Priority::High => label.red().to_string(),
        Priority::Medium => label.yellow().to_string(),
        Priority::Low => label.dimmed().to_string(),
    }
}

pub fn color_source(source: RecommendationSource) -> String {
    let label = source.as_str();
    match source {
        RecommendationSource::Ai => label.cyan().to_string(),
        RecommendationSource::Fallback => label.blue().to_string(),
    }
}

/// Compact `tasks/cpu/memory` rendering of a capacity suggestion
pub fn format_capacity(capacity: Option<&SuggestedCapacity>) -> String {
    let Some(c) = capacity else {
        return "-".to_string();
    };
    let mut parts = Vec::new();
    if let Some(count) = c.desired_count {
        parts.push(format!("{} tasks", count));
    }
    if let Some(cpu) = c.cpu_units {
        parts.push(format!("{} cpu", cpu));
    }
    if let Some(memory) = c.memory_mb {
        parts.push(format!("{} MiB", memory));
    }
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}

/// Format timestamp for display
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_capacity() {
        assert_eq!(format_capacity(None), "-");
        assert_eq!(format_capacity(Some(&SuggestedCapacity::default())), "-");
        let c = SuggestedCapacity {
            desired_count: Some(3),
            cpu_units: None,
            memory_mb: Some(2048.0),
        };
        assert_eq!(format_capacity(Some(&c)), "3 tasks, 2048 MiB");
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 8, 12, 30, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-05-08 12:30");
    }

    #[test]
    fn test_colored_labels_keep_text() {
        colored::control::set_override(false);
        assert_eq!(color_health(ServiceHealth::Critical), "critical");
        assert_eq!(color_priority(Priority::Low), "low");
        assert_eq!(color_source(RecommendationSource::Ai), "ai");
    }
}
