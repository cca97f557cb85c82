//! ECS Scaling Advisor CLI
//!
//! A command-line tool for querying scaling recommendations, submitting
//! services for analysis, and running the analysis offline.

mod client;
mod commands;
mod config;
mod error;
mod output;

use advisor_lib::models::{Priority, ServiceHealth};
use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{analyze, recommendations};
use std::path::PathBuf;

/// ECS Scaling Advisor CLI
#[derive(Parser)]
#[command(name = "ecsr")]
#[command(author, version, about = "CLI for the ECS Scaling Advisor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (falls back to the config file, then http://localhost:8080)
    #[arg(long, env = "ECSR_API_URL")]
    pub api_url: Option<String>,

    /// AWS account ID (falls back to the config file)
    #[arg(long, short, env = "ECSR_ACCOUNT")]
    pub account: Option<String>,

    /// Path to the CLI config file (default ~/.config/ecsr/config.json)
    #[arg(long, env = "ECSR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Query stored recommendations
    #[command(subcommand)]
    Get(GetCommands),

    /// Submit services from a JSON file to the advisor for analysis
    Submit {
        /// File holding one request object or an array of them
        file: PathBuf,
    },

    /// Analyze services from a JSON file locally, using the rule-based path
    Analyze {
        /// File holding one request object or an array of them
        file: PathBuf,

        /// JSON file with threshold, window and log pattern overrides
        #[arg(long)]
        analysis_config: Option<PathBuf>,
    },

    /// Print the model request payload for services in a JSON file
    Prompt {
        /// File holding one request object or an array of them
        file: PathBuf,

        /// JSON file with threshold, window and log pattern overrides
        #[arg(long)]
        analysis_config: Option<PathBuf>,

        /// Print the rendered text prompt instead of the JSON payload
        #[arg(long)]
        render: bool,
    },

    /// Manage CLI defaults
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum GetCommands {
    /// List an account's recommendations, most urgent first
    Recommendations {
        /// Filter by health (good, warning, critical, error)
        #[arg(long)]
        health: Option<ServiceHealth>,

        /// Filter by priority (high, medium, low)
        #[arg(long)]
        priority: Option<Priority>,
    },

    /// Show one service's recommendation
    Recommendation {
        /// ECS cluster name
        cluster: String,

        /// ECS service name
        service: String,
    },

    /// Show an account's health and priority distribution
    Overview,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Store default API URL and account
    Set {
        #[arg(long)]
        api_url: Option<String>,

        #[arg(long)]
        account: Option<String>,
    },

    /// Show the effective defaults
    Show,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    let settings = config::Config::load(config_path)?;

    let api_url = cli
        .api_url
        .clone()
        .or_else(|| settings.api_url.clone())
        .unwrap_or_else(|| config::DEFAULT_API_URL.to_string());
    let account = cli.account.clone().or_else(|| settings.default_account.clone());

    match cli.command {
        Commands::Get(get_cmd) => {
            let client = client::ApiClient::new(&api_url)?;
            let account = account.ok_or(error::CliError::MissingAccount)?;
            match get_cmd {
                GetCommands::Recommendations { health, priority } => {
                    recommendations::get_recommendations(
                        &client, &account, health, priority, cli.format,
                    )
                    .await?;
                }
                GetCommands::Recommendation { cluster, service } => {
                    recommendations::get_recommendation(
                        &client, &account, &cluster, &service, cli.format,
                    )
                    .await?;
                }
                GetCommands::Overview => {
                    recommendations::get_overview(&client, &account, cli.format).await?;
                }
            }
        }
        Commands::Submit { file } => {
            let client = client::ApiClient::new(&api_url)?;
            let requests = commands::load_requests(&file)?;
            recommendations::submit(&client, requests, cli.format).await?;
        }
        Commands::Analyze {
            file,
            analysis_config,
        } => {
            let requests = commands::load_requests(&file)?;
            let analysis = commands::load_analysis_config(analysis_config.as_deref())?;
            analyze::analyze(requests, analysis, cli.format).await?;
        }
        Commands::Prompt {
            file,
            analysis_config,
            render,
        } => {
            let requests = commands::load_requests(&file)?;
            let analysis = commands::load_analysis_config(analysis_config.as_deref())?;
            analyze::prompt(requests, analysis, render)?;
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Set {
                api_url: new_url,
                account: new_account,
            } => {
                let mut updated = settings;
                if new_url.is_some() {
                    updated.api_url = new_url;
                }
                if new_account.is_some() {
                    updated.default_account = new_account;
                }
                let path = updated.save(config_path)?;
                output::print_success(&format!("Saved defaults to {}", path.display()));
            }
            ConfigCommands::Show => {
                output::print_json(&config::Config {
                    api_url: Some(api_url),
                    default_account: account,
                })?;
            }
        },
    }

    Ok(())
}
