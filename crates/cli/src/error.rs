//! CLI usage errors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("no account given: pass --account, set ECSR_ACCOUNT, or run `ecsr config set --account <id>`")]
    MissingAccount,

    #[error("failed to read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("{path} is not a service analysis request or a list of them: {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    #[error("{path} is not a valid analysis configuration: {reason}")]
    InvalidAnalysisConfig { path: PathBuf, reason: String },
}
