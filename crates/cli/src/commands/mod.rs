//! CLI command implementations

pub mod analyze;
pub mod recommendations;

use crate::error::CliError;
use advisor_lib::models::ServiceAnalysisRequest;
use advisor_lib::AnalysisConfig;
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum RequestFile {
    Many(Vec<ServiceAnalysisRequest>),
    One(Box<ServiceAnalysisRequest>),
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Read one request or an array of requests from a JSON file
pub fn load_requests(path: &Path) -> Result<Vec<ServiceAnalysisRequest>, CliError> {
    let content = read(path)?;
    let parsed: RequestFile =
        serde_json::from_str(&content).map_err(|e| CliError::InvalidInput {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(match parsed {
        RequestFile::Many(requests) => requests,
        RequestFile::One(request) => vec![*request],
    })
}

/// Read an analysis configuration (JSON), or the defaults when no path is given
pub fn load_analysis_config(path: Option<&Path>) -> Result<AnalysisConfig, CliError> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let content = read(path)?;
    serde_json::from_str(&content).map_err(|e| CliError::InvalidAnalysisConfig {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_single_request() {
        let file = write_temp(
            r#"{"account_id":"1","cluster_name":"prod","service_name":"api"}"#,
        );
        let requests = load_requests(file.path()).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].service_name, "api");
        assert!(requests[0].logs.is_empty());
    }

    #[test]
    fn test_request_list() {
        let file = write_temp(
            r#"[{"account_id":"1","cluster_name":"prod","service_name":"a"},
                {"account_id":"1","cluster_name":"prod","service_name":"b","logs":["ERROR x"]}]"#,
        );
        let requests = load_requests(file.path()).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].logs, vec!["ERROR x".to_string()]);
    }

    #[test]
    fn test_invalid_input() {
        let file = write_temp(r#"{"service_name": 3}"#);
        assert!(matches!(
            load_requests(file.path()),
            Err(CliError::InvalidInput { .. })
        ));
        assert!(matches!(
            load_requests(Path::new("/nonexistent/requests.json")),
            Err(CliError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_analysis_config_overrides() {
        let file = write_temp(r#"{"cpu_high_threshold": 70.0, "top_signatures_limit": 2}"#);
        let config = load_analysis_config(Some(file.path())).unwrap();
        assert_eq!(config.thresholds.cpu_high_threshold, 70.0);
        assert_eq!(config.thresholds.memory_high_threshold, 80.0);
        assert_eq!(config.top_signatures_limit, 2);
        assert_eq!(load_analysis_config(None).unwrap(), AnalysisConfig::default());
    }
}
