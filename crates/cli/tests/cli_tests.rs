//! CLI integration tests

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

fn ecsr(args: &[&str], config: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ecsr"))
        .args(args)
        .env("ECSR_CONFIG", config)
        .env_remove("ECSR_API_URL")
        .env_remove("ECSR_ACCOUNT")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute command")
}

fn requests_file(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("requests.json");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"[
            {{
                "account_id": "111122223333",
                "cluster_name": "prod",
                "service_name": "checkout",
                "metrics": {{
                    "desired_count": 2,
                    "running_count": 2,
                    "series": [
                        {{"metric": "CPUUtilization", "samples": [
                            {{"timestamp": "2024-05-08T11:00:00Z", "value": 85.0}}
                        ]}},
                        {{"metric": "MemoryUtilization", "samples": [
                            {{"timestamp": "2024-05-08T11:00:00Z", "value": 60.0}}
                        ]}}
                    ]
                }},
                "logs": ["ERROR java.lang.OutOfMemoryError: Java heap space"]
            }},
            {{
                "account_id": "111122223333",
                "cluster_name": "prod",
                "service_name": "idle",
                "metrics": {{
                    "series": [
                        {{"metric": "cpu", "samples": [
                            {{"timestamp": "2024-05-08T11:00:00Z", "value": 5.0}}
                        ]}},
                        {{"metric": "memory", "samples": [
                            {{"timestamp": "2024-05-08T11:00:00Z", "value": 10.0}}
                        ]}}
                    ]
                }}
            }}
        ]"#
    )
    .unwrap();
    path
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = ecsr(&["--help"], &dir.path().join("config.json"));
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("ECS Scaling Advisor"), "Should show app name");
    for command in ["get", "submit", "analyze", "prompt", "config"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let dir = tempfile::tempdir().unwrap();
    let output = ecsr(&["--version"], &dir.path().join("config.json"));

    assert!(output.status.success(), "CLI version should succeed");
    assert!(String::from_utf8_lossy(&output.stdout).contains("ecsr"));
}

#[test]
fn test_get_recommendations_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = ecsr(
        &["get", "recommendations", "--help"],
        &dir.path().join("config.json"),
    );
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--health"));
    assert!(stdout.contains("--priority"));
}

#[test]
fn test_invalid_health_filter_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = ecsr(
        &["--account", "1", "get", "recommendations", "--health", "degraded"],
        &dir.path().join("config.json"),
    );
    assert!(!output.status.success());
}

#[test]
fn test_get_without_account_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = ecsr(&["get", "overview"], &dir.path().join("config.json"));

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no account given"));
}

#[test]
fn test_offline_analyze_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = requests_file(dir.path());
    let output = ecsr(
        &["--format", "json", "analyze", input.to_str().unwrap()],
        &dir.path().join("config.json"),
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);

    // Sorted by priority: the saturated service first
    assert_eq!(records[0]["service_name"], "checkout");
    assert_eq!(records[0]["scaling_action"], "scale_up");
    assert_eq!(records[0]["source"], "fallback");
    assert_eq!(records[1]["service_name"], "idle");
    assert_eq!(records[1]["scaling_action"], "scale_down");
}

#[test]
fn test_offline_analyze_respects_threshold_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let input = requests_file(dir.path());
    let overrides = dir.path().join("analysis.json");
    std::fs::write(&overrides, r#"{"cpu_high_threshold": 90.0}"#).unwrap();

    let output = ecsr(
        &[
            "--format",
            "json",
            "analyze",
            input.to_str().unwrap(),
            "--analysis-config",
            overrides.to_str().unwrap(),
        ],
        &dir.path().join("config.json"),
    );

    assert!(output.status.success());
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let checkout = records
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["service_name"] == "checkout")
        .unwrap();
    assert_eq!(checkout["scaling_action"], "no_change");
}

#[test]
fn test_prompt_payload() {
    let dir = tempfile::tempdir().unwrap();
    let input = requests_file(dir.path());
    let output = ecsr(&["prompt", input.to_str().unwrap()], &dir.path().join("config.json"));

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"response_schema\""));
    assert!(stdout.contains("\"OutOfMemory\""));
}

#[test]
fn test_config_set_and_show() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");

    let output = ecsr(
        &["config", "set", "--api-url", "http://advisor:9000", "--account", "42"],
        &config,
    );
    assert!(output.status.success());

    let output = ecsr(&["config", "show"], &config);
    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["api_url"], "http://advisor:9000");
    assert_eq!(shown["default_account"], "42");
}

#[test]
fn test_get_recommendations_from_service() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/v1/recommendations/111122223333")
        .match_query(mockito::Matcher::UrlEncoded(
            "priority".into(),
            "high".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[{
                "account_id": "111122223333",
                "cluster_name": "prod",
                "service_name": "checkout",
                "service_health": "critical",
                "scaling_action": "no_change",
                "priority": "high",
                "reason": "Unhealthy targets",
                "recommendations": ["Check target health"],
                "generated_at": "2024-05-08T12:00:00Z",
                "source": "ai"
            }]"#,
        )
        .create();

    let dir = tempfile::tempdir().unwrap();
    let output = ecsr(
        &[
            "--api-url",
            &server.url(),
            "--account",
            "111122223333",
            "get",
            "recommendations",
            "--priority",
            "high",
        ],
        &dir.path().join("config.json"),
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("checkout"));
    assert!(stdout.contains("critical"));
    mock.assert();
}
