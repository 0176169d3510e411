//! CLI argument parsing tests.
//!
//! Tests that BridgeArgs parses correctly from command-line strings and that
//! the parsed values resolve into the expected configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use mimo_bridge::cli::BridgeArgs;
use mimo_bridge::config::{ConfigError, DEFAULT_LOG_FILE};

// ─────────────────────────────────────────────────────────────────────────────
// Test Harness
// ─────────────────────────────────────────────────────────────────────────────

/// Minimal CLI parser that mirrors main.rs's Cli, usable from integration tests.
#[derive(Parser)]
#[command(name = "mimo-bridge")]
struct TestCli {
    #[command(flatten)]
    args: BridgeArgs,
}

/// Parse a command-line string into BridgeArgs.
fn parse(args: &[&str]) -> Result<BridgeArgs, clap::Error> {
    TestCli::try_parse_from(args).map(|cli| cli.args)
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_basic_defaults() {
    let args = parse(&["mimo-bridge"]).unwrap();
    assert!(!args.no_diagnostics);
    assert!(!args.verbose);
    assert!(args.env.is_empty());
    assert!(args.wait_ceiling.is_none());
    assert!(args.terminate_grace.is_none());
    assert!(args.command.is_empty());
}

#[test]
fn test_all_options() {
    let args = parse(&[
        "mimo-bridge",
        "--config",
        "/etc/mimo/bridge.yaml",
        "--log-file",
        "/var/log/mimo-bridge.log",
        "--no-diagnostics",
        "-e",
        "MIX_ENV=prod",
        "--env",
        "LOG_LEVEL=debug",
        "--wait-ceiling",
        "250ms",
        "--terminate-grace",
        "5s",
        "--verbose",
        "--",
        "docker",
        "exec",
        "-i",
        "mimo-mcp",
    ])
    .unwrap();

    assert_eq!(args.config, Some(PathBuf::from("/etc/mimo/bridge.yaml")));
    assert_eq!(args.log_file, Some(PathBuf::from("/var/log/mimo-bridge.log")));
    assert!(args.no_diagnostics);
    assert_eq!(
        args.env,
        vec![
            ("MIX_ENV".to_string(), "prod".to_string()),
            ("LOG_LEVEL".to_string(), "debug".to_string()),
        ]
    );
    assert_eq!(args.wait_ceiling, Some(Duration::from_millis(250)));
    assert_eq!(args.terminate_grace, Some(Duration::from_secs(5)));
    assert!(args.verbose);
    assert_eq!(args.command, vec!["docker", "exec", "-i", "mimo-mcp"]);
}

#[test]
fn test_command_flags_not_parsed_as_bridge_flags() {
    let args = parse(&["mimo-bridge", "--", "mix", "run", "--no-halt", "-e", "Mimo.McpCli.run()"])
        .unwrap();
    assert!(args.env.is_empty());
    assert_eq!(
        args.command,
        vec!["mix", "run", "--no-halt", "-e", "Mimo.McpCli.run()"]
    );
}

#[test]
fn test_invalid_env_pair_rejected() {
    assert!(parse(&["mimo-bridge", "-e", "NOEQUALS"]).is_err());
    assert!(parse(&["mimo-bridge", "-e", "=value"]).is_err());
}

#[test]
fn test_invalid_duration_rejected() {
    assert!(parse(&["mimo-bridge", "--wait-ceiling", "soon"]).is_err());
    assert!(parse(&["mimo-bridge", "--terminate-grace", "10"]).is_err());
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolution
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_resolve_without_config_file() {
    let args = parse(&["mimo-bridge", "-e", "A=1", "--", "cat"]).unwrap();
    let config = args.resolve().unwrap();
    assert_eq!(config.launch.program, "cat");
    assert_eq!(config.launch.env, vec![("A".to_string(), "1".to_string())]);
    assert!(config.diagnostics);
    assert_eq!(config.log_file, PathBuf::from(DEFAULT_LOG_FILE));
}

#[test]
fn test_resolve_with_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.yaml");
    std::fs::write(
        &path,
        "command: [ssh, -T, mimo-host]\nlog_file: /tmp/from-file.log\nterminate_grace: 1s\n",
    )
    .unwrap();

    let args = parse(&[
        "mimo-bridge",
        "--config",
        path.to_str().unwrap(),
        "--terminate-grace",
        "7s",
    ])
    .unwrap();
    let config = args.resolve().unwrap();

    assert_eq!(config.launch.program, "ssh");
    assert_eq!(config.launch.args, vec!["-T", "mimo-host"]);
    assert_eq!(config.log_file, PathBuf::from("/tmp/from-file.log"));
    assert_eq!(config.shutdown.terminate_grace, Duration::from_secs(7));
}

#[test]
fn test_resolve_missing_config_file() {
    let args = parse(&["mimo-bridge", "--config", "/nonexistent/bridge.yaml"]).unwrap();
    assert!(matches!(
        args.resolve().unwrap_err(),
        ConfigError::ConfigFileNotFound { .. }
    ));
}
