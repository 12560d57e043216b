//! CLI parse tests.

use super::{Cli, CliCommand};
use clap::Parser;
use std::path::PathBuf;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn cli_parse_replay() {
    let cli = parse(&["feedloop", "replay", "script.json"]);
    assert!(cli.config.is_none());
    match cli.command {
        CliCommand::Replay { script, no_backoff } => {
            assert_eq!(script, PathBuf::from("script.json"));
            assert!(!no_backoff);
        }
        _ => panic!("expected Replay"),
    }
}

#[test]
fn cli_parse_replay_no_backoff_with_config() {
    let cli = parse(&["feedloop", "replay", "s.json", "--no-backoff", "--config", "/tmp/c.toml"]);
    assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    match cli.command {
        CliCommand::Replay { no_backoff, .. } => assert!(no_backoff),
        _ => panic!("expected Replay with no_backoff"),
    }
}

#[test]
fn cli_parse_config() {
    let cli = parse(&["feedloop", "--config", "c.toml", "config"]);
    assert!(matches!(cli.command, CliCommand::Config));
    assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
}

#[test]
fn cli_replay_requires_script() {
    assert!(Cli::try_parse_from(["feedloop", "replay"]).is_err());
}

#[test]
fn cli_rejects_unknown_command() {
    assert!(Cli::try_parse_from(["feedloop", "status"]).is_err());
}
