//! `feedloop config` – print where the config lives and what is in effect.

use anyhow::Result;
use feedloop_core::config::{self, FeedLoopConfig};
use std::path::Path;

pub fn show_config(cfg: &FeedLoopConfig, explicit: Option<&Path>) -> Result<()> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => config::config_path()?,
    };
    println!("# {}", path.display());
    print!("{}", render(cfg)?);

    let lifecycle = cfg.lifecycle_policy();
    let read = cfg.read_policy();
    println!();
    println!("# lifecycle calls: {}", describe_attempts(lifecycle.max_attempts));
    println!("# feed reads:      {}", describe_attempts(read.max_attempts));
    Ok(())
}

fn render(cfg: &FeedLoopConfig) -> Result<String> {
    Ok(toml::to_string_pretty(cfg)?)
}

fn describe_attempts(max_attempts: Option<u32>) -> String {
    match max_attempts {
        Some(1) => "1 attempt (no retry)".to_string(),
        Some(n) => format!("up to {} attempts", n),
        None => "unbounded attempts".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_attempt_budgets() {
        assert_eq!(describe_attempts(Some(1)), "1 attempt (no retry)");
        assert_eq!(describe_attempts(Some(4)), "up to 4 attempts");
        assert_eq!(describe_attempts(None), "unbounded attempts");
    }

    #[test]
    fn renders_bot_username() {
        let cfg = FeedLoopConfig {
            bot_username: Some("bot".into()),
            ..FeedLoopConfig::default()
        };
        assert!(render(&cfg).unwrap().contains("bot_username = \"bot\""));
    }
}
