//! CLI command handlers. Each command is in its own file.

mod config;
mod replay;

pub use config::show_config;
pub use replay::run_replay;
