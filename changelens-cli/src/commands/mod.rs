pub mod analyze;
pub mod check_config;

use std::path::Path;

use anyhow::Context;
use changelens_core::ChangelensConfig;
use changelens_core::config::CONFIG_FILE_NAME;
use clap::Subcommand;
use tracing::debug;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a unified diff against before/after snapshot directories
    Analyze(analyze::AnalyzeArgs),
    /// Validate a configuration file and optionally print the effective settings
    CheckConfig(check_config::CheckConfigArgs),
}

pub fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Analyze(args) => analyze::run(args),
        Command::CheckConfig(args) => check_config::run(&args),
    }
}

/// Load the explicit config file, else `changelens.toml` from the working
/// directory when present, else the defaults.
pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<ChangelensConfig> {
    let path = match path {
        Some(path) => path,
        None if Path::new(CONFIG_FILE_NAME).is_file() => Path::new(CONFIG_FILE_NAME),
        None => {
            debug!("No configuration file, using defaults");
            return Ok(ChangelensConfig::default());
        }
    };
    ChangelensConfig::load(path)
        .with_context(|| format!("Cannot load configuration: {}", path.display()))
}
