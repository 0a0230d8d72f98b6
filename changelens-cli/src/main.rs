use changelens_core::error::ConfigError;
use changelens_core::{AnalysisError, ErrorCode};
use clap::Parser;

mod commands;
mod render;

#[derive(Parser, Debug)]
#[command(
    name = "changelens",
    version,
    about = "Assess the API impact of a PHP change set"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Classify an error into a process exit code.
///
///   0: analysis completed (any risk level)
///   1: general/unknown error
///   2: configuration error
///   3: missing input (diff, snapshot directory or file content)
///   4: invalid diff or file content
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    if let Some(analysis) = err.chain().find_map(|e| e.downcast_ref::<AnalysisError>()) {
        return match analysis.code() {
            ErrorCode::MissingContent => 3,
            ErrorCode::InvalidConfig => 2,
            ErrorCode::Internal => 1,
        };
    }

    if err.chain().any(|e| e.downcast_ref::<ConfigError>().is_some()) {
        return 2;
    }

    let lower = format!("{err:#}").to_lowercase();
    if lower.contains("invalid diff") || lower.contains("invalid content") {
        4
    } else if lower.contains("cannot read") || lower.contains("cannot resolve path") {
        3
    } else if lower.contains("config") {
        2
    } else {
        1
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    // Reports go to stdout; logs stay on stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match commands::run(cli.command) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}
