use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Configuration file (default: ./changelens.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the effective configuration as TOML
    #[arg(long)]
    pub show: bool,
}

pub fn run(args: &CheckConfigArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.config.as_deref())?;

    if args.show {
        let text = config
            .to_toml_string()
            .context("Cannot serialize configuration")?;
        print!("{text}");
    } else {
        println!("Configuration OK");
    }
    Ok(())
}
