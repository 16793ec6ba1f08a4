mod build;
mod cli;
mod commands;
mod config;
mod error;
mod icons;
mod manifest;
mod plist;
mod specs;
mod utils;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 诊断日志走 stderr；RUST_LOG 优先，-v 时默认 debug
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = commands::run(cli)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
