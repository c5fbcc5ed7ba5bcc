use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use kuiki::cli::{Cli, Commands};
use kuiki::commands::{apportion, build};

/// Log to stderr; `RUST_LOG` overrides the level chosen by `-v`.
fn init_tracing(verbose: u8) -> Result<()> {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install tracing subscriber")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;
    match &cli.command {
        Commands::Build(args) => build::run(&cli, args),
        Commands::Apportion(args) => apportion::run(&cli, args),
    }
}
