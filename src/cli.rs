use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use crate::map::Level;

/// Adjacency graphs and canonical codes for Japan's administrative hierarchy
#[derive(Parser, Debug)]
#[command(name = "kuiki", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// TOML configuration file (defaults to ./kuiki.toml when present)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build adjacency graphs for one or more levels
    Build(BuildArgs),

    /// Move a per-municipality table onto the current ward codes
    Apportion(ApportionArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Levels to build: district, municipality, prefecture, block (default: all)
    #[arg(short, long = "level", value_delimiter = ',')]
    pub levels: Vec<Level>,

    /// Output directory (overrides the config file)
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ApportionArgs {
    /// Input CSV keyed by municipality code
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output CSV (must be a file path; "-" is rejected)
    #[arg(value_hint = ValueHint::FilePath)]
    pub output: PathBuf,

    /// Municipality node table to reconcile against
    /// (default: <output_dir>/adj_municipality_nodes.csv)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub nodes: Option<PathBuf>,

    /// Overwrite if the file exists
    #[arg(long)]
    pub force: bool,
}
