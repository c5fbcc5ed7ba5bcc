use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::{
    cli::{BuildArgs, Cli},
    commands::load_config,
    map::Level,
    pipeline::{LevelOutcome, Pipeline},
};

pub fn run(cli: &Cli, args: &BuildArgs) -> Result<()> {
    let mut config = load_config(cli)?;
    if let Some(out) = &args.out { config.output_dir = out.clone() }

    let levels = if args.levels.is_empty() { Level::ALL.to_vec() } else { args.levels.clone() };
    info!(levels = ?levels, out = %config.output_dir.display(), "[build] starting");

    let summary = Pipeline::from_config(config)?.run(&levels);

    for (level, outcome) in &summary.outcomes {
        match outcome {
            LevelOutcome::Built { nodes, edges, components } =>
                info!(%level, nodes, edges, components, "[build] built"),
            LevelOutcome::Loaded { units } => info!(%level, units, "[build] loaded as a dependency"),
            LevelOutcome::Failed { error } => warn!(%level, error = %error, "[build] failed"),
            LevelOutcome::Skipped { dependency } => warn!(%level, %dependency, "[build] skipped"),
        }
    }

    if !summary.is_success() {
        let incomplete = summary.outcomes.iter()
            .filter(|(_, o)| matches!(o, LevelOutcome::Failed { .. } | LevelOutcome::Skipped { .. }))
            .map(|(level, _)| level.as_str())
            .collect::<Vec<_>>();
        bail!("[build] incomplete levels: {}", incomplete.join(", "));
    }
    Ok(())
}
