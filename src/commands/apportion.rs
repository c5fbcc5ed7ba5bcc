use std::{collections::BTreeSet, path::Path};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::{
    apportion::{apportion, CountTable},
    cli::{ApportionArgs, Cli},
    commands::load_config,
    io::{artifact_names, csv::{read_csv, text_column}},
    map::{Level, UnitCode},
    registry::{reconcile, CodeRegistry},
};

pub fn run(cli: &Cli, args: &ApportionArgs) -> Result<()> {
    // Assert output path is not stdout
    if args.output == Path::new("-") { bail!("stdout is not supported."); }
    if args.output.exists() && !args.force {
        bail!("[apportion] {} exists; pass --force to overwrite", args.output.display());
    }

    let config = load_config(cli)?;
    let registry = CodeRegistry::embedded()?;

    let mut table = CountTable::read_csv(&args.input, config.apportion.clone())?;
    let stripped = registry.strip_city_totals(&mut table);
    let table = apportion(&table, registry.ward_remap())?;
    info!(input = %args.input.display(), rows = table.len(), stripped, "[apportion] apportioned table");

    let nodes = args.nodes.clone()
        .unwrap_or_else(|| config.output_dir.join(&artifact_names(Level::Municipality)[1]));
    if nodes.exists() {
        let canonical = registry.canonical_set(Level::Municipality, node_codes(&nodes)?);
        let codes = table.codes().cloned().collect::<BTreeSet<_>>();
        reconcile(&args.input.display().to_string(), &codes, &canonical)
            .into_result(config.strict_reconciliation)?;
    } else {
        warn!(nodes = %nodes.display(), "[apportion] node table not found; skipping reconciliation");
    }

    table.write_csv(&args.output)?;
    info!(output = %args.output.display(), "[apportion] wrote table");
    Ok(())
}

/// Codes listed in a municipality node table.
fn node_codes(path: &Path) -> Result<Vec<UnitCode>> {
    let df = read_csv(path, &["code"])?;
    text_column(&df, "code")?.into_iter().flatten()
        .map(|code| UnitCode::normalize(Level::Municipality, &code).map_err(Into::into))
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("[apportion] Invalid node table: {}", path.display()))
}
