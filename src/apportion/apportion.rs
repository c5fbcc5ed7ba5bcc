use std::collections::BTreeSet;

use anyhow::{ensure, Result};
use tracing::{debug, info, warn};

use crate::{
    apportion::{table::sum_present, CountTable},
    error::BuildError,
    map::UnitCode,
    registry::WardRemap,
};

/// Relative tolerance for the before/after total check.
const TOTAL_TOLERANCE: f64 = 1e-6;

/// Redistribute count columns from retiring codes into their successors.
///
/// Each successor receives its full predecessors' counts plus each split
/// predecessor's counts times its ratio. Ratio columns of successor rows are
/// recomputed from the apportioned counts. Retiring and aggregate codes are
/// dropped. A table without retiring codes is returned unchanged.
pub fn apportion(table: &CountTable, remap: &WardRemap) -> Result<CountTable> {
    let present = table.codes()
        .filter(|code| remap.is_retiring(code))
        .cloned()
        .collect::<BTreeSet<UnitCode>>();
    if present.is_empty() {
        debug!("no retiring codes in table; nothing to apportion");
        return Ok(table.clone());
    }

    if let Some(code) = present.iter().find(|code| !remap.is_referenced(code)) {
        return Err(BuildError::MissingApportionmentRatio { code: code.to_string() }.into());
    }

    let mut out = table.clone();
    let width = table.schema().counts.len();
    if !table.schema().passthrough.is_empty() {
        warn!(
            columns = ?table.schema().passthrough,
            "columns without a ratio formula are left missing on successor rows",
        );
    }

    for successor in remap.successors() {
        ensure!(
            !table.contains(successor.code()),
            "[apportion] table already holds successor {} alongside its predecessors", successor.code()
        );

        let mut contributions = vec![Vec::new(); width];
        for (predecessor, weight) in successor.contributors() {
            let row = table.row(predecessor).ok_or_else(|| BuildError::MissingPredecessor {
                successor: successor.code().to_string(),
                predecessor: predecessor.to_string(),
            })?;
            for (column, value) in row.counts.iter().enumerate() {
                contributions[column].push(value.map(|v| v * weight));
            }
        }

        let counts = contributions.into_iter().map(sum_present).collect();
        out.insert(successor.code().clone(), Some(successor.name()), counts)?;
    }

    for code in present.iter().chain(remap.aggregates()) {
        out.remove(code);
    }

    let successors = remap.successors().iter().map(|s| s.code()).collect::<Vec<_>>();
    for (column, metric) in table.schema().counts.iter().enumerate() {
        let before = table.total(column, &present);
        let after = out.total(column, successors.iter().copied());
        if (after - before).abs() > TOTAL_TOLERANCE * before.abs().max(1.0) {
            return Err(BuildError::TotalNotPreserved { metric: metric.clone(), before, after }.into());
        }
    }

    info!(
        retired = present.len(),
        successors = successors.len(),
        rows = out.len(),
        "apportioned counts to successor codes",
    );
    Ok(out)
}
