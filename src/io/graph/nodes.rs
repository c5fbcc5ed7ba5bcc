use std::collections::BTreeMap;

use anyhow::{Context, Result};
use polars::{frame::DataFrame, prelude::Column};

use crate::{graph::AdjacencyGraph, map::{AdministrativeUnit, UnitCode}};

/// Node table aligned with the graph's row order:
/// `idx, code, name, region, parent_code, parent_name`.
pub(crate) fn node_table(graph: &AdjacencyGraph, units: &[AdministrativeUnit]) -> Result<DataFrame> {
    let by_code = units.iter().map(|u| (&u.code, u)).collect::<BTreeMap<&UnitCode, _>>();
    let rows = graph.codes().iter()
        .map(|code| by_code.get(code).copied()
            .with_context(|| format!("[io::graph::nodes] graph node {code} has no unit")))
        .collect::<Result<Vec<_>>>()?;

    Ok(DataFrame::new(vec![
        Column::new("idx".into(), (0..rows.len() as u32).collect::<Vec<_>>()),
        Column::new("code".into(), rows.iter().map(|u| u.code.as_str()).collect::<Vec<_>>()),
        Column::new("name".into(), rows.iter().map(|u| &*u.name).collect::<Vec<_>>()),
        Column::new("region".into(), rows.iter().map(|u| u.region.as_deref()).collect::<Vec<_>>()),
        Column::new(
            "parent_code".into(),
            rows.iter().map(|u| u.parent.as_ref().map(|p| p.code.as_str())).collect::<Vec<_>>(),
        ),
        Column::new(
            "parent_name".into(),
            rows.iter().map(|u| u.parent.as_ref().map(|p| &*p.name)).collect::<Vec<_>>(),
        ),
    ])?)
}
