use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::BuildError,
    geom::{snap_to_grid, Geometries},
    graph::{AdjacencyGraph, GraphDiagnostics},
    map::{AdministrativeUnit, Level},
};

/// Tuning knobs for the contiguity test.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ContiguityOptions {
    /// Bounding-box padding for R-tree candidate search, in coordinate units.
    pub bbox_tolerance: f64,
    /// Snap coordinates to this grid before testing; 0 disables snapping.
    pub snap_grid: f64,
}

impl Default for ContiguityOptions {
    fn default() -> Self {
        Self { bbox_tolerance: 1e-9, snap_grid: 0.0 }
    }
}

/// Build the Queen-contiguity graph over `units`.
///
/// Nodes are ordered by ascending code regardless of input order, so the
/// same units always produce the same node indices.
pub fn build(units: &[AdministrativeUnit], options: &ContiguityOptions) -> Result<AdjacencyGraph> {
    let mut order = (0..units.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| units[a].code.cmp(&units[b].code));
    ensure!(
        order.windows(2).all(|w| units[w[0]].code != units[w[1]].code),
        "[graph::build] duplicate unit codes; dissolve before building"
    );

    let shapes = order.iter()
        .map(|&i| snap_to_grid(&units[i].geometry, options.snap_grid))
        .collect::<Vec<_>>();
    let codes = order.iter().map(|&i| units[i].code.clone()).collect::<Vec<_>>();

    debug!(units = units.len(), "computing queen contiguity");
    let adjacencies = Geometries::new(shapes).queen_adjacencies(options.bbox_tolerance)?;

    AdjacencyGraph::from_neighbor_lists(codes, &adjacencies)
}

/// Apply the per-level validation policy to a built graph.
///
/// Fixed-cardinality levels must match exactly. More than one connected
/// component is reported but never rejected: islands are legitimately
/// disconnected from the mainland.
pub fn validate(level: Level, graph: &AdjacencyGraph, diagnostics: &GraphDiagnostics) -> Result<(), BuildError> {
    if let Some(expected) = level.expected_count() {
        if graph.node_count() != expected {
            return Err(BuildError::CardinalityMismatch { level, expected, found: graph.node_count() });
        }
    }

    info!(
        %level,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        min = diagnostics.min_neighbors,
        max = diagnostics.max_neighbors,
        mean = %format!("{:.1}", diagnostics.mean_neighbors),
        "neighbor cardinalities",
    );

    if diagnostics.component_count() > 1 {
        let sizes = diagnostics.component_sizes();
        warn!(
            %level,
            components = diagnostics.component_count(),
            mainland = sizes[0],
            isolated = diagnostics.isolated.len(),
            "graph spans more than one connected component (sizes {sizes:?})",
        );
    }

    Ok(())
}
