use serde::{Deserialize, Serialize};

use crate::{graph::{AdjacencyGraph, GraphDiagnostics}, map::Level};

/// Neighbors of one named unit, for eyeballing a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotCheck {
    pub name: String,
    pub code: Option<String>,
    pub neighbors: Vec<String>,
}

/// Contents of `adj_<level>_report.json`.
#[derive(Debug, Serialize)]
pub(crate) struct LevelReport<'a> {
    pub level: Level,
    pub nodes: usize,
    pub edges: usize,
    pub component_sizes: Vec<usize>,
    pub diagnostics: &'a GraphDiagnostics,
    pub spot_checks: &'a [SpotCheck],
}

impl<'a> LevelReport<'a> {
    pub(crate) fn new(level: Level, graph: &AdjacencyGraph, diagnostics: &'a GraphDiagnostics, spot_checks: &'a [SpotCheck]) -> Self {
        Self {
            level,
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            component_sizes: diagnostics.component_sizes(),
            diagnostics,
            spot_checks,
        }
    }
}
