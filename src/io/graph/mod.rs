//! Per-level graph artifacts: CSR matrix, node table, JSON report and manifest.

mod manifest;
mod nodes;
mod report;

use std::{collections::BTreeMap, path::{Path, PathBuf}};

use anyhow::Result;
use tracing::info;

use crate::{
    common::{ensure_dir_exists, sha256_file, write_all_or_none},
    graph::{AdjacencyGraph, GraphDiagnostics},
    io::{csr::write_csr_bytes, csv::csv_bytes},
    map::{AdministrativeUnit, Level},
};

pub use manifest::{FileHash, LevelEntry, Manifest};
pub use report::SpotCheck;

/// File names of one level's artifacts.
pub fn artifact_names(level: Level) -> [String; 3] {
    [
        format!("adj_{level}.csr"),
        format!("adj_{level}_nodes.csv"),
        format!("adj_{level}_report.json"),
    ]
}

/// Write the CSR matrix, node table and report for `level` into `dir`, then
/// record their hashes in the directory's manifest. Returns the paths written.
pub fn write_graph(
    dir: &Path,
    level: Level,
    graph: &AdjacencyGraph,
    units: &[AdministrativeUnit],
    diagnostics: &GraphDiagnostics,
    spot_checks: &[SpotCheck],
) -> Result<Vec<PathBuf>> {
    ensure_dir_exists(dir)?;
    let [csr_name, nodes_name, report_name] = artifact_names(level);

    // Build everything before touching the directory so a failure leaves no partial level
    let csr = write_csr_bytes(graph)?;
    let nodes = csv_bytes(&mut nodes::node_table(graph, units)?)?;
    let mut report = serde_json::to_vec_pretty(&report::LevelReport::new(level, graph, diagnostics, spot_checks))?;
    report.push(b'\n');

    let staged = vec![
        (dir.join(&csr_name), csr),
        (dir.join(&nodes_name), nodes),
        (dir.join(&report_name), report),
    ];
    if let Err(err) = write_all_or_none(&staged) {
        // The level's files may be gone, so its manifest entry no longer describes them
        let mut manifest = Manifest::load_or_default(dir)?;
        if manifest.levels.remove(&level).is_some() {
            manifest.save(dir)?;
        }
        return Err(err);
    }

    let mut files = BTreeMap::new();
    let mut paths = Vec::new();
    for name in [csr_name, nodes_name, report_name] {
        let path = dir.join(&name);
        files.insert(name, FileHash { sha256: sha256_file(&path)? });
        paths.push(path);
    }

    let mut manifest = Manifest::load_or_default(dir)?;
    manifest.levels.insert(level, LevelEntry { nodes: graph.node_count(), edges: graph.edge_count(), files });
    manifest.save(dir)?;

    info!(%level, dir = %dir.display(), nodes = graph.node_count(), edges = graph.edge_count(), "wrote graph artifacts");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{io::{csr::read_csr, csv::{read_csv, text_column}}, map::{ParentRef, UnitCode}};
    use geo::{polygon, MultiPolygon};
    use std::sync::Arc;

    fn fixture() -> (AdjacencyGraph, Vec<AdministrativeUnit>) {
        let units = ["01", "02", "03"].iter().enumerate()
            .map(|(i, c)| {
                let x = i as f64;
                let mut unit = AdministrativeUnit::new(
                    UnitCode::normalize(Level::Prefecture, c).unwrap(),
                    &format!("pref{c}"),
                    MultiPolygon(vec![polygon![(x: x, y: 0.0), (x: x + 1.0, y: 0.0), (x: x + 1.0, y: 1.0), (x: x, y: 0.0)]]),
                );
                unit.parent = Some(ParentRef {
                    code: UnitCode::normalize(Level::Block, "2").unwrap(),
                    name: Arc::from("東北"),
                });
                unit
            })
            .collect::<Vec<_>>();
        let codes = units.iter().map(|u| u.code.clone()).collect();
        let graph = AdjacencyGraph::from_neighbor_lists(codes, &[vec![1], vec![0, 2], vec![1]]).unwrap();
        (graph, units)
    }

    #[test]
    fn writes_all_artifacts_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let (graph, units) = fixture();
        let diagnostics = GraphDiagnostics::compute(&graph);
        let paths = write_graph(dir.path(), Level::Prefecture, &graph, &units, &diagnostics, &[]).unwrap();
        assert_eq!(paths.len(), 3);

        assert_eq!(read_csr(&paths[0]).unwrap(), graph.to_neighbor_lists());

        let nodes = read_csv(&paths[1], &["code", "parent_code"]).unwrap();
        assert_eq!(nodes.height(), 3);
        let codes = text_column(&nodes, "code").unwrap();
        assert_eq!(codes[0].as_deref(), Some("01"));
        assert_eq!(text_column(&nodes, "parent_code").unwrap()[2].as_deref(), Some("02"));

        let manifest = Manifest::load_or_default(dir.path()).unwrap();
        let entry = &manifest.levels[&Level::Prefecture];
        assert_eq!((entry.nodes, entry.edges), (3, 2));
        assert_eq!(entry.files["adj_prefecture.csr"].sha256, sha256_file(&paths[0]).unwrap());
    }

    #[test]
    fn manifest_accumulates_levels() {
        let dir = tempfile::tempdir().unwrap();
        let (graph, units) = fixture();
        let diagnostics = GraphDiagnostics::compute(&graph);
        write_graph(dir.path(), Level::Prefecture, &graph, &units, &diagnostics, &[]).unwrap();

        let empty = AdjacencyGraph::from_neighbor_lists(Vec::new(), &[]).unwrap();
        write_graph(dir.path(), Level::Block, &empty, &[], &GraphDiagnostics::compute(&empty), &[]).unwrap();

        let manifest = Manifest::load_or_default(dir.path()).unwrap();
        assert_eq!(manifest.levels.keys().copied().collect::<Vec<_>>(), vec![Level::Prefecture, Level::Block]);
    }

    #[test]
    fn node_without_unit_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (graph, mut units) = fixture();
        units.pop();
        let diagnostics = GraphDiagnostics::compute(&graph);
        assert!(write_graph(dir.path(), Level::Prefecture, &graph, &units, &diagnostics, &[]).is_err());
        assert!(!dir.path().join("adj_prefecture.csr").exists());
    }

    #[test]
    fn failed_rebuild_removes_the_whole_level() {
        let dir = tempfile::tempdir().unwrap();
        let (graph, units) = fixture();
        let diagnostics = GraphDiagnostics::compute(&graph);
        write_graph(dir.path(), Level::Prefecture, &graph, &units, &diagnostics, &[]).unwrap();

        // A directory where the report belongs makes its move fail after the csr and nodes moved
        let report = dir.path().join("adj_prefecture_report.json");
        std::fs::remove_file(&report).unwrap();
        std::fs::create_dir(&report).unwrap();
        std::fs::write(report.join("keep"), b"").unwrap();

        assert!(write_graph(dir.path(), Level::Prefecture, &graph, &units, &diagnostics, &[]).is_err());
        assert!(!dir.path().join("adj_prefecture.csr").exists());
        assert!(!dir.path().join("adj_prefecture_nodes.csv").exists());
        let leftovers = std::fs::read_dir(dir.path()).unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .count();
        assert_eq!(leftovers, 0);
        assert!(!Manifest::load_or_default(dir.path()).unwrap().levels.contains_key(&Level::Prefecture));
    }
}
