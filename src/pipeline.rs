use std::{collections::{BTreeMap, BTreeSet}, path::PathBuf};

use anyhow::{anyhow, Result};
use tracing::{error, info, warn};

use crate::{
    aggregate::{aggregate, assign_parents, MasterCrosswalk},
    config::BuildConfig,
    error::BuildError,
    graph::{self, AdjacencyGraph, GraphDiagnostics},
    io::{write_graph, SpotCheck},
    load::{load, RecordSource, ShapefileSource},
    map::{AdministrativeUnit, Level},
    registry::CodeRegistry,
};

/// What happened to one level during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum LevelOutcome {
    /// Graph built, validated and written.
    Built { nodes: usize, edges: usize, components: usize },
    /// Units produced for a dependent level only; no artifacts written.
    Loaded { units: usize },
    Failed { error: String },
    /// Not attempted because a level it depends on did not complete.
    Skipped { dependency: Level },
}

/// Per-level outcomes of [`Pipeline::run`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub outcomes: BTreeMap<Level, LevelOutcome>,
}

impl RunSummary {
    #[inline] pub fn outcome(&self, level: Level) -> Option<&LevelOutcome> { self.outcomes.get(&level) }

    /// True when no level failed or was skipped.
    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(|o| matches!(o, LevelOutcome::Built { .. } | LevelOutcome::Loaded { .. }))
    }
}

/// Builds the adjacency graphs for the requested levels.
pub struct Pipeline {
    config: BuildConfig,
    registry: CodeRegistry,
    master: MasterCrosswalk,
    sources: BTreeMap<Level, Box<dyn RecordSource>>,
}

impl Pipeline {
    pub fn new(config: BuildConfig, registry: CodeRegistry, master: MasterCrosswalk) -> Self {
        Self { config, registry, master, sources: BTreeMap::new() }
    }

    /// Pipeline over the shapefiles named in `config`, the embedded registry,
    /// and the configured (or embedded) master table.
    pub fn from_config(config: BuildConfig) -> Result<Self> {
        let master = match &config.master {
            Some(path) => MasterCrosswalk::from_csv(path)?,
            None => MasterCrosswalk::embedded()?,
        };
        let sources = Level::ALL.into_iter()
            .filter_map(|level| config.levels.get(level).source.clone().map(|path| (level, path)))
            .collect::<Vec<(Level, PathBuf)>>();

        let mut pipeline = Self::new(config, CodeRegistry::embedded()?, master);
        for (level, path) in sources {
            pipeline = pipeline.with_source(level, Box::new(ShapefileSource::new(path)));
        }
        Ok(pipeline)
    }

    /// Read `level` from `source` instead of aggregating it.
    pub fn with_source(mut self, level: Level, source: Box<dyn RecordSource>) -> Self {
        self.sources.insert(level, source);
        self
    }

    /// The level whose units `level` is built from, if any.
    fn dependency(&self, level: Level) -> Option<Level> {
        match level {
            Level::Prefecture if !self.sources.contains_key(&Level::Prefecture) => Some(Level::Municipality),
            Level::Block => Some(Level::Prefecture),
            _ => None,
        }
    }

    /// Build `levels` in dependency order. A failure is recorded and logged;
    /// levels depending on the failed one are skipped, the rest still run.
    pub fn run(&self, levels: &[Level]) -> RunSummary {
        let requested = levels.iter().copied().collect::<BTreeSet<_>>();
        let mut needed = requested.clone();
        for level in Level::ALL.into_iter().rev() {
            if needed.contains(&level) {
                if let Some(dependency) = self.dependency(level) { needed.insert(dependency); }
            }
        }

        let mut summary = RunSummary::default();
        let mut done: BTreeMap<Level, Vec<AdministrativeUnit>> = BTreeMap::new();

        for level in Level::ALL.into_iter().filter(|level| needed.contains(level)) {
            if let Some(dependency) = self.dependency(level) {
                if !done.contains_key(&dependency) {
                    warn!(%level, %dependency, "skipping level: dependency did not complete");
                    summary.outcomes.insert(level, LevelOutcome::Skipped { dependency });
                    continue;
                }
            }

            let result = self.units(level, &done).and_then(|units| {
                let outcome = if requested.contains(&level) {
                    self.build_level(level, &units)?
                } else {
                    LevelOutcome::Loaded { units: units.len() }
                };
                Ok((units, outcome))
            });

            match result {
                Ok((units, outcome)) => {
                    done.insert(level, units);
                    summary.outcomes.insert(level, outcome);
                }
                Err(err) => {
                    error!(%level, "level failed: {err:#}");
                    summary.outcomes.insert(level, LevelOutcome::Failed { error: format!("{err:#}") });
                }
            }
        }

        summary
    }

    /// Produce the units of `level`, with parent references attached.
    fn units(&self, level: Level, done: &BTreeMap<Level, Vec<AdministrativeUnit>>) -> Result<Vec<AdministrativeUnit>> {
        let source = || self.sources.get(&level)
            .ok_or_else(|| anyhow!("[pipeline] no source configured for {level}"));
        let built = |dependency: Level| done.get(&dependency)
            .ok_or_else(|| anyhow!("[pipeline] {dependency} units are not available"));

        let mut units = match level {
            Level::District | Level::Municipality => load(level, source()?.as_ref())?,
            Level::Prefecture if self.sources.contains_key(&level) => load(level, source()?.as_ref())?,
            Level::Prefecture => aggregate(built(Level::Municipality)?, &self.master.prefix())?,
            Level::Block => aggregate(built(Level::Prefecture)?, &self.master.pref_to_block())?,
        };

        if level == Level::Municipality {
            let canonical = self.registry.canonical_set(level, units.iter().map(|u| u.code.clone()));
            units.retain(|unit| canonical.contains(&unit.code));
        }

        if let Some(expected) = level.expected_count() {
            if units.len() != expected {
                return Err(BuildError::CardinalityMismatch { level, expected, found: units.len() }.into());
            }
        }

        match level {
            Level::District | Level::Municipality => assign_parents(&mut units, &self.master.prefix())?,
            Level::Prefecture => assign_parents(&mut units, &self.master.pref_to_block())?,
            Level::Block => {}
        }
        Ok(units)
    }

    /// Build, validate and persist the graph over `units`.
    fn build_level(&self, level: Level, units: &[AdministrativeUnit]) -> Result<LevelOutcome> {
        let level_config = self.config.levels.get(level);

        let graph = graph::build(units, &level_config.contiguity)?;
        let diagnostics = GraphDiagnostics::compute(&graph);
        graph::validate(level, &graph, &diagnostics)?;

        if !diagnostics.isolated.is_empty() {
            let names = diagnostics.isolated.iter().take(10)
                .filter_map(|&i| unit_by_code(units, &graph, i))
                .map(|u| u.name.to_string())
                .collect::<Vec<_>>();
            info!(%level, isolated = diagnostics.isolated.len(), "isolated units: {}", names.join(", "));
        }

        let checks = spot_checks(&graph, units, &level_config.spot_checks);
        write_graph(&self.config.output_dir, level, &graph, units, &diagnostics, &checks)?;

        Ok(LevelOutcome::Built {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            components: diagnostics.component_count(),
        })
    }
}

fn unit_by_code<'a>(units: &'a [AdministrativeUnit], graph: &AdjacencyGraph, node: usize) -> Option<&'a AdministrativeUnit> {
    units.iter().find(|u| &u.code == graph.code(node))
}

/// Neighbor names of the units whose region-qualified name is in `names`.
pub fn spot_checks(graph: &AdjacencyGraph, units: &[AdministrativeUnit], names: &[String]) -> Vec<SpotCheck> {
    names.iter()
        .map(|name| {
            let Some(unit) = units.iter().find(|u| u.full_name() == *name) else {
                warn!(name = %name, "spot check: unit not found");
                return SpotCheck { name: name.clone(), code: None, neighbors: Vec::new() };
            };
            let neighbors = graph.index_of(&unit.code)
                .map(|node| graph.neighbors(node).iter()
                    .filter_map(|&j| unit_by_code(units, graph, j as usize))
                    .map(|u| u.name.to_string())
                    .collect::<Vec<_>>())
                .unwrap_or_default();
            info!(name = %name, neighbors = neighbors.len(), "spot check: {}", neighbors.join(", "));
            SpotCheck { name: name.clone(), code: Some(unit.code.to_string()), neighbors }
        })
        .collect()
}
