use std::{fs, path::{Path, PathBuf}};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    apportion::{RatioSpec, TableSchema},
    graph::ContiguityOptions,
    map::Level,
};

/// Precision grid (degrees) applied to prefecture and block outlines before testing.
pub const COARSE_GRID: f64 = 0.002;

/// Settings for one level of the build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Shapefile to read units from. Prefectures without a source are
    /// aggregated from municipalities; blocks are always aggregated.
    pub source: Option<PathBuf>,
    pub contiguity: ContiguityOptions,
    /// Region-qualified unit names whose neighbor lists go into the report.
    pub spot_checks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelsConfig {
    pub district: LevelConfig,
    pub municipality: LevelConfig,
    pub prefecture: LevelConfig,
    pub block: LevelConfig,
}

impl Default for LevelsConfig {
    fn default() -> Self {
        let gis = Path::new("data/raw/gis");
        let names = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        let coarse = ContiguityOptions { snap_grid: COARSE_GRID, ..ContiguityOptions::default() };
        Self {
            district: LevelConfig {
                source: Some(gis.join("senkyoku2022/senkyoku2022.shp")),
                contiguity: ContiguityOptions::default(),
                spot_checks: names(&["東京1区", "大阪1区", "北海道1区", "沖縄1区"]),
            },
            municipality: LevelConfig {
                source: Some(gis.join("N03_2025/N03-20250101.shp")),
                contiguity: ContiguityOptions::default(),
                spot_checks: names(&["東京都千代田区", "大阪府大阪市北区", "北海道札幌市中央区"]),
            },
            prefecture: LevelConfig {
                source: Some(gis.join("N03_2025/N03-20250101_prefecture.shp")),
                contiguity: coarse,
                spot_checks: Vec::new(),
            },
            block: LevelConfig { source: None, contiguity: coarse, spot_checks: Vec::new() },
        }
    }
}

impl LevelsConfig {
    pub fn get(&self, level: Level) -> &LevelConfig {
        match level {
            Level::District => &self.district,
            Level::Municipality => &self.municipality,
            Level::Prefecture => &self.prefecture,
            Level::Block => &self.block,
        }
    }
}

/// Top-level configuration, read from TOML. Every field has a default
/// matching the usual `data/` layout, so an empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub output_dir: PathBuf,
    /// `district_master.csv`; the embedded prefecture/block table is used when unset.
    pub master: Option<PathBuf>,
    /// Fail a level when its codes disagree with the canonical set, instead of warning.
    pub strict_reconciliation: bool,
    pub levels: LevelsConfig,
    /// Column layout for `kuiki apportion`.
    pub apportion: TableSchema,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/processed"),
            master: None,
            strict_reconciliation: false,
            levels: LevelsConfig::default(),
            apportion: TableSchema {
                counts: vec!["pop_total".into(), "n_hh_total".into()],
                ratios: vec![RatioSpec::new("avg_hh_size", &["pop_total"], "n_hh_total")],
                ..TableSchema::default()
            },
        }
    }
}

impl BuildConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("[config] Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("[config] Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: BuildConfig = toml::from_str(content)?;
        config.apportion.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = BuildConfig::from_toml("").unwrap();
        assert_eq!(config.output_dir, PathBuf::from("data/processed"));
        assert!(!config.strict_reconciliation);
        assert_eq!(config.levels.get(Level::Block).contiguity.snap_grid, COARSE_GRID);
        assert_eq!(config.levels.get(Level::District).spot_checks.len(), 4);
    }

    #[test]
    fn overrides_are_applied() {
        let config = BuildConfig::from_toml(r#"
            output_dir = "out"
            strict_reconciliation = true

            [levels.municipality]
            source = "muni.shp"
            spot_checks = ["東京都千代田区"]

            [levels.municipality.contiguity]
            bbox_tolerance = 0.001

            [apportion]
            counts = ["pop_total"]
        "#).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert!(config.strict_reconciliation);
        let muni = config.levels.get(Level::Municipality);
        assert_eq!(muni.source.as_deref(), Some(Path::new("muni.shp")));
        assert_eq!(muni.contiguity.bbox_tolerance, 0.001);
        assert_eq!(muni.contiguity.snap_grid, 0.0);
        assert_eq!(config.apportion.code_column, "muni_code");
        assert!(config.apportion.ratios.is_empty());
        // Untouched levels keep their defaults
        assert!(config.levels.get(Level::District).source.is_some());
    }

    #[test]
    fn invalid_schema_is_rejected() {
        let toml = r#"
            [apportion]
            counts = ["pop_total"]
            ratios = [{ name = "x", numerator = ["missing"], denominator = "pop_total" }]
        "#;
        assert!(BuildConfig::from_toml(toml).is_err());
    }
}
