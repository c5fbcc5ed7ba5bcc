use anyhow::Result;
use geo::MultiPolygon;

use crate::map::Level;

/// One polygon record as delivered by an upstream provider, before
/// normalization. Several records may share a code (multi-part units).
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub code: String,
    pub name: String,
    pub region: Option<String>,
    pub geometry: MultiPolygon<f64>,
}

impl RawRecord {
    pub fn new(code: &str, name: &str, geometry: MultiPolygon<f64>) -> Self {
        Self { code: code.to_string(), name: name.to_string(), region: None, geometry }
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }
}

/// Upstream provider of raw polygon records for a level.
pub trait RecordSource {
    fn records(&self, level: Level) -> Result<Vec<RawRecord>>;
}

/// In-memory records, ignoring the requested level.
impl RecordSource for Vec<RawRecord> {
    fn records(&self, _level: Level) -> Result<Vec<RawRecord>> {
        Ok(self.clone())
    }
}
