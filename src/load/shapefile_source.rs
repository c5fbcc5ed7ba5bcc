use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use shapefile::{dbase::{FieldValue, Record}, Reader, Shape};
use tracing::{info, warn};

use crate::{common::shp_to_geo, load::{RawRecord, RecordSource}, map::Level};

/// Reads polygon records from an ESRI shapefile.
///
/// Field layout follows the published datasets: `kucode`/`kuname` for the
/// 2022 electoral districts, and the MLIT N03 administrative-area schema for
/// municipalities and prefectures.
#[derive(Debug, Clone)]
pub struct ShapefileSource {
    path: PathBuf,
}

impl ShapefileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

/// Get a field as trimmed text; numeric fields are rendered without decimals.
fn get_text_field(record: &Record, field: &str) -> Result<Option<String>> {
    Ok(match record.get(field) {
        Some(FieldValue::Character(s)) => s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
        Some(FieldValue::Numeric(n)) => n.map(|n| format!("{n:.0}")),
        Some(FieldValue::Double(n)) => Some(format!("{n:.0}")),
        Some(FieldValue::Integer(n)) => Some(n.to_string()),
        Some(other) => bail!("unsupported value for field {field}: {other:?}"),
        None => bail!("missing field: {field}"),
    })
}

impl RecordSource for ShapefileSource {
    fn records(&self, level: Level) -> Result<Vec<RawRecord>> {
        let (code_field, name_fields, region_field): (&str, &[&str], Option<&str>) = match level {
            Level::District => ("kucode", &["kuname"], None),
            Level::Municipality => ("N03_007", &["N03_004", "N03_005"], Some("N03_001")),
            Level::Prefecture => ("N03_007", &["N03_001"], None),
            Level::Block => bail!("[load::shapefile] block geometry is derived from prefectures, not read"),
        };

        let mut reader = Reader::from_path(&self.path)
            .with_context(|| format!("[load::shapefile] Failed to open shapefile: {}", self.path.display()))?;

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for result in reader.iter_shapes_and_records() {
            let (shape, record) = result.context("[load::shapefile] Error reading shape+record")?;

            let geometry = match shape {
                Shape::Polygon(polygon) => shp_to_geo(&polygon),
                Shape::NullShape => { skipped += 1; continue }
                other => bail!("[load::shapefile] found non-Polygon shape: {:?}", other.shapetype()),
            };

            // Records without a code belong to no unit; the dissolve would drop them anyway
            let Some(code) = get_text_field(&record, code_field)? else { skipped += 1; continue };

            let name = name_fields.iter()
                .map(|field| get_text_field(&record, field))
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .flatten()
                .collect::<String>();

            let region = region_field
                .map(|field| get_text_field(&record, field))
                .transpose()?
                .flatten();

            records.push(RawRecord { code, name, region, geometry });
        }

        if skipped > 0 {
            warn!(%level, skipped, path = %self.path.display(), "skipped records without code or geometry");
        }
        info!(%level, records = records.len(), path = %self.path.display(), "read shapefile");

        Ok(records)
    }
}
