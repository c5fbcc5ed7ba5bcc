use std::{collections::BTreeMap, sync::Arc};

use anyhow::{Context, Result};
use geo::MultiPolygon;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    error::BuildError,
    geom::union_all,
    load::{RawRecord, RecordSource},
    map::{AdministrativeUnit, Level, UnitCode},
};

/// Records sharing one normalized code, in source order.
struct Group {
    code: UnitCode,
    name: String,
    region: Option<String>,
    parts: Vec<MultiPolygon<f64>>,
}

/// Load, normalize and dissolve the units of `level`.
///
/// Records sharing a code are unioned into one geometry; name and region come
/// from the first record seen for the code. Output is sorted by code.
/// Fixed-cardinality levels fail here, before any downstream step runs.
pub fn load(level: Level, source: &dyn RecordSource) -> Result<Vec<AdministrativeUnit>> {
    let records = source.records(level)
        .with_context(|| format!("[load] Failed to read {level} records"))?;
    let record_count = records.len();

    let mut groups: BTreeMap<UnitCode, Group> = BTreeMap::new();
    for RawRecord { code, name, region, geometry } in records {
        let code = UnitCode::normalize(level, &code)?;
        groups.entry(code.clone())
            .or_insert_with(|| Group { code, name, region, parts: Vec::new() })
            .parts.push(geometry);
    }
    debug!(%level, records = record_count, units = groups.len(), "grouped records by code");

    let units = groups.into_values().collect::<Vec<_>>()
        .into_par_iter()
        .map(dissolve)
        .collect::<Result<Vec<_>, BuildError>>()?;

    if let Some(expected) = level.expected_count() {
        if units.len() != expected {
            return Err(BuildError::CardinalityMismatch { level, expected, found: units.len() }.into());
        }
    }

    info!(%level, units = units.len(), "loaded units");
    Ok(units)
}

/// Union the parts of one group into a single unit.
fn dissolve(group: Group) -> Result<AdministrativeUnit, BuildError> {
    let Group { code, name, region, parts } = group;
    let geometry = union_all(parts);
    if geometry.0.is_empty() {
        return Err(BuildError::EmptyGeometry { level: code.level(), code: code.to_string() });
    }
    let mut unit = AdministrativeUnit::new(code, &name, geometry);
    unit.region = region.map(Arc::from);
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area};

    fn square(x: f64, y: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x, y: y), (x: x + 1.0, y: y), (x: x + 1.0, y: y + 1.0), (x: x, y: y + 1.0), (x: x, y: y),
        ]])
    }

    #[test]
    fn dissolves_multi_part_units() {
        let records = vec![
            RawRecord::new("13101", "千代田区", square(0.0, 0.0)).with_region("東京都"),
            RawRecord::new("13102", "中央区", square(5.0, 0.0)),
            RawRecord::new("13101.0", "ignored", square(1.0, 0.0)),
        ];
        let units = load(Level::Municipality, &records).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].code.as_str(), "13101");
        assert_eq!(&*units[0].name, "千代田区");
        assert_eq!(units[0].full_name(), "東京都千代田区");
        assert!((units[0].geometry.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn output_is_sorted_by_code() {
        let records = vec![
            RawRecord::new("47201", "那覇市", square(9.0, 0.0)),
            RawRecord::new("1100", "札幌市", square(0.0, 0.0)),
        ];
        let codes = load(Level::Municipality, &records).unwrap()
            .into_iter().map(|u| u.code.to_string()).collect::<Vec<_>>();
        assert_eq!(codes, vec!["01100", "47201"]);
    }

    #[test]
    fn district_count_mismatch_is_fatal() {
        let records = (1..=288)
            .map(|i| RawRecord::new(&format!("{:04}", 100 + i), "区", square(i as f64 * 2.0, 0.0)))
            .collect::<Vec<_>>();
        let err = load(Level::District, &records).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::CardinalityMismatch { expected: 289, found: 288, .. })
        ));
    }

    #[test]
    fn empty_geometry_is_rejected() {
        let records = vec![RawRecord::new("13101", "千代田区", MultiPolygon(Vec::new()))];
        let err = load(Level::Municipality, &records).unwrap_err();
        assert!(matches!(err.downcast_ref::<BuildError>(), Some(BuildError::EmptyGeometry { .. })));
    }

    #[test]
    fn invalid_code_is_rejected() {
        let records = vec![RawRecord::new("n/a", "?", square(0.0, 0.0))];
        assert!(load(Level::Municipality, &records).is_err());
    }
}
