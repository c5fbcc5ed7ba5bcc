use std::collections::BTreeMap;

use anyhow::Result;
use geo::MultiPolygon;
use rayon::prelude::*;
use tracing::info;

use crate::{
    aggregate::Crosswalk,
    error::BuildError,
    geom::union_all,
    map::{AdministrativeUnit, ParentRef},
};

fn parent_of(unit: &AdministrativeUnit, crosswalk: &dyn Crosswalk) -> Result<ParentRef, BuildError> {
    crosswalk.parent(&unit.code).ok_or_else(|| BuildError::MissingCrosswalkEntry {
        level: unit.level(),
        code: unit.code.to_string(),
    })
}

/// Dissolve `units` into their parents under `crosswalk`.
///
/// Every unit must have a crosswalk entry. Parents take their code and name
/// from the crosswalk and are returned sorted by code.
pub fn aggregate(units: &[AdministrativeUnit], crosswalk: &dyn Crosswalk) -> Result<Vec<AdministrativeUnit>> {
    let mut groups: BTreeMap<_, (ParentRef, Vec<MultiPolygon<f64>>)> = BTreeMap::new();
    for unit in units {
        let parent = parent_of(unit, crosswalk)?;
        groups.entry(parent.code.clone())
            .or_insert_with(|| (parent, Vec::new()))
            .1.push(unit.geometry.clone());
    }

    let parents = groups.into_values().collect::<Vec<_>>()
        .into_par_iter()
        .map(|(parent, parts)| AdministrativeUnit::new(parent.code, &parent.name, union_all(parts)))
        .collect::<Vec<_>>();

    info!(
        from = units.first().map(|u| u.level().as_str()).unwrap_or("none"),
        to = %crosswalk.parent_level(),
        units = units.len(),
        parents = parents.len(),
        "aggregated units",
    );
    Ok(parents)
}

/// Attach each unit's parent reference from `crosswalk`.
pub fn assign_parents(units: &mut [AdministrativeUnit], crosswalk: &dyn Crosswalk) -> Result<(), BuildError> {
    for unit in units.iter_mut() {
        unit.parent = Some(parent_of(unit, crosswalk)?);
    }
    Ok(())
}
