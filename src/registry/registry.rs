use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::{
    apportion::CountTable,
    error::BuildError,
    map::{Level, UnitCode},
    registry::{RegistryData, WardRemap},
};

/// Expected size of the canonical municipality set. Advisory only.
pub const CANONICAL_MUNICIPALITY_TARGET: usize = 1892;

/// The authoritative municipality code space.
///
/// Built from an explicit [`RegistryData`] so that tests and callers can
/// substitute their own exclusions or reorganizations.
#[derive(Debug, Clone)]
pub struct CodeRegistry {
    excluded: BTreeSet<UnitCode>,
    city_totals: BTreeSet<UnitCode>,
    remap: WardRemap,
}

impl CodeRegistry {
    pub fn new(data: &RegistryData) -> Result<Self, BuildError> {
        let parse = |codes: &[String]| codes.iter()
            .map(|c| UnitCode::normalize(Level::Municipality, c))
            .collect::<Result<BTreeSet<_>, _>>();
        Ok(Self {
            excluded: parse(data.excluded.as_slice())?,
            city_totals: parse(data.city_totals.as_slice())?,
            remap: WardRemap::from_data(&data.ward_remap)?,
        })
    }

    /// Registry over [`RegistryData::embedded`].
    pub fn embedded() -> Result<Self, BuildError> {
        Self::new(&RegistryData::embedded())
    }

    #[inline] pub fn ward_remap(&self) -> &WardRemap { &self.remap }

    #[inline] pub fn is_excluded(&self, code: &UnitCode) -> bool { self.excluded.contains(code) }

    #[inline] pub fn is_city_total(&self, code: &UnitCode) -> bool { self.city_totals.contains(code) }

    /// Drop excluded codes, keeping input order.
    pub fn exclude(&self, codes: impl IntoIterator<Item = UnitCode>) -> Vec<UnitCode> {
        codes.into_iter().filter(|code| !self.is_excluded(code)).collect()
    }

    /// The authoritative code set for `level` given the codes a source produced.
    ///
    /// Municipalities lose excluded and retiring codes; other levels pass through.
    pub fn canonical_set(&self, level: Level, raw: impl IntoIterator<Item = UnitCode>) -> BTreeSet<UnitCode> {
        let raw = raw.into_iter().collect::<BTreeSet<_>>();
        if level != Level::Municipality { return raw }

        let raw_count = raw.len();
        let canonical = raw.into_iter()
            .filter(|code| !self.is_excluded(code) && !self.remap.is_retiring(code))
            .collect::<BTreeSet<_>>();

        info!(
            raw = raw_count,
            canonical = canonical.len(),
            target = CANONICAL_MUNICIPALITY_TARGET,
            "canonical municipality set",
        );
        canonical
    }

    /// Remove designated-city total rows and prefecture total rows (`PP000`)
    /// from a per-municipality table. Returns the number of rows removed.
    pub fn strip_city_totals(&self, table: &mut CountTable) -> usize {
        let before = table.len();
        table.retain(|code| !self.is_city_total(code) && !code.as_str().ends_with("000"));
        let removed = before - table.len();
        debug!(removed, "stripped aggregate rows");
        removed
    }
}

/// Symmetric difference between a foreign code set and the canonical one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Canonical codes the other set lacks.
    pub missing: Vec<UnitCode>,
    /// Codes in the other set that are not canonical.
    pub extra: Vec<UnitCode>,
}

impl Reconciliation {
    #[inline] pub fn is_consistent(&self) -> bool { self.missing.is_empty() && self.extra.is_empty() }

    /// Promote a mismatch to an error in strict mode; otherwise always `Ok`.
    pub fn into_result(self, strict: bool) -> Result<Self, BuildError> {
        if strict && !self.is_consistent() {
            return Err(BuildError::ReconciliationMismatch {
                missing: self.missing.iter().map(UnitCode::to_string).collect(),
                extra: self.extra.iter().map(UnitCode::to_string).collect(),
            });
        }
        Ok(self)
    }
}

/// Compare `other` (named `label` in logs) against `canonical`. Never fails;
/// disagreements are logged with the offending codes.
pub fn reconcile(label: &str, other: &BTreeSet<UnitCode>, canonical: &BTreeSet<UnitCode>) -> Reconciliation {
    let result = Reconciliation {
        missing: canonical.difference(other).cloned().collect(),
        extra: other.difference(canonical).cloned().collect(),
    };

    if result.is_consistent() {
        info!(source = label, codes = other.len(), "code set matches canonical set");
    } else {
        warn!(
            source = label,
            missing = ?result.missing.iter().map(UnitCode::as_str).collect::<Vec<_>>(),
            extra = ?result.extra.iter().map(UnitCode::as_str).collect::<Vec<_>>(),
            "code set disagrees with canonical set",
        );
    }
    result
}
