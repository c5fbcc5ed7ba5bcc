use std::{collections::{BTreeMap, BTreeSet}, sync::Arc};

use crate::{error::BuildError, map::{Level, UnitCode}, registry::RemapData};

/// Tolerance on the sum of a split predecessor's ratios.
const RATIO_SUM_TOLERANCE: f64 = 1e-9;

/// A successor ward and the predecessors it absorbs.
#[derive(Debug, Clone, PartialEq)]
pub struct Successor {
    code: UnitCode,
    name: Arc<str>,
    full: Vec<UnitCode>,
    partial: Vec<(UnitCode, f64)>,
}

impl Successor {
    #[inline] pub fn code(&self) -> &UnitCode { &self.code }

    #[inline] pub fn name(&self) -> &str { &self.name }

    /// Every predecessor with its weight: 1.0 for full predecessors, the split ratio otherwise.
    pub fn contributors(&self) -> impl Iterator<Item = (&UnitCode, f64)> {
        self.full.iter().map(|code| (code, 1.0))
            .chain(self.partial.iter().map(|(code, ratio)| (code, *ratio)))
    }
}

/// Validated ward-reorganization table.
///
/// Invariants: ratios lie in (0, 1]; a split predecessor's ratios sum to 1;
/// a predecessor absorbed whole appears in no other entry; every referenced
/// predecessor is retiring; successors, retiring codes and aggregate codes
/// are pairwise disjoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WardRemap {
    successors: Vec<Successor>,
    retiring: BTreeSet<UnitCode>,
    aggregates: BTreeSet<UnitCode>,
}

fn municipality(raw: &str) -> Result<UnitCode, BuildError> {
    UnitCode::normalize(Level::Municipality, raw)
}

impl WardRemap {
    pub fn from_data(data: &RemapData) -> Result<Self, BuildError> {
        let retiring = data.retiring.iter().map(|c| municipality(c)).collect::<Result<BTreeSet<_>, _>>()?;
        let aggregates = data.aggregates.iter().map(|c| municipality(c)).collect::<Result<BTreeSet<_>, _>>()?;

        let successors = data.successors.iter()
            .map(|(code, spec)| {
                Ok(Successor {
                    code: municipality(code)?,
                    name: Arc::from(spec.name.as_str()),
                    full: spec.full.iter().map(|c| municipality(c)).collect::<Result<_, BuildError>>()?,
                    partial: spec.partial.iter()
                        .map(|(c, &ratio)| Ok((municipality(c)?, ratio)))
                        .collect::<Result<_, BuildError>>()?,
                })
            })
            .collect::<Result<Vec<_>, BuildError>>()?;

        let remap = Self { successors, retiring, aggregates };
        remap.validate()?;
        Ok(remap)
    }

    fn validate(&self) -> Result<(), BuildError> {
        let invalid = |msg: String| Err(BuildError::InvalidRemap(msg));

        let mut occurrences: BTreeMap<&UnitCode, usize> = BTreeMap::new();
        let mut split_sums: BTreeMap<&UnitCode, f64> = BTreeMap::new();
        for successor in &self.successors {
            if self.retiring.contains(&successor.code) {
                return invalid(format!("successor {} is also retiring", successor.code));
            }
            if self.aggregates.contains(&successor.code) {
                return invalid(format!("successor {} is also an aggregate code", successor.code));
            }
            for code in &successor.full {
                *occurrences.entry(code).or_default() += 1;
            }
            for (code, ratio) in &successor.partial {
                if !(ratio.is_finite() && *ratio > 0.0 && *ratio <= 1.0) {
                    return invalid(format!("ratio {ratio} for {code} -> {} outside (0, 1]", successor.code));
                }
                *occurrences.entry(code).or_default() += 1;
                *split_sums.entry(code).or_default() += ratio;
            }
        }

        for successor in &self.successors {
            for code in &successor.full {
                if occurrences[code] > 1 {
                    return invalid(format!("{code} is absorbed whole by {} but also referenced elsewhere", successor.code));
                }
            }
        }
        for (code, sum) in split_sums {
            if (sum - 1.0).abs() > RATIO_SUM_TOLERANCE {
                return invalid(format!("ratios for {code} sum to {sum}, expected 1"));
            }
        }
        if let Some(code) = occurrences.keys().find(|code| !self.retiring.contains(**code)) {
            return invalid(format!("predecessor {code} is not listed as retiring"));
        }
        if let Some(code) = self.aggregates.intersection(&self.retiring).next() {
            return invalid(format!("{code} is both an aggregate and a retiring code"));
        }

        Ok(())
    }

    #[inline] pub fn successors(&self) -> &[Successor] { &self.successors }

    #[inline] pub fn retiring(&self) -> &BTreeSet<UnitCode> { &self.retiring }

    #[inline] pub fn aggregates(&self) -> &BTreeSet<UnitCode> { &self.aggregates }

    #[inline] pub fn is_retiring(&self, code: &UnitCode) -> bool { self.retiring.contains(code) }

    /// Whether some successor names `code` as a predecessor.
    pub fn is_referenced(&self, code: &UnitCode) -> bool {
        self.successors.iter().any(|s| s.contributors().any(|(c, _)| c == code))
    }
}
