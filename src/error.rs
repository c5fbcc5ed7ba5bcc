use thiserror::Error;

use crate::map::Level;

/// Fatal conditions that abort a level build or an apportionment run.
///
/// Everything else is reported through `anyhow` with a `[module]` context
/// prefix; these variants exist so callers can tell a validation failure
/// apart from an I/O failure.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{level}: expected {expected} units, found {found}")]
    CardinalityMismatch { level: Level, expected: usize, found: usize },

    #[error("{level}: no crosswalk entry for unit {code}")]
    MissingCrosswalkEntry { level: Level, code: String },

    #[error("no apportionment entry for retiring code {code}")]
    MissingApportionmentRatio { code: String },

    #[error("successor {successor} references predecessor {predecessor}, which is absent from the table")]
    MissingPredecessor { successor: String, predecessor: String },

    #[error("code sets disagree: {} missing, {} extra (missing: {missing:?}, extra: {extra:?})", missing.len(), extra.len())]
    ReconciliationMismatch { missing: Vec<String>, extra: Vec<String> },

    #[error("apportionment changed the total of {metric}: {before} -> {after}")]
    TotalNotPreserved { metric: String, before: f64, after: f64 },

    #[error("{level}: invalid code {raw:?}")]
    InvalidCode { level: Level, raw: String },

    #[error("invalid ward remap: {0}")]
    InvalidRemap(String),

    #[error("{level}: unit {code} has empty geometry")]
    EmptyGeometry { level: Level, code: String },
}
