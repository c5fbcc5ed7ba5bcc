use std::sync::Arc;

use geo::MultiPolygon;

use crate::map::{Level, UnitCode};

/// Reference to a unit's parent in the next level up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub code: UnitCode,
    pub name: Arc<str>,
}

/// A single administrative unit with its dissolved geometry.
#[derive(Debug, Clone)]
pub struct AdministrativeUnit {
    pub code: UnitCode,
    pub name: Arc<str>,
    pub region: Option<Arc<str>>, // Prefecture name for municipalities, when the source carries it
    pub geometry: MultiPolygon<f64>,
    pub parent: Option<ParentRef>,
}

impl AdministrativeUnit {
    pub fn new(code: UnitCode, name: &str, geometry: MultiPolygon<f64>) -> Self {
        Self { code, name: Arc::from(name), region: None, geometry, parent: None }
    }

    #[inline] pub fn level(&self) -> Level { self.code.level() }

    /// Region-qualified display name, e.g. "東京都千代田区".
    pub fn full_name(&self) -> String {
        match &self.region {
            Some(region) => format!("{region}{}", self.name),
            None => self.name.to_string(),
        }
    }
}
