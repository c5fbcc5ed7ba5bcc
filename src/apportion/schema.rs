use std::collections::BTreeSet;

use anyhow::{bail, ensure, Result};
use polars::frame::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A ratio column, recomputed as `sum(numerator) / denominator`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioSpec {
    pub name: String,
    pub numerator: Vec<String>,
    pub denominator: String,
}

impl RatioSpec {
    pub fn new(name: &str, numerator: &[&str], denominator: &str) -> Self {
        Self {
            name: name.to_string(),
            numerator: numerator.iter().map(|s| s.to_string()).collect(),
            denominator: denominator.to_string(),
        }
    }
}

/// Column layout of a per-municipality metric table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSchema {
    pub code_column: String,
    pub name_column: Option<String>,
    /// Additive columns, apportioned linearly.
    pub counts: Vec<String>,
    /// Derived columns, recomputed from counts after apportionment.
    pub ratios: Vec<RatioSpec>,
    /// Ratio columns with no formula. Kept on untouched rows, missing on
    /// successor rows.
    pub passthrough: Vec<String>,
    /// Undeclared columns starting with one of these are read as pass-through
    /// ratios rather than counts.
    pub ratio_prefixes: Vec<String>,
    /// Columns dropped on read.
    pub ignored: Vec<String>,
}

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            code_column: "muni_code".to_string(),
            name_column: Some("muni_name".to_string()),
            counts: Vec::new(),
            ratios: Vec::new(),
            passthrough: Vec::new(),
            ratio_prefixes: vec!["pct_".to_string(), "avg_".to_string()],
            ignored: Vec::new(),
        }
    }
}

impl TableSchema {
    /// Position of a count column.
    #[inline]
    pub(crate) fn count_index(&self, name: &str) -> Option<usize> {
        self.counts.iter().position(|c| c == name)
    }

    /// Position of a ratio column.
    #[inline]
    pub(crate) fn ratio_index(&self, name: &str) -> Option<usize> {
        self.ratios.iter().position(|r| r.name == name)
    }

    /// Position of a pass-through column.
    #[inline]
    pub(crate) fn passthrough_index(&self, name: &str) -> Option<usize> {
        self.passthrough.iter().position(|c| c == name)
    }

    /// Every column name the schema accounts for, ignored ones included.
    fn declared(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.code_column.as_str())
            .chain(self.name_column.as_deref())
            .chain(self.counts.iter().map(String::as_str))
            .chain(self.ratios.iter().map(|r| r.name.as_str()))
            .chain(self.passthrough.iter().map(String::as_str))
            .chain(self.ignored.iter().map(String::as_str))
    }

    /// Check column names are unique and every ratio is built from count columns.
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for name in self.declared() {
            ensure!(seen.insert(name), "[apportion::schema] duplicate column: {name}");
        }

        for ratio in &self.ratios {
            ensure!(!ratio.numerator.is_empty(), "[apportion::schema] ratio {} has no numerator", ratio.name);
            for column in ratio.numerator.iter().chain([&ratio.denominator]) {
                if self.count_index(column).is_none() {
                    bail!("[apportion::schema] ratio {} uses {column}, which is not a count column", ratio.name);
                }
            }
        }
        Ok(())
    }

    /// This schema extended with the columns of `df` it does not declare.
    ///
    /// Undeclared numeric columns become counts, or pass-through ratios when
    /// their name has a ratio prefix. Undeclared text columns are an error
    /// unless entirely empty.
    pub fn resolve(&self, df: &DataFrame) -> Result<TableSchema> {
        let declared = self.declared().collect::<BTreeSet<_>>();
        let mut resolved = self.clone();
        let mut rejected = Vec::new();

        for column in df.get_columns() {
            let name = column.name().as_str();
            if declared.contains(name) { continue }
            if !column.dtype().is_numeric() && column.null_count() < column.len() {
                rejected.push(name.to_string());
            } else if self.ratio_prefixes.iter().any(|prefix| name.starts_with(prefix.as_str())) {
                resolved.passthrough.push(name.to_string());
            } else {
                resolved.counts.push(name.to_string());
            }
        }

        ensure!(
            rejected.is_empty(),
            "[apportion::schema] non-numeric columns not in the schema: {} (list them under `ignored` to drop them)",
            rejected.join(", "),
        );
        if resolved != *self {
            info!(
                counts = ?&resolved.counts[self.counts.len()..],
                passthrough = ?&resolved.passthrough[self.passthrough.len()..],
                "undeclared columns added to the table schema",
            );
        }
        resolved.validate()?;
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> TableSchema {
        TableSchema {
            counts: vec!["pop_total".into(), "n_hh_total".into()],
            ratios: vec![RatioSpec::new("avg_hh_size", &["pop_total"], "n_hh_total")],
            ..TableSchema::default()
        }
    }

    #[test]
    fn accepts_ratios_over_counts() {
        assert!(schema().validate().is_ok());
    }

    #[test]
    fn rejects_ratio_over_unknown_column() {
        let mut schema = schema();
        schema.ratios.push(RatioSpec::new("pct_foreign", &["pop_foreign"], "pop_total"));
        assert!(schema.validate().is_err());
    }

    #[test]
    fn resolve_adds_undeclared_columns() {
        let df = polars::df![
            "muni_code" => ["13101"],
            "pop_total" => [10.0],
            "n_hh_total" => [5.0],
            "pop_65" => [2i64],
            "pct_elderly_65" => [0.2],
            "note" => [None::<&str>],
        ].unwrap();
        let resolved = schema().resolve(&df).unwrap();
        assert_eq!(resolved.counts, vec!["pop_total", "n_hh_total", "pop_65", "note"]);
        assert_eq!(resolved.passthrough, vec!["pct_elderly_65"]);
    }

    #[test]
    fn resolve_rejects_undeclared_text() {
        let df = polars::df![
            "muni_code" => ["13101"],
            "pop_total" => [10.0],
            "n_hh_total" => [5.0],
            "pref_name" => ["東京都"],
        ].unwrap();
        let err = schema().resolve(&df).unwrap_err();
        assert!(err.to_string().contains("pref_name"));

        let mut schema = schema();
        schema.ignored.push("pref_name".into());
        assert_eq!(schema.resolve(&df).unwrap().counts.len(), 2);
    }

    #[test]
    fn rejects_duplicate_columns() {
        let mut schema = schema();
        schema.counts.push("muni_code".into());
        assert!(schema.validate().is_err());
    }
}
