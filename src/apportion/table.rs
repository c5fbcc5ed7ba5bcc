use std::{collections::BTreeMap, path::Path};

use anyhow::{ensure, Context, Result};
use polars::{frame::DataFrame, prelude::Column};
use tracing::warn;

use crate::{
    apportion::{RatioSpec, TableSchema},
    io::csv::{float_column, read_csv, text_column, write_csv},
    map::{Level, UnitCode},
};

/// Divide, treating a missing or zero denominator as missing.
#[inline]
pub(crate) fn safe_div(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    match (num, den) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

/// Sum of the present values, or missing if none are present.
pub(crate) fn sum_present(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    values.into_iter().flatten().fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

/// One municipality's metrics. Values are aligned with the schema's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: Option<String>,
    pub counts: Vec<Option<f64>>,
    pub ratios: Vec<Option<f64>>,
    pub passthrough: Vec<Option<f64>>,
}

/// Per-municipality metric table keyed by code, kept in code order.
#[derive(Debug, Clone, PartialEq)]
pub struct CountTable {
    schema: TableSchema,
    rows: BTreeMap<UnitCode, Row>,
}

impl CountTable {
    pub fn new(schema: TableSchema) -> Result<Self> {
        schema.validate()?;
        Ok(Self { schema, rows: BTreeMap::new() })
    }

    #[inline] pub fn schema(&self) -> &TableSchema { &self.schema }

    #[inline] pub fn len(&self) -> usize { self.rows.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    #[inline] pub fn contains(&self, code: &UnitCode) -> bool { self.rows.contains_key(code) }

    #[inline] pub fn row(&self, code: &UnitCode) -> Option<&Row> { self.rows.get(code) }

    /// Codes in ascending order.
    pub fn codes(&self) -> impl Iterator<Item = &UnitCode> { self.rows.keys() }

    /// Compute every ratio column from a row's counts.
    fn derive_ratios(&self, counts: &[Option<f64>]) -> Vec<Option<f64>> {
        self.schema.ratios.iter()
            .map(|RatioSpec { numerator, denominator, .. }| {
                let count = |name: &str| self.schema.count_index(name).and_then(|i| counts[i]);
                safe_div(sum_present(numerator.iter().map(|n| count(n.as_str()))), count(denominator.as_str()))
            })
            .collect()
    }

    /// Insert a row from its counts, deriving the ratio columns. Pass-through
    /// columns are left missing. Replaces any existing row.
    pub fn insert(&mut self, code: UnitCode, name: Option<&str>, counts: Vec<Option<f64>>) -> Result<Option<Row>> {
        ensure!(
            counts.len() == self.schema.counts.len(),
            "[apportion::table] row {code} has {} counts, schema has {}", counts.len(), self.schema.counts.len()
        );
        let ratios = self.derive_ratios(&counts);
        let passthrough = vec![None; self.schema.passthrough.len()];
        Ok(self.rows.insert(code, Row { name: name.map(str::to_string), counts, ratios, passthrough }))
    }

    pub fn remove(&mut self, code: &UnitCode) -> Option<Row> {
        self.rows.remove(code)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&UnitCode) -> bool) {
        self.rows.retain(|code, _| keep(code));
    }

    /// Value of a count or ratio column for one code.
    pub fn value(&self, code: &UnitCode, column: &str) -> Option<f64> {
        let row = self.rows.get(code)?;
        match (self.schema.count_index(column), self.schema.ratio_index(column)) {
            (Some(i), _) => row.counts[i],
            (None, Some(i)) => row.ratios[i],
            (None, None) => self.schema.passthrough_index(column).and_then(|i| row.passthrough[i]),
        }
    }

    /// Sum of a count column over `codes`, ignoring missing values.
    pub fn total<'a>(&self, column: usize, codes: impl IntoIterator<Item = &'a UnitCode>) -> f64 {
        codes.into_iter()
            .filter_map(|code| self.rows.get(code).and_then(|row| row.counts[column]))
            .sum()
    }

    /// Build a table from a DataFrame laid out per `schema`, extended with the
    /// frame's undeclared columns (see [`TableSchema::resolve`]).
    ///
    /// Ratio columns present in the frame are kept as given; absent ones are
    /// derived. Duplicate codes keep their first row.
    pub fn from_dataframe(df: &DataFrame, schema: TableSchema) -> Result<Self> {
        let mut table = Self::new(schema.resolve(df)?)?;
        let schema = &table.schema;

        let codes = text_column(df, &schema.code_column)?;
        let names = schema.name_column.as_deref()
            .filter(|name| df.column(name).is_ok())
            .map(|name| text_column(df, name))
            .transpose()?;
        let counts = schema.counts.iter()
            .map(|name| float_column(df, name))
            .collect::<Result<Vec<_>>>()?;
        let ratios = schema.ratios.iter()
            .map(|ratio| df.column(&ratio.name).is_ok().then(|| float_column(df, &ratio.name)).transpose())
            .collect::<Result<Vec<_>>>()?;
        let passthrough = schema.passthrough.iter()
            .map(|name| df.column(name).is_ok().then(|| float_column(df, name)).transpose())
            .collect::<Result<Vec<_>>>()?;

        let mut duplicates = 0usize;
        for (i, raw) in codes.iter().enumerate() {
            let raw = raw.as_deref()
                .with_context(|| format!("[apportion::table] row {i} has no {}", table.schema.code_column))?;
            let code = UnitCode::normalize(Level::Municipality, raw)?;
            if table.rows.contains_key(&code) { duplicates += 1; continue }

            let row_counts = counts.iter().map(|column| column[i]).collect::<Vec<_>>();
            let derived = table.derive_ratios(&row_counts);
            let row_ratios = ratios.iter().zip(derived)
                .map(|(given, derived)| match given {
                    Some(column) => column[i],
                    None => derived,
                })
                .collect();
            let row_passthrough = passthrough.iter()
                .map(|given| given.as_ref().and_then(|column| column[i]))
                .collect();
            let name = names.as_ref().and_then(|names| names[i].clone());
            table.rows.insert(code, Row { name, counts: row_counts, ratios: row_ratios, passthrough: row_passthrough });
        }

        if duplicates > 0 {
            warn!(duplicates, "dropped duplicate codes from table, keeping first occurrence");
        }
        Ok(table)
    }

    /// Convert to a DataFrame with the schema's column layout, in code order.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = vec![Column::new(
            self.schema.code_column.as_str().into(),
            self.rows.keys().map(UnitCode::as_str).collect::<Vec<_>>(),
        )];
        if let Some(name) = &self.schema.name_column {
            columns.push(Column::new(
                name.as_str().into(),
                self.rows.values().map(|row| row.name.as_deref()).collect::<Vec<_>>(),
            ));
        }
        for (i, name) in self.schema.counts.iter().enumerate() {
            columns.push(Column::new(
                name.as_str().into(),
                self.rows.values().map(|row| row.counts[i]).collect::<Vec<_>>(),
            ));
        }
        for (i, ratio) in self.schema.ratios.iter().enumerate() {
            columns.push(Column::new(
                ratio.name.as_str().into(),
                self.rows.values().map(|row| row.ratios[i]).collect::<Vec<_>>(),
            ));
        }
        for (i, name) in self.schema.passthrough.iter().enumerate() {
            columns.push(Column::new(
                name.as_str().into(),
                self.rows.values().map(|row| row.passthrough[i]).collect::<Vec<_>>(),
            ));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Read a table from CSV, keeping codes as text.
    pub fn read_csv(path: &Path, schema: TableSchema) -> Result<Self> {
        let df = read_csv(path, &[schema.code_column.as_str()])?;
        Self::from_dataframe(&df, schema)
            .with_context(|| format!("[apportion::table] Invalid table: {}", path.display()))
    }

    /// Write the table to CSV.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        write_csv(&mut self.to_dataframe()?, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn schema() -> TableSchema {
        TableSchema {
            counts: vec!["pop_total".into(), "n_hh_total".into()],
            ratios: vec![RatioSpec::new("avg_hh_size", &["pop_total"], "n_hh_total")],
            ..TableSchema::default()
        }
    }

    fn code(raw: &str) -> UnitCode {
        UnitCode::normalize(Level::Municipality, raw).unwrap()
    }

    #[test]
    fn safe_div_treats_zero_as_missing() {
        assert_eq!(safe_div(Some(1.0), Some(0.0)), None);
        assert_eq!(safe_div(None, Some(2.0)), None);
        assert_eq!(safe_div(Some(1.0), Some(4.0)), Some(0.25));
    }

    #[test]
    fn sum_present_skips_missing() {
        assert_eq!(sum_present([Some(1.0), None, Some(2.0)]), Some(3.0));
        assert_eq!(sum_present([None, None]), None);
    }

    #[test]
    fn insert_derives_ratios() {
        let mut table = CountTable::new(schema()).unwrap();
        table.insert(code("13101"), Some("千代田区"), vec![Some(60.0), Some(30.0)]).unwrap();
        assert_eq!(table.value(&code("13101"), "avg_hh_size"), Some(2.0));
        assert!(table.insert(code("13102"), None, vec![Some(1.0)]).is_err());
    }

    #[test]
    fn from_dataframe_normalizes_codes() {
        let df = df![
            "muni_code" => ["1100", "13101", "13101"],
            "muni_name" => ["札幌市", "千代田区", "dup"],
            "pop_total" => [Some(100.0), Some(60.0), Some(1.0)],
            "n_hh_total" => [Some(50.0), None, Some(1.0)],
        ].unwrap();
        let table = CountTable::from_dataframe(&df, schema()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.codes().map(UnitCode::as_str).collect::<Vec<_>>(), vec!["01100", "13101"]);
        assert_eq!(table.value(&code("01100"), "avg_hh_size"), Some(2.0));
        assert_eq!(table.value(&code("13101"), "avg_hh_size"), None);
        assert_eq!(table.row(&code("13101")).unwrap().name.as_deref(), Some("千代田区"));
    }

    #[test]
    fn undeclared_columns_are_carried_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("census.csv");
        std::fs::write(&path, "\
muni_code,muni_name,pop_total,n_hh_total,pop_65,pct_elderly_65
13101,千代田区,60,30,12,0.2
13102,中央区,40,20,,0.25
").unwrap();

        let table = CountTable::read_csv(&path, schema()).unwrap();
        assert_eq!(table.schema().counts, vec!["pop_total", "n_hh_total", "pop_65"]);
        assert_eq!(table.schema().passthrough, vec!["pct_elderly_65"]);
        assert_eq!(table.value(&code("13101"), "pop_65"), Some(12.0));
        assert_eq!(table.value(&code("13102"), "pop_65"), None);
        assert_eq!(table.value(&code("13102"), "pct_elderly_65"), Some(0.25));

        let out = dir.path().join("out.csv");
        table.write_csv(&out).unwrap();
        let header = std::fs::read_to_string(&out).unwrap().lines().next().unwrap().to_string();
        assert_eq!(header, "muni_code,muni_name,pop_total,n_hh_total,pop_65,avg_hh_size,pct_elderly_65");
    }

    #[test]
    fn csv_keeps_leading_zeros() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("census.csv");
        let mut table = CountTable::new(schema()).unwrap();
        table.insert(code("01101"), Some("中央区"), vec![Some(10.0), Some(5.0)]).unwrap();
        table.write_csv(&path).unwrap();

        let back = CountTable::read_csv(&path, schema()).unwrap();
        assert_eq!(back.codes().next().unwrap().as_str(), "01101");
        assert_eq!(back.value(&code("01101"), "pop_total"), Some(10.0));
        assert_eq!(back.value(&code("01101"), "avg_hh_size"), Some(2.0));
    }
}
