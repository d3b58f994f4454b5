//! Column type inference.
//!
//! Each column is classified from all of its non-empty cells. Dates are
//! checked before numbers because spreadsheet serial dates are numbers too.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    config::InferenceThresholds,
    data::{CellValue, Dataset, parse_number},
    dates::parse_date,
    error::Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    Date,
    Text,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Number => "number",
            ColumnType::Date => "date",
            ColumnType::Text => "text",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub datatype: ColumnType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<ColumnMeta>,
}

impl Schema {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.datatype)
    }

    pub fn columns_of(&self, datatype: ColumnType) -> impl Iterator<Item = &str> + '_ {
        self.columns
            .iter()
            .filter(move |c| c.datatype == datatype)
            .map(|c| c.name.as_str())
    }
}

/// Per-column counts gathered during inference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSummary {
    pub non_empty: usize,
    pub date_matches: usize,
    pub numeric_matches: usize,
    pub sample: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InferenceStats {
    summaries: Vec<ColumnSummary>,
    rows_read: usize,
}

impl InferenceStats {
    pub fn summary(&self, index: usize) -> Option<&ColumnSummary> {
        self.summaries.get(index)
    }

    pub fn sample_value(&self, index: usize) -> Option<&str> {
        self.summaries.get(index).and_then(|s| s.sample.as_deref())
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }
}

#[derive(Debug, Clone, Default)]
struct TypeCandidate {
    non_empty: usize,
    date_matches: usize,
    numeric_matches: usize,
    sample: Option<String>,
}

impl TypeCandidate {
    fn update(&mut self, value: &CellValue) {
        if value.is_empty() {
            return;
        }
        self.non_empty += 1;
        if parse_date(value).is_some() {
            self.date_matches += 1;
        }
        if parse_number(value).is_some() {
            self.numeric_matches += 1;
        }
        if self.sample.is_none() {
            self.sample = Some(value.as_display());
        }
    }

    fn ratio(&self, count: usize) -> f64 {
        if self.non_empty == 0 {
            0.0
        } else {
            count as f64 / self.non_empty as f64
        }
    }

    fn decide(&self, thresholds: &InferenceThresholds) -> ColumnType {
        if self.non_empty == 0 {
            return ColumnType::Text;
        }
        if self.ratio(self.date_matches) > thresholds.date_ratio {
            ColumnType::Date
        } else if self.ratio(self.numeric_matches) > thresholds.numeric_ratio {
            ColumnType::Number
        } else {
            ColumnType::Text
        }
    }

    fn finalize(self) -> ColumnSummary {
        ColumnSummary {
            non_empty: self.non_empty,
            date_matches: self.date_matches,
            numeric_matches: self.numeric_matches,
            sample: self.sample,
        }
    }
}

fn classify<'a>(
    name: &str,
    values: impl Iterator<Item = &'a CellValue>,
    thresholds: &InferenceThresholds,
) -> (ColumnType, TypeCandidate) {
    let mut candidate = TypeCandidate::default();
    for value in values {
        candidate.update(value);
    }
    let datatype = candidate.decide(thresholds);
    debug!(
        "Column '{name}': {}/{} date, {}/{} numeric -> {datatype}",
        candidate.date_matches,
        candidate.non_empty,
        candidate.numeric_matches,
        candidate.non_empty
    );
    (datatype, candidate)
}

/// Classifies one column with the default thresholds.
pub fn detect_column_type(column: &str, dataset: &Dataset) -> Result<ColumnType> {
    detect_column_type_with(column, dataset, &InferenceThresholds::default())
}

pub fn detect_column_type_with(
    column: &str,
    dataset: &Dataset,
    thresholds: &InferenceThresholds,
) -> Result<ColumnType> {
    let index = dataset.require_column(column)?;
    let (datatype, _) = classify(column, dataset.column_values(index), thresholds);
    Ok(datatype)
}

pub fn infer_schema(dataset: &Dataset, thresholds: &InferenceThresholds) -> Schema {
    infer_schema_with_stats(dataset, thresholds).0
}

pub fn infer_schema_with_stats(
    dataset: &Dataset,
    thresholds: &InferenceThresholds,
) -> (Schema, InferenceStats) {
    let mut columns = Vec::with_capacity(dataset.columns().len());
    let mut summaries = Vec::with_capacity(dataset.columns().len());
    for (index, name) in dataset.columns().iter().enumerate() {
        let (datatype, candidate) = classify(name, dataset.column_values(index), thresholds);
        columns.push(ColumnMeta {
            name: name.clone(),
            datatype,
        });
        summaries.push(candidate.finalize());
    }
    let stats = InferenceStats {
        summaries,
        rows_read: dataset.len(),
    };
    (Schema { columns }, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_column(values: &[CellValue]) -> Dataset {
        Dataset::new(
            vec!["col".to_string()],
            values.iter().cloned().map(|v| vec![v]).collect(),
        )
    }

    #[test]
    fn empty_column_is_text() {
        let dataset = single_column(&[CellValue::Empty, CellValue::from("  ")]);
        assert_eq!(detect_column_type("col", &dataset).unwrap(), ColumnType::Text);
    }

    #[test]
    fn serial_numbers_classify_as_date() {
        let dataset = single_column(&[CellValue::Number(45292.0), CellValue::Number(45293.0)]);
        assert_eq!(detect_column_type("col", &dataset).unwrap(), ColumnType::Date);
    }

    #[test]
    fn numeric_text_classifies_as_number() {
        let values = ["100", "50", "30", "12.5", "7"].map(CellValue::from);
        let dataset = single_column(&values);
        assert_eq!(detect_column_type("col", &dataset).unwrap(), ColumnType::Number);
    }

    #[test]
    fn exactly_eighty_percent_numeric_stays_text() {
        let values = ["1", "2", "3", "4", "n/a"].map(CellValue::from);
        let dataset = single_column(&values);
        assert_eq!(detect_column_type("col", &dataset).unwrap(), ColumnType::Text);
    }

    #[test]
    fn half_dates_is_not_enough() {
        let values = ["2024-01-01", "2024-01-02", "East", "West"].map(CellValue::from);
        let dataset = single_column(&values);
        assert_eq!(detect_column_type("col", &dataset).unwrap(), ColumnType::Text);
    }

    #[test]
    fn thresholds_are_tunable() {
        let values = ["1", "2", "3", "4", "n/a"].map(CellValue::from);
        let dataset = single_column(&values);
        let relaxed = InferenceThresholds {
            numeric_ratio: 0.7,
            ..InferenceThresholds::default()
        };
        assert_eq!(
            detect_column_type_with("col", &dataset, &relaxed).unwrap(),
            ColumnType::Number
        );
    }

    #[test]
    fn stats_capture_counts_and_samples() {
        let dataset = Dataset::new(
            vec!["Date".to_string(), "Sales".to_string()],
            vec![
                vec![CellValue::from("2024-01-01"), CellValue::Empty],
                vec![CellValue::from("2024-01-02"), CellValue::from("5")],
            ],
        );
        let (schema, stats) = infer_schema_with_stats(&dataset, &InferenceThresholds::default());
        assert_eq!(schema.column_type("Date"), Some(ColumnType::Date));
        assert_eq!(schema.column_type("Sales"), Some(ColumnType::Number));
        assert_eq!(stats.rows_read(), 2);
        assert_eq!(stats.sample_value(0), Some("2024-01-01"));
        assert_eq!(stats.sample_value(1), Some("5"));
        let summary = stats.summary(1).unwrap();
        assert_eq!(summary.non_empty, 1);
        assert_eq!(summary.numeric_matches, 1);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let dataset = single_column(&[]);
        assert!(detect_column_type("missing", &dataset).is_err());
    }
}
