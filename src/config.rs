//! Pivot configuration and inference tuning.
//!
//! [`PivotConfig`] is immutable: every setter returns a new value so the
//! session can recompute from a complete configuration on each change.

use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    aggregate::{AggregateFunction, DateBucket},
    error::{PivotError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Area,
    Pie,
    Scatter,
}

/// Ratios a column must exceed to be classified as Date or Number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceThresholds {
    pub date_ratio: f64,
    pub numeric_ratio: f64,
}

impl Default for InferenceThresholds {
    fn default() -> Self {
        Self {
            date_ratio: 0.5,
            numeric_ratio: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotConfig {
    pub group_by: Option<String>,
    pub value_column: Option<String>,
    pub function: AggregateFunction,
    pub bucket: DateBucket,
    pub chart_kind: ChartKind,
    pub thresholds: InferenceThresholds,
}

impl PivotConfig {
    pub fn with_group_by(&self, column: Option<String>) -> Self {
        Self {
            group_by: column,
            ..self.clone()
        }
    }

    pub fn with_value_column(&self, column: Option<String>) -> Self {
        Self {
            value_column: column,
            ..self.clone()
        }
    }

    pub fn with_function(&self, function: AggregateFunction) -> Self {
        Self {
            function,
            ..self.clone()
        }
    }

    pub fn with_bucket(&self, bucket: DateBucket) -> Self {
        Self {
            bucket,
            ..self.clone()
        }
    }

    pub fn with_chart_kind(&self, chart_kind: ChartKind) -> Self {
        Self {
            chart_kind,
            ..self.clone()
        }
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|err| PivotError::Config {
            message: err.to_string(),
        })
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).map_err(|err| PivotError::Config {
            message: err.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml_string()?;
        std::fs::write(path, yaml).map_err(|err| PivotError::Config {
            message: format!("writing {path:?}: {err}"),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|err| PivotError::Config {
            message: format!("opening {path:?}: {err}"),
        })?;
        serde_yaml::from_reader(BufReader::new(file)).map_err(|err| PivotError::Config {
            message: format!("parsing {path:?}: {err}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_leave_original_untouched() {
        let base = PivotConfig::default();
        let next = base
            .with_group_by(Some("Region".to_string()))
            .with_function(AggregateFunction::Avg);
        assert_eq!(base.group_by, None);
        assert_eq!(base.function, AggregateFunction::Sum);
        assert_eq!(next.group_by.as_deref(), Some("Region"));
        assert_eq!(next.function, AggregateFunction::Avg);
    }

    #[test]
    fn yaml_uses_lowercase_labels_and_defaults() {
        let config = PivotConfig::from_yaml_str(
            "group_by: Date\nvalue_column: Sales\nfunction: max\nbucket: quarter\n",
        )
        .expect("parse yaml");
        assert_eq!(config.function, AggregateFunction::Max);
        assert_eq!(config.bucket, DateBucket::Quarter);
        assert_eq!(config.chart_kind, ChartKind::Bar);
        assert_eq!(config.thresholds, InferenceThresholds::default());

        let rendered = config.to_yaml_string().expect("render yaml");
        assert!(rendered.contains("function: max"));
        assert!(rendered.contains("bucket: quarter"));
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = PivotConfig::from_yaml_str("function: [").unwrap_err();
        assert!(matches!(err, PivotError::Config { .. }));
    }
}
