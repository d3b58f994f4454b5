//! Upload-to-chart orchestration.
//!
//! [`compute_chart`] is the pure step: one loaded dataset plus one complete
//! [`PivotConfig`] yields one [`ChartView`]. [`PivotSession`] holds the
//! current dataset and configuration and calls it after every change, so the
//! view always matches the configuration it was computed from.

use std::path::Path;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::{
    aggregate::{
        AggregateFunction, AggregatedPoint, DateBucket, aggregate_by_date, group_and_aggregate,
    },
    config::{ChartKind, InferenceThresholds, PivotConfig},
    data::Dataset,
    error::{PivotError, Result},
    preview,
    reader::{self, SheetTable},
    schema::{ColumnType, Schema, infer_schema_with_stats},
};

pub const DEFAULT_X_AXIS_TITLE: &str = "Group";
pub const DEFAULT_Y_AXIS_TITLE: &str = "Value";

/// Chart-ready output of one recomputation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub points: Vec<AggregatedPoint>,
    pub group_column: Option<String>,
    pub value_column: Option<String>,
    pub x_axis_title: String,
    pub y_axis_title: String,
    pub group_is_date: bool,
    pub chart_kind: ChartKind,
}

impl Default for ChartView {
    fn default() -> Self {
        Self::empty(ChartKind::default())
    }
}

impl ChartView {
    pub fn empty(chart_kind: ChartKind) -> Self {
        Self {
            points: Vec::new(),
            group_column: None,
            value_column: None,
            x_axis_title: DEFAULT_X_AXIS_TITLE.to_string(),
            y_axis_title: DEFAULT_Y_AXIS_TITLE.to_string(),
            group_is_date: false,
            chart_kind,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum of the values as displayed, i.e. each rounded to two decimals.
    pub fn total(&self) -> f64 {
        self.points
            .iter()
            .map(|point| (point.value * 100.0).round() / 100.0)
            .sum()
    }

    /// One object per point keyed by the column names, values as two-decimal
    /// strings: `[{"Region": "East", "Sales": "150.00"}]`.
    pub fn to_records(&self) -> JsonValue {
        let group_key = self.group_column.as_deref().unwrap_or(DEFAULT_X_AXIS_TITLE);
        let value_key = self.value_column.as_deref().unwrap_or(DEFAULT_Y_AXIS_TITLE);
        JsonValue::Array(
            self.points
                .iter()
                .map(|point| {
                    let mut record = Map::new();
                    record.insert(
                        group_key.to_string(),
                        JsonValue::String(point.group_key.clone()),
                    );
                    record.insert(
                        value_key.to_string(),
                        JsonValue::String(point.display_value()),
                    );
                    JsonValue::Object(record)
                })
                .collect(),
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A parsed upload together with its inferred schema.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDataset {
    pub file_name: String,
    pub dataset: Dataset,
    pub schema: Schema,
}

impl LoadedDataset {
    pub fn new(
        file_name: impl Into<String>,
        table: SheetTable,
        thresholds: &InferenceThresholds,
    ) -> Self {
        let dataset = Dataset::from(table);
        let (schema, stats) = infer_schema_with_stats(&dataset, thresholds);
        for (index, column) in schema.columns.iter().enumerate() {
            if let Some(summary) = stats.summary(index) {
                debug!(
                    "Column '{}' -> {} ({} non-empty, sample {:?})",
                    column.name,
                    column.datatype,
                    summary.non_empty,
                    summary.sample.as_deref().unwrap_or("")
                );
            }
        }
        Self {
            file_name: file_name.into(),
            dataset,
            schema,
        }
    }
}

/// Picks the initial group-by and value columns for a fresh upload.
///
/// Group-by prefers the first Date column, then the first non-Number column.
/// The value column is the first Number column.
pub fn default_axes(schema: &Schema) -> (Option<String>, Option<String>) {
    let group_by = schema
        .columns_of(ColumnType::Date)
        .next()
        .or_else(|| {
            schema
                .columns
                .iter()
                .find(|c| c.datatype != ColumnType::Number)
                .map(|c| c.name.as_str())
        })
        .map(str::to_string);
    let value_column = schema
        .columns_of(ColumnType::Number)
        .next()
        .map(str::to_string);
    (group_by, value_column)
}

/// Aggregates `loaded` according to `config`.
///
/// A configuration without both columns selected, or an empty dataset,
/// yields an empty view rather than an error.
pub fn compute_chart(loaded: &LoadedDataset, config: &PivotConfig) -> Result<ChartView> {
    let (Some(group_by), Some(value_column)) = (&config.group_by, &config.value_column) else {
        return Ok(ChartView::empty(config.chart_kind));
    };
    if loaded.dataset.is_empty() {
        return Ok(ChartView::empty(config.chart_kind));
    }

    let group_is_date = loaded.schema.column_type(group_by) == Some(ColumnType::Date);
    let points = if group_is_date {
        aggregate_by_date(
            &loaded.dataset,
            group_by,
            value_column,
            config.function,
            config.bucket,
        )?
    } else {
        group_and_aggregate(&loaded.dataset, group_by, value_column, config.function)?
    };
    if points.is_empty() {
        return Err(PivotError::EmptyResult {
            column: group_by.clone(),
        });
    }

    Ok(ChartView {
        points,
        group_column: Some(group_by.clone()),
        value_column: Some(value_column.clone()),
        x_axis_title: group_by.clone(),
        y_axis_title: format!("{value_column} ({})", config.function),
        group_is_date,
        chart_kind: config.chart_kind,
    })
}

/// Owns the current upload, configuration, and derived chart view.
///
/// Every mutation replaces the configuration wholesale and recomputes. A
/// failure leaves an empty view plus a user-facing message; it never keeps
/// points computed for an earlier configuration.
///
/// The loading flag is raised from [`PivotSession::begin_load`] until the
/// upload lands or fails. A second upload while it is raised is not
/// rejected; whichever finishes last wins.
#[derive(Debug, Clone, Default)]
pub struct PivotSession {
    loaded: Option<LoadedDataset>,
    config: PivotConfig,
    view: ChartView,
    loading: bool,
    error: Option<String>,
}

impl PivotSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PivotConfig) -> Self {
        Self {
            view: ChartView::empty(config.chart_kind),
            config,
            ..Self::default()
        }
    }

    pub fn loaded(&self) -> Option<&LoadedDataset> {
        self.loaded.as_ref()
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.loaded.as_ref().map(|l| &l.dataset)
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.loaded.as_ref().map(|l| &l.schema)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.loaded.as_ref().map(|l| l.file_name.as_str())
    }

    pub fn config(&self) -> &PivotConfig {
        &self.config
    }

    pub fn view(&self) -> &ChartView {
        &self.view
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Marks an upload as in flight, e.g. while the caller reads file bytes
    /// off the UI thread. Cleared by [`Self::load_table`], a failed
    /// [`Self::load_path`], [`Self::fail_load`], or [`Self::clear`].
    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    /// Ends an in-flight upload that failed before a table was produced.
    ///
    /// The previous dataset and view stay in place.
    pub fn fail_load(&mut self, err: &PivotError) {
        warn!("Upload failed: {err}");
        self.loading = false;
        self.error = Some(err.user_message().to_string());
    }

    /// The message to show the user for the most recent failure, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Reads a spreadsheet from disk and makes it the current dataset.
    ///
    /// On failure the previous dataset and view stay in place and the upload
    /// message is surfaced.
    pub fn load_path(&mut self, path: &Path) -> Result<()> {
        self.begin_load();
        match reader::read_path(path) {
            Ok(table) => {
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                self.load_table(file_name, table);
                Ok(())
            }
            Err(err) => {
                self.fail_load(&err);
                Err(err)
            }
        }
    }

    /// Replaces the dataset with `table` and selects default axes.
    ///
    /// The aggregate function, date bucket, and chart kind carry over.
    pub fn load_table(&mut self, file_name: impl Into<String>, table: SheetTable) {
        let loaded = LoadedDataset::new(file_name, table, &self.config.thresholds);
        info!(
            "Loaded '{}' with {} row(s) and {} column(s)",
            loaded.file_name,
            loaded.dataset.len(),
            loaded.dataset.columns().len()
        );
        let (group_by, value_column) = default_axes(&loaded.schema);
        self.config = self
            .config
            .with_group_by(group_by)
            .with_value_column(value_column);
        self.loaded = Some(loaded);
        self.loading = false;
        self.error = None;
        self.recompute();
    }

    pub fn clear(&mut self) {
        self.loaded = None;
        self.config = self
            .config
            .with_group_by(None)
            .with_value_column(None);
        self.view = ChartView::empty(self.config.chart_kind);
        self.loading = false;
        self.error = None;
    }

    pub fn set_group_by(&mut self, column: Option<String>) {
        let config = self.config.with_group_by(column);
        self.apply_config(config);
    }

    pub fn set_value_column(&mut self, column: Option<String>) {
        let config = self.config.with_value_column(column);
        self.apply_config(config);
    }

    pub fn set_function(&mut self, function: AggregateFunction) {
        let config = self.config.with_function(function);
        self.apply_config(config);
    }

    pub fn set_bucket(&mut self, bucket: DateBucket) {
        let config = self.config.with_bucket(bucket);
        self.apply_config(config);
    }

    pub fn set_chart_kind(&mut self, chart_kind: ChartKind) {
        let config = self.config.with_chart_kind(chart_kind);
        self.apply_config(config);
    }

    /// Installs a complete configuration and recomputes the view.
    ///
    /// Thresholds only take effect on the next upload.
    pub fn apply_config(&mut self, config: PivotConfig) {
        self.config = config;
        self.recompute();
    }

    fn recompute(&mut self) {
        let Some(loaded) = &self.loaded else {
            self.view = ChartView::empty(self.config.chart_kind);
            return;
        };
        match compute_chart(loaded, &self.config) {
            Ok(view) => {
                info!(
                    "Computed {} point(s) for '{}' by '{}'",
                    view.points.len(),
                    view.y_axis_title,
                    view.x_axis_title
                );
                self.view = view;
                self.error = None;
            }
            Err(err) => {
                warn!("Aggregation failed: {err}");
                self.view = ChartView::empty(self.config.chart_kind);
                self.error = Some(err.user_message().to_string());
            }
        }
    }

    /// Columns offered for the group-by axis: everything that is not Number.
    pub fn group_by_candidates(&self) -> Vec<&str> {
        self.schema()
            .map(|schema| {
                schema
                    .columns
                    .iter()
                    .filter(|c| c.datatype != ColumnType::Number)
                    .map(|c| c.name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn value_candidates(&self) -> Vec<&str> {
        self.schema()
            .map(|schema| schema.columns_of(ColumnType::Number).collect())
            .unwrap_or_default()
    }

    /// Whether the date bucket setting affects the current view.
    pub fn bucket_applies(&self) -> bool {
        match (self.schema(), &self.config.group_by) {
            (Some(schema), Some(group_by)) => {
                schema.column_type(group_by) == Some(ColumnType::Date)
            }
            _ => false,
        }
    }

    pub fn preview(&self, limit: usize) -> Option<String> {
        self.loaded
            .as_ref()
            .map(|l| preview::render_preview(&l.dataset, &l.schema, limit))
    }
}
