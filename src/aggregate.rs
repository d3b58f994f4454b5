//! Grouping and reduction of dataset rows into chart points.
//!
//! Rows are partitioned either by the display text of a categorical column or
//! by a calendar bucket of a date column, and each partition is reduced with
//! one [`AggregateFunction`]. Group order is first-occurrence order, which
//! makes the final stable sort break ties deterministically.

use std::{collections::HashMap, fmt};

use chrono::{Datelike, Days, NaiveDate};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    data::{BLANK_GROUP_KEY, CellValue, Dataset, coerce_number},
    dates::parse_date,
    error::Result,
};

/// Separator between the first and last day of a week bucket key.
pub const WEEK_RANGE_SEPARATOR: &str = " 至 ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum AggregateFunction {
    #[default]
    Sum,
    Avg,
    Count,
    Max,
    Min,
}

impl AggregateFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Count => "count",
            AggregateFunction::Max => "max",
            AggregateFunction::Min => "min",
        }
    }

    pub fn variants() -> &'static [AggregateFunction] {
        &[
            AggregateFunction::Sum,
            AggregateFunction::Avg,
            AggregateFunction::Count,
            AggregateFunction::Max,
            AggregateFunction::Min,
        ]
    }

    /// Parses a label case-insensitively; unknown labels fall back to sum.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "sum" => AggregateFunction::Sum,
            "avg" | "average" | "mean" => AggregateFunction::Avg,
            "count" => AggregateFunction::Count,
            "max" => AggregateFunction::Max,
            "min" => AggregateFunction::Min,
            other => {
                warn!("Unknown aggregate function '{other}', using sum");
                AggregateFunction::Sum
            }
        }
    }
}

impl From<String> for AggregateFunction {
    fn from(value: String) -> Self {
        AggregateFunction::from_label(&value)
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum DateBucket {
    #[default]
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl DateBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateBucket::Day => "day",
            DateBucket::Week => "week",
            DateBucket::Month => "month",
            DateBucket::Quarter => "quarter",
            DateBucket::Year => "year",
        }
    }

    /// Parses a label case-insensitively; unknown labels fall back to day.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "day" => DateBucket::Day,
            "week" => DateBucket::Week,
            "month" => DateBucket::Month,
            "quarter" => DateBucket::Quarter,
            "year" => DateBucket::Year,
            other => {
                warn!("Unknown date bucket '{other}', using day");
                DateBucket::Day
            }
        }
    }

    /// First calendar day of the bucket containing `date`.
    ///
    /// Weeks start on Sunday.
    pub fn start_of(&self, date: NaiveDate) -> NaiveDate {
        let start = match self {
            DateBucket::Day => Some(date),
            DateBucket::Week => date.checked_sub_days(Days::new(u64::from(
                date.weekday().num_days_from_sunday(),
            ))),
            DateBucket::Month => date.with_day(1),
            DateBucket::Quarter => {
                let first_month = (quarter_of(date) - 1) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), first_month, 1)
            }
            DateBucket::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
        };
        start.unwrap_or(NaiveDate::MIN)
    }

    /// Group key for `date`, e.g. `2024-01` for a month bucket.
    pub fn key_for(&self, date: NaiveDate) -> String {
        match self {
            DateBucket::Day => format_day(date),
            DateBucket::Week => {
                let start = self.start_of(date);
                let end = start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
                format!(
                    "{}{WEEK_RANGE_SEPARATOR}{}",
                    format_day(start),
                    format_day(end)
                )
            }
            DateBucket::Month => format!("{}-{:02}", date.year(), date.month()),
            DateBucket::Quarter => format!("{}-Q{}", date.year(), quarter_of(date)),
            DateBucket::Year => date.year().to_string(),
        }
    }
}

impl From<String> for DateBucket {
    fn from(value: String) -> Self {
        DateBucket::from_label(&value)
    }
}

impl fmt::Display for DateBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn quarter_of(date: NaiveDate) -> u32 {
    date.month().div_ceil(3)
}

fn format_day(date: NaiveDate) -> String {
    format!("{}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// One reduced group, ready for the chart layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPoint {
    pub group_key: String,
    pub value: f64,
}

impl AggregatedPoint {
    /// The value rounded to two decimals, as shown on the chart.
    pub fn display_value(&self) -> String {
        format!("{:.2}", self.value)
    }
}

#[derive(Debug, Clone, Copy)]
struct GroupAccumulator {
    sum: f64,
    count: usize,
    min: f64,
    max: f64,
}

impl GroupAccumulator {
    fn new() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn reduce(&self, function: AggregateFunction) -> f64 {
        match function {
            AggregateFunction::Sum => self.sum,
            AggregateFunction::Avg => {
                if self.count > 0 {
                    self.sum / self.count as f64
                } else {
                    0.0
                }
            }
            AggregateFunction::Count => self.count as f64,
            AggregateFunction::Max => self.max,
            AggregateFunction::Min => self.min,
        }
    }
}

struct Group<T> {
    key: String,
    tag: T,
    acc: GroupAccumulator,
}

/// Group accumulators in first-occurrence order.
struct OrderedGroups<T> {
    index: HashMap<String, usize>,
    groups: Vec<Group<T>>,
}

impl<T> OrderedGroups<T> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    fn entry(&mut self, key: String, tag: impl FnOnce() -> T) -> &mut GroupAccumulator {
        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                let position = self.groups.len();
                self.index.insert(key.clone(), position);
                self.groups.push(Group {
                    key,
                    tag: tag(),
                    acc: GroupAccumulator::new(),
                });
                position
            }
        };
        &mut self.groups[position].acc
    }

    fn into_points(self, function: AggregateFunction) -> Vec<(AggregatedPoint, T)> {
        self.groups
            .into_iter()
            .map(|group| {
                let point = AggregatedPoint {
                    value: group.acc.reduce(function),
                    group_key: group.key,
                };
                (point, group.tag)
            })
            .collect()
    }
}

fn group_key(cell: &CellValue) -> String {
    if cell.is_empty() {
        BLANK_GROUP_KEY.to_string()
    } else {
        cell.as_display()
    }
}

/// Groups rows by the display text of `group_by` and reduces `value_column`.
///
/// Unparseable values count as zero. The result is sorted by value,
/// largest first; equal values keep first-occurrence order.
pub fn group_and_aggregate(
    dataset: &Dataset,
    group_by: &str,
    value_column: &str,
    function: AggregateFunction,
) -> Result<Vec<AggregatedPoint>> {
    let group_index = dataset.require_column(group_by)?;
    let value_index = dataset.require_column(value_column)?;

    let mut groups = OrderedGroups::new();
    for row in dataset.rows() {
        let value = coerce_number(&row[value_index]);
        groups.entry(group_key(&row[group_index]), || ()).add(value);
    }

    let mut points = groups
        .into_points(function)
        .into_iter()
        .map(|(point, ())| point)
        .collect::<Vec<_>>();
    points.sort_by(|a, b| b.value.total_cmp(&a.value));
    debug!(
        "Grouped {} row(s) by '{group_by}' into {} point(s) using {function}",
        dataset.len(),
        points.len()
    );
    Ok(points)
}

/// Groups rows by calendar bucket of `date_column` and reduces `value_column`.
///
/// Rows whose date cell does not parse are left out. The result is sorted by
/// bucket start date, oldest first.
pub fn aggregate_by_date(
    dataset: &Dataset,
    date_column: &str,
    value_column: &str,
    function: AggregateFunction,
    bucket: DateBucket,
) -> Result<Vec<AggregatedPoint>> {
    let date_index = dataset.require_column(date_column)?;
    let value_index = dataset.require_column(value_column)?;

    let mut groups = OrderedGroups::new();
    let mut skipped = 0usize;
    for row in dataset.rows() {
        let Some(date) = parse_date(&row[date_index]) else {
            skipped += 1;
            continue;
        };
        let value = coerce_number(&row[value_index]);
        groups
            .entry(bucket.key_for(date), || bucket.start_of(date))
            .add(value);
    }
    if skipped > 0 {
        debug!("Skipped {skipped} row(s) with no parseable date in '{date_column}'");
    }

    let mut points = groups.into_points(function);
    points.sort_by_key(|(_, start)| *start);
    Ok(points.into_iter().map(|(point, _)| point).collect())
}
