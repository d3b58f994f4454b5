//! Spreadsheet pivot pipeline.
//!
//! A sheet is read into rows, each column's type is inferred, and rows are
//! grouped and reduced into chart points:
//!
//! ```text
//! reader -> data::Dataset -> schema::infer_schema -> aggregate -> pipeline::ChartView
//! ```
//!
//! [`pipeline::PivotSession`] ties the steps together and recomputes the
//! chart view on every upload or configuration change.

pub mod aggregate;
pub mod config;
pub mod data;
pub mod dates;
pub mod error;
pub mod pipeline;
pub mod preview;
pub mod reader;
pub mod schema;
pub mod table;

use std::{env, sync::OnceLock};

use log::LevelFilter;

pub use aggregate::{AggregateFunction, AggregatedPoint, DateBucket};
pub use config::{ChartKind, InferenceThresholds, PivotConfig};
pub use data::{CellValue, Dataset};
pub use error::PivotError;
pub use pipeline::{ChartView, PivotSession};
pub use schema::{ColumnType, Schema};

static LOGGER: OnceLock<()> = OnceLock::new();

/// Installs the `env_logger` backend once.
///
/// `RUST_LOG` takes precedence; without it this crate logs at info level.
pub fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_pivot", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}
