//! Spreadsheet loading into the `{columns, rows}` shape the pipeline consumes.
//!
//! Only the first worksheet is read and its first row is the header. Workbook
//! formats go through `calamine`; delimited text goes through `csv` with
//! `encoding_rs` decoding.
//!
//! Workbook numbers are delivered as their display text, the same view a user
//! sees in the sheet. Date-formatted cells are delivered as serial numbers so
//! the date parser can recognise them regardless of the display format.

use std::{
    collections::HashSet,
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Context, anyhow};
use calamine::{Data, Reader, open_workbook_auto};
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info};

use crate::{
    data::{CellValue, Dataset, format_number},
    dates::datetime_to_serial,
    error::{PivotError, Result},
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];
const DELIMITED_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

/// Header names plus data rows of one sheet, before type inference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    /// Splits raw rows into a header and data rows.
    ///
    /// Leading blank rows are ignored, blank data rows are dropped, blank
    /// header cells become `column_{n}`, and repeated names get a numeric
    /// suffix. Returns `None` when there is no header row at all.
    pub fn from_raw_rows(raw: Vec<Vec<CellValue>>) -> Option<Self> {
        let mut rows = raw
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.is_empty()));
        let header = rows.next()?;
        let columns = unique_headers(&header);
        let width = columns.len();
        let rows = rows
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Some(Self { columns, rows })
    }
}

impl From<SheetTable> for Dataset {
    fn from(table: SheetTable) -> Self {
        Dataset::new(table.columns, table.rows)
    }
}

fn unique_headers(header: &[CellValue]) -> Vec<String> {
    let mut seen = HashSet::new();
    header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = match cell.as_display().trim() {
                "" => format!("column_{}", idx + 1),
                name => name.to_string(),
            };
            let mut name = base.clone();
            let mut suffix = 1usize;
            while !seen.insert(name.clone()) {
                name = format!("{base}_{suffix}");
                suffix += 1;
            }
            name
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => {
            Encoding::for_label(value.trim().as_bytes()).ok_or_else(|| PivotError::Config {
                message: format!("unknown encoding '{value}'"),
            })
        }
        None => Ok(UTF_8),
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match extension_of(path).as_deref() {
        Some("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn read_path(path: &Path) -> Result<SheetTable> {
    read_path_with(path, &ReaderOptions::default())
}

pub fn read_path_with(path: &Path, options: &ReaderOptions) -> Result<SheetTable> {
    let extension = extension_of(path).unwrap_or_default();
    let raw = if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        read_workbook(path)
    } else if DELIMITED_EXTENSIONS.contains(&extension.as_str()) {
        let delimiter = resolve_input_delimiter(path, options.delimiter);
        File::open(path)
            .with_context(|| format!("Opening input file {path:?}"))
            .and_then(|file| read_delimited(BufReader::new(file), delimiter, options.encoding))
    } else {
        return Err(PivotError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    };
    let raw = raw.map_err(|err| PivotError::FileParse {
        path: path.to_path_buf(),
        message: format!("{err:#}"),
    })?;

    let table = SheetTable::from_raw_rows(raw).ok_or_else(|| PivotError::EmptySheet {
        path: path.to_path_buf(),
    })?;
    info!(
        "Read {} row(s) across {} column(s) from {:?}",
        table.rows.len(),
        table.columns.len(),
        path
    );
    Ok(table)
}

fn read_workbook(path: &Path) -> anyhow::Result<Vec<Vec<CellValue>>> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("Opening workbook {path:?}"))?;
    if let Some(name) = workbook.sheet_names().first() {
        debug!("Reading worksheet '{name}' from {path:?}");
    }
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("Workbook has no worksheets"))?
        .context("Reading first worksheet")?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(workbook_cell).collect())
        .collect())
}

fn workbook_cell(cell: &Data) -> CellValue {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            CellValue::text(s.clone())
        }
        Data::Int(i) => CellValue::Text(i.to_string()),
        Data::Float(f) => CellValue::Text(format_number(*f)),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) if dt.is_datetime() => dt
            .as_datetime()
            .map(|value| CellValue::Number(datetime_to_serial(value)))
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTime(dt) => CellValue::Text(format_number(dt.as_f64())),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

/// Reads every record of a delimited text source without header handling.
pub fn read_delimited<R: Read>(
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
) -> anyhow::Result<Vec<Vec<CellValue>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(reader);
    let mut rows = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", idx + 1))?;
        let row = record
            .iter()
            .map(|field| decode_bytes(field, encoding).map(CellValue::text))
            .collect::<anyhow::Result<Vec<_>>>()
            .with_context(|| format!("Decoding row {}", idx + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> anyhow::Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}
