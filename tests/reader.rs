mod common;

use sheet_pivot::{
    data::CellValue,
    error::{PivotError, UPLOAD_FAILED_MESSAGE},
    reader::{ReaderOptions, read_path, read_path_with, resolve_encoding},
};

use common::TestWorkspace;

#[test]
fn csv_first_row_becomes_the_header() {
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "sales.csv",
        "Region,Date,Sales\nEast,2024-01-05,100\n\nWest,2024-02-01,30\n",
    );
    let table = read_path(&path).expect("read csv");
    assert_eq!(table.columns, vec!["Region", "Date", "Sales"]);
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[1][0], CellValue::from("West"));
    assert_eq!(table.rows[1][2], CellValue::from("30"));
}

#[test]
fn tsv_extension_switches_delimiter() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("sales.tsv", "Region\tSales\nEast, North\t12\n");
    let table = read_path(&path).expect("read tsv");
    assert_eq!(table.columns, vec!["Region", "Sales"]);
    assert_eq!(table.rows[0][0], CellValue::from("East, North"));
}

#[test]
fn ragged_rows_are_padded_and_blank_cells_empty() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("ragged.csv", "A,B,C\n1\n2,,3\n");
    let table = read_path(&path).expect("read csv");
    assert_eq!(
        table.rows,
        vec![
            vec![CellValue::from("1"), CellValue::Empty, CellValue::Empty],
            vec![CellValue::from("2"), CellValue::Empty, CellValue::from("3")],
        ]
    );
}

#[test]
fn duplicate_and_blank_headers_are_renamed() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("dupes.csv", "Sales,,Sales\n1,2,3\n");
    let table = read_path(&path).expect("read csv");
    assert_eq!(table.columns, vec!["Sales", "column_2", "Sales_1"]);
}

#[test]
fn explicit_encoding_decodes_legacy_bytes() {
    let workspace = TestWorkspace::new();
    let encoding = resolve_encoding(Some("gbk")).expect("gbk label");
    let (bytes, _, _) = encoding.encode("地区,销售额\n华东,100\n");
    let path = workspace.write_bytes("legacy.csv", &bytes);
    let options = ReaderOptions {
        encoding,
        ..ReaderOptions::default()
    };
    let table = read_path_with(&path, &options).expect("read gbk csv");
    assert_eq!(table.columns, vec!["地区", "销售额"]);
    assert_eq!(table.rows[0][0], CellValue::from("华东"));
}

#[test]
fn explicit_delimiter_overrides_extension() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("semi.csv", "Region;Sales\nEast;5\n");
    let options = ReaderOptions {
        delimiter: Some(b';'),
        ..ReaderOptions::default()
    };
    let table = read_path_with(&path, &options).expect("read csv");
    assert_eq!(table.columns, vec!["Region", "Sales"]);
}

#[test]
fn unsupported_extension_is_rejected_before_reading() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("report.pdf", "%PDF-1.7");
    let err = read_path(&path).unwrap_err();
    assert!(matches!(err, PivotError::UnsupportedFormat { .. }));
    assert!(err.is_upload_error());
    assert_eq!(err.user_message(), UPLOAD_FAILED_MESSAGE);
}

#[test]
fn corrupt_workbook_is_a_parse_failure() {
    let workspace = TestWorkspace::new();
    let path = workspace.write_bytes("broken.xlsx", b"this is not a zip archive");
    let err = read_path(&path).unwrap_err();
    assert!(matches!(err, PivotError::FileParse { .. }), "{err:?}");
    assert_eq!(err.user_message(), UPLOAD_FAILED_MESSAGE);
}

#[test]
fn missing_file_is_a_parse_failure() {
    let workspace = TestWorkspace::new();
    let err = read_path(&workspace.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, PivotError::FileParse { .. }));
}

#[test]
fn file_without_header_is_an_empty_sheet() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("empty.csv", "\n,,\n");
    let err = read_path(&path).unwrap_err();
    assert!(matches!(err, PivotError::EmptySheet { .. }));
    assert!(err.is_upload_error());
}

#[test]
fn header_only_file_has_no_rows() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("header.csv", "Region,Sales\n");
    let table = read_path(&path).expect("read csv");
    assert_eq!(table.columns.len(), 2);
    assert!(table.rows.is_empty());
}
