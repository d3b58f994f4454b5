use crate::{
    data::Dataset,
    schema::{ColumnType, Schema},
    table::{self, Align},
};

/// Rows shown under the chart when no explicit limit is given.
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

const EMPTY_CELL_MARKER: &str = "-";

/// Renders the first `limit` rows with each header annotated by its type.
///
/// Empty cells show as `-`; a trailing note reports how many rows were left
/// out.
pub fn render_preview(dataset: &Dataset, schema: &Schema, limit: usize) -> String {
    let headers = dataset
        .columns()
        .iter()
        .map(|name| match schema.column_type(name) {
            Some(datatype) => format!("{name} ({datatype})"),
            None => name.clone(),
        })
        .collect::<Vec<_>>();
    let align = dataset
        .columns()
        .iter()
        .map(|name| match schema.column_type(name) {
            Some(ColumnType::Number) => Align::Right,
            _ => Align::Left,
        })
        .collect::<Vec<_>>();
    let rows = dataset
        .rows()
        .iter()
        .take(limit)
        .map(|row| {
            row.iter()
                .map(|cell| {
                    if cell.is_empty() {
                        EMPTY_CELL_MARKER.to_string()
                    } else {
                        cell.as_display()
                    }
                })
                .collect()
        })
        .collect::<Vec<Vec<String>>>();

    let mut rendered = table::render_table(&headers, &rows, &align);
    if dataset.len() > rows.len() {
        rendered.push_str(&format!(
            "Showing first {} of {} row(s)\n",
            rows.len(),
            dataset.len()
        ));
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::InferenceThresholds, data::CellValue, schema::infer_schema};

    #[test]
    fn preview_marks_types_and_empty_cells() {
        let dataset = Dataset::new(
            vec!["Region".to_string(), "Sales".to_string()],
            vec![
                vec![CellValue::from("East"), CellValue::from("100")],
                vec![CellValue::from("West"), CellValue::Empty],
                vec![CellValue::from("North"), CellValue::from("7")],
            ],
        );
        let schema = infer_schema(&dataset, &InferenceThresholds::default());
        let rendered = render_preview(&dataset, &schema, 2);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Region (text)  Sales (number)");
        assert!(lines[3].ends_with('-'));
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[4], "Showing first 2 of 3 row(s)");
    }
}
