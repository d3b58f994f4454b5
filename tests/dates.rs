use chrono::NaiveDate;
use proptest::prelude::*;
use sheet_pivot::{
    data::CellValue,
    dates::{datetime_to_serial, parse_date, parse_date_str, serial_to_date},
};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn every_supported_layout_resolves_to_the_same_day() {
    let expected = ymd(2024, 3, 9);
    for text in [
        "2024-03-09",
        "2024/3/9",
        "2024-03-09T08:15:00Z",
        "2024-03-09T23:59:59.999Z",
        "2024年3月9日",
        "09/03/2024",
        "9-3-2024",
        "2024.3.9",
        " 2024-03-09 ",
    ] {
        assert_eq!(parse_date_str(text), Some(expected), "{text}");
    }
    assert_eq!(parse_date(&CellValue::Number(45360.0)), Some(expected));
}

#[test]
fn late_utc_timestamps_keep_the_written_day() {
    assert_eq!(
        parse_date_str("2023-12-31T23:30:00Z"),
        Some(ymd(2023, 12, 31))
    );
}

#[test]
fn non_dates_are_rejected() {
    for text in ["", "East", "12345", "2024", "2024-02-30", "32/01/2024", "Q1 2024"] {
        assert_eq!(parse_date_str(text), None, "{text}");
    }
    assert_eq!(parse_date(&CellValue::Empty), None);
    assert_eq!(parse_date(&CellValue::Number(f64::NAN)), None);
}

proptest! {
    #[test]
    fn iso_text_and_serial_agree(offset in 0i64..60_000) {
        let date = ymd(1900, 3, 1) + chrono::Duration::days(offset);
        let iso = date.format("%Y-%m-%d").to_string();
        prop_assert_eq!(parse_date_str(&iso), Some(date));

        let midnight = date.and_hms_opt(0, 0, 0).unwrap();
        prop_assert_eq!(serial_to_date(datetime_to_serial(midnight)), Some(date));
        let evening = date.and_hms_opt(21, 45, 0).unwrap();
        prop_assert_eq!(serial_to_date(datetime_to_serial(evening)), Some(date));
    }

    #[test]
    fn day_first_layout_swaps_fields(offset in 0i64..20_000) {
        let date = ymd(1990, 1, 1) + chrono::Duration::days(offset);
        let text = date.format("%d/%m/%Y").to_string();
        prop_assert_eq!(parse_date_str(&text), Some(date));
    }
}
