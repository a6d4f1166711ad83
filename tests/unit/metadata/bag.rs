use chrono::NaiveDate;

use super::*;

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

fn local(secs: i64) -> NaiveDateTime {
    DateTime::from_timestamp(secs, 0)
        .unwrap()
        .with_timezone(&chrono::Local)
        .naive_local()
}

#[test]
fn formatted_text_parses_with_metadata_layout() {
    let v = MetadataValue::Text("2023:05:01 10:00:00".to_string());
    assert_eq!(v.as_timestamp(), Some(at(2023, 5, 1, 10, 0, 0)));
}

#[test]
fn numeric_text_is_read_as_epoch() {
    let v = MetadataValue::Text("1690000000".to_string());
    assert_eq!(v.as_timestamp(), Some(local(1_690_000_000)));
}

#[test]
fn numbers_are_read_as_epoch() {
    assert_eq!(
        MetadataValue::Integer(1_690_000_000).as_timestamp(),
        Some(local(1_690_000_000))
    );
    assert_eq!(
        MetadataValue::Float(1_690_000_000.0).as_timestamp(),
        Some(local(1_690_000_000))
    );
}

#[test]
fn trailing_nul_and_whitespace_are_ignored() {
    let v = MetadataValue::Text("2023:05:01 10:00:00\0".to_string());
    assert_eq!(v.as_timestamp(), Some(at(2023, 5, 1, 10, 0, 0)));
}

#[test]
fn garbage_and_non_finite_values_are_rejected() {
    assert_eq!(MetadataValue::Text("yesterday".into()).as_timestamp(), None);
    assert_eq!(MetadataValue::Text("2023-05-01 10:00:00".into()).as_timestamp(), None);
    assert_eq!(MetadataValue::Text("NaN".into()).as_timestamp(), None);
    assert_eq!(MetadataValue::Float(f64::INFINITY).as_timestamp(), None);
}

#[test]
fn embedded_keys_override_filesystem_keys() {
    let mut bag: MetadataBag = [
        (FILE_SIZE, MetadataValue::Integer(10)),
        (CREATION_TIME, MetadataValue::Float(1.0)),
    ]
    .into_iter()
    .collect();
    let embedded: MetadataBag = [
        (CREATION_TIME, MetadataValue::Text("2023:05:01 10:00:00".into())),
        ("Model", MetadataValue::Text("X100".into())),
    ]
    .into_iter()
    .collect();

    bag.merge_embedded(embedded);
    assert_eq!(bag.len(), 3);
    assert_eq!(
        bag.get(CREATION_TIME),
        Some(&MetadataValue::Text("2023:05:01 10:00:00".into()))
    );
    assert_eq!(bag.get(FILE_SIZE), Some(&MetadataValue::Integer(10)));
}

#[test]
fn serializes_as_plain_json_object() {
    let bag: MetadataBag = [
        ("Model", MetadataValue::Text("X100".into())),
        (FILE_SIZE, MetadataValue::Integer(42)),
    ]
    .into_iter()
    .collect();
    let json = serde_json::to_value(&bag).unwrap();
    assert_eq!(json, serde_json::json!({ "Model": "X100", "file_size": 42 }));
}
