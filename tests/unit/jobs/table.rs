use super::*;

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "photostamp_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[test]
fn json_table_keeps_null_distinct_from_empty_text() {
    let tmp = temp_dir("table_json");
    std::fs::create_dir_all(&tmp).unwrap();
    let path = tmp.join("jobs.json");
    std::fs::write(
        &path,
        r#"[
            {"Path": "a.jpg", "Plant": "North", "Quality": "A", "Title": "Sunset",
             "Description": null, "Logo": "yes", "Compress(%)": 80},
            {"Path": null, "Plant": null},
            {"Path": "b.jpg", "Plant": "North", "Quality": "A", "Title": "Dawn",
             "Description": "", "Logo": "no", "Compress(%)": 75}
        ]"#,
    )
    .unwrap();

    let records = read_job_table(&path).unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].line, 2);
    assert_eq!(records[0].get("Description"), Some(&CellValue::Empty));
    assert_eq!(records[0].get("Compress(%)"), Some(&CellValue::Number(80.0)));

    assert_eq!(records[1].line, 4);
    assert_eq!(
        records[1].get("Description"),
        Some(&CellValue::Text(String::new()))
    );

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn unsupported_extension_is_rejected() {
    let err = read_job_table(Path::new("jobs.txt")).unwrap_err();
    assert!(err.to_string().contains("unsupported job table format"));
}

#[test]
fn malformed_json_reports_the_file() {
    let tmp = temp_dir("table_bad_json");
    std::fs::create_dir_all(&tmp).unwrap();
    let path = tmp.join("jobs.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = read_job_table(&path).unwrap_err();
    assert!(err.to_string().contains("jobs.json"));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn spreadsheet_cells_map_to_cell_values() {
    assert_eq!(cell_value(&Data::Empty), CellValue::Empty);
    assert_eq!(cell_value(&Data::Int(80)), CellValue::Number(80.0));
    assert_eq!(
        cell_value(&Data::String("yes".into())),
        CellValue::Text("yes".into())
    );
    assert_eq!(cell_value(&Data::Bool(true)), CellValue::Bool(true));
}
