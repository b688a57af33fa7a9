//! Integration test: leakage audit of a raw CSV file

use automl_select::diagnostics::diagnose;
use automl_select::pipeline::RunConfig;
use automl_select::SelectError;

fn write(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("raw.csv");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_audit_reports_duplicates_and_leaky_columns() {
    let dir = tempfile::tempdir().unwrap();
    let mut body = String::from("age,leak,site,target\n");
    for i in 0..20 {
        let y = i % 2;
        body.push_str(&format!("{},{},3,{}\n", 40 + i, y, y));
    }
    // Two exact repeats of earlier rows
    body.push_str("40,0,3,0\n");
    body.push_str("41,1,3,1\n");
    let path = write(&dir, &body);

    let report = diagnose(&RunConfig::default().with_data_path(path)).unwrap();

    assert_eq!(report.n_rows, 22);
    assert_eq!(report.duplicate_rows, 2);
    assert_eq!(report.identical_to_target, vec!["leak".to_string()]);
    assert_eq!(report.constant_columns, vec!["site".to_string()]);
    assert!(report.suspected_separators.is_empty());
    assert_eq!(report.class_counts.values().sum::<usize>(), 22);
    assert_eq!(report.feature_importances[0].0, "leak");
    assert_eq!(report.feature_importances.len(), 3);
    assert!(!report.is_clean());
}

#[test]
fn test_audit_of_clean_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut body = String::from("a,b,target\n");
    for i in 0..30 {
        body.push_str(&format!("{},{},{}\n", i, (i * 7) % 11, i % 2));
    }
    let path = write(&dir, &body);

    let report = diagnose(&RunConfig::default().with_data_path(path)).unwrap();
    assert_eq!(report.duplicate_rows, 0);
    assert_eq!(report.train_test_overlap, 0);
    assert!(report.is_clean());
}

#[test]
fn test_audit_requires_outcome_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "a,b\n1,2\n3,4\n");

    let err = diagnose(&RunConfig::default().with_data_path(path)).unwrap_err();
    assert!(matches!(err, SelectError::SchemaError(_)));
}
