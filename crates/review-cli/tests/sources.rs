//! File-backed collaborators.

use std::fs;

use review_cli::sources::{
    FileExtractor, RegistrySource, SIMULATED_SAVE_FAILURE, SimulatedRowStore, parse_csv_table,
    parse_json_table, sample_identities,
};
use review_core::{
    ExtractionError, Extractor, IdentityRegistry, ImageInput, RegistryLoadError, RowStore,
    SaveRequest,
};
use review_model::{PayloadValue, SavePayload};

fn request(row_index: usize) -> SaveRequest {
    request_from("page", row_index)
}

fn request_from(table_digest: &str, row_index: usize) -> SaveRequest {
    let payload = SavePayload {
        values: vec![PayloadValue::Identity(101), PayloadValue::Text("3".to_string())],
        types: vec!["name".to_string(), "quantity".to_string()],
    };
    SaveRequest::new(
        table_digest,
        row_index,
        payload,
        chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
    )
}

#[test]
fn json_table_is_validated() {
    let table = parse_json_table(br#"{"headers": ["Name", "Count"], "rows": [["a", "1"]]}"#)
        .unwrap();
    assert_eq!(table.headers(), ["Name", "Count"]);
    assert_eq!(table.row_count(), 1);

    for bad in [
        &br#"{"headers": ["Name"], "rows": [["a", "1"]]}"#[..],
        &br#"{"rows": [["a"]]}"#[..],
        &br#"{"headers": ["Name"], "rows": [[1]]}"#[..],
        &b"not json"[..],
    ] {
        let err = parse_json_table(bad).unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed { .. }), "{err}");
    }
}

#[test]
fn csv_table_uses_first_record_as_headers() {
    let table = parse_csv_table("Name,Count\nعلی رضایی,3\n\"Doe, J\",4\n".as_bytes()).unwrap();
    assert_eq!(table.headers(), ["Name", "Count"]);
    assert_eq!(table.row(1).unwrap(), ["Doe, J", "4"]);

    let err = parse_csv_table(b"Name,Count\na\n").unwrap_err();
    assert!(matches!(err, ExtractionError::Malformed { .. }));
}

#[tokio::test]
async fn images_are_unsupported() {
    let image = ImageInput::new("scan.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47]);
    let err = FileExtractor.extract(&image).await.unwrap_err();
    assert!(matches!(
        err,
        ExtractionError::Unsupported { ref mime_type, .. } if mime_type == "image/png"
    ));
}

#[tokio::test]
async fn extractor_reads_files_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("page.csv");
    fs::write(&path, "A,B\nx,y\n").unwrap();
    let image = ImageInput::from_path(&path).unwrap();
    assert_eq!(image.mime_type, "text/csv");
    let table = FileExtractor.extract(&image).await.unwrap();
    assert_eq!(table.row(0).unwrap(), ["x", "y"]);
}

#[tokio::test]
async fn registry_sources() {
    let builtin = RegistrySource::from_option(None)
        .fetch_identities()
        .await
        .unwrap();
    assert_eq!(builtin, sample_identities());
    assert_eq!(builtin.len(), 5);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.json");
    fs::write(&path, r#"[{"id": 7, "name": "x"}, {"id": 8, "name": "y"}]"#).unwrap();
    let loaded = RegistrySource::from_option(Some(path.clone()))
        .fetch_identities()
        .await
        .unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[1].name, "y");

    fs::write(&path, r#"[{"id": 7, "name": "x"}, {"id": 7, "name": "y"}]"#).unwrap();
    let err = RegistrySource::File(path).fetch_identities().await.unwrap_err();
    assert!(matches!(err, RegistryLoadError::Malformed { .. }));

    let err = RegistrySource::File(dir.path().join("missing.json"))
        .fetch_identities()
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryLoadError::Io { .. }));
}

#[tokio::test]
async fn simulated_store_fails_on_schedule() {
    let store = SimulatedRowStore::new().with_fail_every(2);
    store.save(&request(0)).await.unwrap();
    let err = store.save(&request(1)).await.unwrap_err();
    assert_eq!(err.message, SIMULATED_SAVE_FAILURE);
    store.save(&request(1)).await.unwrap();

    assert_eq!(store.attempts(), 3);
    let rows: Vec<usize> = store.accepted().iter().map(|r| r.row_index).collect();
    assert_eq!(rows, vec![0, 1]);
}

#[tokio::test]
async fn simulated_store_ignores_resends() {
    let store = SimulatedRowStore::new();
    store.save(&request(0)).await.unwrap();
    store.save(&request(0)).await.unwrap();
    assert_eq!(store.attempts(), 2);
    assert_eq!(store.accepted().len(), 1);
}

#[tokio::test]
async fn simulated_store_keeps_matching_rows_from_other_tables() {
    let store = SimulatedRowStore::new();
    store.save(&request_from("page one", 0)).await.unwrap();
    store.save(&request_from("page two", 0)).await.unwrap();
    assert_eq!(store.accepted().len(), 2);
}
