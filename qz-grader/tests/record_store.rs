mod common;

use common::{MemoryStore, at, submission};
use qz_core::{
    models::{RubricKey, ScoreRecord, ScoreValue},
    ports::{StoreErrorKind, StoreOp},
};
use qz_grader::{config::GraderConfig, record_store::RecordStore};
use rstest::*;
use serde_json::json;

#[fixture]
fn config() -> GraderConfig {
    GraderConfig {
        fetch_concurrency: 3,
        ..GraderConfig::default()
    }
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(100)]
#[tokio::test]
async fn test_listing_follows_every_page(config: GraderConfig, #[case] page_size: usize) -> anyhow::Result<()> {
    let store = MemoryStore::paged(page_size);
    for i in 0..5 {
        store.submit(&format!("submission-{i}"), "42", "Jane", "Smith", i);
    }
    store.insert("result-42", json!({"submissionIndex": 0}), at(0));

    let records = RecordStore::new(store.clone(), &config);
    let submissions = records.fetch_submissions().await?;

    let keys: Vec<_> = submissions.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(
        keys,
        ["submission-0", "submission-1", "submission-2", "submission-3", "submission-4"]
    );
    assert_eq!(store.list_calls(), 5usize.div_ceil(page_size));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_submission_fields_come_from_payload_and_metadata(config: GraderConfig) -> anyhow::Result<()> {
    let store = MemoryStore::new();
    store.insert("submission-a", submission("42", "Jane", "Smith", "let x = 1;"), at(250));

    let submissions = RecordStore::new(store, &config).fetch_submissions().await?;
    let record = &submissions[0];
    assert_eq!(record.key, "submission-a");
    assert_eq!(record.student_id.as_str(), "42");
    assert_eq!(record.first_name, "Jane");
    assert_eq!(record.last_name, "Smith");
    assert_eq!(record.hashed_id.as_deref(), Some("h42"));
    assert_eq!(record.response, "let x = 1;");
    assert_eq!(record.creation_time, at(250));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_malformed_submissions_are_skipped(config: GraderConfig) -> anyhow::Result<()> {
    let store = MemoryStore::new();
    store.submit("submission-ok", "42", "Jane", "Smith", 0);
    store.insert("submission-bad", json!({"firstName": "No", "lastName": "Id"}), at(1));
    store.insert("submission-text", json!("just a string"), at(2));

    let submissions = RecordStore::new(store, &config).fetch_submissions().await?;
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].key, "submission-ok");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_missing_creation_time_is_skipped(config: GraderConfig) -> anyhow::Result<()> {
    let store = MemoryStore::new();
    store.submit("submission-ok", "42", "Jane", "Smith", 0);
    store.insert_without_metadata("submission-odd", submission("7", "Amy", "Jones", ""));

    let records = RecordStore::new(store, &config).fetch_submissions().await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, "submission-ok");
    assert_eq!(records[0].student_id.as_str(), "42");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_score_records(config: GraderConfig) -> anyhow::Result<()> {
    let store = MemoryStore::new();
    store.insert("result-42", json!({"submissionIndex": 1, "loop": "3", "note": "ignored"}), at(0));
    store.insert("result-7", json!({"overall": "2"}), at(0));
    store.insert("result-9", json!("garbage"), at(0));
    let records = RecordStore::new(store.clone(), &config);

    let mut scores = records.fetch_scores().await?;
    scores.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(scores.len(), 2);

    let (student, record) = &scores[0];
    let record_42 = record.clone();
    assert_eq!(student.as_str(), "42");
    assert_eq!(record.submission_index, 1);
    assert_eq!(record.scores.get(RubricKey::Loop), ScoreValue::Proficient);

    // no index on record reads as the first submission
    let (student, record) = &scores[1];
    assert_eq!(student.as_str(), "7");
    assert_eq!(record.submission_index, 0);
    assert!(record.is_graded());

    assert_eq!(records.load_score("result-100").await?, None);

    let err = records.load_score("result-9").await.unwrap_err();
    assert_eq!(err.op, StoreOp::Get);
    assert!(matches!(err.kind, StoreErrorKind::Decode(_)));

    // the lenient read used while grading treats it as absent
    assert_eq!(records.read_score("result-9").await?, None);
    assert_eq!(records.read_score("result-42").await?, Some(record_42));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_save_writes_only_graded_fields(config: GraderConfig) -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let records = RecordStore::new(store.clone(), &config);

    let mut record = ScoreRecord::new(2);
    record.scores.set(RubricKey::Return, ScoreValue::Emerging);
    record.scores.set(RubricKey::Declaration, ScoreValue::Unprepared);
    records.save_score("result-42", &record).await?;

    assert_eq!(
        store.value("result-42"),
        Some(json!({"submissionIndex": 2, "declaration": "1", "return": "2"}))
    );
    assert_eq!(records.load_score("result-42").await?, Some(record));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_failed_write_names_the_key(config: GraderConfig) {
    let store = MemoryStore::new();
    store.fail_writes(true);

    let err = RecordStore::new(store, &config)
        .save_score("result-42", &ScoreRecord::new(0))
        .await
        .unwrap_err();
    assert_eq!(err.op, StoreOp::Set);
    assert_eq!(err.key, "result-42");
    assert!(matches!(err.kind, StoreErrorKind::Backend(_)));
}

#[rstest]
#[tokio::test]
async fn test_clear_scores_keeps_submissions(config: GraderConfig) -> anyhow::Result<()> {
    let store = MemoryStore::paged(2);
    store.submit("submission-1", "42", "Jane", "Smith", 0);
    for id in ["1", "2", "3"] {
        store.insert(&format!("result-{id}"), json!({"submissionIndex": 0}), at(0));
    }

    let removed = RecordStore::new(store.clone(), &config).clear_scores().await?;
    assert_eq!(removed, 3);
    assert_eq!(store.keys(), ["submission-1"]);
    Ok(())
}
