//! Persistence tests for the file-backed vector index.

use std::io::Write;

use replykit_rag::{Document, FileVectorIndex, RagError, VectorIndex};
use tempfile::tempdir;

const COLLECTION: &str = "tweet_amazon_collection";

fn exchange(id: &str, embedding: Vec<f32>, reply: &str) -> Document {
    Document::exchange(id, format!("customer {id}"), embedding, reply)
}

#[tokio::test]
async fn documents_survive_a_reopen() {
    let root = tempdir().unwrap();
    {
        let index = FileVectorIndex::open(root.path(), COLLECTION, 3).await.unwrap();
        index.upsert(&exchange("a", vec![1.0, 0.0, 0.0], "reply a")).await.unwrap();
        index.upsert(&exchange("b", vec![0.0, 1.0, 0.0], "reply b")).await.unwrap();
    }

    let index = FileVectorIndex::open(root.path(), COLLECTION, 3).await.unwrap();
    assert_eq!(index.len().await, 2);

    let results = index.query(&[0.0, 1.0, 0.0], 1).await.unwrap();
    assert_eq!(results[0].document.id, "b");
    assert_eq!(results[0].document.paired_response(), Some("reply b"));
}

#[tokio::test]
async fn replacements_survive_a_reopen_and_keep_their_rank() {
    let root = tempdir().unwrap();
    {
        let index = FileVectorIndex::open(root.path(), COLLECTION, 2).await.unwrap();
        index.upsert(&exchange("a", vec![1.0, 0.0], "old")).await.unwrap();
        index.upsert(&exchange("b", vec![1.0, 0.0], "b")).await.unwrap();
        index.upsert(&exchange("a", vec![1.0, 0.0], "new")).await.unwrap();
    }

    let index = FileVectorIndex::open(root.path(), COLLECTION, 2).await.unwrap();
    assert_eq!(index.len().await, 2);
    let results = index.query(&[1.0, 0.0], 2).await.unwrap();
    assert_eq!(results[0].document.id, "a");
    assert_eq!(results[0].document.paired_response(), Some("new"));
    assert_eq!(results[1].document.id, "b");
}

#[tokio::test]
async fn reopening_with_other_dimensions_fails() {
    let root = tempdir().unwrap();
    FileVectorIndex::open(root.path(), COLLECTION, 3).await.unwrap();

    let err = FileVectorIndex::open(root.path(), COLLECTION, 4).await.err().unwrap();
    assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 4 }));
}

#[tokio::test]
async fn rejected_upsert_is_not_persisted() {
    let root = tempdir().unwrap();
    {
        let index = FileVectorIndex::open(root.path(), COLLECTION, 3).await.unwrap();
        index.upsert(&exchange("a", vec![1.0, 0.0, 0.0], "reply")).await.unwrap();

        let err = index.upsert(&exchange("b", vec![1.0, 0.0], "reply")).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 2 }));
        let err = index.upsert(&exchange("c", vec![0.0, 1.0, 0.0], "")).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidDocument { .. }));
        assert_eq!(index.len().await, 1);
    }

    let index = FileVectorIndex::open(root.path(), COLLECTION, 3).await.unwrap();
    assert_eq!(index.len().await, 1);
    assert!(index.get("b").await.is_none());
}

#[tokio::test]
async fn torn_final_line_is_discarded_and_the_log_stays_usable() {
    let root = tempdir().unwrap();
    let log_path = {
        let index = FileVectorIndex::open(root.path(), COLLECTION, 2).await.unwrap();
        index.upsert(&exchange("a", vec![1.0, 0.0], "reply a")).await.unwrap();
        index.path().join("documents.jsonl")
    };

    // Simulate a crash halfway through an append.
    let mut file = std::fs::OpenOptions::new().append(true).open(&log_path).unwrap();
    file.write_all(br#"{"id":"b","text":"cust"#).unwrap();
    drop(file);

    let index = FileVectorIndex::open(root.path(), COLLECTION, 2).await.unwrap();
    assert_eq!(index.len().await, 1);
    index.upsert(&exchange("c", vec![0.0, 1.0], "reply c")).await.unwrap();
    drop(index);

    let index = FileVectorIndex::open(root.path(), COLLECTION, 2).await.unwrap();
    assert_eq!(index.len().await, 2);
    assert!(index.get("c").await.is_some());
}

#[tokio::test]
async fn corrupt_line_in_the_middle_is_an_error() {
    let root = tempdir().unwrap();
    let log_path = {
        let index = FileVectorIndex::open(root.path(), COLLECTION, 2).await.unwrap();
        index.path().join("documents.jsonl")
    };
    std::fs::write(&log_path, "not json\n").unwrap();

    let err = FileVectorIndex::open(root.path(), COLLECTION, 2).await.err().unwrap();
    assert!(matches!(err, RagError::StorageError { .. }));
}

#[tokio::test]
async fn compaction_keeps_only_live_documents() {
    let root = tempdir().unwrap();
    let index = FileVectorIndex::open(root.path(), COLLECTION, 2).await.unwrap();
    for reply in ["one", "two", "three"] {
        index.upsert(&exchange("a", vec![1.0, 0.0], reply)).await.unwrap();
    }
    index.upsert(&exchange("b", vec![0.0, 1.0], "b")).await.unwrap();

    assert_eq!(index.compact().await.unwrap(), 2);
    let log = std::fs::read_to_string(index.path().join("documents.jsonl")).unwrap();
    assert_eq!(log.lines().count(), 2);

    // The log is still appendable after compaction.
    index.upsert(&exchange("c", vec![1.0, 1.0], "c")).await.unwrap();
    drop(index);

    let index = FileVectorIndex::open(root.path(), COLLECTION, 2).await.unwrap();
    assert_eq!(index.len().await, 3);
    assert_eq!(index.get("a").await.unwrap().paired_response(), Some("three"));
}

#[tokio::test]
async fn invalid_collection_names_are_rejected() {
    let root = tempdir().unwrap();
    for name in ["", "../escape", "..", "."] {
        let err = FileVectorIndex::open(root.path(), name, 2).await.err().unwrap();
        assert!(matches!(err, RagError::ConfigError(_)), "accepted {name:?}");
    }
}

#[tokio::test]
async fn failed_compaction_leaves_the_log_writable() {
    let root = tempdir().unwrap();
    let index = FileVectorIndex::open(root.path(), COLLECTION, 2).await.unwrap();
    index.upsert(&exchange("a", vec![1.0, 0.0], "one")).await.unwrap();
    index.upsert(&exchange("a", vec![1.0, 0.0], "two")).await.unwrap();

    // A directory in the way of the snapshot file makes compaction fail.
    let blocker = index.path().join("documents.jsonl.tmp");
    std::fs::create_dir(&blocker).unwrap();
    let err = index.compact().await.unwrap_err();
    assert!(matches!(err, RagError::StorageError { .. }));

    index.upsert(&exchange("b", vec![0.0, 1.0], "b")).await.unwrap();
    drop(index);
    std::fs::remove_dir(&blocker).unwrap();

    let index = FileVectorIndex::open(root.path(), COLLECTION, 2).await.unwrap();
    assert_eq!(index.len().await, 2);
    assert_eq!(index.get("a").await.unwrap().paired_response(), Some("two"));
    assert!(index.get("b").await.is_some());
}

#[tokio::test]
async fn upserts_after_compaction_land_in_the_live_log() {
    let root = tempdir().unwrap();
    let index = FileVectorIndex::open(root.path(), COLLECTION, 2).await.unwrap();
    index.upsert(&exchange("a", vec![1.0, 0.0], "one")).await.unwrap();
    index.compact().await.unwrap();
    index.upsert(&exchange("b", vec![0.0, 1.0], "b")).await.unwrap();

    let log = std::fs::read_to_string(index.path().join("documents.jsonl")).unwrap();
    assert_eq!(log.lines().count(), 2);
    assert!(!index.path().join("documents.jsonl.tmp").exists());
}
