//! Persistence and edge case tests.
//!
//! Tests document I/O, configuration files, and ledger snapshots on disk.

use std::path::PathBuf;
use tempfile::TempDir;

use crate::config::GatewayConfig;
use crate::error::StoreError;
use crate::persistence::{load_document, save_document};
use crate::usage::UsageLedger;
use modelgate_core::{RecordScope, RecordType, UsageRecordRepository, UsageStatus, UsageRecord};

// ============================================================================
// Document Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let nested = temp_dir.path().join("deeply").join("nested").join("doc.json");

    save_document(&nested, &serde_json::json!({"key": "value"}))
        .await
        .unwrap();

    assert!(nested.exists());
}

#[tokio::test]
async fn test_yaml_document_is_written_as_yaml() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("gateway.yaml");

    save_document(&path, &GatewayConfig::template()).await.unwrap();

    let raw = tokio::fs::read_to_string(&path).await.unwrap();
    assert!(raw.contains("providers:"));
    assert!(!raw.trim_start().starts_with('{'));

    let loaded: GatewayConfig = load_document(&path).await.unwrap();
    assert_eq!(loaded.providers.len(), 1);
}

#[tokio::test]
async fn test_load_nonexistent_file() {
    let path = PathBuf::from("/nonexistent/path/gateway.json");
    let result: Result<GatewayConfig, _> = load_document(&path).await;
    assert!(matches!(result, Err(StoreError::Io(_))));
}

#[tokio::test]
async fn test_no_temp_file_left_behind() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("doc.json");
    save_document(&path, &1u32).await.unwrap();

    let mut entries = tokio::fs::read_dir(temp_dir.path()).await.unwrap();
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    assert_eq!(names, vec!["doc.json".to_string()]);
}

// ============================================================================
// Ledger Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_ledger_save_and_load_keeps_ids() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ledger.json");

    let ledger = UsageLedger::new();
    let mut record = UsageRecord::pending(RecordScope::new(RecordType::Api), "m", "p");
    record.status = Some(UsageStatus::Success);
    ledger.create(record.clone()).await.unwrap();
    ledger.create(record).await.unwrap();
    ledger.save(&path).await.unwrap();

    let loaded = UsageLedger::load(&path).await.unwrap();
    assert_eq!(loaded.len().await, 2);
    assert!(loaded.find(2).await.unwrap().is_some());

    let next = loaded
        .create(UsageRecord::pending(RecordScope::new(RecordType::Api), "m", "p"))
        .await
        .unwrap();
    assert_eq!(next.id, Some(3));
}

#[tokio::test]
async fn test_ledger_load_missing_file_is_empty() {
    let ledger = UsageLedger::load(&PathBuf::from("/nonexistent/ledger.json"))
        .await
        .unwrap();
    assert!(ledger.is_empty().await);
}

#[tokio::test]
async fn test_ledger_rejects_records_without_id() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ledger.json");

    let record = UsageRecord::pending(RecordScope::new(RecordType::Api), "m", "p");
    let snapshot = serde_json::json!({"next_id": 1, "records": [record]});
    save_document(&path, &snapshot).await.unwrap();

    let result = UsageLedger::load(&path).await;
    assert!(matches!(result, Err(StoreError::MissingRecordId)));
}
