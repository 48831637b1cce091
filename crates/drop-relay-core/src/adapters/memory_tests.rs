//! Tests for the in-memory storage adapters

use super::*;
use crate::actor::{RelayState, TokenMeta, TokenStatus};

fn sample_meta() -> BlobMeta {
    BlobMeta::new("hello.txt", 1_700_000_000)
}

// ============================================================================
// Blob Store
// ============================================================================

#[tokio::test]
async fn test_put_get_round_trip() {
    let store = MemoryBlobStore::new();
    store
        .put("obj/abc.txt", Bytes::from("hi"), sample_meta())
        .await
        .unwrap();

    let blob = store.get("obj/abc.txt").await.unwrap().unwrap();
    assert_eq!(blob.data, Bytes::from("hi"));
    assert_eq!(blob.meta.filename, "hello.txt");
    assert_eq!(blob.meta.uploaded_at, "1700000000");
}

#[tokio::test]
async fn test_get_unknown_key_is_none() {
    let store = MemoryBlobStore::new();
    assert!(store.get("obj/missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let store = MemoryBlobStore::new();
    store
        .put("obj/abc", Bytes::from("x"), sample_meta())
        .await
        .unwrap();

    store.delete("obj/abc").await.unwrap();
    assert!(store.get("obj/abc").await.unwrap().is_none());

    // Deleting again is not an error.
    store.delete("obj/abc").await.unwrap();
}

#[tokio::test]
async fn test_list_filters_by_prefix_and_sums_sizes() {
    let store = MemoryBlobStore::new();
    store
        .put("obj/a", Bytes::from("aaa"), sample_meta())
        .await
        .unwrap();
    store
        .put("obj/b", Bytes::from("bbbbb"), sample_meta())
        .await
        .unwrap();
    store
        .put("other/c", Bytes::from("c"), sample_meta())
        .await
        .unwrap();

    let entries = store.list("obj/").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].key, "obj/a");
    assert_eq!(entries[0].size, 3);
    assert_eq!(entries[1].key, "obj/b");
    assert_eq!(entries[1].size, 5);
}

// ============================================================================
// State Store
// ============================================================================

fn sample_state() -> RelayState {
    let mut state = RelayState::default();
    let meta = TokenMeta {
        token: "t1".to_string(),
        object_key: "obj/t1.txt".to_string(),
        filename: "a.txt".to_string(),
        content_type: "text/plain".to_string(),
        size: 3,
        created_at: 100,
        expires_at: 0,
        status: TokenStatus::Ready,
        uploader_ip: "1.2.3.4".to_string(),
    };
    state.tokens.insert("t1".to_string(), meta);
    state.by_name.insert("a.txt".to_string(), "t1".to_string());
    state.queue.push("t1".to_string());
    state.metrics.hc_count = 7;
    state
}

#[tokio::test]
async fn test_state_load_empty() {
    let store = MemoryStateStore::new();
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_state_save_load_round_trip() {
    let store = MemoryStateStore::new();
    let state = sample_state();
    store.save(&state).await.unwrap();

    let loaded = store.load().await.unwrap().unwrap();
    assert_eq!(loaded, state);
}

#[tokio::test]
async fn test_save_failure_injection() {
    let store = MemoryStateStore::new();
    store.save(&sample_state()).await.unwrap();

    store.set_fail_saves(true);
    let mut changed = sample_state();
    changed.metrics.hc_count = 99;
    assert!(store.save(&changed).await.is_err());

    // The previously persisted state is still what loads.
    let loaded = store.load().await.unwrap().unwrap();
    assert_eq!(loaded.metrics.hc_count, 7);

    store.set_fail_saves(false);
    store.save(&changed).await.unwrap();
    assert_eq!(store.load().await.unwrap().unwrap().metrics.hc_count, 99);
}
