use super::*;

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn set_get_and_remove_round_trip_through_snapshot() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert_eq!(storage.get("sitehero-theme"), None);

    storage.set("sitehero-theme", "\"dark\"").await.expect("set");
    assert_eq!(storage.get("sitehero-theme").as_deref(), Some("\"dark\""));

    storage.set("sitehero-theme", "\"light\"").await.expect("overwrite");
    assert_eq!(storage.get("sitehero-theme").as_deref(), Some("\"light\""));

    storage.remove("sitehero-theme").await.expect("remove");
    assert_eq!(storage.get("sitehero-theme"), None);
}

#[tokio::test]
async fn values_survive_reopening_the_database_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("nested").join("state.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    {
        let storage = Storage::new(&database_url).await.expect("db");
        storage.set("recent", "[\"steel\"]").await.expect("set");
        storage.pool().close().await;
    }

    assert!(db_path.exists(), "database file should exist");

    let reopened = Storage::new(&database_url).await.expect("reopen");
    assert_eq!(reopened.get("recent").as_deref(), Some("[\"steel\"]"));
}

#[tokio::test]
async fn persisted_state_reads_writes_and_clears() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let state: PersistedState<Vec<String>> = PersistedState::new(Arc::clone(&store), "recent");

    assert_eq!(state.read(), None);
    state
        .write(&vec!["rebar".to_string(), "steel".to_string()])
        .await
        .expect("write");
    assert_eq!(
        state.read(),
        Some(vec!["rebar".to_string(), "steel".to_string()])
    );
    assert_eq!(store.get("recent").as_deref(), Some("[\"rebar\",\"steel\"]"));

    state.clear().await.expect("clear");
    assert_eq!(state.read(), None);
}

#[tokio::test]
async fn persisted_state_ignores_corrupt_json() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    store.set("recent", "not json").await.expect("set");

    let state: PersistedState<Vec<String>> = PersistedState::new(store, "recent");
    assert_eq!(state.read(), None);
}

#[test]
fn memory_urls_have_no_backing_path() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(sqlite_path("sqlite://file:state?mode=memory"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/state.db"),
        Some(PathBuf::from("./data/state.db"))
    );
}
