use std::{
    collections::HashMap,
    fs,
    marker::PhantomData,
    path::{Path, PathBuf},
    str::FromStr,
    sync::{Arc, RwLock},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use tracing::warn;

/// String key-value persistence with synchronous reads.
///
/// Reads never wait on I/O so that start-up state (theme, recent searches)
/// can be applied before anything is rendered. Writes go through to the
/// backing store before returning.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

type Snapshot = Arc<RwLock<HashMap<String, String>>>;

fn read_snapshot(snapshot: &Snapshot, key: &str) -> Option<String> {
    let guard = snapshot.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.get(key).cloned()
}

fn write_snapshot(snapshot: &Snapshot, key: &str, value: Option<&str>) {
    let mut guard = snapshot
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    match value {
        Some(value) => {
            guard.insert(key.to_string(), value.to_string());
        }
        None => {
            guard.remove(key);
        }
    }
}

/// SQLite-backed local state.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
    snapshot: Snapshot,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every in-memory connection is its own database.
        let max_connections = if is_memory_url(database_url) { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        let storage = Self {
            pool,
            snapshot: Arc::new(RwLock::new(HashMap::new())),
        };
        storage.reload().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Re-reads every key from disk into the in-memory snapshot.
    pub async fn reload(&self) -> Result<()> {
        let rows = sqlx::query("SELECT key, value FROM kv_store")
            .fetch_all(&self.pool)
            .await
            .context("failed to load kv_store snapshot")?;

        let mut loaded = HashMap::with_capacity(rows.len());
        for row in rows {
            let key: String = row.try_get("key")?;
            let value: String = row.try_get("value")?;
            loaded.insert(key, value);
        }

        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = loaded;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for Storage {
    fn get(&self, key: &str) -> Option<String> {
        read_snapshot(&self.snapshot, key)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to persist key '{key}'"))?;

        write_snapshot(&self.snapshot, key, Some(value));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete key '{key}'"))?;

        write_snapshot(&self.snapshot, key, None);
        Ok(())
    }
}

/// Process-local store, used where nothing should outlive the session.
#[derive(Clone, Default)]
pub struct MemoryStore {
    snapshot: Snapshot,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        read_snapshot(&self.snapshot, key)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        write_snapshot(&self.snapshot, key, Some(value));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        write_snapshot(&self.snapshot, key, None);
        Ok(())
    }
}

/// A typed value stored as JSON under one fixed key.
pub struct PersistedState<T> {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for PersistedState<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key,
            _value: PhantomData,
        }
    }
}

impl<T> PersistedState<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            store,
            key,
            _value: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Returns `None` when the key is absent or holds something undecodable.
    pub fn read(&self) -> Option<T> {
        let raw = self.store.get(self.key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key = self.key, error = %err, "ignoring unreadable persisted value");
                None
            }
        }
    }

    pub async fn write(&self, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("failed to encode value for '{}'", self.key))?;
        self.store.set(self.key, &raw).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.remove(self.key).await
    }
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
