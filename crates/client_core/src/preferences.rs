//! Theme preference and recent searches, persisted in local state.

use std::{fmt, str::FromStr, sync::Arc};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use shared::domain::UnknownValue;
use storage::{KeyValueStore, PersistedState};
use tokio::sync::watch;
use tracing::{info, warn};

pub const THEME_STORAGE_KEY: &str = "sitehero-theme";
pub const RECENT_SEARCHES_KEY: &str = "sitehero-recent-searches";
pub const RECENT_SEARCHES_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
            ThemePreference::System => "system",
        }
    }

    pub fn resolve(&self, system_prefers_dark: bool) -> Theme {
        match self {
            ThemePreference::Light => Theme::Light,
            ThemePreference::Dark => Theme::Dark,
            ThemePreference::System if system_prefers_dark => Theme::Dark,
            ThemePreference::System => Theme::Light,
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemePreference {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(ThemePreference::Light),
            "dark" => Ok(ThemePreference::Dark),
            "system" => Ok(ThemePreference::System),
            other => Err(UnknownValue::new("theme", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

/// Holds the user's theme preference and the theme currently applied.
///
/// Construction reads the stored preference synchronously so the applied
/// theme is correct before the first frame is drawn.
pub struct ThemeController {
    store: Arc<dyn KeyValueStore>,
    preference: ThemePreference,
    system_prefers_dark: bool,
    applied: watch::Sender<Theme>,
}

impl ThemeController {
    pub fn load(store: Arc<dyn KeyValueStore>, system_prefers_dark: bool) -> Self {
        let preference = match store.get(THEME_STORAGE_KEY) {
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                warn!(error = %err, "ignoring stored theme preference");
                ThemePreference::default()
            }),
            None => ThemePreference::default(),
        };
        let (applied, _) = watch::channel(preference.resolve(system_prefers_dark));
        Self {
            store,
            preference,
            system_prefers_dark,
            applied,
        }
    }

    pub fn preference(&self) -> ThemePreference {
        self.preference
    }

    pub fn theme(&self) -> Theme {
        *self.applied.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Theme> {
        self.applied.subscribe()
    }

    pub async fn set_preference(&mut self, preference: ThemePreference) -> Result<Theme> {
        self.store
            .set(THEME_STORAGE_KEY, preference.as_str())
            .await?;
        self.preference = preference;
        info!(theme = %preference, "theme preference saved");
        Ok(self.apply())
    }

    /// Forgets the stored preference and falls back to following the OS.
    pub async fn clear(&mut self) -> Result<Theme> {
        self.store.remove(THEME_STORAGE_KEY).await?;
        self.preference = ThemePreference::default();
        Ok(self.apply())
    }

    /// Reacts to an OS appearance change. Only a `system` preference follows it.
    pub fn on_system_change(&mut self, prefers_dark: bool) -> Theme {
        self.system_prefers_dark = prefers_dark;
        self.apply()
    }

    fn apply(&self) -> Theme {
        let theme = self.preference.resolve(self.system_prefers_dark);
        self.applied.send_if_modified(|current| {
            let changed = *current != theme;
            *current = theme;
            changed
        });
        theme
    }
}

/// Bounded, most-recent-first list of past search queries.
#[derive(Clone)]
pub struct RecentSearches {
    state: PersistedState<Vec<String>>,
    limit: usize,
}

impl RecentSearches {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_limit(store, RECENT_SEARCHES_LIMIT)
    }

    pub fn with_limit(store: Arc<dyn KeyValueStore>, limit: usize) -> Self {
        Self {
            state: PersistedState::new(store, RECENT_SEARCHES_KEY),
            limit: limit.max(1),
        }
    }

    pub fn list(&self) -> Vec<String> {
        let mut entries = self.state.read().unwrap_or_default();
        entries.truncate(self.limit);
        entries
    }

    /// Moves `query` to the front, dropping case-insensitive duplicates.
    pub async fn record(&self, query: &str) -> Result<Vec<String>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(self.list());
        }

        let folded = query.to_lowercase();
        let mut entries = self.list();
        entries.retain(|existing| existing.to_lowercase() != folded);
        entries.insert(0, query.to_string());
        entries.truncate(self.limit);
        self.state.write(&entries).await?;
        Ok(entries)
    }

    pub async fn remove(&self, query: &str) -> Result<Vec<String>> {
        let folded = query.trim().to_lowercase();
        let mut entries = self.list();
        entries.retain(|existing| existing.to_lowercase() != folded);
        self.state.write(&entries).await?;
        Ok(entries)
    }

    pub async fn clear(&self) -> Result<()> {
        self.state.clear().await
    }
}

#[cfg(test)]
#[path = "tests/preferences_tests.rs"]
mod tests;
