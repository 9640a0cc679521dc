use std::{fs, path::Path};

use serde::Deserialize;
use tracing::warn;

pub const SETTINGS_FILE: &str = "sitehero.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub api_key: String,
    pub state_database_url: String,
    pub page_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:54321".into(),
            api_key: String::new(),
            state_database_url: "sqlite://./data/sitehero-state.db".into(),
            page_size: 50,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    api_key: Option<String>,
    state_database_url: Option<String>,
    page_size: Option<u32>,
}

impl Settings {
    pub fn apply_file(&mut self, raw: &str) -> Result<(), toml::de::Error> {
        let file_cfg: FileSettings = toml::from_str(raw)?;
        if let Some(v) = file_cfg.api_url {
            self.api_url = v;
        }
        if let Some(v) = file_cfg.api_key {
            self.api_key = v;
        }
        if let Some(v) = file_cfg.state_database_url {
            self.state_database_url = v;
        }
        if let Some(v) = file_cfg.page_size {
            self.page_size = v;
        }
        Ok(())
    }

    /// Environment overrides; later names in each list win.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for name in ["VITE_SUPABASE_URL", "SITEHERO_API_URL", "APP__API_URL"] {
            if let Some(v) = lookup(name) {
                self.api_url = v;
            }
        }
        for name in ["VITE_SUPABASE_ANON_KEY", "SITEHERO_API_KEY", "APP__API_KEY"] {
            if let Some(v) = lookup(name) {
                self.api_key = v;
            }
        }
        if let Some(v) = lookup("APP__STATE_DATABASE_URL") {
            self.state_database_url = v;
        }
        if let Some(v) = lookup("APP__PAGE_SIZE") {
            if let Ok(parsed) = v.parse::<u32>() {
                self.page_size = parsed;
            }
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Err(err) = settings.apply_file(&raw) {
            warn!(path = %path.display(), error = %err, "ignoring malformed settings file");
        }
    }

    settings.apply_env(|name| std::env::var(name).ok());
    settings.page_size = settings.page_size.clamp(1, 1000);
    settings.state_database_url = normalize_database_url(&settings.state_database_url);
    settings
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().state_database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}
