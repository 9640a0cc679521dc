//! Applying numbered migration files to the hosted Postgres database.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool,
};
use tracing::{error, info};
use url::Url;

use crate::list_migrations;

const DB_USER: &str = "postgres";
const DB_NAME: &str = "postgres";
const DB_PORT: u16 = 5432;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where migration SQL is executed.
#[async_trait]
pub trait MigrationTarget: Send {
    async fn apply(&mut self, name: &str, sql: &str) -> Result<()>;
}

/// Connection details derived from the project URL and database password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseTarget {
    pub host: String,
    pub port: u16,
    pub password: String,
}

impl DatabaseTarget {
    /// Reads `VITE_SUPABASE_URL` (or `SITEHERO_API_URL`) and
    /// `SUPABASE_DB_PASSWORD`; an explicit `password` wins over the latter.
    pub fn from_env(
        lookup: impl Fn(&str) -> Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        let Some(project_url) = lookup("VITE_SUPABASE_URL").or_else(|| lookup("SITEHERO_API_URL"))
        else {
            bail!("VITE_SUPABASE_URL is not set");
        };
        let parsed = Url::parse(&project_url)
            .with_context(|| format!("invalid project url '{project_url}'"))?;
        let Some(host) = parsed.host_str() else {
            bail!("project url '{project_url}' has no host");
        };

        let Some(password) = password.or_else(|| lookup("SUPABASE_DB_PASSWORD")) else {
            bail!("SUPABASE_DB_PASSWORD is not set and no --password was given");
        };

        Ok(Self {
            host: host.to_string(),
            port: DB_PORT,
            password,
        })
    }
}

pub struct PostgresTarget {
    pool: PgPool,
}

impl PostgresTarget {
    pub async fn connect(target: &DatabaseTarget) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&target.host)
            .port(target.port)
            .username(DB_USER)
            .password(&target.password)
            .database(DB_NAME)
            .ssl_mode(PgSslMode::Require);
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to connect to {}:{}", target.host, target.port))?;
        info!(host = %target.host, "connected");
        Ok(Self { pool })
    }
}

#[async_trait]
impl MigrationTarget for PostgresTarget {
    async fn apply(&mut self, _name: &str, sql: &str) -> Result<()> {
        sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(())
    }
}

/// Numbered migration files in `dir`, in apply order.
pub fn pending_migrations(dir: &Path) -> Result<Vec<PathBuf>> {
    let files: Vec<PathBuf> = list_migrations(dir)?
        .into_iter()
        .map(|name| dir.join(name))
        .collect();
    if files.is_empty() {
        bail!("no migration files found in {}", dir.display());
    }
    Ok(files)
}

/// Applies `files` in order and stops at the first failure. Returns how many
/// were applied.
pub async fn apply_files(target: &mut dyn MigrationTarget, files: &[PathBuf]) -> Result<usize> {
    let total = files.len();
    for (index, path) in files.iter().enumerate() {
        if !path.is_file() {
            bail!("migration file not found: {}", path.display());
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let sql = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        info!(step = index + 1, total, migration = %name, "applying");
        if let Err(err) = target.apply(&name, &sql).await {
            error!(migration = %name, error = %err, "migration failed");
            return Err(err.context(format!("migration {name} failed")));
        }
    }
    Ok(total)
}

#[cfg(test)]
#[path = "tests/apply_tests.rs"]
mod tests;
