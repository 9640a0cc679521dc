mod apply;

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::apply::{apply_files, pending_migrations, DatabaseTarget, PostgresTarget};

const MARKER_PREFIX: &str = "-- Migration: ";
const COMBINED_FILE: &str = "COMBINED_ALL_MIGRATIONS.sql";

#[derive(Parser, Debug)]
#[command(name = "sitehero-tools", about = "Maintenance helpers for the backend schema")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split a combined migration file into numbered files.
    SplitMigrations { combined: PathBuf, out_dir: PathBuf },
    /// List numbered migration files in apply order.
    ListMigrations { dir: PathBuf },
    /// Apply every numbered migration in a directory, stopping at the first failure.
    RunMigrations {
        dir: PathBuf,
        /// Database password; defaults to SUPABASE_DB_PASSWORD.
        #[arg(long)]
        password: Option<String>,
    },
    /// Apply one migration file.
    RunMigration {
        file: PathBuf,
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Migration {
    number: u32,
    name: String,
    content: String,
}

impl Migration {
    fn file_name(&self) -> String {
        format!("{:03}_{}.sql", self.number, self.name)
    }
}

/// Parses `-- Migration: 012_add_rls.sql` into `(12, "add_rls")`.
fn parse_marker(line: &str) -> Option<(u32, &str)> {
    let rest = line.strip_prefix(MARKER_PREFIX)?;
    let (digits, tail) = rest.split_once('_')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let end = tail.find(".sql")?;
    let name = &tail[..end];
    if name.is_empty() {
        return None;
    }
    Some((digits.parse().ok()?, name))
}

/// Lines before the first marker are dropped. A repeated number keeps the
/// later section.
fn split_combined(content: &str) -> Vec<Migration> {
    let mut sections: BTreeMap<u32, Migration> = BTreeMap::new();
    let mut current: Option<(u32, String)> = None;
    let mut buffer: Vec<&str> = Vec::new();

    for line in content.split('\n') {
        if let Some((number, name)) = parse_marker(line) {
            if let Some((number, name)) = current.take() {
                sections.insert(
                    number,
                    Migration {
                        number,
                        name,
                        content: buffer.join("\n"),
                    },
                );
            }
            current = Some((number, name.to_string()));
            buffer = vec![line];
        } else {
            buffer.push(line);
        }
    }
    if let Some((number, name)) = current {
        sections.insert(
            number,
            Migration {
                number,
                name,
                content: buffer.join("\n"),
            },
        );
    }

    sections.into_values().collect()
}

fn write_migrations(migrations: &[Migration], out_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let mut written = Vec::with_capacity(migrations.len());
    for migration in migrations {
        let path = out_dir.join(migration.file_name());
        fs::write(&path, &migration.content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(file = %path.display(), bytes = migration.content.len(), "wrote migration");
        written.push(path);
    }
    Ok(written)
}

fn is_numbered_migration(name: &str) -> bool {
    let bytes = name.as_bytes();
    name != COMBINED_FILE
        && name.ends_with(".sql")
        && bytes.len() > 4
        && bytes[..3].iter().all(u8::is_ascii_digit)
        && bytes[3] == b'_'
}

fn list_migrations(dir: &Path) -> Result<Vec<String>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) if is_numbered_migration(&name) => names.push(name),
            Ok(_) => {}
            Err(raw) => warn!(name = ?raw, "skipping non utf-8 file name"),
        }
    }
    names.sort();
    Ok(names)
}

async fn connect(password: Option<String>) -> Result<PostgresTarget> {
    let target = DatabaseTarget::from_env(|name| std::env::var(name).ok(), password)?;
    PostgresTarget::connect(&target).await
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    match cli.command {
        Command::SplitMigrations { combined, out_dir } => {
            let content = fs::read_to_string(&combined)
                .with_context(|| format!("failed to read {}", combined.display()))?;
            let migrations = split_combined(&content);
            if migrations.is_empty() {
                bail!("no '{MARKER_PREFIX}' markers found in {}", combined.display());
            }
            for path in write_migrations(&migrations, &out_dir)? {
                println!("{}", path.display());
            }
            println!("{} migration files written", migrations.len());
        }
        Command::ListMigrations { dir } => {
            for name in list_migrations(&dir)? {
                println!("{name}");
            }
        }
        Command::RunMigrations { dir, password } => {
            let files = pending_migrations(&dir)?;
            println!("found {} migration files", files.len());
            let mut target = connect(password).await?;
            let applied = apply_files(&mut target, &files).await?;
            println!("{applied} migrations applied");
        }
        Command::RunMigration { file, password } => {
            if !file.is_file() {
                bail!("migration file not found: {}", file.display());
            }
            let mut target = connect(password).await?;
            apply_files(&mut target, std::slice::from_ref(&file)).await?;
            println!("{} applied", file.display());
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
