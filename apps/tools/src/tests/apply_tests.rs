use std::collections::HashMap;

use super::*;

#[derive(Default)]
struct RecordingTarget {
    applied: Vec<String>,
    fail_on: Option<String>,
}

#[async_trait]
impl MigrationTarget for RecordingTarget {
    async fn apply(&mut self, name: &str, sql: &str) -> Result<()> {
        if self.fail_on.as_deref() == Some(name) {
            bail!("syntax error near '{}'", sql.trim());
        }
        self.applied.push(name.to_string());
        Ok(())
    }
}

fn migrations_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (name, sql) in [
        ("010_rls.sql", "alter table projects enable row level security;"),
        ("001_initial_schema.sql", "create table projects (id uuid);"),
        ("002_site_instructions.sql", "create tabel site_instructions;"),
        ("COMBINED_ALL_MIGRATIONS.sql", "-- everything"),
    ] {
        fs::write(dir.path().join(name), sql).expect("write");
    }
    dir
}

fn names(files: &[PathBuf]) -> Vec<String> {
    files
        .iter()
        .map(|path| path.file_name().expect("name").to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn migrations_apply_in_numeric_order_without_the_combined_file() {
    let dir = migrations_dir();
    let files = pending_migrations(dir.path()).expect("pending");
    assert_eq!(
        names(&files),
        vec![
            "001_initial_schema.sql",
            "002_site_instructions.sql",
            "010_rls.sql"
        ]
    );

    let mut target = RecordingTarget::default();
    let applied = apply_files(&mut target, &files).await.expect("apply");
    assert_eq!(applied, 3);
    assert_eq!(target.applied, names(&files));
}

#[tokio::test]
async fn first_failure_stops_the_run() {
    let dir = migrations_dir();
    let files = pending_migrations(dir.path()).expect("pending");
    let mut target = RecordingTarget {
        fail_on: Some("002_site_instructions.sql".into()),
        ..RecordingTarget::default()
    };

    let err = apply_files(&mut target, &files).await.expect_err("bad sql");
    assert_eq!(target.applied, vec!["001_initial_schema.sql"]);
    assert!(err.to_string().contains("002_site_instructions.sql"));
    assert!(format!("{err:#}").contains("create tabel"));
}

#[tokio::test]
async fn missing_single_file_is_reported_before_anything_runs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut target = RecordingTarget::default();
    let err = apply_files(&mut target, &[dir.path().join("042_absent.sql")])
        .await
        .expect_err("missing");
    assert!(err.to_string().contains("042_absent.sql"));
    assert!(target.applied.is_empty());
}

#[test]
fn empty_directory_has_nothing_to_apply() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(pending_migrations(dir.path()).is_err());
}

#[test]
fn database_target_comes_from_project_url_and_password() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("VITE_SUPABASE_URL", "https://abcd1234.supabase.co"),
        ("SUPABASE_DB_PASSWORD", "from-env"),
    ]);
    let lookup = |name: &str| env.get(name).map(|v| v.to_string());

    let target = DatabaseTarget::from_env(lookup, None).expect("target");
    assert_eq!(target.host, "abcd1234.supabase.co");
    assert_eq!(target.port, 5432);
    assert_eq!(target.password, "from-env");

    let target = DatabaseTarget::from_env(lookup, Some("explicit".into())).expect("target");
    assert_eq!(target.password, "explicit");
}

#[test]
fn database_target_requires_url_and_password() {
    assert!(DatabaseTarget::from_env(|_| None, Some("pw".into())).is_err());

    let only_url = |name: &str| {
        (name == "VITE_SUPABASE_URL").then(|| "https://abcd1234.supabase.co".to_string())
    };
    let err = DatabaseTarget::from_env(only_url, None).expect_err("no password");
    assert!(err.to_string().contains("SUPABASE_DB_PASSWORD"));
}
