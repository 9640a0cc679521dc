use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, load_settings_from},
    CrossFeatureSearch, FilterState, ListView, Page, RecentSearches, RestClient, Theme,
    ThemeController, ThemePreference, ViewTab,
};
use shared::{
    domain::{ContractorId, EntityType, Facet, ItemId, ItemStatus, Priority},
    error::ApiError,
    protocol::ResultItem,
};
use storage::{KeyValueStore, Storage};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sitehero", about = "Browse construction project records")]
struct Cli {
    /// Settings file; defaults to ./sitehero.toml
    #[arg(long)]
    config: Option<PathBuf>,
    /// Whether the OS currently prefers a dark appearance.
    #[arg(long)]
    system_dark: bool,
    /// Print records as JSON instead of a table.
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List records of one kind.
    List {
        entity: EntityType,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "all")]
        status: Facet<ItemStatus>,
        #[arg(long, default_value = "all")]
        priority: Facet<Priority>,
        #[arg(long, default_value = "all")]
        contractor: Facet<ContractorId>,
        #[arg(long, default_value = "all")]
        tab: ViewTab,
    },
    /// Show one record.
    Show { entity: EntityType, id: ItemId },
    /// Search every feature at once.
    Search { query: String },
    /// Show or clear recent searches.
    Recent {
        #[arg(long)]
        clear: bool,
    },
    /// Show or set the theme preference.
    Theme { preference: Option<ThemePreference> },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => load_settings_from(path),
        None => load_settings(),
    };
    let storage = Storage::new(&settings.state_database_url)
        .await
        .with_context(|| format!("failed to open {}", settings.state_database_url))?;
    storage.health_check().await?;
    let store: Arc<dyn KeyValueStore> = Arc::new(storage);
    let mut theme = ThemeController::load(Arc::clone(&store), cli.system_dark);
    let palette = Palette::for_theme(theme.theme());
    info!(theme = ?theme.theme(), api_url = %settings.api_url, "starting");

    match cli.command {
        Command::List {
            entity,
            search,
            status,
            priority,
            contractor,
            tab,
        } => {
            let client = RestClient::from_settings(&settings)?;
            let filters = FilterState {
                search_text: search,
                status,
                priority,
                entity_type: Facet::All,
                contractor,
            };
            let view = ListView::with_filters(
                Arc::new(client),
                vec![entity],
                Page::first(settings.page_size),
                filters,
            );
            view.set_tab(tab);
            match view.load(Utc::now()).await {
                Ok(rows) => print_rows(&palette, &rows, cli.json)?,
                Err(err) => report_failure(&palette, ApiError::from(&err)),
            }
        }
        Command::Show { entity, id } => {
            let client = RestClient::from_settings(&settings)?;
            match client.get_item(entity, id).await {
                Ok(item) => print_rows(&palette, &[item], cli.json)?,
                Err(err) => report_failure(&palette, ApiError::from(&err)),
            }
        }
        Command::Search { query } => {
            let client = RestClient::from_settings(&settings)?;
            let search = CrossFeatureSearch::new(Arc::new(client))
                .with_recent(RecentSearches::new(Arc::clone(&store)));
            let results = search.search(&query).await;
            if results.is_empty() && results.failures.is_empty() {
                println!("no matches for '{}'", results.query);
            }
            for group in &results.groups {
                println!("{}", palette.heading(group.entity_type.label()));
                print_rows(&palette, &group.items, cli.json)?;
            }
            for (entity_type, err) in &results.failures {
                report_failure(
                    &palette,
                    ApiError::new(err.code(), format!("{}: {err}", entity_type.label())),
                );
            }
        }
        Command::Recent { clear } => {
            let recent = RecentSearches::new(Arc::clone(&store));
            if clear {
                recent.clear().await?;
                println!("recent searches cleared");
            } else {
                for query in recent.list() {
                    println!("{query}");
                }
            }
        }
        Command::Theme { preference } => {
            if let Some(preference) = preference {
                theme.set_preference(preference).await?;
            }
            println!(
                "{} (preference: {})",
                palette.heading(match theme.theme() {
                    Theme::Light => "light",
                    Theme::Dark => "dark",
                }),
                theme.preference()
            );
        }
    }

    Ok(())
}

struct Palette {
    accent: &'static str,
    muted: &'static str,
    error: &'static str,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                accent: "\x1b[96m",
                muted: "\x1b[37m",
                error: "\x1b[91m",
            },
            Theme::Light => Self {
                accent: "\x1b[34m",
                muted: "\x1b[90m",
                error: "\x1b[31m",
            },
        }
    }

    fn heading(&self, text: &str) -> String {
        format!("{}{text}\x1b[0m", self.accent)
    }

    fn muted(&self, text: &str) -> String {
        format!("{}{text}\x1b[0m", self.muted)
    }
}

fn print_rows(palette: &Palette, rows: &[ResultItem], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    for item in rows {
        let due = item
            .due_date()
            .map(|due| due.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<14} {:<10} {}  {}",
            item.status().as_str(),
            due,
            item.title(),
            palette.muted(&item.id().to_string())
        );
    }
    Ok(())
}

fn report_failure(palette: &Palette, err: ApiError) {
    eprintln!("{}{:?}: {}\x1b[0m", palette.error, err.code, err.message);
    eprintln!("run the same command again to retry");
}
