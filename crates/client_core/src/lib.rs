pub mod config;
pub mod filters;
pub mod forms;
pub mod list_view;
pub mod preferences;
pub mod query;
pub mod rest;
pub mod search;
pub mod view;

pub use filters::{FilterState, FilterStore, QueryParams};
pub use list_view::ListView;
pub use preferences::{RecentSearches, Theme, ThemeController, ThemePreference};
pub use query::{QueryState, RemoteQuery};
pub use rest::{ItemSource, Page, RestClient};
pub use search::{CrossFeatureSearch, SearchResults};
pub use view::{apply_tab, ViewTab};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
