use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{domain::EntityType, error::ClientError, protocol::ResultItem};
use tokio::{sync::watch, task::JoinHandle};
use tracing::debug;

use crate::{
    filters::{FilterState, FilterStore},
    query::{QueryState, RemoteQuery},
    rest::{ItemSource, Page},
    view::{apply_tab, tab_counts, ViewTab},
};

/// One list page: filters drive the remote query, the active tab narrows
/// what it returned.
pub struct ListView {
    filters: FilterStore,
    query: Arc<RemoteQuery>,
    tab: watch::Sender<ViewTab>,
    sync_task: JoinHandle<()>,
}

impl ListView {
    pub fn new(source: Arc<dyn ItemSource>, scope: Vec<EntityType>, page: Page) -> Self {
        Self::with_filters(source, scope, page, FilterState::default())
    }

    pub fn with_filters(
        source: Arc<dyn ItemSource>,
        scope: Vec<EntityType>,
        page: Page,
        initial: FilterState,
    ) -> Self {
        let filters = FilterStore::new(initial);
        let query = Arc::new(RemoteQuery::new(source, scope, page));
        query.set_params(filters.query_params());

        let mut changes = filters.subscribe();
        let sync_query = Arc::clone(&query);
        let sync_task = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let params = changes.borrow_and_update().to_query_params();
                if !sync_query.set_params(params) {
                    debug!("filter change left query params unchanged");
                }
            }
        });

        let (tab, _) = watch::channel(ViewTab::All);
        Self {
            filters,
            query,
            tab,
            sync_task,
        }
    }

    pub fn filters(&self) -> &FilterStore {
        &self.filters
    }

    pub fn query(&self) -> &RemoteQuery {
        &self.query
    }

    pub fn tab(&self) -> ViewTab {
        *self.tab.borrow()
    }

    pub fn set_tab(&self, tab: ViewTab) -> bool {
        self.tab.send_if_modified(|current| {
            let changed = *current != tab;
            *current = tab;
            changed
        })
    }

    pub fn retry(&self) -> bool {
        self.query.retry()
    }

    /// Pushes the current filters to the query without waiting for the
    /// background subscription to observe them.
    pub fn sync(&self) -> bool {
        self.query.set_params(self.filters.query_params())
    }

    /// Rows the current tab shows from the last successful fetch.
    pub fn visible_items(&self, now: DateTime<Utc>) -> Vec<ResultItem> {
        let state = self.query.snapshot();
        apply_tab(state.items(), self.tab(), now)
    }

    pub fn tab_counts(&self, now: DateTime<Utc>) -> std::collections::BTreeMap<ViewTab, usize> {
        let state = self.query.snapshot();
        tab_counts(state.items(), now)
    }

    /// Waits for the fetch matching the current filters and returns the
    /// rows under the current tab.
    pub async fn load(&self, now: DateTime<Utc>) -> Result<Vec<ResultItem>, ClientError> {
        self.sync();
        match self.query.settled().await {
            QueryState::Success(items) => Ok(apply_tab(&items, self.tab(), now)),
            QueryState::Error(err) => Err(err),
            QueryState::Idle | QueryState::Loading => Ok(Vec::new()),
        }
    }
}

impl Drop for ListView {
    fn drop(&mut self) {
        self.sync_task.abort();
    }
}

#[cfg(test)]
#[path = "tests/list_view_tests.rs"]
mod tests;
