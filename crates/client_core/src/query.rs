//! Parameterized remote fetch with observable loading/error state.
//!
//! A [`RemoteQuery`] only fetches when its parameters change by value, and
//! only the response to the most recent request is ever applied: older
//! in-flight requests are aborted, and any response that still arrives for a
//! superseded generation is dropped.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use shared::{domain::EntityType, error::ClientError, protocol::ResultItem};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    filters::QueryParams,
    rest::{ItemSource, Page},
};

#[derive(Debug, Clone, Default)]
pub enum QueryState {
    #[default]
    Idle,
    Loading,
    Success(Vec<ResultItem>),
    Error(ClientError),
}

impl QueryState {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn items(&self) -> &[ResultItem] {
        match self {
            QueryState::Success(items) => items,
            _ => &[],
        }
    }

    pub fn error(&self) -> Option<&ClientError> {
        match self {
            QueryState::Error(err) => Some(err),
            _ => None,
        }
    }
}

/// Fetches every admitted entity kind in `scope` concurrently and merges the
/// rows newest first, keeping at most `page.limit` of them. The first failure
/// fails the whole fetch.
pub async fn fetch_scoped(
    source: &dyn ItemSource,
    scope: &[EntityType],
    params: &QueryParams,
    page: Page,
) -> Result<Vec<ResultItem>, ClientError> {
    let fetches = scope
        .iter()
        .copied()
        .filter(|entity_type| params.admits(*entity_type))
        .map(|entity_type| source.fetch_items(entity_type, params, page));

    let mut merged = Vec::new();
    for result in join_all(fetches).await {
        merged.extend(result?);
    }
    merged.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    merged.truncate(page.limit as usize);
    Ok(merged)
}

struct Inflight {
    params: Option<QueryParams>,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    inflight: Mutex<Inflight>,
    state: watch::Sender<QueryState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inflight> {
        self.inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct RemoteQuery {
    source: Arc<dyn ItemSource>,
    scope: Vec<EntityType>,
    page: Page,
    shared: Arc<Shared>,
}

impl RemoteQuery {
    pub fn new(source: Arc<dyn ItemSource>, scope: Vec<EntityType>, page: Page) -> Self {
        let (state, _) = watch::channel(QueryState::Idle);
        Self {
            source,
            scope,
            page,
            shared: Arc::new(Shared {
                inflight: Mutex::new(Inflight {
                    params: None,
                    generation: 0,
                    task: None,
                }),
                state,
            }),
        }
    }

    pub fn scope(&self) -> &[EntityType] {
        &self.scope
    }

    pub fn params(&self) -> Option<QueryParams> {
        self.shared.lock().params.clone()
    }

    pub fn snapshot(&self) -> QueryState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.shared.state.subscribe()
    }

    /// Starts a fetch unless `params` equals the current parameters.
    /// Returns whether a request was issued.
    pub fn set_params(&self, params: QueryParams) -> bool {
        let mut inflight = self.shared.lock();
        if inflight.params.as_ref() == Some(&params) {
            return false;
        }
        self.start(&mut inflight, params);
        true
    }

    /// Re-issues the last request. Returns `false` if nothing was ever requested.
    pub fn retry(&self) -> bool {
        let mut inflight = self.shared.lock();
        let Some(params) = inflight.params.clone() else {
            return false;
        };
        info!(generation = inflight.generation + 1, "retrying query");
        self.start(&mut inflight, params);
        true
    }

    /// Waits until no request is outstanding and returns the resulting state.
    pub async fn settled(&self) -> QueryState {
        let mut rx = self.shared.state.subscribe();
        let settled = rx
            .wait_for(|state| !state.is_loading())
            .await
            .map(|state| state.clone());
        settled.unwrap_or_else(|_| self.snapshot())
    }

    fn start(&self, inflight: &mut Inflight, params: QueryParams) {
        if let Some(previous) = inflight.task.take() {
            previous.abort();
        }
        inflight.generation += 1;
        inflight.params = Some(params.clone());
        self.shared.state.send_replace(QueryState::Loading);

        let generation = inflight.generation;
        let shared = Arc::clone(&self.shared);
        let source = Arc::clone(&self.source);
        let scope = self.scope.clone();
        let page = self.page;

        inflight.task = Some(tokio::spawn(async move {
            debug!(generation, ?params, "fetching");
            let result = fetch_scoped(source.as_ref(), &scope, &params, page).await;

            let mut inflight = shared.lock();
            if inflight.generation != generation {
                debug!(
                    generation,
                    current = inflight.generation,
                    "discarding stale response"
                );
                return;
            }
            inflight.task = None;
            let next = match result {
                Ok(items) => {
                    info!(generation, count = items.len(), "query succeeded");
                    QueryState::Success(items)
                }
                Err(err) => {
                    warn!(generation, error = %err, "query failed");
                    QueryState::Error(err)
                }
            };
            shared.state.send_replace(next);
        }));
    }
}

impl Drop for RemoteQuery {
    fn drop(&mut self) {
        if let Some(task) = self.shared.lock().task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/query_tests.rs"]
mod tests;
