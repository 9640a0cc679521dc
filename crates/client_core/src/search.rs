use std::sync::Arc;

use futures::future::join_all;
use shared::{domain::EntityType, error::ClientError, protocol::ResultItem};
use tracing::{info, warn};

use crate::{
    filters::{FilterState, QueryParams},
    preferences::RecentSearches,
    rest::{ItemSource, Page},
};

pub const MIN_QUERY_LEN: usize = 2;
pub const DEFAULT_PER_TYPE_LIMIT: u32 = 5;

#[derive(Debug, Clone)]
pub struct SearchGroup {
    pub entity_type: EntityType,
    pub items: Vec<ResultItem>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub query: String,
    pub groups: Vec<SearchGroup>,
    pub failures: Vec<(EntityType, ClientError)>,
}

impl SearchResults {
    pub fn total(&self) -> usize {
        self.groups.iter().map(|group| group.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Searches several features at once and groups the hits per feature.
pub struct CrossFeatureSearch {
    source: Arc<dyn ItemSource>,
    recent: Option<RecentSearches>,
    entity_types: Vec<EntityType>,
    per_type_limit: u32,
}

impl CrossFeatureSearch {
    pub fn new(source: Arc<dyn ItemSource>) -> Self {
        Self {
            source,
            recent: None,
            entity_types: EntityType::ALL.to_vec(),
            per_type_limit: DEFAULT_PER_TYPE_LIMIT,
        }
    }

    pub fn with_recent(mut self, recent: RecentSearches) -> Self {
        self.recent = Some(recent);
        self
    }

    pub fn with_entity_types(mut self, entity_types: Vec<EntityType>) -> Self {
        self.entity_types = entity_types;
        self
    }

    pub fn with_per_type_limit(mut self, limit: u32) -> Self {
        self.per_type_limit = limit.max(1);
        self
    }

    pub async fn search(&self, query: &str) -> SearchResults {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return SearchResults {
                query: query.to_string(),
                ..SearchResults::default()
            };
        }

        let params: QueryParams = FilterState {
            search_text: query.to_string(),
            ..FilterState::default()
        }
        .to_query_params();
        let page = Page::first(self.per_type_limit);

        let fetches = self.entity_types.iter().map(|entity_type| {
            let params = &params;
            async move {
                let result = self.source.fetch_items(*entity_type, params, page).await;
                (*entity_type, result)
            }
        });

        let mut results = SearchResults {
            query: query.to_string(),
            ..SearchResults::default()
        };
        for (entity_type, result) in join_all(fetches).await {
            match result {
                Ok(items) if items.is_empty() => {}
                Ok(mut items) => {
                    items.truncate(self.per_type_limit as usize);
                    results.groups.push(SearchGroup { entity_type, items });
                }
                Err(err) => {
                    warn!(entity = %entity_type, error = %err, "search failed for entity type");
                    results.failures.push((entity_type, err));
                }
            }
        }

        if let Some(recent) = &self.recent {
            if let Err(err) = recent.record(query).await {
                warn!(error = %err, "failed to record recent search");
            }
        }
        info!(query, hits = results.total(), "cross-feature search finished");
        results
    }
}

#[cfg(test)]
#[path = "tests/search_tests.rs"]
mod tests;
