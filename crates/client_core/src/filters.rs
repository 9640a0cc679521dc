//! Per-view filter state and the backend parameters derived from it.

use std::collections::BTreeMap;

use serde::Serialize;
use shared::domain::{ContractorId, EntityType, Facet, ItemStatus, Priority, ALL_SENTINEL};
use tokio::sync::watch;

pub const SEARCH_KEY: &str = "search";
pub const STATUS_KEY: &str = "status";
pub const PRIORITY_KEY: &str = "priority";
pub const ENTITY_TYPE_KEY: &str = "entity_type";
pub const CONTRACTOR_KEY: &str = "contractor";

/// The user's search text and categorical selections for one list view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub search_text: String,
    pub status: Facet<ItemStatus>,
    pub priority: Facet<Priority>,
    pub entity_type: Facet<EntityType>,
    pub contractor: Facet<ContractorId>,
}

impl FilterState {
    /// Builds the backend parameters, leaving out every unconstrained field.
    pub fn to_query_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        let search = self.search_text.trim();
        if !search.is_empty() {
            params.insert(SEARCH_KEY, search);
        }
        params.insert_facet(STATUS_KEY, &self.status);
        params.insert_facet(PRIORITY_KEY, &self.priority);
        params.insert_facet(ENTITY_TYPE_KEY, &self.entity_type);
        params.insert_facet(CONTRACTOR_KEY, &self.contractor);
        params
    }

    pub fn is_unfiltered(&self) -> bool {
        self.to_query_params().is_empty()
    }
}

/// Backend-facing filter parameters. Ordered so equal filters compare and
/// serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, key: &str, value: &str) {
        if value.is_empty() || value.eq_ignore_ascii_case(ALL_SENTINEL) {
            return;
        }
        self.0.insert(key.to_string(), value.to_string());
    }

    fn insert_facet<T: ToString>(&mut self, key: &str, facet: &Facet<T>) {
        if let Some(value) = facet.value() {
            self.insert(key, &value.to_string());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn search(&self) -> Option<&str> {
        self.get(SEARCH_KEY)
    }

    pub fn entity_type(&self) -> Option<EntityType> {
        self.get(ENTITY_TYPE_KEY).and_then(|raw| raw.parse().ok())
    }

    /// Whether an entity kind may appear in results constrained by these params.
    pub fn admits(&self, entity_type: EntityType) -> bool {
        self.entity_type().map_or(true, |wanted| wanted == entity_type)
    }
}

impl FromIterator<(String, String)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (key, value) in iter {
            params.insert(&key, value.trim());
        }
        params
    }
}

/// Owns the [`FilterState`] of one list view and publishes every change.
pub struct FilterStore {
    tx: watch::Sender<FilterState>,
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new(FilterState::default())
    }
}

impl FilterStore {
    pub fn new(initial: FilterState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn state(&self) -> FilterState {
        self.tx.borrow().clone()
    }

    pub fn query_params(&self) -> QueryParams {
        self.tx.borrow().to_query_params()
    }

    pub fn subscribe(&self) -> watch::Receiver<FilterState> {
        self.tx.subscribe()
    }

    /// Applies `change`; subscribers are notified only if the state differs.
    pub fn update(&self, change: impl FnOnce(&mut FilterState)) -> bool {
        self.tx.send_if_modified(|state| {
            let before = state.clone();
            change(state);
            *state != before
        })
    }

    pub fn set_search_text(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        self.update(|state| state.search_text = text)
    }

    pub fn set_status(&self, status: Facet<ItemStatus>) -> bool {
        self.update(|state| state.status = status)
    }

    pub fn set_priority(&self, priority: Facet<Priority>) -> bool {
        self.update(|state| state.priority = priority)
    }

    pub fn set_entity_type(&self, entity_type: Facet<EntityType>) -> bool {
        self.update(|state| state.entity_type = entity_type)
    }

    pub fn set_contractor(&self, contractor: Facet<ContractorId>) -> bool {
        self.update(|state| state.contractor = contractor)
    }

    pub fn reset(&self) -> bool {
        self.update(|state| *state = FilterState::default())
    }
}

#[cfg(test)]
#[path = "tests/filters_tests.rs"]
mod tests;
