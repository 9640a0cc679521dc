//! Typed access to the hosted PostgREST backend.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use shared::{
    domain::{EntityType, ItemId},
    error::ClientError,
    protocol::ResultItem,
};
use tracing::{info, warn};
use url::Url;

use crate::{
    config::Settings,
    filters::{QueryParams, CONTRACTOR_KEY, PRIORITY_KEY, STATUS_KEY},
    forms::Draft,
};

const REST_PREFIX: &str = "rest/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Page {
    pub fn first(limit: u32) -> Self {
        Self {
            limit: limit.clamp(1, 1000),
            offset: 0,
        }
    }

    pub fn next(&self) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset.saturating_add(self.limit),
        }
    }
}

/// Where list views get their rows from.
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn fetch_items(
        &self,
        entity_type: EntityType,
        params: &QueryParams,
        page: Page,
    ) -> Result<Vec<ResultItem>, ClientError>;
}

pub struct RestClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl RestClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|err| ClientError::Network(format!("invalid backend url '{base_url}': {err}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            api_key: api_key.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ClientError> {
        Self::new(&settings.api_url, settings.api_key.clone())
    }

    pub fn table_url(&self, table: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(&format!("{REST_PREFIX}/{table}"))
            .map_err(|err| ClientError::Network(format!("invalid table url for '{table}': {err}")))
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        if self.api_key.is_empty() {
            return builder;
        }
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    pub async fn get_item(
        &self,
        entity_type: EntityType,
        id: ItemId,
    ) -> Result<ResultItem, ClientError> {
        let url = self.table_url(entity_type.table())?;
        let response = self
            .request(reqwest::Method::GET, url)
            .query(&[
                ("select", "*".to_string()),
                ("id", format!("eq.{id}")),
                ("limit", "1".to_string()),
            ])
            .send()
            .await
            .map_err(network)?;
        let rows: Vec<Value> = checked(response, entity_type, &id.to_string())
            .await?
            .json()
            .await
            .map_err(decode)?;

        let Some(row) = rows.into_iter().next() else {
            return Err(ClientError::NotFound {
                entity: entity_type.to_string(),
                target: id.to_string(),
            });
        };
        Ok(ResultItem::from_row(entity_type, row)?)
    }

    /// Validates `draft` and, only if it is complete, inserts it.
    pub async fn create<D: Draft>(&self, draft: &D) -> Result<ResultItem, ClientError> {
        draft.validate().into_result()?;

        let entity_type = D::ENTITY;
        let url = self.table_url(entity_type.table())?;
        let response = self
            .request(reqwest::Method::POST, url)
            .header("Prefer", "return=representation")
            .json(draft)
            .send()
            .await
            .map_err(network)?;
        let rows: Vec<Value> = checked(response, entity_type, entity_type.table())
            .await?
            .json()
            .await
            .map_err(decode)?;

        let row = rows.into_iter().next().ok_or_else(|| ClientError::Backend {
            status: StatusCode::OK.as_u16(),
            message: format!("insert into {} returned no rows", entity_type.table()),
        })?;
        info!(entity = %entity_type, "created record");
        Ok(ResultItem::from_row(entity_type, row)?)
    }
}

#[async_trait]
impl ItemSource for RestClient {
    async fn fetch_items(
        &self,
        entity_type: EntityType,
        params: &QueryParams,
        page: Page,
    ) -> Result<Vec<ResultItem>, ClientError> {
        let Some(query) = list_query(entity_type, params, page) else {
            return Ok(Vec::new());
        };

        let url = self.table_url(entity_type.table())?;
        let path = url.path().to_string();
        let response = self
            .request(reqwest::Method::GET, url)
            .query(&query)
            .send()
            .await
            .map_err(network)?;
        let rows: Vec<Value> = checked(response, entity_type, &path)
            .await?
            .json()
            .await
            .map_err(decode)?;

        rows.into_iter()
            .map(|row| ResultItem::from_row(entity_type, row).map_err(ClientError::from))
            .collect()
    }
}

/// PostgREST query pairs for one entity kind, or `None` when the params
/// constrain a column that kind does not have.
pub fn list_query(
    entity_type: EntityType,
    params: &QueryParams,
    page: Page,
) -> Option<Vec<(String, String)>> {
    if !params.admits(entity_type) {
        return None;
    }

    let mut query = vec![("select".to_string(), "*".to_string())];

    if let Some(status) = params.get(STATUS_KEY) {
        query.push(("status".to_string(), format!("eq.{status}")));
    }
    if let Some(priority) = params.get(PRIORITY_KEY) {
        if !has_priority(entity_type) {
            return None;
        }
        query.push(("priority".to_string(), format!("eq.{priority}")));
    }
    if let Some(contractor) = params.get(CONTRACTOR_KEY) {
        let column = contractor_column(entity_type)?;
        query.push((column.to_string(), format!("eq.{contractor}")));
    }
    if let Some(search) = params.search() {
        let pattern = quote_filter_value(&format!("*{search}*"));
        let clauses = search_columns(entity_type)
            .iter()
            .map(|column| format!("{column}.ilike.{pattern}"))
            .collect::<Vec<_>>()
            .join(",");
        query.push(("or".to_string(), format!("({clauses})")));
    }

    query.push(("order".to_string(), "created_at.desc".to_string()));
    query.push(("limit".to_string(), page.limit.to_string()));
    query.push(("offset".to_string(), page.offset.to_string()));
    Some(query)
}

fn has_priority(entity_type: EntityType) -> bool {
    matches!(
        entity_type,
        EntityType::SiteInstruction | EntityType::Submittal | EntityType::BidPackage
    )
}

fn contractor_column(entity_type: EntityType) -> Option<&'static str> {
    match entity_type {
        EntityType::SiteInstruction | EntityType::Submittal | EntityType::InsuranceCertificate => {
            Some("subcontractor_id")
        }
        EntityType::BidPackage => Some("awarded_to"),
        EntityType::DailyReport | EntityType::Document | EntityType::PhotoProgress => None,
    }
}

fn search_columns(entity_type: EntityType) -> &'static [&'static str] {
    match entity_type {
        EntityType::SiteInstruction => &["title", "description", "reference_number"],
        EntityType::Submittal => &["title", "submittal_number", "spec_section"],
        EntityType::DailyReport => &["summary", "weather"],
        EntityType::Document => &["name", "category"],
        EntityType::InsuranceCertificate => &["carrier", "policy_number", "coverage_type"],
        EntityType::BidPackage => &["name", "trade"],
        EntityType::PhotoProgress => &["caption", "location"],
    }
}

/// Double-quotes a value so PostgREST reserved characters stay literal.
fn quote_filter_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// `target` names what was requested and ends up in `NotFound`.
async fn checked(
    response: Response,
    entity_type: EntityType,
    target: &str,
) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    warn!(entity = %entity_type, %status, "backend request failed");
    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound {
            entity: entity_type.to_string(),
            target: target.to_string(),
        });
    }
    Err(ClientError::Backend {
        status: status.as_u16(),
        message,
    })
}

fn network(err: reqwest::Error) -> ClientError {
    ClientError::Network(err.to_string())
}

fn decode(err: reqwest::Error) -> ClientError {
    ClientError::Decode(err.to_string())
}

#[cfg(test)]
#[path = "tests/rest_tests.rs"]
mod tests;
