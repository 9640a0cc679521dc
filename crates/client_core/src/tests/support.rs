use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    domain::{ContractorId, EntityType, ItemId, ItemStatus, Priority, ProjectId},
    error::ClientError,
    protocol::{InsuranceCertificate, ResultItem, SiteInstruction},
};

use crate::{
    filters::{QueryParams, STATUS_KEY},
    rest::{ItemSource, Page},
};

pub fn instruction(status: ItemStatus, due: Option<DateTime<Utc>>) -> ResultItem {
    ResultItem::SiteInstruction(SiteInstruction {
        id: ItemId::new(),
        project_id: ProjectId::new(),
        reference_number: None,
        title: format!("{status} instruction"),
        description: None,
        status,
        priority: Some(Priority::Normal),
        subcontractor_id: None,
        due_date: due,
        requires_acknowledgment: false,
        acknowledged: false,
        created_at: Utc::now(),
    })
}

pub fn certificate(status: ItemStatus, expires: Option<DateTime<Utc>>) -> ResultItem {
    ResultItem::InsuranceCertificate(InsuranceCertificate {
        id: ItemId::new(),
        project_id: ProjectId::new(),
        subcontractor_id: Some(ContractorId::new()),
        carrier: "Acme Mutual".into(),
        policy_number: "GL-1001".into(),
        coverage_type: Some("general_liability".into()),
        status,
        expiration_date: expires,
        created_at: Utc::now(),
    })
}

/// In-memory backend. Rows are filtered by status only; every call is
/// recorded and can be delayed or failed per entity type.
#[derive(Default)]
pub struct FakeSource {
    rows: Mutex<HashMap<EntityType, Vec<ResultItem>>>,
    failures: Mutex<HashMap<EntityType, ClientError>>,
    delays: Mutex<Vec<Duration>>,
    calls: Mutex<Vec<(EntityType, QueryParams)>>,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, entity_type: EntityType, items: Vec<ResultItem>) {
        self.rows.lock().expect("rows").insert(entity_type, items);
    }

    pub fn fail(&self, entity_type: EntityType, err: ClientError) {
        self.failures.lock().expect("failures").insert(entity_type, err);
    }

    pub fn heal(&self, entity_type: EntityType) {
        self.failures.lock().expect("failures").remove(&entity_type);
    }

    /// Delays applied to successive calls, in call order.
    pub fn delay_calls(&self, delays: Vec<Duration>) {
        *self.delays.lock().expect("delays") = delays;
    }

    pub fn calls(&self) -> Vec<(EntityType, QueryParams)> {
        self.calls.lock().expect("calls").clone()
    }
}

#[async_trait]
impl ItemSource for FakeSource {
    async fn fetch_items(
        &self,
        entity_type: EntityType,
        params: &QueryParams,
        _page: Page,
    ) -> Result<Vec<ResultItem>, ClientError> {
        let delay = {
            let mut calls = self.calls.lock().expect("calls");
            calls.push((entity_type, params.clone()));
            let delays = self.delays.lock().expect("delays");
            delays.get(calls.len() - 1).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.failures.lock().expect("failures").get(&entity_type) {
            return Err(err.clone());
        }

        let rows = self
            .rows
            .lock()
            .expect("rows")
            .get(&entity_type)
            .cloned()
            .unwrap_or_default();
        let status = params.get(STATUS_KEY).and_then(|raw| raw.parse::<ItemStatus>().ok());
        Ok(rows
            .into_iter()
            .filter(|item| status.map_or(true, |wanted| item.status() == wanted))
            .collect())
    }
}
