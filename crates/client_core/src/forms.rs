//! Create forms and the client-side checks that gate submission.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use shared::{
    domain::{ContractorId, EntityType, ItemStatus, Priority, ProjectId},
    error::ValidationErrors,
};

/// A record a user is filling in before it is sent to the backend.
pub trait Draft: Serialize + Send + Sync {
    const ENTITY: EntityType;

    fn validate(&self) -> ValidationErrors;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteInstructionDraft {
    pub project_id: Option<ProjectId>,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub subcontractor_id: Option<ContractorId>,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub requires_acknowledgment: bool,
    pub status: ItemStatus,
}

impl SiteInstructionDraft {
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            project_id: Some(project_id),
            title: String::new(),
            description: String::new(),
            subcontractor_id: None,
            priority: Priority::Normal,
            due_date: None,
            requires_acknowledgment: true,
            status: ItemStatus::Draft,
        }
    }
}

impl Draft for SiteInstructionDraft {
    const ENTITY: EntityType = EntityType::SiteInstruction;

    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.require_some("project_id", &self.project_id);
        errors.require("title", &self.title);
        errors.require_some("subcontractor_id", &self.subcontractor_id);
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReportDraft {
    pub project_id: Option<ProjectId>,
    pub report_date: Option<NaiveDate>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers_on_site: Option<u32>,
    pub status: ItemStatus,
}

impl DailyReportDraft {
    pub fn new(project_id: ProjectId, report_date: NaiveDate) -> Self {
        Self {
            project_id: Some(project_id),
            report_date: Some(report_date),
            summary: String::new(),
            weather: None,
            workers_on_site: None,
            status: ItemStatus::Draft,
        }
    }
}

impl Draft for DailyReportDraft {
    const ENTITY: EntityType = EntityType::DailyReport;

    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.require_some("project_id", &self.project_id);
        errors.require_some("report_date", &self.report_date);
        errors.require("summary", &self.summary);
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsuranceCertificateDraft {
    pub project_id: Option<ProjectId>,
    pub subcontractor_id: Option<ContractorId>,
    pub carrier: String,
    pub policy_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub status: ItemStatus,
}

impl InsuranceCertificateDraft {
    pub fn new(project_id: ProjectId, subcontractor_id: ContractorId) -> Self {
        Self {
            project_id: Some(project_id),
            subcontractor_id: Some(subcontractor_id),
            carrier: String::new(),
            policy_number: String::new(),
            coverage_type: None,
            effective_date: None,
            expiration_date: None,
            status: ItemStatus::Pending,
        }
    }
}

impl Draft for InsuranceCertificateDraft {
    const ENTITY: EntityType = EntityType::InsuranceCertificate;

    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.require_some("project_id", &self.project_id);
        errors.require_some("subcontractor_id", &self.subcontractor_id);
        errors.require("carrier", &self.carrier);
        errors.require("policy_number", &self.policy_number);
        errors.require_some("expiration_date", &self.expiration_date);
        if let (Some(effective), Some(expires)) = (self.effective_date, self.expiration_date) {
            if expires <= effective {
                errors.add(
                    "expiration_date",
                    "expiration date must be after the effective date",
                );
            }
        }
        errors
    }
}

#[cfg(test)]
#[path = "tests/forms_tests.rs"]
mod tests;
