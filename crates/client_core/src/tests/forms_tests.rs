use chrono::{Duration, Utc};

use super::*;

#[test]
fn empty_site_instruction_lists_every_missing_field() {
    let mut draft = SiteInstructionDraft::new(ProjectId::new());
    draft.project_id = None;

    let errors = draft.validate();
    assert_eq!(errors.get("project_id"), Some("project id is required"));
    assert_eq!(errors.get("title"), Some("title is required"));
    assert_eq!(
        errors.get("subcontractor_id"),
        Some("subcontractor id is required")
    );
    assert_eq!(errors.get("description"), None);
}

#[test]
fn complete_site_instruction_passes() {
    let mut draft = SiteInstructionDraft::new(ProjectId::new());
    draft.title = "Shore east wall".into();
    draft.subcontractor_id = Some(ContractorId::new());

    assert!(draft.validate().is_empty());
    assert!(draft.validate().into_result().is_ok());
}

#[test]
fn blank_text_counts_as_missing() {
    let mut draft = DailyReportDraft::new(
        ProjectId::new(),
        NaiveDate::from_ymd_opt(2026, 3, 14).expect("date"),
    );
    draft.summary = "   ".into();
    assert_eq!(draft.validate().get("summary"), Some("summary is required"));
}

#[test]
fn certificate_must_expire_after_it_takes_effect() {
    let mut draft = InsuranceCertificateDraft::new(ProjectId::new(), ContractorId::new());
    draft.carrier = "Acme Mutual".into();
    draft.policy_number = "GL-2201".into();
    let effective = Utc::now();
    draft.effective_date = Some(effective);
    draft.expiration_date = Some(effective - Duration::days(1));

    let errors = draft.validate();
    assert_eq!(
        errors.get("expiration_date"),
        Some("expiration date must be after the effective date")
    );

    draft.expiration_date = Some(effective + Duration::days(365));
    assert!(draft.validate().is_empty());
}

#[test]
fn drafts_serialize_without_empty_optionals() {
    let mut draft = SiteInstructionDraft::new(ProjectId::new());
    draft.title = "Shore east wall".into();
    let body = serde_json::to_value(&draft).expect("json");

    assert_eq!(body["status"], "draft");
    assert_eq!(body["priority"], "normal");
    assert!(body.get("description").is_none());
    assert!(body.get("due_date").is_none());
}
