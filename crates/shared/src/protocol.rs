use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::domain::{ContractorId, EntityType, ItemId, ItemStatus, Priority, ProjectId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteInstruction {
    pub id: ItemId,
    pub project_id: ProjectId,
    #[serde(default)]
    pub reference_number: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: ItemStatus,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub subcontractor_id: Option<ContractorId>,
    #[serde(default, deserialize_with = "deserialize_flexible_date")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub requires_acknowledgment: bool,
    #[serde(default)]
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submittal {
    pub id: ItemId,
    pub project_id: ProjectId,
    #[serde(default)]
    pub submittal_number: Option<String>,
    pub title: String,
    #[serde(default)]
    pub spec_section: Option<String>,
    pub status: ItemStatus,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub subcontractor_id: Option<ContractorId>,
    #[serde(default, deserialize_with = "deserialize_flexible_date")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub id: ItemId,
    pub project_id: ProjectId,
    pub report_date: NaiveDate,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub weather: Option<String>,
    #[serde(default)]
    pub workers_on_site: Option<u32>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: ItemId,
    pub project_id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceCertificate {
    pub id: ItemId,
    pub project_id: ProjectId,
    #[serde(default)]
    pub subcontractor_id: Option<ContractorId>,
    pub carrier: String,
    pub policy_number: String,
    #[serde(default)]
    pub coverage_type: Option<String>,
    pub status: ItemStatus,
    #[serde(default, deserialize_with = "deserialize_flexible_date")]
    pub expiration_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidPackage {
    pub id: ItemId,
    pub project_id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub trade: Option<String>,
    pub status: ItemStatus,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub awarded_to: Option<ContractorId>,
    #[serde(default, deserialize_with = "deserialize_flexible_date")]
    pub bid_due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoProgress {
    pub id: ItemId,
    pub project_id: ProjectId,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub status: ItemStatus,
    pub captured_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Parses an RFC 3339 timestamp, a zoneless timestamp or a bare `DATE`
/// value. Zoneless values are taken as UTC, bare dates as UTC midnight.
pub fn parse_flexible_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

fn deserialize_flexible_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_flexible_date(&raw)
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("invalid date '{raw}'")))
}

/// A record returned by the backend, tagged by the kind of entity it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity_type", rename_all = "snake_case")]
pub enum ResultItem {
    SiteInstruction(SiteInstruction),
    Submittal(Submittal),
    DailyReport(DailyReport),
    Document(Document),
    InsuranceCertificate(InsuranceCertificate),
    BidPackage(BidPackage),
    PhotoProgress(PhotoProgress),
}

impl ResultItem {
    /// Decodes an untagged backend row of the given entity kind.
    pub fn from_row(
        entity_type: EntityType,
        row: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match entity_type {
            EntityType::SiteInstruction => Self::SiteInstruction(serde_json::from_value(row)?),
            EntityType::Submittal => Self::Submittal(serde_json::from_value(row)?),
            EntityType::DailyReport => Self::DailyReport(serde_json::from_value(row)?),
            EntityType::Document => Self::Document(serde_json::from_value(row)?),
            EntityType::InsuranceCertificate => {
                Self::InsuranceCertificate(serde_json::from_value(row)?)
            }
            EntityType::BidPackage => Self::BidPackage(serde_json::from_value(row)?),
            EntityType::PhotoProgress => Self::PhotoProgress(serde_json::from_value(row)?),
        })
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            ResultItem::SiteInstruction(_) => EntityType::SiteInstruction,
            ResultItem::Submittal(_) => EntityType::Submittal,
            ResultItem::DailyReport(_) => EntityType::DailyReport,
            ResultItem::Document(_) => EntityType::Document,
            ResultItem::InsuranceCertificate(_) => EntityType::InsuranceCertificate,
            ResultItem::BidPackage(_) => EntityType::BidPackage,
            ResultItem::PhotoProgress(_) => EntityType::PhotoProgress,
        }
    }

    pub fn id(&self) -> ItemId {
        match self {
            ResultItem::SiteInstruction(item) => item.id,
            ResultItem::Submittal(item) => item.id,
            ResultItem::DailyReport(item) => item.id,
            ResultItem::Document(item) => item.id,
            ResultItem::InsuranceCertificate(item) => item.id,
            ResultItem::BidPackage(item) => item.id,
            ResultItem::PhotoProgress(item) => item.id,
        }
    }

    pub fn project_id(&self) -> ProjectId {
        match self {
            ResultItem::SiteInstruction(item) => item.project_id,
            ResultItem::Submittal(item) => item.project_id,
            ResultItem::DailyReport(item) => item.project_id,
            ResultItem::Document(item) => item.project_id,
            ResultItem::InsuranceCertificate(item) => item.project_id,
            ResultItem::BidPackage(item) => item.project_id,
            ResultItem::PhotoProgress(item) => item.project_id,
        }
    }

    pub fn title(&self) -> String {
        match self {
            ResultItem::SiteInstruction(item) => item.title.clone(),
            ResultItem::Submittal(item) => item.title.clone(),
            ResultItem::DailyReport(item) => item
                .summary
                .clone()
                .unwrap_or_else(|| format!("Daily report {}", item.report_date)),
            ResultItem::Document(item) => item.name.clone(),
            ResultItem::InsuranceCertificate(item) => {
                format!("{} {}", item.carrier, item.policy_number)
            }
            ResultItem::BidPackage(item) => item.name.clone(),
            ResultItem::PhotoProgress(item) => item
                .caption
                .clone()
                .unwrap_or_else(|| format!("Photo {}", item.captured_at.date_naive())),
        }
    }

    pub fn status(&self) -> ItemStatus {
        match self {
            ResultItem::SiteInstruction(item) => item.status,
            ResultItem::Submittal(item) => item.status,
            ResultItem::DailyReport(item) => item.status,
            ResultItem::Document(item) => item.status,
            ResultItem::InsuranceCertificate(item) => item.status,
            ResultItem::BidPackage(item) => item.status,
            ResultItem::PhotoProgress(item) => item.status,
        }
    }

    pub fn priority(&self) -> Option<Priority> {
        match self {
            ResultItem::SiteInstruction(item) => item.priority,
            ResultItem::Submittal(item) => item.priority,
            ResultItem::BidPackage(item) => item.priority,
            ResultItem::DailyReport(_)
            | ResultItem::Document(_)
            | ResultItem::InsuranceCertificate(_)
            | ResultItem::PhotoProgress(_) => None,
        }
    }

    /// Due date, expiration date or bid deadline, whichever applies.
    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        match self {
            ResultItem::SiteInstruction(item) => item.due_date,
            ResultItem::Submittal(item) => item.due_date,
            ResultItem::InsuranceCertificate(item) => item.expiration_date,
            ResultItem::BidPackage(item) => item.bid_due_date,
            ResultItem::DailyReport(_) | ResultItem::Document(_) | ResultItem::PhotoProgress(_) => {
                None
            }
        }
    }

    pub fn contractor_id(&self) -> Option<ContractorId> {
        match self {
            ResultItem::SiteInstruction(item) => item.subcontractor_id,
            ResultItem::Submittal(item) => item.subcontractor_id,
            ResultItem::InsuranceCertificate(item) => item.subcontractor_id,
            ResultItem::BidPackage(item) => item.awarded_to,
            ResultItem::DailyReport(_) | ResultItem::Document(_) | ResultItem::PhotoProgress(_) => {
                None
            }
        }
    }

    /// Issued but not yet acknowledged by the receiving contractor.
    pub fn awaits_acknowledgment(&self) -> bool {
        match self {
            ResultItem::SiteInstruction(item) => {
                item.status == ItemStatus::Issued
                    && item.requires_acknowledgment
                    && !item.acknowledged
            }
            _ => false,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            ResultItem::SiteInstruction(item) => item.created_at,
            ResultItem::Submittal(item) => item.created_at,
            ResultItem::DailyReport(item) => item.created_at,
            ResultItem::Document(item) => item.created_at,
            ResultItem::InsuranceCertificate(item) => item.created_at,
            ResultItem::BidPackage(item) => item.created_at,
            ResultItem::PhotoProgress(item) => item.created_at,
        }
    }
}
