use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| UnknownValue::new(stringify!($name), s))
            }
        }
    };
}

id_newtype!(ItemId);
id_newtype!(ProjectId);
id_newtype!(ContractorId);
id_newtype!(UserId);

/// Raised when a string does not name a member of a fixed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownValue {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownValue::new($kind, other)),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    SiteInstruction,
    Submittal,
    DailyReport,
    Document,
    InsuranceCertificate,
    BidPackage,
    PhotoProgress,
}

string_enum!(EntityType, "entity type", {
    SiteInstruction => "site_instruction",
    Submittal => "submittal",
    DailyReport => "daily_report",
    Document => "document",
    InsuranceCertificate => "insurance_certificate",
    BidPackage => "bid_package",
    PhotoProgress => "photo_progress",
});

impl EntityType {
    /// Backend table backing this entity kind.
    pub fn table(&self) -> &'static str {
        match self {
            EntityType::SiteInstruction => "site_instructions",
            EntityType::Submittal => "submittals",
            EntityType::DailyReport => "daily_reports",
            EntityType::Document => "documents",
            EntityType::InsuranceCertificate => "insurance_certificates",
            EntityType::BidPackage => "bid_packages",
            EntityType::PhotoProgress => "photo_progress_entries",
        }
    }

    /// Column holding the date an item is due (or expires).
    pub fn due_column(&self) -> Option<&'static str> {
        match self {
            EntityType::SiteInstruction | EntityType::Submittal => Some("due_date"),
            EntityType::InsuranceCertificate => Some("expiration_date"),
            EntityType::BidPackage => Some("bid_due_date"),
            EntityType::DailyReport | EntityType::Document | EntityType::PhotoProgress => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntityType::SiteInstruction => "Site instruction",
            EntityType::Submittal => "Submittal",
            EntityType::DailyReport => "Daily report",
            EntityType::Document => "Document",
            EntityType::InsuranceCertificate => "Insurance certificate",
            EntityType::BidPackage => "Bid package",
            EntityType::PhotoProgress => "Photo progress",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Draft,
    Issued,
    Acknowledged,
    Pending,
    Submitted,
    UnderReview,
    InProgress,
    Approved,
    Rejected,
    Completed,
    Verified,
    Void,
    Expired,
}

string_enum!(ItemStatus, "status", {
    Draft => "draft",
    Issued => "issued",
    Acknowledged => "acknowledged",
    Pending => "pending",
    Submitted => "submitted",
    UnderReview => "under_review",
    InProgress => "in_progress",
    Approved => "approved",
    Rejected => "rejected",
    Completed => "completed",
    Verified => "verified",
    Void => "void",
    Expired => "expired",
});

impl ItemStatus {
    /// Closed-out statuses never count as overdue or due.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemStatus::Completed | ItemStatus::Verified | ItemStatus::Void
        )
    }

    pub fn is_awaiting_review(&self) -> bool {
        matches!(
            self,
            ItemStatus::Pending | ItemStatus::Submitted | ItemStatus::UnderReview
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

string_enum!(Priority, "priority", {
    Low => "low",
    Normal => "normal",
    High => "high",
    Urgent => "urgent",
});

/// The filter value meaning "no constraint applied".
pub const ALL_SENTINEL: &str = "all";

/// A categorical filter selection: either no constraint or one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet<T> {
    All,
    Only(T),
}

impl<T> Default for Facet<T> {
    fn default() -> Self {
        Facet::All
    }
}

impl<T> Facet<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Facet::All => None,
            Facet::Only(value) => Some(value),
        }
    }
}

impl<T> From<Option<T>> for Facet<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Facet::All, Facet::Only)
    }
}

impl<T: fmt::Display> fmt::Display for Facet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facet::All => f.write_str(ALL_SENTINEL),
            Facet::Only(value) => fmt::Display::fmt(value, f),
        }
    }
}

impl<T> FromStr for Facet<T>
where
    T: FromStr<Err = UnknownValue>,
{
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_SENTINEL) {
            return Ok(Facet::All);
        }
        trimmed.parse().map(Facet::Only)
    }
}
