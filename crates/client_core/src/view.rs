//! Client-side narrowing of fetched results by the active tab.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use shared::{
    domain::{EntityType, ItemStatus, UnknownValue},
    protocol::ResultItem,
};

/// Window in which an insurance certificate counts as expiring soon.
pub const EXPIRY_WARNING_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ViewTab {
    #[default]
    All,
    Overdue,
    DueToday,
    Pending,
    Completed,
    ExpiringSoon,
    Status(ItemStatus),
}

impl ViewTab {
    pub const STANDARD: &'static [ViewTab] = &[
        ViewTab::All,
        ViewTab::Overdue,
        ViewTab::DueToday,
        ViewTab::Pending,
        ViewTab::Completed,
        ViewTab::ExpiringSoon,
    ];

    pub fn includes(&self, item: &ResultItem, now: DateTime<Utc>) -> bool {
        match self {
            ViewTab::All => true,
            ViewTab::Overdue => is_overdue(item, now),
            ViewTab::DueToday => is_due_today(item, now),
            ViewTab::Pending => is_pending(item),
            ViewTab::Completed => item.status().is_terminal(),
            ViewTab::ExpiringSoon => is_expiring_soon(item, now),
            ViewTab::Status(status) => item.status() == *status,
        }
    }
}

impl fmt::Display for ViewTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewTab::All => f.write_str("all"),
            ViewTab::Overdue => f.write_str("overdue"),
            ViewTab::DueToday => f.write_str("due_today"),
            ViewTab::Pending => f.write_str("pending"),
            ViewTab::Completed => f.write_str("completed"),
            ViewTab::ExpiringSoon => f.write_str("expiring_soon"),
            ViewTab::Status(status) => fmt::Display::fmt(status, f),
        }
    }
}

impl FromStr for ViewTab {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(ViewTab::All),
            "overdue" => Ok(ViewTab::Overdue),
            "due_today" => Ok(ViewTab::DueToday),
            "pending" => Ok(ViewTab::Pending),
            "completed" => Ok(ViewTab::Completed),
            "expiring_soon" => Ok(ViewTab::ExpiringSoon),
            other => other
                .parse()
                .map(ViewTab::Status)
                .map_err(|_| UnknownValue::new("tab", other)),
        }
    }
}

/// Due strictly before `now` and not closed out.
pub fn is_overdue(item: &ResultItem, now: DateTime<Utc>) -> bool {
    if item.status().is_terminal() {
        return false;
    }
    item.due_date().is_some_and(|due| due < now)
}

pub fn is_due_today(item: &ResultItem, now: DateTime<Utc>) -> bool {
    if item.status().is_terminal() {
        return false;
    }
    item.due_date()
        .is_some_and(|due| due.date_naive() == now.date_naive())
}

pub fn is_pending(item: &ResultItem) -> bool {
    item.status().is_awaiting_review() || item.awaits_acknowledgment()
}

pub fn is_expiring_soon(item: &ResultItem, now: DateTime<Utc>) -> bool {
    if item.entity_type() != EntityType::InsuranceCertificate || item.status() == ItemStatus::Void {
        return false;
    }
    let horizon = now + Duration::days(EXPIRY_WARNING_DAYS);
    item.due_date()
        .is_some_and(|expires| expires >= now && expires <= horizon)
}

/// Items visible under `tab`, in their original order.
pub fn apply_tab(items: &[ResultItem], tab: ViewTab, now: DateTime<Utc>) -> Vec<ResultItem> {
    items
        .iter()
        .filter(|item| tab.includes(item, now))
        .cloned()
        .collect()
}

/// Badge counts for the standard tabs.
pub fn tab_counts(items: &[ResultItem], now: DateTime<Utc>) -> BTreeMap<ViewTab, usize> {
    ViewTab::STANDARD
        .iter()
        .map(|tab| {
            let count = items.iter().filter(|item| tab.includes(item, now)).count();
            (*tab, count)
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
