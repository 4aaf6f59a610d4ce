//! Filtering, sorting and grouping for list views.
//!
//! Pure functions over already-loaded records; the repository hands over full
//! tables and the handlers shape them here.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{DeliveryStatus, Quote, QuoteFilter, ReportRecord};

/// Sort key for report lists.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    RequestDate,
    CreatedAt,
    Total,
    Supplier,
    Department,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Field to group report records by.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GroupBy {
    Department,
    Supplier,
    Status,
    DeliveryStatus,
    /// `YYYY-MM` of the request date
    Month,
}

/// Query parameters accepted by the report list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub delivery_status: Option<DeliveryStatus>,
    #[serde(default)]
    pub prefix: Option<String>,
    /// Inclusive lower bound on the request date
    #[serde(default)]
    pub from: Option<String>,
    /// Inclusive upper bound on the request date
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub order: SortOrder,
}

/// One bucket of a grouped report list.
#[derive(Debug, Clone, Serialize)]
pub struct ReportGroup {
    pub key: String,
    pub count: usize,
    pub total: f64,
    pub records: Vec<ReportRecord>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

impl ReportQuery {
    /// Whether `record` passes every filter that is set.
    pub fn matches(&self, record: &ReportRecord) -> bool {
        if let Some(department) = non_blank(&self.department) {
            if !record.department.eq_ignore_ascii_case(department) {
                return false;
            }
        }
        if let Some(supplier) = non_blank(&self.supplier) {
            if !contains_ci(&record.supplier, &supplier.to_lowercase()) {
                return false;
            }
        }
        if let Some(status) = non_blank(&self.status) {
            if !record.status.eq_ignore_ascii_case(status) {
                return false;
            }
        }
        if let Some(delivery) = self.delivery_status {
            if record.delivery_status != delivery {
                return false;
            }
        }
        if let Some(prefix) = non_blank(&self.prefix) {
            if !record.prefix.eq_ignore_ascii_case(prefix) {
                return false;
            }
        }
        if let Some(from) = non_blank(&self.from) {
            if record.request_date.as_str() < from {
                return false;
            }
        }
        if let Some(to) = non_blank(&self.to) {
            if record.request_date.as_str() > to {
                return false;
            }
        }
        if let Some(q) = non_blank(&self.q) {
            let needle = q.to_lowercase();
            let hit = [
                record.description.as_str(),
                record.supplier.as_str(),
                record.department.as_str(),
                record.prefix.as_str(),
                record.approval_numbers.as_str(),
                record.invoice.as_deref().unwrap_or_default(),
                record.notes.as_deref().unwrap_or_default(),
            ]
            .iter()
            .any(|field| contains_ci(field, &needle));
            if !hit {
                return false;
            }
        }
        true
    }

    /// Filter then sort.
    pub fn apply(&self, records: Vec<ReportRecord>) -> Vec<ReportRecord> {
        let mut filtered: Vec<ReportRecord> =
            records.into_iter().filter(|r| self.matches(r)).collect();
        sort_reports(&mut filtered, self.sort, self.order);
        filtered
    }
}

fn compare_reports(a: &ReportRecord, b: &ReportRecord, key: SortKey) -> Ordering {
    let primary = match key {
        SortKey::RequestDate => a.request_date.cmp(&b.request_date),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::Total => a.total.total_cmp(&b.total),
        SortKey::Supplier => a.supplier.to_lowercase().cmp(&b.supplier.to_lowercase()),
        SortKey::Department => a
            .department
            .to_lowercase()
            .cmp(&b.department.to_lowercase()),
    };
    // Ties fall back to creation time so the order is stable across requests
    primary.then_with(|| a.created_at.cmp(&b.created_at))
}

pub fn sort_reports(records: &mut [ReportRecord], key: SortKey, order: SortOrder) {
    records.sort_by(|a, b| {
        let ord = compare_reports(a, b, key);
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

fn group_key(record: &ReportRecord, by: GroupBy) -> String {
    let key = match by {
        GroupBy::Department => record.department.trim().to_string(),
        GroupBy::Supplier => record.supplier.trim().to_string(),
        GroupBy::Status => record.status.trim().to_string(),
        GroupBy::DeliveryStatus => record.delivery_status.as_str().to_string(),
        GroupBy::Month => record.request_date.chars().take(7).collect(),
    };
    if key.is_empty() {
        "(none)".to_string()
    } else {
        key
    }
}

/// Bucket records by `by`; buckets are ordered by key and keep the input order inside.
pub fn group_reports(records: Vec<ReportRecord>, by: GroupBy) -> Vec<ReportGroup> {
    let mut buckets: BTreeMap<String, Vec<ReportRecord>> = BTreeMap::new();
    for record in records {
        buckets.entry(group_key(&record, by)).or_default().push(record);
    }

    buckets
        .into_iter()
        .map(|(key, records)| ReportGroup {
            count: records.len(),
            total: records.iter().map(|r| r.total).sum(),
            key,
            records,
        })
        .collect()
}

/// Filter quotes and order them newest first.
pub fn filter_quotes(quotes: Vec<Quote>, filter: &QuoteFilter) -> Vec<Quote> {
    let supplier = non_blank(&filter.supplier).map(str::to_lowercase);
    let q = non_blank(&filter.q).map(str::to_lowercase);
    let from = non_blank(&filter.from);
    let to = non_blank(&filter.to);

    let mut result: Vec<Quote> = quotes
        .into_iter()
        .filter(|quote| {
            if let Some(quote_type) = filter.quote_type {
                if quote.quote_type != quote_type {
                    return false;
                }
            }
            if let Some(supplier) = &supplier {
                if !contains_ci(&quote.supplier_name, supplier) {
                    return false;
                }
            }
            let day = quote.created_at.get(..10).unwrap_or(&quote.created_at);
            if from.is_some_and(|from| day < from) || to.is_some_and(|to| day > to) {
                return false;
            }
            if let Some(q) = &q {
                let hit = [
                    quote.supplier_name.as_str(),
                    quote.prefix.as_str(),
                    quote.first_quote_number.as_str(),
                    quote.second_quote_number.as_str(),
                    quote.description.as_str(),
                    quote.observation.as_str(),
                ]
                .iter()
                .any(|field| contains_ci(field, q));
                if !hit {
                    return false;
                }
            }
            true
        })
        .collect();

    result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    result
}
