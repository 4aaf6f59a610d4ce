//! Whole-store snapshot used to seed and restore demo data.

use serde::{Deserialize, Serialize};

use super::{Quote, ReportListItem, ReportRecord, Supplier, SystemSettings};

/// Every table in one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub schema_version: i32,
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub revision_id: i64,
    #[serde(default)]
    pub quotes: Vec<Quote>,
    #[serde(default)]
    pub reports: Vec<ReportRecord>,
    #[serde(default)]
    pub report_items: Vec<ReportListItem>,
    #[serde(default)]
    pub suppliers: Vec<Supplier>,
    #[serde(default)]
    pub settings: SystemSettings,
}

/// Revision information for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub generated_at: String,
}
