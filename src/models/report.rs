//! Report record (purchase/approval ledger line) and dropdown list items.

use serde::{Deserialize, Serialize};

/// Where the printed report is in the protocol workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Delivered,
    Protocoled,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 3] = [
        DeliveryStatus::Pending,
        DeliveryStatus::Delivered,
        DeliveryStatus::Protocoled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "Pending",
            DeliveryStatus::Delivered => "Delivered",
            DeliveryStatus::Protocoled => "Protocoled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == s)
    }
}

/// A purchase/report ledger line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub id: String,
    pub request_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_date: Option<String>,
    pub prefix: String,
    pub department: String,
    pub description: String,
    #[serde(default)]
    pub supplier: String,
    #[serde(default)]
    pub approval_numbers: String,
    pub total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub delivery_status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocoled_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocoled_by: Option<String>,
    pub created_at: String,
}

/// Request body for creating or overwriting a report record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportInput {
    pub request_date: String,
    #[serde(default)]
    pub approval_date: Option<String>,
    pub prefix: String,
    pub department: String,
    pub description: String,
    #[serde(default)]
    pub supplier: String,
    #[serde(default)]
    pub approval_numbers: String,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub invoice: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub delivery_status: DeliveryStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for a delivery-status rewrite.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryUpdateRequest {
    pub delivery_status: DeliveryStatus,
}

/// Request body for confirming the protocol of several records at once.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolConfirmRequest {
    pub ids: Vec<String>,
}

/// Which dropdown a list item populates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ListCategory {
    Department,
    Supplier,
    Status,
    Delivery,
}

impl ListCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListCategory::Department => "department",
            ListCategory::Supplier => "supplier",
            ListCategory::Status => "status",
            ListCategory::Delivery => "delivery",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "department" => Some(ListCategory::Department),
            "supplier" => Some(ListCategory::Supplier),
            "status" => Some(ListCategory::Status),
            "delivery" => Some(ListCategory::Delivery),
            _ => None,
        }
    }
}

/// A (category, value) pair feeding a dropdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportListItem {
    pub id: String,
    pub category: ListCategory,
    pub value: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportListItemInput {
    pub category: ListCategory,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListItemQuery {
    #[serde(default)]
    pub category: Option<ListCategory>,
}

/// Dropdown values per category, sorted and de-duplicated.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListOptions {
    pub department: Vec<String>,
    pub supplier: Vec<String>,
    pub status: Vec<String>,
    pub delivery: Vec<String>,
}
