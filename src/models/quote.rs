//! Quote model: one supplier request or approval message.

use serde::{Deserialize, Serialize};

/// Which message template a quote uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum QuoteType {
    /// Ask the supplier for a quote
    Request,
    /// Tell the supplier a quote was approved
    Approval,
}

impl QuoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteType::Request => "request",
            QuoteType::Approval => "approval",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "request" => Some(QuoteType::Request),
            "approval" => Some(QuoteType::Approval),
            _ => None,
        }
    }
}

/// A stored supplier message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    pub quote_type: QuoteType,
    pub supplier_name: String,
    #[serde(default)]
    pub supplier_phone: String,
    pub prefix: String,
    #[serde(default)]
    pub first_quote_number: String,
    #[serde(default)]
    pub second_quote_number: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub observation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub created_at: String,
}

/// Request body for creating or overwriting a quote.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteInput {
    pub quote_type: QuoteType,
    pub supplier_name: String,
    #[serde(default)]
    pub supplier_phone: String,
    pub prefix: String,
    #[serde(default)]
    pub first_quote_number: String,
    #[serde(default)]
    pub second_quote_number: String,
    #[serde(default)]
    pub description: String,
    /// Left empty to have it composed from `description`
    #[serde(default)]
    pub observation: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Query parameters for the quote list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteFilter {
    #[serde(default, rename = "type")]
    pub quote_type: Option<QuoteType>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
    /// Inclusive lower bound on the creation date (`YYYY-MM-DD`)
    #[serde(default)]
    pub from: Option<String>,
    /// Inclusive upper bound on the creation date (`YYYY-MM-DD`)
    #[serde(default)]
    pub to: Option<String>,
}
