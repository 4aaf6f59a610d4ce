//! WhatsApp message composition for quotes.
//!
//! The observation paragraph is rewritten by an external text-generation
//! endpoint when one is configured; everything else is a fixed template.

mod generator;

pub use generator::*;

use serde::Serialize;

use crate::models::{Quote, QuoteInput, QuoteType};

/// Template fields shared by the generator prompt and the final message.
#[derive(Debug, Clone)]
pub struct MessageFields {
    pub quote_type: QuoteType,
    pub supplier_name: String,
    pub supplier_phone: String,
    pub prefix: String,
    pub first_quote_number: String,
    pub second_quote_number: String,
}

impl MessageFields {
    pub fn from_input(input: &QuoteInput) -> Self {
        Self {
            quote_type: input.quote_type,
            supplier_name: input.supplier_name.trim().to_string(),
            supplier_phone: input.supplier_phone.clone(),
            prefix: input.prefix.trim().to_string(),
            first_quote_number: input.first_quote_number.trim().to_string(),
            second_quote_number: input.second_quote_number.trim().to_string(),
        }
    }

    pub fn from_quote(quote: &Quote) -> Self {
        Self {
            quote_type: quote.quote_type,
            supplier_name: quote.supplier_name.clone(),
            supplier_phone: quote.supplier_phone.clone(),
            prefix: quote.prefix.clone(),
            first_quote_number: quote.first_quote_number.clone(),
            second_quote_number: quote.second_quote_number.clone(),
        }
    }

    /// Non-empty quote numbers joined with " / ".
    pub fn quote_numbers(&self) -> String {
        [&self.first_quote_number, &self.second_quote_number]
            .into_iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// Where the observation text came from.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MessageSource {
    Generated,
    Fallback,
    /// Observation supplied by the user and used as-is
    Stored,
}

/// A finished message ready to send.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedMessage {
    pub observation: String,
    pub message: String,
    pub source: MessageSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_url: Option<String>,
}

impl ComposedMessage {
    pub fn new(fields: &MessageFields, observation: String, source: MessageSource) -> Self {
        let message = render_message(fields, &observation);
        let whatsapp_url = whatsapp_link(&fields.supplier_phone, &message);
        Self {
            observation,
            message,
            source,
            whatsapp_url,
        }
    }
}

/// Render the fixed WhatsApp template.
pub fn render_message(fields: &MessageFields, observation: &str) -> String {
    let title = match fields.quote_type {
        QuoteType::Request => "*QUOTE REQUEST*",
        QuoteType::Approval => "*QUOTE APPROVED*",
    };

    let mut lines = vec![
        title.to_string(),
        String::new(),
        format!("Supplier: {}", fields.supplier_name),
        format!("Prefix: {}", fields.prefix),
    ];

    let numbers = fields.quote_numbers();
    if !numbers.is_empty() {
        lines.push(format!("Quote no.: {}", numbers));
    }

    let observation = observation.trim();
    if !observation.is_empty() {
        lines.push(String::new());
        lines.push(format!("Observation: {}", observation));
    }

    if fields.quote_type == QuoteType::Approval {
        lines.push(String::new());
        lines.push("Please proceed with the service as quoted.".to_string());
    }

    lines.join("\n")
}

/// Local rewrite used whenever generation is unavailable.
pub fn fallback_observation(description: &str) -> String {
    let collapsed = description.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return collapsed;
    }

    let mut chars = collapsed.chars();
    let mut text: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    if !text.ends_with(['.', '!', '?']) {
        text.push('.');
    }
    text
}

const LABELS: [&str; 3] = ["observation:", "observations:", "obs:"];

/// Strip incidental markup from generated text.
pub fn sanitize_generated(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            continue;
        }

        let mut text = trimmed.trim_start_matches('#').trim_start();
        for bullet in ["- ", "* ", "• "] {
            if let Some(rest) = text.strip_prefix(bullet) {
                text = rest;
                break;
            }
        }

        let cleaned = text.replace("**", "").replace("__", "").replace(['*', '`'], "");
        let cleaned = cleaned.trim();

        if cleaned.is_empty() {
            // Keep at most one blank line between paragraphs
            if lines.last().is_some_and(|l| !l.is_empty()) {
                lines.push(String::new());
            }
            continue;
        }
        lines.push(cleaned.to_string());
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    let mut text = lines.join("\n");

    let label = LABELS.iter().find(|l| {
        text.get(..l.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(l))
    });
    if let Some(label) = label {
        text = text[label.len()..].trim_start().to_string();
    }

    for (open, close) in [('"', '"'), ('\u{201C}', '\u{201D}'), ('\'', '\'')] {
        if text.len() > 1 && text.starts_with(open) && text.ends_with(close) {
            text = text[open.len_utf8()..text.len() - close.len_utf8()]
                .trim()
                .to_string();
            break;
        }
    }

    text
}

/// `wa.me` deep link; `None` when the phone has no digits.
pub fn whatsapp_link(phone: &str, message: &str) -> Option<String> {
    let digits = normalize_phone(phone);
    if digits.is_empty() {
        return None;
    }
    Some(format!(
        "https://wa.me/{}?text={}",
        digits,
        urlencoding::encode(message)
    ))
}

/// Keep only the digits of a phone number.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}
