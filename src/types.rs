use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// Placeholder type used when tickets are on the page but none could be parsed.
pub const SYNTHETIC_TICKET_TYPE: &str = "Available Ticket";

/// One listing as read off the page. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ticket_type: Option<String>,
}

impl TicketInfo {
    /// "Ticket available, details unknown."
    pub fn synthetic() -> Self {
        Self {
            ticket_type: Some(SYNTHETIC_TICKET_TYPE.to_string()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.section.is_none() && self.price.is_none() && self.row.is_none() && self.ticket_type.is_none()
    }

    pub fn set(&mut self, field: TicketField, value: String) {
        let slot = match field {
            TicketField::Section => &mut self.section,
            TicketField::Price => &mut self.price,
            TicketField::Row => &mut self.row,
            TicketField::Type => &mut self.ticket_type,
        };
        *slot = Some(value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketField {
    Section,
    Price,
    Row,
    Type,
}

impl std::fmt::Display for TicketField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TicketField::Section => "section",
            TicketField::Price => "price",
            TicketField::Row => "row",
            TicketField::Type => "type",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Poll outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResult {
    pub found: bool,
    pub count: usize,
    pub tickets: Vec<TicketInfo>,
    pub captcha_detected: bool,
}

impl PollResult {
    pub fn none(captcha_detected: bool) -> Self {
        Self {
            found: false,
            count: 0,
            tickets: Vec::new(),
            captcha_detected,
        }
    }

    pub fn from_tickets(tickets: Vec<TicketInfo>, captcha_detected: bool) -> Self {
        Self {
            found: !tickets.is_empty(),
            count: tickets.len(),
            tickets,
            captcha_detected,
        }
    }
}

/// Everything one orchestrated cycle produced.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub result: PollResult,
    /// Raw diagnostic of a failure caught at the orchestrator boundary.
    pub error: Option<String>,
    /// Best-effort steps that did not succeed (storage clearing, close, ...).
    pub warnings: Vec<String>,
}

/// Outcome of one retry-loop invocation; one of these becomes one CSV row.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub attempts: u32,
    pub success: bool,
    pub tickets_found: usize,
    pub captcha_detected: bool,
    pub error: Option<String>,
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// Run log record
// ---------------------------------------------------------------------------

/// Column order is the CSV header order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: String,
    pub success: bool,
    pub tickets_found: usize,
    pub error_message: String,
    pub run_duration: u64,
    pub captcha_detected: bool,
}
