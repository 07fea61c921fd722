use serde::Deserialize;

use crate::browser::Probe;
use crate::detector::js_literal;
use crate::error::Result;

pub const PROBE_NAME: &str = "availability";

/// Any of these on the page means tickets are listed.
pub const CONTAINER_SELECTORS: &[&str] = &[
    r#"[data-testid="quickpicksList"]"#,
    ".ticket-list",
    r#"[data-tid="ticket-tile"]"#,
    ".event-tickets",
    ".ticket-card",
    r#"[data-tid="verified-resale"]"#,
];

pub const NO_RESULTS_TEXT: &str = "Sorry, we couldn't find any results";

const SCRIPT: &str = r#"(() => {
    const selectors = __SELECTORS__;
    let containerCount = 0;
    for (const sel of selectors) {
        containerCount += document.querySelectorAll(sel).length;
    }
    const body = (document.body && document.body.textContent) || '';
    return { containerCount, noResultsText: body.includes(__NO_RESULTS__) };
})()"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySnapshot {
    pub container_count: usize,
    pub no_results_text: bool,
}

impl AvailabilitySnapshot {
    /// Containers are authoritative; the "no results" text only matters
    /// when none exist, and its absence defaults to available.
    pub fn is_available(&self) -> bool {
        self.container_count > 0 || !self.no_results_text
    }
}

pub fn probe() -> Probe {
    let source = SCRIPT
        .replace("__SELECTORS__", &js_literal(CONTAINER_SELECTORS.to_vec()))
        .replace("__NO_RESULTS__", &js_literal(NO_RESULTS_TEXT));
    Probe::new(PROBE_NAME, source)
}

pub fn parse(value: serde_json::Value) -> Result<AvailabilitySnapshot> {
    Ok(serde_json::from_value(value)?)
}
