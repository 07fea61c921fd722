use std::collections::HashMap;

use serde_json::{json, Value};

use crate::browser::Probe;
use crate::detector::js_literal;
use crate::error::Result;
use crate::types::{TicketField, TicketInfo};

pub const PROBE_NAME: &str = "extract";

/// Listing enumeration strategies in priority order. The first one that
/// matches anything on the page is used for every listing on that page.
pub const CONTAINER_STRATEGIES: &[&str] = &[
    r#"[data-testid="quickpicksList"] > div"#,
    ".ticket-list > div",
    r#"[data-tid="ticket-tile"]"#,
    ".event-tickets > div",
    ".ticket-card",
];

/// Per-field selector fallbacks, tried in order inside each listing.
pub const FIELD_CASCADE: &[(TicketField, &[&str])] = &[
    (
        TicketField::Section,
        &[r#"[data-testid="section-name"]"#, r#"[data-tid="section-name"]"#, ".section", ".section-name"],
    ),
    (
        TicketField::Price,
        &[r#"[data-testid="price"]"#, r#"[data-tid="price"]"#, ".ticket-price", ".price"],
    ),
    (
        TicketField::Row,
        &[r#"[data-testid="row-name"]"#, r#"[data-tid="row-name"]"#, ".row", ".row-name"],
    ),
    (
        TicketField::Type,
        &[r#"[data-testid="verified-resale"]"#, r#"[data-tid="verified-resale"]"#, ".ticket-type", ".type"],
    ),
];

/// For every strategy, every matched element, every field: the text of each
/// fallback selector's first match (or null). No decisions are made here.
const SCRIPT: &str = r#"(() => {
    const strategies = __STRATEGIES__;
    const fields = __FIELDS__;
    return strategies.map(strategy =>
        Array.from(document.querySelectorAll(strategy)).map(el => {
            const listing = {};
            for (const [field, selectors] of fields) {
                listing[field] = selectors.map(sel => {
                    const hit = el.querySelector(sel);
                    return hit ? hit.textContent : null;
                });
            }
            return listing;
        })
    );
})()"#;

/// One matched element: field name → candidate text per fallback selector.
pub type RawListing = HashMap<String, Vec<Option<String>>>;

/// `[[field, [selector, ..]], ..]` in cascade order.
fn field_plan() -> Value {
    FIELD_CASCADE
        .iter()
        .map(|(field, selectors)| json!([field.to_string(), selectors]))
        .collect()
}

pub fn probe() -> Probe {
    let fields = field_plan();
    let source = SCRIPT
        .replace("__STRATEGIES__", &js_literal(CONTAINER_STRATEGIES.to_vec()))
        .replace("__FIELDS__", &js_literal(fields));
    Probe::new(PROBE_NAME, source)
}

/// Outer index follows `CONTAINER_STRATEGIES`.
pub fn parse(value: Value) -> Result<Vec<Vec<RawListing>>> {
    Ok(serde_json::from_value(value)?)
}

/// Index of the strategy that wins for this page, if any matched.
pub fn winning_strategy(per_strategy: &[Vec<RawListing>]) -> Option<usize> {
    per_strategy.iter().position(|matches| !matches.is_empty())
}

/// Apply first-match-wins strategy selection and per-field cascades.
/// Listings with no resolvable field are dropped.
pub fn listings_from(per_strategy: Vec<Vec<RawListing>>) -> Vec<TicketInfo> {
    let Some(idx) = winning_strategy(&per_strategy) else {
        return Vec::new();
    };
    per_strategy
        .into_iter()
        .nth(idx)
        .unwrap_or_default()
        .iter()
        .map(resolve_listing)
        .filter(|t| !t.is_empty())
        .collect()
}

fn resolve_listing(raw: &RawListing) -> TicketInfo {
    let mut ticket = TicketInfo::default();
    for (field, _) in FIELD_CASCADE {
        let resolved = raw
            .get(&field.to_string())
            .into_iter()
            .flatten()
            .flatten()
            .map(|text| text.trim())
            .find(|text| !text.is_empty());
        if let Some(text) = resolved {
            ticket.set(*field, text.to_string());
        }
    }
    ticket
}

/// Tickets were detected, so an empty parse must not read as "no tickets".
pub fn with_fallback(tickets: Vec<TicketInfo>) -> Vec<TicketInfo> {
    if tickets.is_empty() {
        vec![TicketInfo::synthetic()]
    } else {
        tickets
    }
}
