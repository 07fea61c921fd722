/// Ordered marker table: first entry with any marker contained in the
/// diagnostic decides the label. Timeouts must stay ahead of the generic
/// error-type names, which almost every diagnostic contains.
const MARKERS: &[(&[&str], &str)] = &[
    (&["TimeoutError"], "Browser timeout"),
    (&["Connection terminated", "pipe_handler"], "Connection error"),
    (&["Navigation failed"], "Navigation failed"),
    (&["process did exit"], "Browser crashed"),
    (&["net::ERR", "network error"], "Network error"),
    (&["captcha", "CAPTCHA"], "CAPTCHA detected"),
    (&["page.goto"], "Page navigation error"),
];

/// Generic type names, checked in this order after the specific markers.
const ERROR_TYPES: &[&str] = &["Error", "Exception", "TypeError", "SyntaxError", "ReferenceError"];

pub const FALLBACK_LABEL: &str = "Script error";

/// Reduce a raw diagnostic to a short, stable label for the run log.
/// Absent or empty input yields an empty label.
pub fn classify_error(diagnostic: Option<&str>) -> String {
    let Some(text) = diagnostic.filter(|t| !t.is_empty()) else {
        return String::new();
    };

    for (markers, label) in MARKERS {
        if markers.iter().any(|m| text.contains(m)) {
            return (*label).to_string();
        }
    }

    ERROR_TYPES
        .iter()
        .find(|t| text.contains(*t))
        .copied()
        .unwrap_or(FALLBACK_LABEL)
        .to_string()
}
