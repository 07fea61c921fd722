use crate::browser::Probe;
use crate::detector::js_literal;
use crate::detector::visibility::{is_visible, ElementBox};
use crate::error::Result;

pub const PROBE_NAME: &str = "captcha";

/// Widget markers, each matched with querySelector (first hit only).
pub const MARKER_SELECTORS: &[&str] = &[
    ".g-recaptcha",
    r#"iframe[src*="recaptcha/api2"]"#,
    r#".recaptcha-checkbox[role="checkbox"]"#,
    ".recaptcha-challenge:not(.recaptcha-challenge-expired)",
];

/// Elements whose text is searched for challenge phrases.
pub const TEXT_TAGS: &str = "div, p, h1, h2, h3, h4, h5, span";

/// Lowercase; matched against lowercased text content.
pub const CHALLENGE_PHRASES: &[&str] = &["please complete the security check", "confirm you're not a robot"];

const SCRIPT: &str = r#"(() => {
    const selectors = __SELECTORS__;
    const phrases = __PHRASES__;
    const describe = (el) => {
        const cs = window.getComputedStyle(el);
        return {
            tag: el.tagName,
            offsetWidth: el.offsetWidth,
            offsetHeight: el.offsetHeight,
            hasOffsetParent: el.offsetParent !== null,
            display: cs.display,
            visibility: cs.visibility,
            opacity: cs.opacity,
        };
    };
    const found = [];
    for (const sel of selectors) {
        const el = document.querySelector(sel);
        if (el) found.push(describe(el));
    }
    for (const el of document.querySelectorAll(__TAGS__)) {
        const text = (el.textContent || '').toLowerCase();
        if (phrases.some(p => text.includes(p))) found.push(describe(el));
    }
    return found;
})()"#;

/// Collects layout facts for every challenge candidate; the verdict is made in Rust.
pub fn probe() -> Probe {
    let source = SCRIPT
        .replace("__SELECTORS__", &js_literal(MARKER_SELECTORS.to_vec()))
        .replace("__PHRASES__", &js_literal(CHALLENGE_PHRASES.to_vec()))
        .replace("__TAGS__", &js_literal(TEXT_TAGS));
    Probe::new(PROBE_NAME, source)
}

pub fn parse(value: serde_json::Value) -> Result<Vec<ElementBox>> {
    Ok(serde_json::from_value(value)?)
}

pub fn any_visible(candidates: &[ElementBox]) -> bool {
    candidates.iter().any(is_visible)
}
