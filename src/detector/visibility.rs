use serde::Deserialize;

/// Smallest width/height (px, exclusive) for a challenge widget to count as shown.
pub const MIN_VISIBLE_PX: f64 = 10.0;

/// Layout facts about one DOM element, collected in the page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementBox {
    pub tag: String,
    pub offset_width: f64,
    pub offset_height: f64,
    pub has_offset_parent: bool,
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub opacity: String,
}

/// Shown = big enough, not hidden by CSS, and laid out (or the body itself).
pub fn is_visible(el: &ElementBox) -> bool {
    let has_size = el.offset_width > MIN_VISIBLE_PX && el.offset_height > MIN_VISIBLE_PX;
    let laid_out = el.has_offset_parent || el.tag.eq_ignore_ascii_case("BODY");
    let hidden_by_css = el.display == "none"
        || el.visibility == "hidden"
        || el.opacity.trim().parse::<f64>().map(|o| o <= 0.0).unwrap_or(false);

    has_size && laid_out && !hidden_by_css
}
