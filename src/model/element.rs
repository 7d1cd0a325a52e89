use regex_lite::{Captures, Regex};

/// Class marking author text containers that become editable in place.
pub const TEXT_ELEMENT_CLASS: &str = "sitepad-text";

const EDIT_ATTR: &str = " contenteditable=\"true\"";

/// Per-element markup preparation for editing.
pub struct ElementModel;

impl ElementModel {
    pub fn new() -> Self {
        Self
    }

    /// Annotate raw markup for editing: text elements become editable in
    /// place, and anchors stop navigating so clicking one selects it
    /// instead. `unprepare_for_edit` reverses both exactly.
    pub fn prepare_for_edit(&self, raw: &str) -> String {
        let text_re = Regex::new(&format!(
            r#"(<[A-Za-z][-A-Za-z0-9]*\b[^>]*class="[^"]*\b{}\b[^"]*")"#,
            TEXT_ELEMENT_CLASS
        ))
        .unwrap();
        let out = text_re.replace_all(raw, |caps: &Captures| format!("{}{}", &caps[1], EDIT_ATTR));

        let href_re = Regex::new(r#"(<a\b[^>]*?)\shref=""#).unwrap();
        href_re
            .replace_all(&out, "$1 data-sitepad-href=\"")
            .into_owned()
    }

    pub fn unprepare_for_edit(&self, html: &str) -> String {
        html.replace(EDIT_ATTR, "")
            .replace(" data-sitepad-href=\"", " href=\"")
    }
}

impl Default for ElementModel {
    fn default() -> Self {
        Self::new()
    }
}
