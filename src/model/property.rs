use std::cell::RefCell;

use crate::domain::markup::{self, DocumentModel};

/// Head tag holding the styles authored in the editor.
pub const STYLE_CARRIER_CLASS: &str = "sitepad-inline-styles";

/// Element style store.
///
/// Styles authored in the editor live in memory while editing and are
/// persisted inside a dedicated `<style>` carrier tag in the document head.
pub struct PropertyModel {
    styles: RefCell<String>,
}

impl PropertyModel {
    pub fn new() -> Self {
        Self {
            styles: RefCell::new(String::new()),
        }
    }

    /// Make sure the carrier tag exists.
    pub fn init_styles(&self, doc: &mut DocumentModel) {
        if markup::tag_content(doc.head(), "style", STYLE_CARRIER_CLASS).is_none() {
            doc.append_to_head(&format!(
                "<style class=\"{}\"></style>",
                STYLE_CARRIER_CLASS
            ));
        }
    }

    /// Carrier tag -> store.
    pub fn load_properties(&self, doc: &DocumentModel) {
        *self.styles.borrow_mut() =
            markup::tag_content(doc.head(), "style", STYLE_CARRIER_CLASS).unwrap_or_default();
    }

    /// Store -> the live document's carrier tag.
    pub fn save_properties(&self, doc: &mut DocumentModel) {
        let css = self.styles.borrow().clone();
        self.write_styles(doc, &css);
    }

    pub fn get_all_styles(&self) -> String {
        self.styles.borrow().clone()
    }

    pub fn set_styles(&self, css: impl Into<String>) {
        *self.styles.borrow_mut() = css.into();
    }

    /// Write `css` into `doc`'s carrier tag, creating it if missing.
    pub fn write_styles(&self, doc: &mut DocumentModel, css: &str) {
        match markup::set_tag_content(doc.head(), "style", STYLE_CARRIER_CLASS, css) {
            Some(head) => doc.set_head(head),
            None => doc.append_to_head(&format!(
                "<style class=\"{}\">{}</style>",
                STYLE_CARRIER_CLASS, css
            )),
        }
    }
}

impl Default for PropertyModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_styles_creates_carrier_once() {
        let property = PropertyModel::new();
        let mut doc = DocumentModel::parse("<head><title>t</title></head><body></body>");
        property.init_styles(&mut doc);
        property.init_styles(&mut doc);
        assert_eq!(doc.head().matches(STYLE_CARRIER_CLASS).count(), 1);
    }

    #[test]
    fn test_load_and_save_round_trip() {
        let property = PropertyModel::new();
        let mut doc = DocumentModel::parse(&format!(
            "<head><style class=\"{}\">.a {{ color: red; }}</style></head><body></body>",
            STYLE_CARRIER_CLASS
        ));
        property.load_properties(&doc);
        assert_eq!(property.get_all_styles(), ".a { color: red; }");

        property.set_styles(".a { color: blue; }");
        property.save_properties(&mut doc);
        assert!(doc.head().contains(".a { color: blue; }"));
        assert!(!doc.head().contains("red"));
    }

    #[test]
    fn test_write_styles_creates_missing_carrier() {
        let property = PropertyModel::new();
        let mut doc = DocumentModel::default();
        property.write_styles(&mut doc, ".b {}");
        assert_eq!(
            markup::tag_content(doc.head(), "style", STYLE_CARRIER_CLASS).as_deref(),
            Some(".b {}")
        );
    }
}
