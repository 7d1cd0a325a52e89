use std::cell::RefCell;

use regex_lite::Regex;

use crate::domain::markup::{self, DocumentModel};

/// Head tag controlling which page of the document is visible.
pub const PAGE_STYLE_CLASS: &str = "sitepad-current-page-style";

/// Attribute carried by page anchors in the body.
pub const PAGE_NAME_ATTR: &str = "data-page-name";

/// Tracks the page currently shown in the surface.
pub struct PageModel {
    current: RefCell<Option<String>>,
}

impl PageModel {
    pub fn new() -> Self {
        Self {
            current: RefCell::new(None),
        }
    }

    /// Current page, falling back to the first page anchor in the document.
    pub fn get_current(&self, doc: &DocumentModel) -> Option<String> {
        if let Some(name) = self.current.borrow().clone() {
            return Some(name);
        }
        let re = Regex::new(&format!(r#"{}="([^"]+)""#, PAGE_NAME_ATTR)).unwrap();
        re.captures(doc.body()).map(|c| c[1].to_string())
    }

    /// Forget the tracked page; the next lookup re-derives it from the
    /// document. Called when a new document takes over the surface.
    pub fn reset(&self) {
        *self.current.borrow_mut() = None;
    }

    /// Show exactly one page by rewriting the page visibility style tag.
    pub fn set_current(&self, doc: &mut DocumentModel, name: Option<&str>) {
        *self.current.borrow_mut() = name.map(str::to_string);
        let head = markup::remove_tags_with_class(doc.head(), PAGE_STYLE_CLASS);
        doc.set_head(head);
        if let Some(name) = name {
            doc.append_to_head(&format!(
                "<style class=\"{}\">.sitepad-paged {{ display: none; }} .sitepad-paged.{} {{ display: block; }}</style>",
                PAGE_STYLE_CLASS, name
            ));
        }
    }
}

impl Default for PageModel {
    fn default() -> Self {
        Self::new()
    }
}
