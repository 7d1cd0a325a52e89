use std::cell::RefCell;

use crate::domain::markup::{self, DocumentModel};

/// Marker carried on the body of every document produced by the editor. It
/// drives the runtime scripts outside the editor, so it is stripped while
/// editing and restored in the persisted snapshot.
pub const RUNTIME_CLASS: &str = "sitepad-runtime";

/// Marker stamped on exported copies. A document carrying it is not a
/// project file and can not be re-opened for editing.
pub const PUBLISHED_CLASS: &str = "sitepad-published";

/// Body class toggled while the document is editable in place.
pub const EDITABLE_CLASS: &str = "sitepad-editable";

/// Classes the editor paints on elements while interacting; never persisted.
pub const INTERNAL_CLASSES: &[&str] =
    &["sitepad-selected", "sitepad-hovered", "sitepad-dragging"];

/// Selection target standing for the document root.
pub const ROOT_SELECTION: &str = "body";

/// Editability and selection state of the live document body.
pub struct BodyModel {
    selection: RefCell<Vec<String>>,
}

impl BodyModel {
    pub fn new() -> Self {
        Self {
            selection: RefCell::new(vec![ROOT_SELECTION.to_string()]),
        }
    }

    pub fn set_editable(&self, doc: &mut DocumentModel, editable: bool) {
        if editable {
            doc.add_body_class(EDITABLE_CLASS);
        } else {
            doc.remove_body_class(EDITABLE_CLASS);
        }
    }

    /// Strip editability markers from a detached copy before it is persisted.
    pub fn remove_editable_classes(&self, doc: &mut DocumentModel) {
        doc.remove_body_class(EDITABLE_CLASS);
        let body = markup::remove_class_everywhere(doc.body(), EDITABLE_CLASS);
        doc.set_body(body);
    }

    pub fn remove_internal_classes(&self, doc: &mut DocumentModel) {
        for class in INTERNAL_CLASSES {
            doc.remove_body_class(class);
            let body = markup::remove_class_everywhere(doc.body(), class);
            doc.set_body(body);
        }
    }

    pub fn set_selection(&self, targets: Vec<String>) {
        *self.selection.borrow_mut() = targets;
    }

    pub fn select_root(&self) {
        self.set_selection(vec![ROOT_SELECTION.to_string()]);
    }

    pub fn selection(&self) -> Vec<String> {
        self.selection.borrow().clone()
    }
}

impl Default for BodyModel {
    fn default() -> Self {
        Self::new()
    }
}
