use std::cell::RefCell;
use std::rc::Rc;

use regex_lite::Regex;

use crate::domain::markup::{self, DocumentModel};
use crate::error::FileError;
use crate::model::page::PAGE_STYLE_CLASS;
use crate::scheduler::TaskQueue;
use crate::storage::{DoneCallback, ErrorCallback};

/// Class on every tag injected for the duration of an editing session; all
/// of them are dropped before a snapshot is persisted.
pub const TEMP_TAG_CLASS: &str = "sitepad-temp-tag";

/// Head tag holding the document-wide style the author edits as text.
pub const HEAD_STYLE_CLASS: &str = "sitepad-head-style";

/// Head tag holding the document-wide script the author edits as text.
pub const HEAD_SCRIPT_CLASS: &str = "sitepad-head-script";

/// Meta name recording where the document publishes to.
pub const PUBLICATION_PATH_META: &str = "sitepad-publication-path";

pub const USER_HEAD_START: &str = "<!-- sitepad-user-head-start -->";
pub const USER_HEAD_END: &str = "<!-- sitepad-user-head-end -->";

/// Head content management: the author's own head tags, the editor's
/// temporary tags, and head-level metadata.
pub struct HeadModel {
    user_head: RefCell<String>,
    queue: Rc<TaskQueue>,
}

impl HeadModel {
    pub fn new(queue: Rc<TaskQueue>) -> Self {
        Self {
            user_head: RefCell::new(String::new()),
            queue,
        }
    }

    /// Pull the author's own head content out of the raw markup before the
    /// renderer parses it. Author tags can be malformed; parsed in place
    /// they could push tags into the body or break document structure. The
    /// content is held aside until `insert_user_head` puts it back.
    pub fn extract_user_head(&self, raw: &str) -> String {
        if let (Some(start), Some(end)) = (raw.find(USER_HEAD_START), raw.find(USER_HEAD_END)) {
            if start < end {
                let inner = raw[start + USER_HEAD_START.len()..end].to_string();
                *self.user_head.borrow_mut() = inner;
                let mut out = String::with_capacity(raw.len());
                out.push_str(&raw[..start]);
                out.push_str(&raw[end + USER_HEAD_END.len()..]);
                return out;
            }
        }
        self.user_head.borrow_mut().clear();
        raw.to_string()
    }

    /// Put the author's head content back, just before `</head>`.
    pub fn insert_user_head(&self, html: &str) -> String {
        let insert = format!(
            "{}{}{}",
            USER_HEAD_START,
            self.user_head.borrow(),
            USER_HEAD_END
        );
        match html.find("</head>") {
            Some(pos) => format!("{}{}{}", &html[..pos], insert, &html[pos..]),
            None => html.to_string(),
        }
    }

    pub fn user_head(&self) -> String {
        self.user_head.borrow().clone()
    }

    pub fn get_head_style(&self, doc: &DocumentModel) -> String {
        markup::tag_content(doc.head(), "style", HEAD_STYLE_CLASS).unwrap_or_default()
    }

    pub fn set_head_style(&self, doc: &mut DocumentModel, css: &str) {
        match markup::set_tag_content(doc.head(), "style", HEAD_STYLE_CLASS, css) {
            Some(head) => doc.set_head(head),
            None if !css.is_empty() => doc.append_to_head(&format!(
                "<style class=\"{}\">{}</style>",
                HEAD_STYLE_CLASS, css
            )),
            None => {}
        }
    }

    pub fn get_head_script(&self, doc: &DocumentModel) -> String {
        markup::tag_content(doc.head(), "script", HEAD_SCRIPT_CLASS).unwrap_or_default()
    }

    pub fn set_head_script(&self, doc: &mut DocumentModel, js: &str) {
        match markup::set_tag_content(doc.head(), "script", HEAD_SCRIPT_CLASS, js) {
            Some(head) => doc.set_head(head),
            None if !js.is_empty() => doc.append_to_head(&format!(
                "<script class=\"{}\">{}</script>",
                HEAD_SCRIPT_CLASS, js
            )),
            None => {}
        }
    }

    /// Inject edition-only tags into the head. Completion is reported
    /// through the queue, matching how the surface fetches referenced
    /// assets; only one of the two callbacks ever fires.
    pub fn add_temp_tags(
        &self,
        doc: &mut DocumentModel,
        urls: &[String],
        base_url: &str,
        on_success: DoneCallback,
        on_error: ErrorCallback,
    ) {
        if let Some(bad) = urls.iter().find(|u| u.trim().is_empty()) {
            let bad = bad.clone();
            self.queue.defer(move || {
                on_error(FileError::EditionResources(format!(
                    "unusable resource url: {:?}",
                    bad
                )))
            });
            return;
        }
        for url in urls {
            let href = absolute_url(base_url, url);
            doc.append_to_head(&format!(
                "<link rel=\"stylesheet\" class=\"{}\" href=\"{}\">",
                TEMP_TAG_CLASS, href
            ));
        }
        self.queue.defer(move || on_success());
    }

    /// Drop every temporary tag, the load-time base marker included.
    pub fn remove_temp_tags(&self, doc: &mut DocumentModel) {
        let head = markup::remove_tags_with_class(doc.head(), TEMP_TAG_CLASS);
        doc.set_head(head);
    }

    /// Drop the page visibility tag; it only means something in the surface.
    pub fn remove_page_style_tag(&self, doc: &mut DocumentModel) {
        let head = markup::remove_tags_with_class(doc.head(), PAGE_STYLE_CLASS);
        doc.set_head(head);
    }

    pub fn set_publication_path(&self, doc: &mut DocumentModel, path: Option<&str>) {
        let re = Regex::new(&format!(
            r#"<meta\b[^>]*name="{}"[^>]*>"#,
            PUBLICATION_PATH_META
        ))
        .unwrap();
        let head = re.replace_all(doc.head(), "").into_owned();
        doc.set_head(head);
        if let Some(path) = path {
            doc.append_to_head(&format!(
                "<meta name=\"{}\" content=\"{}\">",
                PUBLICATION_PATH_META, path
            ));
        }
    }

    pub fn publication_path(&self, doc: &DocumentModel) -> Option<String> {
        let re = Regex::new(&format!(
            r#"<meta\b[^>]*name="{}"[^>]*content="([^"]*)""#,
            PUBLICATION_PATH_META
        ))
        .unwrap();
        re.captures(doc.head()).map(|c| c[1].to_string())
    }
}

fn absolute_url(base: &str, url: &str) -> String {
    if url.starts_with("//") || url.contains("://") || url.starts_with('/') {
        url.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), url)
    }
}
