use regex_lite::{Captures, Regex};

/// A parsed document: head content, body content and the body element's own
/// attributes, held separately so the pipelines can work on them without
/// re-scanning the whole markup.
///
/// `Clone` is the deep copy the serialization pipeline detaches before it
/// starts rewriting anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentModel {
    head: String,
    body: String,
    body_classes: Vec<String>,
    body_style: Vec<(String, String)>,
    body_attrs: Vec<(String, String)>,
}

impl DocumentModel {
    /// Tolerant parse of raw markup. A missing head becomes empty; with no
    /// body element, everything outside the head counts as body content.
    pub fn parse(raw: &str) -> Self {
        let head_re = Regex::new(r"(?s)<head[^>]*>(.*?)</head>").unwrap();
        let head = head_re
            .captures(raw)
            .map(|c| c[1].to_string())
            .unwrap_or_default();

        let body_re = Regex::new(r"(?s)<body([^>]*)>(.*)</body>").unwrap();
        let (attrs_raw, body) = match body_re.captures(raw) {
            Some(c) => (c[1].to_string(), c[2].to_string()),
            None => {
                let mut rest = head_re.replace(raw, "").into_owned();
                for pattern in [r"(?i)<!doctype[^>]*>", r"</?html[^>]*>"] {
                    rest = Regex::new(pattern).unwrap().replace_all(&rest, "").into_owned();
                }
                (String::new(), rest.trim().to_string())
            }
        };

        let mut model = Self {
            head,
            body,
            ..Self::default()
        };

        let attr_re = Regex::new(r#"([A-Za-z][-A-Za-z0-9_:]*)\s*=\s*"([^"]*)""#).unwrap();
        for cap in attr_re.captures_iter(&attrs_raw) {
            let name = cap[1].to_ascii_lowercase();
            let value = cap[2].to_string();
            match name.as_str() {
                "class" => model
                    .body_classes
                    .extend(value.split_whitespace().map(str::to_string)),
                "style" => {
                    for decl in value.split(';') {
                        if let Some((k, v)) = decl.split_once(':') {
                            let (k, v) = (k.trim(), v.trim());
                            if !k.is_empty() && !v.is_empty() {
                                model.body_style.push((k.to_string(), v.to_string()));
                            }
                        }
                    }
                }
                _ => model.body_attrs.push((name, value)),
            }
        }
        model
    }

    /// Markup of the document element: head and body, without the outer
    /// `<html>` wrapper or doctype.
    pub fn document_markup(&self) -> String {
        format!("<head>{}</head>{}", self.head, self.body_markup())
    }

    fn body_markup(&self) -> String {
        let mut tag = String::from("<body");
        if !self.body_classes.is_empty() {
            tag.push_str(&format!(" class=\"{}\"", self.body_classes.join(" ")));
        }
        if !self.body_style.is_empty() {
            let style = self
                .body_style
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect::<Vec<_>>()
                .join("; ");
            tag.push_str(&format!(" style=\"{}\"", style));
        }
        for (k, v) in &self.body_attrs {
            tag.push_str(&format!(" {}=\"{}\"", k, v));
        }
        format!("{}>{}</body>", tag, self.body)
    }

    pub fn head(&self) -> &str {
        &self.head
    }

    pub fn set_head(&mut self, head: impl Into<String>) {
        self.head = head.into();
    }

    pub fn append_to_head(&mut self, fragment: &str) {
        self.head.push_str(fragment);
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    pub fn body_is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }

    pub fn body_classes(&self) -> &[String] {
        &self.body_classes
    }

    pub fn has_body_class(&self, class: &str) -> bool {
        self.body_classes.iter().any(|c| c == class)
    }

    pub fn add_body_class(&mut self, class: &str) {
        if !self.has_body_class(class) {
            self.body_classes.push(class.to_string());
        }
    }

    pub fn remove_body_class(&mut self, class: &str) {
        self.body_classes.retain(|c| c != class);
    }

    pub fn set_body_style(&mut self, name: &str, value: &str) {
        if let Some(slot) = self.body_style.iter_mut().find(|(k, _)| k == name) {
            slot.1 = value.to_string();
        } else {
            self.body_style.push((name.to_string(), value.to_string()));
        }
    }

    pub fn body_style(&self, name: &str) -> Option<&str> {
        self.body_style
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn clear_body_style(&mut self, name: &str) {
        self.body_style.retain(|(k, _)| k != name);
    }
}

/// Remove a class token wherever it appears in `markup`. Class attributes
/// left empty are dropped entirely.
pub fn remove_class_everywhere(markup: &str, class: &str) -> String {
    let re = Regex::new(r#" class="([^"]*)""#).unwrap();
    re.replace_all(markup, |caps: &Captures| {
        let kept: Vec<&str> = caps[1].split_whitespace().filter(|c| *c != class).collect();
        if kept.is_empty() {
            String::new()
        } else {
            format!(" class=\"{}\"", kept.join(" "))
        }
    })
    .into_owned()
}

/// Drop every head-level element whose class list contains `class`. Handles
/// void tags (`<link>`, `<base>`, `<meta>`) and paired `<style>`/`<script>`
/// elements.
pub fn remove_tags_with_class(markup: &str, class: &str) -> String {
    let void = Regex::new(&format!(
        r#"<(?:link|base|meta)\b[^>]*class="[^"]*\b{}\b[^"]*"[^>]*/?>"#,
        class
    ))
    .unwrap();
    let paired = Regex::new(&format!(
        r#"(?s)<(?:style|script)\b[^>]*class="[^"]*\b{}\b[^"]*"[^>]*>.*?</(?:style|script)>"#,
        class
    ))
    .unwrap();
    let out = void.replace_all(markup, "");
    paired.replace_all(&out, "").into_owned()
}

/// Inner content of the first `<{tag}>` element carrying `class`.
pub fn tag_content(markup: &str, tag: &str, class: &str) -> Option<String> {
    tag_re(tag, class).captures(markup).map(|c| c[2].to_string())
}

/// Replace the inner content of the first `<{tag}>` element carrying
/// `class`. Returns `None` when no such element exists.
pub fn set_tag_content(markup: &str, tag: &str, class: &str, content: &str) -> Option<String> {
    let re = tag_re(tag, class);
    if !re.is_match(markup) {
        return None;
    }
    let content = content.to_string();
    Some(
        re.replace(markup, |caps: &Captures| {
            format!("{}{}{}", &caps[1], content, &caps[3])
        })
        .into_owned(),
    )
}

fn tag_re(tag: &str, class: &str) -> Regex {
    Regex::new(&format!(
        r#"(?s)(<{tag}\b[^>]*class="[^"]*\b{class}\b[^"]*"[^>]*>)(.*?)(</{tag}>)"#
    ))
    .unwrap()
}

/// Strip structural artifacts some renderers leave behind in inline content
/// (gecko marks every break and edited span it synthesizes).
pub fn repair_inline_artifacts(markup: &str) -> String {
    markup
        .replace(" type=\"_moz\"", "")
        .replace(" _moz_dirty=\"\"", "")
}
