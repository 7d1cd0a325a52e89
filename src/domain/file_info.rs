use serde::{Deserialize, Serialize};

/// Where a document lives in storage.
///
/// Immutable value: sessions replace the whole thing, they never patch
/// fields. `None` at the session level means no document has been adopted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Absolute location of the document.
    pub path: String,

    /// Display name. Entries persisted by old releases may lack it.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_mime")]
    pub mime: String,

    #[serde(default)]
    pub is_dir: bool,
}

fn default_mime() -> String {
    "text/html".to_string()
}

impl FileInfo {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: Some(name.into()),
            mime: default_mime(),
            is_dir: false,
        }
    }

    /// Value for a document pulled from a transient source. It has no
    /// display name and never enters the recent-files list.
    pub fn transient(url: impl Into<String>) -> Self {
        Self {
            path: url.into(),
            name: None,
            mime: default_mime(),
            is_dir: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let info = FileInfo::new("/projects/site.html", "site.html");
        let json = serde_json::to_string(&info).unwrap();
        let loaded: FileInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(info, loaded);
    }

    #[test]
    fn test_legacy_record_without_name() {
        // Records written before display names existed.
        let json = r#"{"path": "/old/site.html"}"#;
        let info: FileInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.path, "/old/site.html");
        assert_eq!(info.name, None);
        assert_eq!(info.mime, "text/html");
        assert!(!info.is_dir);
    }

    #[test]
    fn test_transient_has_no_name() {
        let info = FileInfo::transient("https://example.com/templates/blank.html");
        assert_eq!(info.name, None);
        assert!(!info.is_dir);
    }
}
