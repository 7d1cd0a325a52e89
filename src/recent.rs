use std::rc::Rc;

use crate::domain::file_info::FileInfo;
use crate::storage::KeyValueStore;

/// Upper bound on the recent-files list.
pub const MAX_RECENT_FILES: usize = 5;

/// Storage key for the persisted list. One key per installation, shared by
/// every document.
pub const RECENT_FILES_KEY: &str = "sitepad:recent-files";

/// Bounded most-recent-first list of previously opened documents, persisted
/// as one JSON array in the injected key-value store.
#[derive(Clone)]
pub struct RecentFiles {
    store: Rc<dyn KeyValueStore>,
}

impl RecentFiles {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persisted entries, most recent first. Records written before display
    /// names existed are unusable and filtered out; an unreadable payload
    /// degrades to an empty list.
    pub fn list(&self) -> Vec<FileInfo> {
        let Some(raw) = self.store.get(RECENT_FILES_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<FileInfo>>(&raw) {
            Ok(entries) => entries.into_iter().filter(|e| e.name.is_some()).collect(),
            Err(e) => {
                eprintln!("Failed to parse recent files: {}. Ignoring.", e);
                Vec::new()
            }
        }
    }

    /// Move-to-front upsert by location, truncated to the bound.
    pub fn remember(&self, info: &FileInfo) {
        let mut entries = self.list();
        entries.retain(|e| e.path != info.path);
        entries.insert(0, info.clone());
        entries.truncate(MAX_RECENT_FILES);
        match serde_json::to_string(&entries) {
            Ok(json) => self.store.set(RECENT_FILES_KEY, &json),
            Err(e) => eprintln!("Failed to persist recent files: {}", e),
        }
    }

    pub fn clear(&self) {
        self.store.remove(RECENT_FILES_KEY);
    }
}
