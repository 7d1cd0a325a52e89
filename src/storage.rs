use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::domain::file_info::FileInfo;
use crate::error::FileError;
use crate::scheduler::TaskQueue;

pub type DoneCallback = Box<dyn FnOnce()>;
pub type MarkupCallback = Box<dyn FnOnce(String)>;
pub type ErrorCallback = Box<dyn FnOnce(FileError)>;

/// Document storage collaborator.
///
/// All results are delivered through the task queue, never inline: nothing
/// blocks the interaction thread, and callers see uniform callback timing
/// whatever the backend. Errors are forwarded verbatim, never retried.
pub trait Storage {
    fn read(&self, info: &FileInfo, on_success: MarkupCallback, on_error: ErrorCallback);
    fn write(&self, info: &FileInfo, markup: &str, on_success: DoneCallback, on_error: ErrorCallback);
    /// Read a document bundled with the editor itself (templates, examples).
    fn load_local(&self, url: &str, on_success: MarkupCallback, on_error: ErrorCallback);
}

/// Filesystem backend.
pub struct DiskStorage {
    queue: Rc<TaskQueue>,
}

impl DiskStorage {
    pub fn new(queue: Rc<TaskQueue>) -> Self {
        Self { queue }
    }
}

impl Storage for DiskStorage {
    fn read(&self, info: &FileInfo, on_success: MarkupCallback, on_error: ErrorCallback) {
        let path = info.path.clone();
        self.queue.defer(move || match fs::read_to_string(&path) {
            Ok(markup) => on_success(markup),
            Err(e) => on_error(FileError::Io(e)),
        });
    }

    fn write(&self, info: &FileInfo, markup: &str, on_success: DoneCallback, on_error: ErrorCallback) {
        let path = info.path.clone();
        let markup = markup.to_string();
        self.queue.defer(move || {
            let dirs_ok = match Path::new(&path).parent() {
                Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
                _ => Ok(()),
            };
            match dirs_ok.and_then(|_| fs::write(&path, &markup)) {
                Ok(()) => on_success(),
                Err(e) => on_error(FileError::Io(e)),
            }
        });
    }

    fn load_local(&self, url: &str, on_success: MarkupCallback, on_error: ErrorCallback) {
        let path = url.to_string();
        self.queue.defer(move || match fs::read_to_string(&path) {
            Ok(markup) => on_success(markup),
            Err(e) => on_error(FileError::Io(e)),
        });
    }
}

/// In-memory backend for tests and demos.
pub struct MemoryStorage {
    files: Rc<RefCell<HashMap<String, String>>>,
    queue: Rc<TaskQueue>,
}

impl MemoryStorage {
    pub fn new(queue: Rc<TaskQueue>) -> Self {
        Self {
            files: Rc::new(RefCell::new(HashMap::new())),
            queue,
        }
    }

    pub fn insert(&self, path: impl Into<String>, markup: impl Into<String>) {
        self.files.borrow_mut().insert(path.into(), markup.into());
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, info: &FileInfo, on_success: MarkupCallback, on_error: ErrorCallback) {
        self.load_local(&info.path, on_success, on_error);
    }

    fn write(&self, info: &FileInfo, markup: &str, on_success: DoneCallback, _on_error: ErrorCallback) {
        let files = Rc::clone(&self.files);
        let path = info.path.clone();
        let markup = markup.to_string();
        self.queue.defer(move || {
            files.borrow_mut().insert(path, markup);
            on_success();
        });
    }

    fn load_local(&self, url: &str, on_success: MarkupCallback, on_error: ErrorCallback) {
        let files = Rc::clone(&self.files);
        let url = url.to_string();
        self.queue.defer(move || {
            let found = files.borrow().get(&url).cloned();
            match found {
                Some(markup) => on_success(markup),
                None => on_error(FileError::Storage(format!("no such file: {}", url))),
            }
        });
    }
}

/// Client-local persistent key-value storage. The recent-files registry is
/// handed one of these instead of reaching into a global location itself.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// One file per key under the per-installation data directory.
pub struct DiskKeyValueStore {
    dir: PathBuf,
}

impl DiskKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default store location: data_dir/sitepad/storage/
    pub fn default_location() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("sitepad");
        path.push("storage");
        path
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl KeyValueStore for DiskKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.key_path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(e) = fs::create_dir_all(&self.dir)
            .and_then(|_| fs::write(self.key_path(key), value))
        {
            eprintln!("Failed to persist {}: {}", key, e);
        }
    }

    fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.key_path(key));
    }
}

/// In-memory key-value store for tests.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RefCell<HashMap<String, String>>,
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_memory_storage_read_write() {
        let queue = Rc::new(TaskQueue::new());
        let storage = MemoryStorage::new(queue.clone());
        let info = FileInfo::new("/site.html", "site.html");

        let written = Rc::new(Cell::new(false));
        let written2 = written.clone();
        storage.write(
            &info,
            "<html></html>",
            Box::new(move || written2.set(true)),
            Box::new(|e| panic!("unexpected error: {}", e)),
        );
        assert!(!written.get());
        queue.run_until_idle();
        assert!(written.get());

        let read = Rc::new(RefCell::new(String::new()));
        let read2 = read.clone();
        storage.read(
            &info,
            Box::new(move |markup| *read2.borrow_mut() = markup),
            Box::new(|e| panic!("unexpected error: {}", e)),
        );
        queue.run_until_idle();
        assert_eq!(*read.borrow(), "<html></html>");
    }

    #[test]
    fn test_memory_storage_missing_file_propagates_error() {
        let queue = Rc::new(TaskQueue::new());
        let storage = MemoryStorage::new(queue.clone());
        let failed = Rc::new(Cell::new(false));
        let failed2 = failed.clone();
        storage.read(
            &FileInfo::new("/missing.html", "missing.html"),
            Box::new(|_| panic!("unexpected success")),
            Box::new(move |e| {
                assert!(e.is_io());
                failed2.set(true);
            }),
        );
        queue.run_until_idle();
        assert!(failed.get());
    }

    #[test]
    fn test_disk_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.html");
        let queue = Rc::new(TaskQueue::new());
        let storage = DiskStorage::new(queue.clone());
        let info = FileInfo::new(path.to_str().unwrap(), "site.html");

        storage.write(
            &info,
            "<html>disk</html>",
            Box::new(|| {}),
            Box::new(|e| panic!("unexpected error: {}", e)),
        );
        queue.run_until_idle();

        let read = Rc::new(RefCell::new(String::new()));
        let read2 = read.clone();
        storage.read(
            &info,
            Box::new(move |markup| *read2.borrow_mut() = markup),
            Box::new(|e| panic!("unexpected error: {}", e)),
        );
        queue.run_until_idle();
        assert_eq!(*read.borrow(), "<html>disk</html>");
    }

    #[test]
    fn test_disk_storage_read_error() {
        let queue = Rc::new(TaskQueue::new());
        let storage = DiskStorage::new(queue.clone());
        let failed = Rc::new(Cell::new(false));
        let failed2 = failed.clone();
        storage.read(
            &FileInfo::new("/definitely/not/here.html", "here.html"),
            Box::new(|_| panic!("unexpected success")),
            Box::new(move |e| {
                assert!(matches!(e, FileError::Io(_)));
                failed2.set(true);
            }),
        );
        queue.run_until_idle();
        assert!(failed.get());
    }

    #[test]
    fn test_disk_key_value_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskKeyValueStore::new(dir.path());
        assert_eq!(store.get("sitepad:recent-files"), None);
        store.set("sitepad:recent-files", "[1, 2]");
        assert_eq!(store.get("sitepad:recent-files").as_deref(), Some("[1, 2]"));
        store.remove("sitepad:recent-files");
        assert_eq!(store.get("sitepad:recent-files"), None);
    }

    #[test]
    fn test_memory_key_value_store() {
        let store = MemoryKeyValueStore::default();
        store.set("k", "v");
        assert_eq!(store.get("k").as_deref(), Some("v"));
        store.remove("k");
        assert_eq!(store.get("k"), None);
    }
}
