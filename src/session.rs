use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::domain::file_info::FileInfo;
use crate::error::FileError;
use crate::load::{LoadOptions, LoadPipeline};
use crate::migration::{Migration, NoMigration};
use crate::model::Models;
use crate::notify::{ConsoleNotifier, Notifier};
use crate::recent::RecentFiles;
use crate::scheduler::TaskQueue;
use crate::serialize::Serializer;
use crate::settings::FileConfig;
use crate::stage::Stage;
use crate::storage::{DiskKeyValueStore, DiskStorage, KeyValueStore, Storage};

/// Session-scoped state shared between the orchestrator and the load
/// pipeline: the adopted save target and the template flag.
///
/// The FileInfo is `None` iff nothing has been opened or saved this
/// session, and it is always replaced wholesale.
#[derive(Default)]
pub struct SessionState {
    file_info: RefCell<Option<FileInfo>>,
    template: Cell<bool>,
}

impl SessionState {
    pub fn file_info(&self) -> Option<FileInfo> {
        self.file_info.borrow().clone()
    }

    pub fn is_template(&self) -> bool {
        self.template.get()
    }

    fn adopt(&self, info: FileInfo) {
        *self.file_info.borrow_mut() = Some(info);
    }

    fn clear(&self) {
        *self.file_info.borrow_mut() = None;
    }

    fn set_template(&self, template: bool) {
        self.template.set(template);
    }
}

/// Top-level session operations: open, save, close, and access to the
/// surface and both pipelines.
///
/// Everything runs on the interaction thread; storage answers arrive as
/// queue tasks. There is no cancellation for in-flight operations — issuing
/// a second open before the first completes is the caller's responsibility.
pub struct FileSession {
    state: Rc<SessionState>,
    stage: Rc<Stage>,
    models: Rc<Models>,
    queue: Rc<TaskQueue>,
    storage: Rc<dyn Storage>,
    recent: RecentFiles,
    loader: Rc<LoadPipeline>,
    serializer: Rc<Serializer>,
}

impl FileSession {
    pub fn new(
        storage: Rc<dyn Storage>,
        store: Rc<dyn KeyValueStore>,
        migration: Rc<dyn Migration>,
        notifier: Rc<dyn Notifier>,
        queue: Rc<TaskQueue>,
        config: FileConfig,
    ) -> Self {
        let state = Rc::new(SessionState::default());
        let stage = Rc::new(Stage::new(Rc::clone(&queue)));
        let models = Rc::new(Models::new(Rc::clone(&queue)));
        let serializer = Rc::new(Serializer::new(
            Rc::clone(&stage),
            Rc::clone(&models),
            Rc::clone(&queue),
            config.beautify_indent,
        ));
        let loader = LoadPipeline::new(
            Rc::clone(&stage),
            Rc::clone(&models),
            Rc::clone(&serializer),
            migration,
            notifier,
            Rc::clone(&queue),
            Rc::clone(&state),
            config,
        );
        Self {
            state,
            stage,
            models,
            queue,
            storage,
            recent: RecentFiles::new(store),
            loader,
            serializer,
        }
    }

    /// Session wired to the local filesystem with defaults.
    pub fn with_defaults() -> Self {
        let queue = Rc::new(TaskQueue::new());
        Self::new(
            Rc::new(DiskStorage::new(Rc::clone(&queue))),
            Rc::new(DiskKeyValueStore::new(DiskKeyValueStore::default_location())),
            Rc::new(NoMigration),
            Rc::new(ConsoleNotifier),
            queue,
            FileConfig::load(),
        )
    }

    /// Open a stored document. On success the prior session is closed, the
    /// location is adopted and recorded, and the raw markup is handed to
    /// the caller; installing it into the surface is the caller's move. A
    /// failed read adopts nothing.
    pub fn open(
        &self,
        info: FileInfo,
        on_success: impl FnOnce(String) + 'static,
        on_error: impl FnOnce(FileError) + 'static,
    ) {
        let state = Rc::clone(&self.state);
        let recent = self.recent.clone();
        let adopted = info.clone();
        self.storage.read(
            &info,
            Box::new(move |raw| {
                state.clear();
                state.set_template(false);
                state.adopt(adopted.clone());
                recent.remember(&adopted);
                on_success(raw);
            }),
            Box::new(on_error),
        );
    }

    /// Open a document from a transient source (a template, a shared
    /// example) for display only. The session has no save target until
    /// `save_as`, and nothing is recorded in the recent list.
    pub fn open_from_url(
        &self,
        url: &str,
        on_success: impl FnOnce(String) + 'static,
        on_error: impl FnOnce(FileError) + 'static,
    ) {
        let state = Rc::clone(&self.state);
        self.storage.load_local(
            url,
            Box::new(move |raw| {
                state.clear();
                state.set_template(true);
                on_success(raw);
            }),
            Box::new(on_error),
        );
    }

    /// Write the snapshot to a new location, adopt and record it.
    pub fn save_as(
        &self,
        info: FileInfo,
        markup: &str,
        on_success: impl FnOnce() + 'static,
        on_error: impl FnOnce(FileError) + 'static,
    ) -> Result<(), FileError> {
        self.state.adopt(info.clone());
        self.recent.remember(&info);
        self.save(markup, on_success, on_error)
    }

    /// Write the snapshot to the adopted location.
    ///
    /// Calling this with no adopted location is caller misuse: the session
    /// refuses before touching storage.
    pub fn save(
        &self,
        markup: &str,
        on_success: impl FnOnce() + 'static,
        on_error: impl FnOnce(FileError) + 'static,
    ) -> Result<(), FileError> {
        let Some(info) = self.state.file_info() else {
            return Err(FileError::NoOpenFile);
        };
        let state = Rc::clone(&self.state);
        self.storage.write(
            &info,
            markup,
            Box::new(move || {
                // A successful save ends template mode.
                state.set_template(false);
                on_success();
            }),
            Box::new(on_error),
        );
        Ok(())
    }

    /// Close the session. Only the adopted location is cleared; the surface
    /// itself is reset by the next load.
    pub fn close(&self) {
        self.state.clear();
    }

    /// Install raw markup into the surface via the load pipeline.
    pub fn install(
        &self,
        raw: &str,
        options: LoadOptions,
        on_done: impl FnOnce() + 'static,
        on_error: impl FnOnce(FileError) + 'static,
    ) {
        Rc::clone(&self.loader).install(raw, options, on_done, on_error);
    }

    /// Snapshot the surface synchronously.
    pub fn serialize(&self) -> String {
        self.serializer.serialize()
    }

    /// Snapshot the surface one step per queue turn.
    pub fn serialize_async(&self, on_done: impl FnOnce(String) + 'static) {
        self.serializer.serialize_async(on_done);
    }

    pub fn file_info(&self) -> Option<FileInfo> {
        self.state.file_info()
    }

    pub fn is_template(&self) -> bool {
        self.state.is_template()
    }

    pub fn stage(&self) -> &Rc<Stage> {
        &self.stage
    }

    pub fn models(&self) -> &Rc<Models> {
        &self.models
    }

    pub fn queue(&self) -> &Rc<TaskQueue> {
        &self.queue
    }

    pub fn storage(&self) -> &Rc<dyn Storage> {
        &self.storage
    }

    pub fn recent(&self) -> &RecentFiles {
        &self.recent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::storage::{MemoryKeyValueStore, MemoryStorage};

    fn session() -> (FileSession, Rc<MemoryStorage>) {
        let queue = Rc::new(TaskQueue::new());
        let storage = Rc::new(MemoryStorage::new(Rc::clone(&queue)));
        let session = FileSession::new(
            storage.clone(),
            Rc::new(MemoryKeyValueStore::default()),
            Rc::new(NoMigration),
            Rc::new(ConsoleNotifier),
            queue,
            FileConfig::default(),
        );
        (session, storage)
    }

    fn valid_project() -> String {
        "<html><head><title>t</title></head><body class=\"sitepad-runtime\"><p>x</p></body></html>"
            .to_string()
    }

    #[test]
    fn test_open_adopts_records_and_delivers() {
        let (session, storage) = session();
        storage.insert("/site.html", valid_project());

        let received = Rc::new(RefCell::new(String::new()));
        let received2 = received.clone();
        session.open(
            FileInfo::new("/site.html", "site.html"),
            move |raw| *received2.borrow_mut() = raw,
            |e| panic!("unexpected error: {}", e),
        );
        assert_eq!(session.file_info(), None);
        session.queue().run_until_idle();

        assert_eq!(*received.borrow(), valid_project());
        assert_eq!(session.file_info().unwrap().path, "/site.html");
        assert!(!session.is_template());
        let recorded: Vec<_> = session.recent().list().into_iter().map(|e| e.path).collect();
        assert_eq!(recorded, vec!["/site.html"]);
    }

    #[test]
    fn test_open_failure_adopts_nothing() {
        let (session, _storage) = session();
        let failed = Rc::new(Cell::new(false));
        let failed2 = failed.clone();
        session.open(
            FileInfo::new("/missing.html", "missing.html"),
            |_| panic!("unexpected success"),
            move |e| {
                assert!(e.is_io());
                failed2.set(true);
            },
        );
        session.queue().run_until_idle();

        assert!(failed.get());
        assert_eq!(session.file_info(), None);
        assert!(session.recent().list().is_empty());
    }

    #[test]
    fn test_open_from_url_marks_template_without_save_target() {
        let (session, storage) = session();
        storage.insert("templates/blank.html", valid_project());

        let received = Rc::new(Cell::new(false));
        let received2 = received.clone();
        session.open_from_url(
            "templates/blank.html",
            move |_| received2.set(true),
            |e| panic!("unexpected error: {}", e),
        );
        session.queue().run_until_idle();

        assert!(received.get());
        assert!(session.is_template());
        assert_eq!(session.file_info(), None);
        assert!(session.recent().list().is_empty());
    }

    #[test]
    fn test_save_without_open_file_is_refused() {
        let (session, storage) = session();
        let result = session.save("<html></html>", || {}, |_| {});
        assert!(matches!(result, Err(FileError::NoOpenFile)));
        session.queue().run_until_idle();
        assert_eq!(storage.get("/site.html"), None);
    }

    #[test]
    fn test_save_as_adopts_and_clears_template_flag() {
        let (session, storage) = session();
        storage.insert("templates/blank.html", valid_project());
        session.open_from_url("templates/blank.html", |_| {}, |_| {});
        session.queue().run_until_idle();
        assert!(session.is_template());

        let saved = Rc::new(Cell::new(false));
        let saved2 = saved.clone();
        session
            .save_as(
                FileInfo::new("/mine.html", "mine.html"),
                "<html>mine</html>",
                move || saved2.set(true),
                |e| panic!("unexpected error: {}", e),
            )
            .unwrap();
        session.queue().run_until_idle();

        assert!(saved.get());
        assert!(!session.is_template());
        assert_eq!(storage.get("/mine.html").as_deref(), Some("<html>mine</html>"));
        assert_eq!(session.file_info().unwrap().path, "/mine.html");
    }

    #[test]
    fn test_save_writes_to_adopted_location() {
        let (session, storage) = session();
        storage.insert("/site.html", valid_project());
        session.open(FileInfo::new("/site.html", "site.html"), |_| {}, |_| {});
        session.queue().run_until_idle();

        session
            .save("<html>edited</html>", || {}, |e| panic!("unexpected error: {}", e))
            .unwrap();
        session.queue().run_until_idle();
        assert_eq!(storage.get("/site.html").as_deref(), Some("<html>edited</html>"));
    }

    #[test]
    fn test_close_clears_file_info_only() {
        let (session, storage) = session();
        storage.insert("/site.html", valid_project());
        session.open(FileInfo::new("/site.html", "site.html"), |_| {}, |_| {});
        session.queue().run_until_idle();
        assert!(session.file_info().is_some());

        session.close();
        assert_eq!(session.file_info(), None);
        assert!(matches!(
            session.save("<html></html>", || {}, |_| {}),
            Err(FileError::NoOpenFile)
        ));
    }

    #[test]
    fn test_open_install_serialize_save_round_trip() {
        let (session, storage) = session();
        storage.insert("/site.html", valid_project());

        let markup = Rc::new(RefCell::new(String::new()));
        let markup2 = markup.clone();
        session.open(
            FileInfo::new("/site.html", "site.html"),
            move |raw| *markup2.borrow_mut() = raw,
            |e| panic!("unexpected error: {}", e),
        );
        session.queue().run_until_idle();

        let done = Rc::new(Cell::new(false));
        let done2 = done.clone();
        session.install(
            &markup.borrow(),
            crate::load::LoadOptions::default(),
            move || done2.set(true),
            |e| panic!("unexpected error: {}", e),
        );
        session.queue().run_until_idle();
        assert!(done.get());

        let snapshot = session.serialize();
        session
            .save(&snapshot, || {}, |e| panic!("unexpected error: {}", e))
            .unwrap();
        session.queue().run_until_idle();
        assert_eq!(storage.get("/site.html").as_deref(), Some(snapshot.as_str()));
    }
}
