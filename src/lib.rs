//! Document lifecycle core of the SitePad web page editor.
//!
//! Installs persisted markup into the live editable surface (validating and
//! migrating it on the way in) and reconstructs a clean, persistable
//! snapshot from that surface, synchronously or one step per queue turn.
//!
//! # Structure
//!
//! - `domain/` - Value types (FileInfo, the parsed document model)
//! - `model/` - Model collaborators (properties, head, body, elements, pages)
//! - `stage` - The live editable rendering surface
//! - `load` / `serialize` - The install and snapshot pipelines
//! - `session` / `recent` - Open/save orchestration and the recent-files list
//! - `scheduler` / `storage` / `settings` / `notify` - Cooperative task
//!   queue, persistence collaborators, configuration, notifications

pub mod domain;
pub mod error;
pub mod load;
pub mod migration;
pub mod model;
pub mod notify;
pub mod recent;
pub mod scheduler;
pub mod serialize;
pub mod session;
pub mod settings;
pub mod stage;
pub mod storage;

// Re-exports for convenient external access
pub use domain::file_info::FileInfo;
pub use domain::markup::DocumentModel;
pub use error::{FileError, Result};
pub use load::{LoadOptions, LoadPipeline};
pub use migration::{Migration, NoMigration};
pub use model::Models;
pub use notify::{ConsoleNotifier, Notifier};
pub use recent::{RecentFiles, MAX_RECENT_FILES};
pub use scheduler::TaskQueue;
pub use serialize::Serializer;
pub use session::{FileSession, SessionState};
pub use settings::FileConfig;
pub use stage::{ExecutionContext, Indicator, Stage};
pub use storage::{
    DiskKeyValueStore, DiskStorage, KeyValueStore, MemoryKeyValueStore, MemoryStorage, Storage,
};
