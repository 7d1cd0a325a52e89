pub mod file_info;
pub mod markup;

pub use file_info::FileInfo;
pub use markup::DocumentModel;
