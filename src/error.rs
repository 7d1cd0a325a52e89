use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("this document was not created with the editor and can not be opened")]
    NotEditable,

    #[error("this is a published copy of a project, not an editable project file")]
    PublishedCopy,

    #[error("no file is open, save to a new location first")]
    NoOpenFile,

    #[error("failed to load edition resources: {0}")]
    EditionResources(String),

    #[error("surface not ready after {attempts} checks")]
    SurfaceTimeout { attempts: u32 },

    #[error("document migration did not converge after {0} reload cycles")]
    MigrationDiverged(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

impl FileError {
    /// True for rejections of the document itself (signature checks).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::NotEditable | Self::PublishedCopy)
    }

    /// True for failures of the storage collaborator, forwarded verbatim.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Json(_) | Self::Storage(_))
    }
}

/// Convenience type alias for Results with FileError
pub type Result<T> = std::result::Result<T, FileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FileError = io_err.into();
        assert!(matches!(err, FileError::Io(_)));
        assert!(err.is_io());
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_display() {
        let err = FileError::SurfaceTimeout { attempts: 8 };
        assert_eq!(err.to_string(), "surface not ready after 8 checks");

        let err = FileError::MigrationDiverged(3);
        assert_eq!(
            err.to_string(),
            "document migration did not converge after 3 reload cycles"
        );

        let err = FileError::Storage("backend offline".to_string());
        assert_eq!(err.to_string(), "storage error: backend offline");
    }

    #[test]
    fn test_validation_predicate() {
        assert!(FileError::NotEditable.is_validation());
        assert!(FileError::PublishedCopy.is_validation());
        assert!(!FileError::NoOpenFile.is_validation());
        assert!(!FileError::SurfaceTimeout { attempts: 1 }.is_validation());
    }
}
