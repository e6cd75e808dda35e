/**
 * Errors surfaced to the caller of the planner
 */

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The source directory is missing or cannot be listed. No plan is produced.
    #[error("Source directory cannot be read: {}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Source path is not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl OrganizeError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        OrganizeError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, OrganizeError>;
