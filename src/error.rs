use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The issue text is empty or could not be read as image directives
    #[error("Invalid issue format. {0}")]
    Format(String),

    /// Required target registry configuration is missing
    #[error("{0}")]
    Config(String),

    /// The mirroring executable could not be started or exited with a failure
    #[error("Syncing failed for arch '{arch}'. Reason: {reason}")]
    Sync { arch: String, reason: String },

    #[error("Failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
