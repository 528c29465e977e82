// Error types shared across layers
use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the management-bean server.
#[derive(Debug, Error)]
pub enum StatError {
    #[error("can't contact server: {0}")]
    Unreachable(String),

    #[error("management service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed management response: {0}")]
    Decode(String),
}

impl StatError {
    /// Whether the bean server itself could not be reached, as opposed to
    /// answering with something unexpected.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, StatError::Unreachable(_))
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("pdf error: {0}")]
    Pdf(String),

    #[error("invalid color `{0}`")]
    InvalidColor(String),
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("can't read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("can't create backup {}: {source}", .path.display())]
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("can't write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no free backup name for {}", .0.display())]
    BackupExhausted(PathBuf),
}
