use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EndpointError>;

/// Failures surfaced while loading relation state or rendering cqlshrc.
///
/// Relation data itself never produces an error; malformed values are
/// dropped during aggregation.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("{operation} failed for {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to look up user {user}: {source}")]
    UserLookup { user: String, source: nix::Error },
    #[error("no such user: {user}")]
    UnknownUser { user: String },
    #[error("failed to change ownership of {}: {source}", path.display())]
    Ownership { path: PathBuf, source: nix::Error },
    #[error("{}:{line}: {reason}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: &'static str,
    },
    #[error("invalid relation snapshot {}: {source}", path.display())]
    Snapshot {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl EndpointError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
