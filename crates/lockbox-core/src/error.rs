//! Error types surfaced by the core.

use std::path::PathBuf;

/// Errors returned by workspace, codec and command operations.
///
/// Lookups that simply miss are not errors: they come back as `None`/`false`.
/// The not-found variants are only used where a command has no sentinel to
/// return instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no workspace is open")]
    NoActiveWorkspace,

    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("entry not found: {0}")]
    EntryNotFound(String),

    #[error("invalid change-set: {0}")]
    InvalidChangeSet(String),

    #[error("invalid command: {0}")]
    InvalidCommand(#[from] serde_json::Error),

    #[error("workspace has no storage location; create or open one first")]
    NoOrigin,

    #[error("failed to {action} workspace at {}: {source:#}", .location.display())]
    Persistence {
        action: &'static str,
        location: PathBuf,
        source: anyhow::Error,
    },
}

impl Error {
    /// Stable machine-readable name for the wire envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NoActiveWorkspace => "no-active-workspace",
            Error::GroupNotFound(_) | Error::EntryNotFound(_) => "not-found",
            Error::InvalidChangeSet(_) => "invalid-change-set",
            Error::InvalidCommand(_) => "invalid-command",
            Error::NoOrigin => "no-origin",
            Error::Persistence { .. } => "persistence",
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
