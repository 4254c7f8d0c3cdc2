use std::path::PathBuf;

use thiserror::Error;

use ql_client::ClientError;
use ql_store::{SettingsIssue, StoreError};

/// Coarse classification used by front ends to pick what to tell the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    AuthenticationFailed,
    Validation,
    HashMismatch,
    AlreadyRunning,
    StoreCorruption,
    MissingDataFile,
    Setup,
    Internal,
}

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("The game is already running")]
    AlreadyRunning,

    #[error("Another launcher instance holds {path}")]
    InstanceLocked { path: PathBuf },

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsIssue),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Hash mismatch for {}: expected {expected}", path.display())]
    HashMismatch {
        path: PathBuf,
        expected: String,
        /// `None` when the file could not be read at all
        actual: Option<String>,
    },

    #[error("Build/branch identifiers for project {project_id} branch '{branch}' were not found")]
    IdentifiersNotFound { project_id: u32, branch: String },

    #[error("Failed to start {}: {source}", program.display())]
    ProcessStart {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Hardware fingerprint unavailable: {0}")]
    Fingerprint(String),

    #[error("Launcher update requested; download from {url}")]
    UpdateRequested { url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LaunchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyRunning | Self::InstanceLocked { .. } => ErrorKind::AlreadyRunning,
            Self::HashMismatch { .. } => ErrorKind::HashMismatch,
            Self::Settings(_) | Self::Fingerprint(_) => ErrorKind::Setup,
            Self::Client(e) if e.is_auth_failure() => ErrorKind::AuthenticationFailed,
            Self::Client(ClientError::Transport(_)) | Self::Client(ClientError::Status { .. }) => {
                ErrorKind::Transport
            }
            Self::Client(ClientError::Validation { .. }) | Self::Client(ClientError::Decode { .. }) => {
                ErrorKind::Validation
            }
            Self::Client(ClientError::Store(e)) | Self::Store(e) => store_kind(e),
            Self::IdentifiersNotFound { .. } => ErrorKind::Validation,
            Self::Client(_)
            | Self::ProcessStart { .. }
            | Self::UpdateRequested { .. }
            | Self::Io(_) => ErrorKind::Internal,
        }
    }
}

fn store_kind(e: &StoreError) -> ErrorKind {
    match e {
        StoreError::MissingDataFile { .. } => ErrorKind::MissingDataFile,
        e if e.is_corruption() => ErrorKind::StoreCorruption,
        _ => ErrorKind::Internal,
    }
}

pub type Result<T> = std::result::Result<T, LaunchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            LaunchError::Client(ClientError::StaleToken).kind(),
            ErrorKind::AuthenticationFailed
        );
        assert_eq!(
            LaunchError::Store(StoreError::IncompatibleDataFile {
                found: Some(1),
                expected: 2
            })
            .kind(),
            ErrorKind::StoreCorruption
        );
        assert_eq!(
            LaunchError::Client(ClientError::Store(StoreError::MissingDataFile {
                path: PathBuf::from("data.qcl")
            }))
            .kind(),
            ErrorKind::MissingDataFile
        );
        assert_eq!(
            LaunchError::HashMismatch {
                path: PathBuf::from("a"),
                expected: "00".to_string(),
                actual: None
            }
            .kind(),
            ErrorKind::HashMismatch
        );
    }
}
