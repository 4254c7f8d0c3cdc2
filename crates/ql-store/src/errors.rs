use std::path::PathBuf;

use thiserror::Error;

/// Failures of the symmetric encryption layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid key size: expected 32 bytes, got {0}")]
    InvalidKeySize(usize),

    #[error("Encryption failed")]
    Encrypt,

    #[error("Ciphertext is malformed: {0}")]
    Malformed(String),

    #[error("Decryption failed - wrong key or tampered data")]
    Decrypt,
}

/// Reasons a settings record is rejected before it is persisted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsIssue {
    #[error("Username is required")]
    MissingUsername,

    #[error("Password is required")]
    MissingPassword,

    #[error("Game executable path is required")]
    MissingFilePath,

    #[error("Language is required")]
    MissingLanguage,

    #[error("Game executable path must point to {expected}")]
    WrongExecutable { expected: &'static str },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Data file {path} does not exist - run setup first")]
    MissingDataFile { path: PathBuf },

    #[error(
        "Data file is incompatible (version {found:?}, expected {expected}) - delete it and run setup again"
    )]
    IncompatibleDataFile { found: Option<u64>, expected: u64 },

    #[error("Bucket '{0}' does not exist")]
    MissingBucket(&'static str),

    #[error("Key '{key}' is missing from bucket '{bucket}'")]
    MissingKey { bucket: &'static str, key: &'static str },

    #[error("Failed to create bucket '{name}': {reason} - data file was removed")]
    BucketCreation { name: String, reason: String },

    #[error("Data file is malformed: {0}")]
    Malformed(String),

    #[error("Timed out waiting for the data file lock")]
    LockTimeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("JSON serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] SettingsIssue),
}

impl StoreError {
    /// Whether the data file must be deleted and recreated before it can be used again
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::IncompatibleDataFile { .. }
                | Self::MissingBucket(_)
                | Self::MissingKey { .. }
                | Self::Malformed(_)
                | Self::Crypto(_)
                | Self::Serde(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
