//! Encrypted, versioned configuration store for qlauncher.
//!
//! All launcher state lives in a single data file made of named buckets:
//!
//! - `settings`: core, experimental and launcher settings, the auth token and
//!   the per-store credential key
//! - `lastupdate`: "last checked" timestamps and the schema version
//!
//! Credentials and the auth token are encrypted with AES-256-GCM under a key
//! generated once per data file. A file whose schema version does not match
//! [`DATA_FILE_VERSION`] is rejected on every read and has to be deleted.

pub mod crypto;
pub mod errors;
pub mod file_store;
pub mod settings;
pub mod store;

pub use crypto::{EncryptionKey, decrypt, encrypt};
pub use errors::{CryptoError, Result, SettingsIssue, StoreError};
pub use file_store::LauncherStore;
pub use settings::{
    AuthToken, Configuration, CoreSettings, DATA_FILE_VERSION, ExperimentalSettings,
    GAME_EXECUTABLE, LauncherSettings, Record, UpdateKind, UpdateTimes,
};
pub use store::{DATA_FILE_NAME, DataStore};
