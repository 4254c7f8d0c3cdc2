use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::crypto::EncryptionKey;
use crate::errors::{Result, SettingsIssue, StoreError};
use crate::file_store::{ReadTx, WriteTx};

pub const BUCKET_SETTINGS: &str = "settings";
pub const BUCKET_LAST_UPDATE: &str = "lastupdate";

pub const KEY_CORE: &str = "core";
pub const KEY_EXPERIMENTAL: &str = "experimental";
pub const KEY_LAUNCHER: &str = "launcher";
pub const KEY_TOKEN: &str = "token";
pub const KEY_TOKEN_KEY: &str = "tokenkey";
pub const KEY_LAST_GAME: &str = "lastgame";
pub const KEY_LAST_LAUNCHER: &str = "lastlauncher";
pub const KEY_VERSION: &str = "dbver";

/// Schema version stamped into every data file this build writes
pub const DATA_FILE_VERSION: u64 = 2;

/// The executable `CoreSettings::file_path` has to point at
pub const GAME_EXECUTABLE: &str = "QuakeChampions.exe";

/// A value persisted under a fixed bucket/key pair
pub trait Record: Sized {
    const NAME: &'static str;

    fn read(tx: &ReadTx<'_>) -> Result<Self>;

    fn write(&self, tx: &mut WriteTx<'_>) -> Result<()>;
}

fn read_json<T: DeserializeOwned>(tx: &ReadTx<'_>, key: &'static str) -> Result<T> {
    let bytes = tx.require(BUCKET_SETTINGS, key)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_json<T: Serialize>(tx: &mut WriteTx<'_>, key: &'static str, value: &T) -> Result<()> {
    tx.create_bucket_if_missing(BUCKET_SETTINGS)?;
    let bytes = serde_json::to_vec(value)?;
    tx.put(BUCKET_SETTINGS, key, &bytes)
}

/// The per-store credential key co-located in the settings bucket
pub fn stored_key(tx: &ReadTx<'_>) -> Result<EncryptionKey> {
    let bytes = tx.require(BUCKET_SETTINGS, KEY_TOKEN_KEY)?;
    Ok(EncryptionKey::from_slice(&bytes)?)
}

pub fn read_stored_key(tx: &ReadTx<'_>) -> Result<Option<EncryptionKey>> {
    if !tx.has_bucket(BUCKET_SETTINGS) {
        return Ok(None);
    }
    tx.get(BUCKET_SETTINGS, KEY_TOKEN_KEY)?
        .map(|bytes| EncryptionKey::from_slice(&bytes).map_err(StoreError::from))
        .transpose()
}

pub fn write_stored_key(tx: &mut WriteTx<'_>, key: &EncryptionKey) -> Result<()> {
    tx.create_bucket_if_missing(BUCKET_SETTINGS)?;
    tx.put(BUCKET_SETTINGS, KEY_TOKEN_KEY, key.as_bytes())
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct CoreSettings {
    pub username: String,
    pub password: String,
    pub file_path: PathBuf,
    pub language: String,
    /// Hardware fingerprint sent as the source-fingerprint header
    pub fingerprint: String,
}

impl std::fmt::Debug for CoreSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreSettings")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("file_path", &self.file_path)
            .field("language", &self.language)
            .field("fingerprint", &"[REDACTED]")
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
struct StoredCoreSettings {
    username: String,
    password: String,
    file_path: PathBuf,
    language: String,
    fingerprint: String,
}

impl CoreSettings {
    pub fn validate(&self) -> std::result::Result<(), SettingsIssue> {
        if self.username.is_empty() {
            return Err(SettingsIssue::MissingUsername);
        }
        if self.password.is_empty() {
            return Err(SettingsIssue::MissingPassword);
        }
        if self.file_path.as_os_str().is_empty() {
            return Err(SettingsIssue::MissingFilePath);
        }
        if !names_game_executable(&self.file_path) {
            return Err(SettingsIssue::WrongExecutable {
                expected: GAME_EXECUTABLE,
            });
        }
        if self.language.is_empty() {
            return Err(SettingsIssue::MissingLanguage);
        }
        Ok(())
    }

    pub fn same_credentials(&self, other: &CoreSettings) -> bool {
        self.username == other.username && self.password == other.password
    }
}

fn names_game_executable(path: &Path) -> bool {
    path.to_string_lossy()
        .to_ascii_lowercase()
        .contains(&GAME_EXECUTABLE.to_ascii_lowercase())
}

impl Record for CoreSettings {
    const NAME: &'static str = KEY_CORE;

    fn read(tx: &ReadTx<'_>) -> Result<Self> {
        let key = stored_key(tx)?;
        let stored: StoredCoreSettings = read_json(tx, KEY_CORE)?;

        Ok(Self {
            username: key.decrypt(&stored.username)?,
            password: key.decrypt(&stored.password)?,
            file_path: stored.file_path,
            language: stored.language,
            fingerprint: key.decrypt(&stored.fingerprint)?,
        })
    }

    fn write(&self, tx: &mut WriteTx<'_>) -> Result<()> {
        let key = stored_key(&tx.read())?;
        let stored = StoredCoreSettings {
            username: key.encrypt(&self.username)?,
            password: key.encrypt(&self.password)?,
            file_path: self.file_path.clone(),
            language: self.language.clone(),
            fingerprint: key.encrypt(&self.fingerprint)?,
        };
        write_json(tx, KEY_CORE, &stored)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentalSettings {
    pub use_max_fps_limit: bool,
    pub use_max_fps_limit_minimized: bool,
    pub use_fps_smoothing: bool,
    pub max_fps_limit: u32,
    pub max_fps_limit_minimized: u32,
}

impl ExperimentalSettings {
    /// A limit of zero means "no limit", so its switch is turned off
    pub fn normalize(&mut self) {
        if self.use_max_fps_limit && self.max_fps_limit == 0 {
            self.use_max_fps_limit = false;
        }
        if self.use_max_fps_limit_minimized && self.max_fps_limit_minimized == 0 {
            self.use_max_fps_limit_minimized = false;
        }
    }
}

impl Record for ExperimentalSettings {
    const NAME: &'static str = KEY_EXPERIMENTAL;

    fn read(tx: &ReadTx<'_>) -> Result<Self> {
        read_json(tx, KEY_EXPERIMENTAL)
    }

    fn write(&self, tx: &mut WriteTx<'_>) -> Result<()> {
        let mut normalized = *self;
        normalized.normalize();
        write_json(tx, KEY_EXPERIMENTAL, &normalized)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherSettings {
    pub auto_start: bool,
    pub exit_on_launch: bool,
    pub minimize_on_launch: bool,
    pub minimize_to_tray: bool,
}

impl Record for LauncherSettings {
    const NAME: &'static str = KEY_LAUNCHER;

    fn read(tx: &ReadTx<'_>) -> Result<Self> {
        read_json(tx, KEY_LAUNCHER)
    }

    fn write(&self, tx: &mut WriteTx<'_>) -> Result<()> {
        write_json(tx, KEY_LAUNCHER, self)
    }
}

/// Session token issued by the identity service; empty means "none"
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
}

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_empty()
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.token.is_empty() {
            f.write_str("AuthToken(<none>)")
        } else {
            f.write_str("AuthToken([REDACTED])")
        }
    }
}

impl Record for AuthToken {
    const NAME: &'static str = KEY_TOKEN;

    fn read(tx: &ReadTx<'_>) -> Result<Self> {
        let key = stored_key(tx)?;
        let encrypted = tx.require(BUCKET_SETTINGS, KEY_TOKEN)?;
        let encrypted = String::from_utf8(encrypted)
            .map_err(|_| StoreError::Malformed("Token is not valid UTF-8".to_string()))?;
        Ok(Self {
            token: key.decrypt(&encrypted)?,
        })
    }

    fn write(&self, tx: &mut WriteTx<'_>) -> Result<()> {
        let key = stored_key(&tx.read())?;
        let encrypted = key.encrypt(&self.token)?;
        tx.put(BUCKET_SETTINGS, KEY_TOKEN, encrypted.as_bytes())
    }
}

/// Which "last checked" timestamp a write touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Game timestamp set, launcher timestamp kept if one already exists
    All,
    Game,
    Launcher,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateTimes {
    pub last_game_check: i64,
    pub last_launcher_check: i64,
}

fn decode_u64(bytes: &[u8], key: &str) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Malformed(format!("{} must be 8 bytes, got {}", key, bytes.len())))?;
    Ok(u64::from_le_bytes(raw))
}

impl Record for UpdateTimes {
    const NAME: &'static str = BUCKET_LAST_UPDATE;

    fn read(tx: &ReadTx<'_>) -> Result<Self> {
        let game = tx.require(BUCKET_LAST_UPDATE, KEY_LAST_GAME)?;
        let launcher = tx.require(BUCKET_LAST_UPDATE, KEY_LAST_LAUNCHER)?;
        Ok(Self {
            last_game_check: decode_u64(&game, KEY_LAST_GAME)? as i64,
            last_launcher_check: decode_u64(&launcher, KEY_LAST_LAUNCHER)? as i64,
        })
    }

    fn write(&self, tx: &mut WriteTx<'_>) -> Result<()> {
        tx.create_bucket_if_missing(BUCKET_LAST_UPDATE)?;
        tx.put(
            BUCKET_LAST_UPDATE,
            KEY_LAST_GAME,
            &(self.last_game_check as u64).to_le_bytes(),
        )?;
        tx.put(
            BUCKET_LAST_UPDATE,
            KEY_LAST_LAUNCHER,
            &(self.last_launcher_check as u64).to_le_bytes(),
        )
    }
}

pub fn write_update_time(tx: &mut WriteTx<'_>, kind: UpdateKind, unix_time: i64) -> Result<()> {
    tx.create_bucket_if_missing(BUCKET_LAST_UPDATE)?;
    let stamp = (unix_time as u64).to_le_bytes();

    match kind {
        UpdateKind::Game => tx.put(BUCKET_LAST_UPDATE, KEY_LAST_GAME, &stamp),
        UpdateKind::Launcher => tx.put(BUCKET_LAST_UPDATE, KEY_LAST_LAUNCHER, &stamp),
        UpdateKind::All => {
            tx.put(BUCKET_LAST_UPDATE, KEY_LAST_GAME, &stamp)?;
            let existing = tx.read().get(BUCKET_LAST_UPDATE, KEY_LAST_LAUNCHER)?;
            match existing {
                Some(bytes) if !bytes.is_empty() => Ok(()),
                _ => tx.put(BUCKET_LAST_UPDATE, KEY_LAST_LAUNCHER, &stamp),
            }
        }
    }
}

pub fn read_version(tx: &ReadTx<'_>) -> Result<Option<u64>> {
    if !tx.has_bucket(BUCKET_LAST_UPDATE) {
        return Ok(None);
    }
    tx.get(BUCKET_LAST_UPDATE, KEY_VERSION)?
        .map(|bytes| decode_u64(&bytes, KEY_VERSION))
        .transpose()
}

pub fn write_version(tx: &mut WriteTx<'_>) -> Result<()> {
    tx.create_bucket_if_missing(BUCKET_LAST_UPDATE)?;
    tx.put(
        BUCKET_LAST_UPDATE,
        KEY_VERSION,
        &DATA_FILE_VERSION.to_le_bytes(),
    )
}

/// Everything a launch needs from the data file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    pub core: CoreSettings,
    pub experimental: ExperimentalSettings,
    pub launcher: LauncherSettings,
    pub auth: AuthToken,
}

impl Record for Configuration {
    const NAME: &'static str = "configuration";

    fn read(tx: &ReadTx<'_>) -> Result<Self> {
        Ok(Self {
            core: CoreSettings::read(tx)?,
            experimental: ExperimentalSettings::read(tx)?,
            launcher: LauncherSettings::read(tx)?,
            auth: AuthToken::read(tx)?,
        })
    }

    fn write(&self, tx: &mut WriteTx<'_>) -> Result<()> {
        self.core.write(tx)?;
        self.experimental.write(tx)?;
        self.launcher.write(tx)?;
        self.auth.write(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> CoreSettings {
        CoreSettings {
            username: "player@example.com".to_string(),
            password: "secret".to_string(),
            file_path: PathBuf::from(r"C:\Games\QC\client\bin\pc\QuakeChampions.exe"),
            language: "en".to_string(),
            fingerprint: "fp".to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_complete_settings() {
        assert_eq!(core().validate(), Ok(()));
    }

    #[test]
    fn test_validate_reports_first_missing_field() {
        let mut settings = core();
        settings.password.clear();
        assert_eq!(settings.validate(), Err(SettingsIssue::MissingPassword));

        let mut settings = core();
        settings.language.clear();
        assert_eq!(settings.validate(), Err(SettingsIssue::MissingLanguage));
    }

    #[test]
    fn test_validate_matches_executable_case_insensitively() {
        let mut settings = core();
        settings.file_path = PathBuf::from("/games/qc/QUAKECHAMPIONS.EXE");
        assert_eq!(settings.validate(), Ok(()));

        settings.file_path = PathBuf::from("/games/qc/Launcher.exe");
        assert!(matches!(
            settings.validate(),
            Err(SettingsIssue::WrongExecutable { .. })
        ));
    }

    #[test]
    fn test_normalize_turns_off_zero_limits() {
        let mut settings = ExperimentalSettings {
            use_max_fps_limit: true,
            use_max_fps_limit_minimized: true,
            use_fps_smoothing: true,
            max_fps_limit: 0,
            max_fps_limit_minimized: 30,
        };
        settings.normalize();

        assert!(!settings.use_max_fps_limit);
        assert!(settings.use_max_fps_limit_minimized);
        assert!(settings.use_fps_smoothing);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", core());
        assert!(!rendered.contains("secret"));
        assert_eq!(format!("{:?}", AuthToken::new("abc")), "AuthToken([REDACTED])");
    }
}
