use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

use crate::crypto::EncryptionKey;
use crate::errors::{Result, StoreError};
use crate::file_store::LauncherStore;
use crate::settings::{
    AuthToken, Configuration, CoreSettings, DATA_FILE_VERSION, ExperimentalSettings,
    LauncherSettings, Record, UpdateKind, UpdateTimes, read_stored_key, read_version,
    write_stored_key, write_update_time, write_version,
};

pub const DATA_FILE_NAME: &str = "data.qcl";

/// Secrets obtained before the data file exists.
///
/// First-run credential verification happens before anything is saved, so
/// the token and key are held here until `save_configuration` commits them.
#[derive(Default)]
struct PendingSecrets {
    token: Option<String>,
    key: Option<EncryptionKey>,
    fingerprint: Option<String>,
}

/// Record-level access to the launcher data file.
///
/// Every operation opens the file, checks it, runs one transaction and closes
/// it again; nothing read from disk is cached between calls.
pub struct DataStore {
    path: PathBuf,
    pending: Mutex<PendingSecrets>,
}

impl std::fmt::Debug for DataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl DataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pending: Mutex::new(PendingSecrets::default()),
        }
    }

    /// Data file inside `dir` using the default file name
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(DATA_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Open for reading and enforce both preconditions: the file exists and
    /// carries the expected schema version.
    async fn open_checked(&self) -> Result<LauncherStore> {
        let store = LauncherStore::open(&self.path, false).await?;

        let found = store.view(read_version)?;
        if found != Some(DATA_FILE_VERSION) {
            error!(
                "Data file {} has version {:?}, expected {}",
                self.path.display(),
                found,
                DATA_FILE_VERSION
            );
            return Err(StoreError::IncompatibleDataFile {
                found,
                expected: DATA_FILE_VERSION,
            });
        }

        Ok(store)
    }

    #[instrument(skip(self), fields(record = R::NAME))]
    pub async fn get<R: Record>(&self) -> Result<R> {
        let store = self.open_checked().await?;
        store.view(R::read).map_err(|e| {
            error!("Failed to read {} from data file: {}", R::NAME, e);
            e
        })
    }

    #[instrument(skip(self, record), fields(record = R::NAME))]
    pub async fn save<R: Record>(&self, record: &R) -> Result<()> {
        let mut store = self.open_checked().await?;
        store.update(|tx| record.write(tx)).await.map_err(|e| {
            error!("Failed to save {} to data file: {}", R::NAME, e);
            e
        })?;
        debug!("Saved {}", R::NAME);
        Ok(())
    }

    pub async fn load_configuration(&self) -> Result<Configuration> {
        self.get::<Configuration>().await
    }

    /// Commit the full settings set.
    ///
    /// Creates the data file on first run. The credential key is the existing
    /// one when present, else the staged one, else freshly generated. The game
    /// check timestamp is reset so the next launch verifies the install.
    #[instrument(skip_all)]
    pub async fn save_configuration(
        &self,
        core: &CoreSettings,
        experimental: &ExperimentalSettings,
        launcher: &LauncherSettings,
    ) -> Result<()> {
        let mut store = LauncherStore::open(&self.path, true).await?;

        let (pending_token, pending_key, pending_fingerprint) = {
            let mut pending = self.pending_guard()?;
            (
                pending.token.take(),
                pending.key.take(),
                pending.fingerprint.take(),
            )
        };

        let existing_key = store.view(read_stored_key).unwrap_or_else(|e| {
            warn!("Ignoring unreadable credential key: {}", e);
            None
        });
        let existing_token = match &existing_key {
            Some(_) => store.view(AuthToken::read).ok(),
            None => None,
        };

        let key = existing_key
            .or(pending_key)
            .unwrap_or_else(EncryptionKey::generate);
        let token = pending_token
            .map(AuthToken::new)
            .or(existing_token)
            .unwrap_or_default();

        let mut core = core.clone();
        if let Some(fingerprint) = pending_fingerprint {
            core.fingerprint = fingerprint;
        }

        store
            .update(|tx| {
                write_stored_key(tx, &key)?;
                core.write(tx)?;
                experimental.write(tx)?;
                launcher.write(tx)?;
                token.write(tx)?;
                write_version(tx)?;
                write_update_time(tx, UpdateKind::All, 0)
            })
            .await?;

        info!("Saved configuration to {}", self.path.display());
        Ok(())
    }

    fn pending_guard(&self) -> Result<std::sync::MutexGuard<'_, PendingSecrets>> {
        self.pending
            .lock()
            .map_err(|_| StoreError::Malformed("Pending secrets lock poisoned".to_string()))
    }

    /// Hold a token from pre-save verification until the first save
    pub fn stage_pending_token(&self, token: impl Into<String>) -> Result<()> {
        let mut pending = self.pending_guard()?;
        pending.token = Some(token.into());
        if pending.key.is_none() {
            pending.key = Some(EncryptionKey::generate());
        }
        Ok(())
    }

    pub fn stage_pending_fingerprint(&self, fingerprint: impl Into<String>) -> Result<()> {
        self.pending_guard()?.fingerprint = Some(fingerprint.into());
        Ok(())
    }

    pub fn has_pending_token(&self) -> bool {
        self.pending_guard()
            .map(|pending| pending.token.is_some())
            .unwrap_or(false)
    }

    pub async fn auth_token(&self) -> Result<String> {
        Ok(self.get::<AuthToken>().await?.token)
    }

    pub async fn update_auth_token(&self, token: &str) -> Result<()> {
        self.save(&AuthToken::new(token)).await
    }

    pub async fn clear_auth_token(&self) -> Result<()> {
        info!("Clearing stored auth token");
        self.save(&AuthToken::default()).await
    }

    pub async fn last_update_times(&self) -> Result<UpdateTimes> {
        self.get::<UpdateTimes>().await
    }

    #[instrument(skip(self))]
    pub async fn set_last_check_time(&self, kind: UpdateKind, unix_time: i64) -> Result<()> {
        let mut store = self.open_checked().await?;
        store
            .update(|tx| write_update_time(tx, kind, unix_time))
            .await
    }

    /// Remove the data file; the prescribed recovery for corruption
    pub async fn delete(&self) -> Result<()> {
        // the sidecar lock file is left in place
        match fs::remove_file(&self.path).await {
            Ok(()) => info!("Removed {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}
