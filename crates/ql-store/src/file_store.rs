use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, error, warn};

use crate::errors::{Result, StoreError};

const LOCK_ATTEMPTS: u32 = 50;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(100);

/// On-disk layout: named buckets of base64-encoded byte values
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Document {
    buckets: BTreeMap<String, BTreeMap<String, String>>,
}

/// Read-only view handed to [`LauncherStore::view`] closures
pub struct ReadTx<'a> {
    doc: &'a Document,
}

impl ReadTx<'_> {
    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.doc.buckets.contains_key(bucket)
    }

    /// `Ok(None)` when the key is absent, `MissingBucket` when the bucket is
    pub fn get(&self, bucket: &'static str, key: &str) -> Result<Option<Vec<u8>>> {
        let values = self
            .doc
            .buckets
            .get(bucket)
            .ok_or(StoreError::MissingBucket(bucket))?;

        values
            .get(key)
            .map(|encoded| {
                STANDARD.decode(encoded).map_err(|e| {
                    StoreError::Malformed(format!("Value {}/{} is not base64: {}", bucket, key, e))
                })
            })
            .transpose()
    }

    pub fn require(&self, bucket: &'static str, key: &'static str) -> Result<Vec<u8>> {
        self.get(bucket, key)?
            .ok_or(StoreError::MissingKey { bucket, key })
    }
}

/// Mutable working copy handed to [`LauncherStore::update`] closures
pub struct WriteTx<'a> {
    doc: &'a mut Document,
}

impl WriteTx<'_> {
    pub fn create_bucket_if_missing(&mut self, name: &str) -> Result<()> {
        if name.is_empty() || name.len() > 255 {
            return Err(StoreError::BucketCreation {
                name: name.to_string(),
                reason: "bucket name must be 1-255 bytes".to_string(),
            });
        }
        self.doc.buckets.entry(name.to_string()).or_default();
        Ok(())
    }

    pub fn put(&mut self, bucket: &'static str, key: &str, value: &[u8]) -> Result<()> {
        let values = self
            .doc
            .buckets
            .get_mut(bucket)
            .ok_or(StoreError::MissingBucket(bucket))?;
        values.insert(key.to_string(), STANDARD.encode(value));
        Ok(())
    }

    pub fn read(&self) -> ReadTx<'_> {
        ReadTx { doc: self.doc }
    }
}

/// Single-file bucketed store.
///
/// Holds an exclusive advisory lock on `<data file>.lock` from `open` until
/// the value is dropped. Every successful `update` is written atomically.
#[derive(Debug)]
pub struct LauncherStore {
    path: PathBuf,
    document: Document,
    _lock: std::fs::File,
}

impl LauncherStore {
    /// Open the data file at `path`.
    ///
    /// With `create == false` a missing file is reported as `MissingDataFile`.
    pub async fn open(path: impl AsRef<Path>, create: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !create && !fs::try_exists(&path).await? {
            return Err(StoreError::MissingDataFile { path });
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let lock = Self::acquire_lock(&lock_path(&path)).await?;

        let document = match fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Document::default(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                error!("Data file {} is not valid JSON: {}", path.display(), e);
                StoreError::Malformed(e.to_string())
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::default(),
            Err(e) => return Err(e.into()),
        };

        debug!("Opened data file {}", path.display());
        Ok(Self {
            path,
            document,
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire an exclusive lock, retrying for a bounded time
    async fn acquire_lock(lock_path: &Path) -> Result<std::fs::File> {
        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path)?;

        for attempt in 1..=LOCK_ATTEMPTS {
            match lock_file.try_lock_exclusive() {
                Ok(()) => return Ok(lock_file),
                Err(_) if attempt < LOCK_ATTEMPTS => {
                    tokio::time::sleep(LOCK_RETRY_DELAY).await;
                }
                Err(e) => {
                    warn!("Could not lock {}: {}", lock_path.display(), e);
                }
            }
        }

        Err(StoreError::LockTimeout)
    }

    pub fn view<R>(&self, f: impl FnOnce(&ReadTx<'_>) -> Result<R>) -> Result<R> {
        f(&ReadTx {
            doc: &self.document,
        })
    }

    /// Run `f` against a working copy and persist it only if `f` succeeds.
    ///
    /// A bucket-creation failure removes the data file entirely.
    pub async fn update<R>(&mut self, f: impl FnOnce(&mut WriteTx<'_>) -> Result<R>) -> Result<R> {
        let mut working = self.document.clone();

        let outcome = f(&mut WriteTx { doc: &mut working });

        match outcome {
            Ok(value) => {
                self.persist(&working).await?;
                self.document = working;
                Ok(value)
            }
            Err(e @ StoreError::BucketCreation { .. }) => {
                error!("{}; removing {}", e, self.path.display());
                if let Err(remove_err) = fs::remove_file(&self.path).await
                    && remove_err.kind() != std::io::ErrorKind::NotFound
                {
                    error!(
                        "Failed to remove data file {}: {}",
                        self.path.display(),
                        remove_err
                    );
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn persist(&self, document: &Document) -> Result<()> {
        let json = serde_json::to_vec_pretty(document)?;

        // Atomic write: write to temp file, then rename
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, json).await?;

        let file = std::fs::File::open(&temp_path)?;
        file.sync_all()?;

        fs::rename(&temp_path, &self.path).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }
}

fn lock_path(data_file: &Path) -> PathBuf {
    let mut name = data_file
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    data_file.with_file_name(name)
}
