use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::process::Command;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::{LaunchError, Result};

pub const DEFAULT_ATTEMPTS: u32 = 4;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const HELPER_COPY_NAME: &str = "ExtractBNLauncherFP.exe";
const HELPER_ERROR_LOG: &str = "blff_error.log";

/// Produces the hardware fingerprint sent with vendor requests
#[async_trait::async_trait]
pub trait FingerprintSource: Send + Sync {
    async fn fingerprint(&self) -> Result<String>;
}

/// Fixed value, used for command-line overrides and tests
#[derive(Debug, Clone)]
pub struct StaticFingerprint(pub String);

#[async_trait::async_trait]
impl FingerprintSource for StaticFingerprint {
    async fn fingerprint(&self) -> Result<String> {
        if self.0.is_empty() {
            return Err(LaunchError::Fingerprint("empty fingerprint override".to_string()));
        }
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct HelperReply {
    fp: Option<String>,
}

/// Runs the external fingerprint helper and collects its single reply.
///
/// The helper is copied into `work_dir`, started with `-p=<port> -r=<attempts>`
/// and writes `{"fp": string|null}` to a loopback listener on that port.
#[derive(Debug, Clone)]
pub struct HelperFingerprint {
    pub helper: PathBuf,
    pub work_dir: PathBuf,
    pub attempts: u32,
    pub timeout: Duration,
}

impl HelperFingerprint {
    pub fn new(helper: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            helper: helper.into(),
            work_dir: work_dir.into(),
            attempts: DEFAULT_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Working copy of the helper; removed together with its error log on drop
struct ScopedHelper {
    path: PathBuf,
    error_log: PathBuf,
}

impl ScopedHelper {
    async fn install(helper: &Path, work_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(work_dir).await?;
        let path = work_dir.join(HELPER_COPY_NAME);
        tokio::fs::copy(helper, &path).await.map_err(|e| {
            error!("Failed to copy fingerprint helper {}: {}", helper.display(), e);
            e
        })?;
        Ok(Self {
            path,
            error_log: work_dir.join(HELPER_ERROR_LOG),
        })
    }
}

impl Drop for ScopedHelper {
    fn drop(&mut self) {
        for path in [&self.path, &self.error_log] {
            if let Err(e) = std::fs::remove_file(path)
                && e.kind() != std::io::ErrorKind::NotFound
            {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

fn parse_reply(bytes: &[u8]) -> Result<String> {
    let reply: HelperReply = serde_json::from_slice(bytes)
        .map_err(|e| LaunchError::Fingerprint(format!("invalid helper reply: {}", e)))?;
    match reply.fp {
        Some(fp) if !fp.is_empty() => Ok(fp),
        _ => Err(LaunchError::Fingerprint(
            "helper could not find a fingerprint".to_string(),
        )),
    }
}

#[async_trait::async_trait]
impl FingerprintSource for HelperFingerprint {
    #[instrument(skip(self), fields(helper = %self.helper.display()))]
    async fn fingerprint(&self) -> Result<String> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        debug!("Waiting for fingerprint on 127.0.0.1:{}", port);

        let reader = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await?;
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf).await?;
            Ok::<_, std::io::Error>(buf)
        });

        let scoped = ScopedHelper::install(&self.helper, &self.work_dir).await?;

        let mut command = Command::new(&scoped.path);
        command
            .arg(format!("-p={}", port))
            .arg(format!("-r={}", self.attempts))
            .current_dir(&self.work_dir)
            .kill_on_drop(true);

        let status = tokio::time::timeout(self.timeout, command.status())
            .await
            .map_err(|_| LaunchError::Fingerprint("helper timed out".to_string()))?
            .map_err(|source| LaunchError::ProcessStart {
                program: scoped.path.clone(),
                source,
            })?;
        if !status.success() {
            warn!("Fingerprint helper exited with {}", status);
        }

        let bytes = match tokio::time::timeout(self.timeout, reader).await {
            Ok(Ok(Ok(bytes))) => bytes,
            Ok(Ok(Err(e))) => return Err(LaunchError::Fingerprint(e.to_string())),
            Ok(Err(join)) => return Err(LaunchError::Fingerprint(join.to_string())),
            Err(_) => {
                return Err(LaunchError::Fingerprint(
                    "no reply from helper".to_string(),
                ));
            }
        };
        drop(scoped);

        let fp = parse_reply(&bytes)?;
        info!("Obtained hardware fingerprint");
        Ok(fp)
    }
}
