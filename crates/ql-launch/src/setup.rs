use tracing::{info, instrument, warn};

use ql_client::{LauncherClient, SessionManager};
use ql_store::{Configuration, CoreSettings, ExperimentalSettings, LauncherSettings};

use crate::errors::Result;
use crate::fingerprint::FingerprintSource;

/// Settings entered by the user for a first run or a settings change
#[derive(Debug, Clone, Default)]
pub struct SetupRequest {
    /// An empty fingerprint means "reuse the stored one or ask the helper"
    pub core: CoreSettings,
    pub experimental: ExperimentalSettings,
    pub launcher: LauncherSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupOutcome {
    /// Credentials were checked against the identity service
    pub credentials_verified: bool,
    pub fingerprint_refreshed: bool,
}

async fn existing_configuration(client: &LauncherClient) -> Result<Option<Configuration>> {
    let store = client.store();
    if !store.exists().await {
        return Ok(None);
    }
    match store.load_configuration().await {
        Ok(cfg) => Ok(Some(cfg)),
        Err(e) if e.is_corruption() => {
            warn!("Existing settings are unreadable, resetting: {}", e);
            store.delete().await?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Validate and persist settings.
///
/// The stored token is kept when the credentials are unchanged; otherwise
/// the credentials are verified first and the returned token is staged so
/// the save commits it together with everything else.
#[instrument(skip_all)]
pub async fn configure(
    client: &LauncherClient,
    fingerprints: &dyn FingerprintSource,
    request: SetupRequest,
) -> Result<SetupOutcome> {
    let SetupRequest {
        mut core,
        experimental,
        launcher,
    } = request;
    core.validate()?;

    let existing = existing_configuration(client).await?;
    let store = client.store();

    let mut fingerprint_refreshed = false;
    if core.fingerprint.is_empty() {
        match existing.as_ref().map(|cfg| cfg.core.fingerprint.as_str()) {
            Some(stored) if !stored.is_empty() => core.fingerprint = stored.to_string(),
            _ => {
                core.fingerprint = fingerprints.fingerprint().await?;
                fingerprint_refreshed = true;
            }
        }
    }
    store.stage_pending_fingerprint(core.fingerprint.clone())?;

    let token_reusable = existing
        .as_ref()
        .is_some_and(|cfg| cfg.core.same_credentials(&core) && !cfg.auth.is_empty());

    let credentials_verified = if token_reusable {
        info!("Credentials unchanged, keeping stored token");
        false
    } else {
        SessionManager::new(client.clone())
            .verify_credentials(&core.username, &core.password)
            .await?;
        true
    };

    store
        .save_configuration(&core, &experimental, &launcher)
        .await?;

    Ok(SetupOutcome {
        credentials_verified,
        fingerprint_refreshed,
    })
}
