use tracing::{error, info, instrument, warn};

use ql_store::Configuration;

use crate::client::LauncherClient;
use crate::errors::{ClientError, Result};
use crate::responses::AuthResponse;

/// How the session for this run was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    /// No stored token; authenticated with username and password
    Fresh,
    /// Stored token accepted by the verify endpoint
    Verified,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub session_id: String,
    pub entitlement_ids: Vec<u32>,
    pub flow: AuthFlow,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("session_id", &self.session_id)
            .field("entitlement_ids", &self.entitlement_ids)
            .field("flow", &self.flow)
            .finish()
    }
}

impl Session {
    fn from_response(response: AuthResponse, flow: AuthFlow) -> Self {
        Self {
            token: response.token,
            session_id: response.session_id,
            entitlement_ids: response.entitlement_ids,
            flow,
        }
    }
}

/// Decides between token verification and fresh authentication and keeps
/// the stored token in step with what the identity service accepts.
#[derive(Debug, Clone)]
pub struct SessionManager {
    client: LauncherClient,
}

impl SessionManager {
    pub fn new(client: LauncherClient) -> Self {
        Self { client }
    }

    /// Authenticate for a launch.
    ///
    /// An empty stored token triggers credential authentication and the new
    /// token is persisted. A stored token is verified; if the service rejects
    /// it the token is cleared and `StaleToken` is returned without retrying.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, cfg: &Configuration) -> Result<Session> {
        if cfg.auth.is_empty() {
            info!("No stored token, authenticating with credentials");
            let response = self
                .client
                .authenticate_with_credentials(&cfg.core.username, &cfg.core.password)
                .await
                .map_err(|e| {
                    error!("Credential authentication failed: {}", e);
                    e
                })?;

            self.client
                .store()
                .update_auth_token(&response.token)
                .await?;
            return Ok(Session::from_response(response, AuthFlow::Fresh));
        }

        match self.client.verify_token().await {
            Ok(response) => {
                info!("Stored token verified");
                Ok(Session::from_response(response, AuthFlow::Verified))
            }
            Err(ClientError::AuthenticationFailed { endpoint }) => {
                warn!("Stored token rejected by {}, clearing it", endpoint);
                self.client.store().clear_auth_token().await?;
                Err(ClientError::StaleToken)
            }
            Err(e) => {
                error!("Token verification failed: {}", e);
                Err(e)
            }
        }
    }

    /// Check credentials that have not been saved yet.
    ///
    /// On success the returned token is staged so the first settings save
    /// persists it.
    #[instrument(skip(self, password))]
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<Session> {
        match self.client.pre_save_verify(username, password).await {
            Ok(response) => {
                self.client.store().stage_pending_token(&response.token)?;
                info!("Credentials verified");
                Ok(Session::from_response(response, AuthFlow::Fresh))
            }
            Err(ClientError::AuthenticationFailed { .. }) => {
                warn!("Credentials rejected during verification");
                Err(ClientError::CredentialMismatch)
            }
            Err(e) => Err(e),
        }
    }
}
