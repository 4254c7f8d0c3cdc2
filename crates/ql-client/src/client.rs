use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, instrument, warn};

use ql_store::DataStore;

use crate::config::ClientConfig;
use crate::errors::{ClientError, Result};
use crate::headers::build_headers;
use crate::requests::{
    AuthRequest, BranchInfoRequest, EntitlementInfoRequest, GameCodeRequest, GameUpdateRequest,
    LaunchArgsRequest, LauncherUpdateRequest, PreSaveVerifyRequest, RemoteRequest,
    ServerStatusRequest, VerifyRequest,
};
use crate::responses::{
    AuthResponse, BranchInfoResponse, EntitlementInfoResponse, GameCodeResponse,
    GameUpdateResponse, LaunchArgsResponse, LauncherUpdateResponse, RawResponse,
    ServerStatusResponse, parse_remote_response,
};

/// Outcome of the best-effort server status probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerHealth {
    Online,
    Offline,
    Unknown(String),
}

/// HTTP client for the identity, build-info and update services
#[derive(Debug, Clone)]
pub struct LauncherClient {
    config: Arc<ClientConfig>,
    http: Client,
    store: Arc<DataStore>,
}

impl LauncherClient {
    pub fn new(config: ClientConfig, store: Arc<DataStore>) -> Result<Self> {
        let timeout = config.timeout;
        Self::with_parts(Arc::new(config), store, timeout)
    }

    fn with_parts(config: Arc<ClientConfig>, store: Arc<DataStore>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            config,
            http,
            store,
        })
    }

    /// Same configuration with a different overall request timeout
    pub fn with_timeout(&self, timeout: Duration) -> Result<Self> {
        Self::with_parts(self.config.clone(), self.store.clone(), timeout)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    /// Perform one exchange: build headers, send, classify the status,
    /// then decode and validate the body into the request's response type.
    #[instrument(skip(self, request), fields(kind = %R::KIND))]
    pub async fn send<R: RemoteRequest>(&self, request: &R) -> Result<R::Response> {
        let url = request.endpoint(&self.config.endpoints)?;
        let headers = build_headers(R::HEADERS, &self.config, &self.store).await?;

        let mut builder = self
            .http
            .request(request.method(), url.clone())
            .headers(headers);
        if let Some(body) = request.body()? {
            builder = builder.json(&body);
        }

        debug!("{} {}", request.method(), url);
        let response = builder.send().await.map_err(|e| {
            error!("Request to {} failed: {}", url, e);
            e
        })?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            warn!("{} returned 401 Unauthorized", url);
            return Err(ClientError::AuthenticationFailed {
                endpoint: url.to_string(),
            });
        }
        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            error!("{} returned HTTP {}: {}", url, status, snippet);
            return Err(ClientError::Status {
                status,
                endpoint: url.to_string(),
            });
        }

        let raw = RawResponse::from_body(R::KIND, &body)?;
        let parsed = parse_remote_response(&raw, &self.config.product)?;
        let actual = parsed.kind();

        R::from_remote(parsed).ok_or(ClientError::UnexpectedResponse {
            expected: R::KIND,
            actual,
        })
    }

    pub async fn authenticate_with_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthResponse> {
        self.send(&AuthRequest::new(username, password)).await
    }

    pub async fn verify_token(&self) -> Result<AuthResponse> {
        self.send(&VerifyRequest::default()).await
    }

    pub async fn pre_save_verify(&self, username: &str, password: &str) -> Result<AuthResponse> {
        self.send(&PreSaveVerifyRequest::new(username, password))
            .await
    }

    pub async fn entitlement_info(&self) -> Result<EntitlementInfoResponse> {
        self.send(&EntitlementInfoRequest {
            entitlement_id: self.config.product.entitlement_id,
        })
        .await
    }

    pub async fn branch_info(&self, project_id: u32, branch_id: u32) -> Result<BranchInfoResponse> {
        self.send(&BranchInfoRequest {
            project_id,
            branch_id,
        })
        .await
    }

    pub async fn launch_args(&self, project_id: u32) -> Result<LaunchArgsResponse> {
        self.send(&LaunchArgsRequest { project_id }).await
    }

    pub async fn game_code(&self, project_id: u32) -> Result<GameCodeResponse> {
        self.send(&GameCodeRequest { project_id }).await
    }

    pub async fn server_status(&self) -> Result<ServerStatusResponse> {
        self.send(&ServerStatusRequest).await
    }

    pub async fn game_update(&self) -> Result<GameUpdateResponse> {
        self.send(&GameUpdateRequest).await
    }

    pub async fn launcher_update(&self) -> Result<LauncherUpdateResponse> {
        self.send(&LauncherUpdateRequest).await
    }

    /// Server status that never fails; problems come back as `Unknown`
    #[instrument(skip(self))]
    pub async fn check_server_status(&self) -> ServerHealth {
        match self.server_status().await {
            Ok(status) if status.is_down(&self.config.product.status_key) => {
                warn!("Game servers report DOWN");
                ServerHealth::Offline
            }
            Ok(_) => {
                info!("Game servers are online");
                ServerHealth::Online
            }
            Err(e) => {
                warn!("Server status check failed: {}", e);
                ServerHealth::Unknown(e.to_string())
            }
        }
    }
}
