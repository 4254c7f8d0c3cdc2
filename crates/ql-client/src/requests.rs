use std::fmt;

use reqwest::Method;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use crate::config::Endpoints;
use crate::errors::Result;
use crate::headers::{BaseHeaders, ExtraHeaders, HeaderSet};
use crate::responses::{
    AuthResponse, BranchInfoResponse, EntitlementInfoResponse, GameCodeResponse,
    GameUpdateResponse, LaunchArgsResponse, LauncherUpdateResponse, RemoteResponse, ResponseKind,
    ServerStatusResponse,
};

/// A typed exchange with one remote endpoint.
///
/// The request declares its verb, URL, header groups, optional JSON body and
/// the response shape dispatch must produce for it.
pub trait RemoteRequest: fmt::Debug {
    type Response;

    const KIND: ResponseKind;
    const HEADERS: HeaderSet;

    fn method(&self) -> Method;

    fn endpoint(&self, endpoints: &Endpoints) -> Result<Url>;

    /// JSON body; `None` for requests that carry no content
    fn body(&self) -> Result<Option<serde_json::Value>> {
        Ok(None)
    }

    fn from_remote(response: RemoteResponse) -> Option<Self::Response>;
}

fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Serialize)]
struct CredentialsBody<'a> {
    username: &'a str,
    session_id: &'a str,
    password: &'a str,
}

/// Fresh username/password authentication
#[derive(Clone)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
    pub session_id: String,
}

impl AuthRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            session_id: new_session_id(),
        }
    }

    fn credentials_body(&self) -> Result<Option<serde_json::Value>> {
        Ok(Some(serde_json::to_value(CredentialsBody {
            username: &self.username,
            session_id: &self.session_id,
            password: &self.password,
        })?))
    }
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("session_id", &self.session_id)
            .finish()
    }
}

impl RemoteRequest for AuthRequest {
    type Response = AuthResponse;
    const KIND: ResponseKind = ResponseKind::Auth;
    const HEADERS: HeaderSet = HeaderSet::new(BaseHeaders::ServicesJson, ExtraHeaders::VENDOR);

    fn method(&self) -> Method {
        Method::POST
    }

    fn endpoint(&self, endpoints: &Endpoints) -> Result<Url> {
        endpoints.auth()
    }

    fn body(&self) -> Result<Option<serde_json::Value>> {
        self.credentials_body()
    }

    fn from_remote(response: RemoteResponse) -> Option<Self::Response> {
        match response {
            RemoteResponse::Auth(r) => Some(r),
            _ => None,
        }
    }
}

/// Same exchange as [`AuthRequest`] for credentials that are not saved yet
#[derive(Clone)]
pub struct PreSaveVerifyRequest(pub AuthRequest);

impl PreSaveVerifyRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self(AuthRequest::new(username, password))
    }
}

impl fmt::Debug for PreSaveVerifyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PreSaveVerifyRequest").field(&self.0).finish()
    }
}

impl RemoteRequest for PreSaveVerifyRequest {
    type Response = AuthResponse;
    const KIND: ResponseKind = ResponseKind::PreSaveVerify;
    const HEADERS: HeaderSet = HeaderSet::new(BaseHeaders::ServicesJson, ExtraHeaders::VENDOR);

    fn method(&self) -> Method {
        Method::POST
    }

    fn endpoint(&self, endpoints: &Endpoints) -> Result<Url> {
        endpoints.auth()
    }

    fn body(&self) -> Result<Option<serde_json::Value>> {
        self.0.credentials_body()
    }

    fn from_remote(response: RemoteResponse) -> Option<Self::Response> {
        match response {
            RemoteResponse::PreSaveVerify(r) => Some(r),
            _ => None,
        }
    }
}

/// Token-based session verification
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub session_id: String,
}

impl Default for VerifyRequest {
    fn default() -> Self {
        Self {
            session_id: new_session_id(),
        }
    }
}

impl RemoteRequest for VerifyRequest {
    type Response = AuthResponse;
    const KIND: ResponseKind = ResponseKind::Auth;
    const HEADERS: HeaderSet =
        HeaderSet::new(BaseHeaders::ServicesJson, ExtraHeaders::VENDOR_AUTH);

    fn method(&self) -> Method {
        Method::POST
    }

    fn endpoint(&self, endpoints: &Endpoints) -> Result<Url> {
        endpoints.verify()
    }

    fn body(&self) -> Result<Option<serde_json::Value>> {
        Ok(Some(serde_json::json!({ "session_id": self.session_id })))
    }

    fn from_remote(response: RemoteResponse) -> Option<Self::Response> {
        match response {
            RemoteResponse::Auth(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EntitlementInfoRequest {
    pub entitlement_id: u32,
}

impl RemoteRequest for EntitlementInfoRequest {
    type Response = EntitlementInfoResponse;
    const KIND: ResponseKind = ResponseKind::EntitlementInfo;
    const HEADERS: HeaderSet = HeaderSet::new(BaseHeaders::ServicesJson, ExtraHeaders::VENDOR);

    fn method(&self) -> Method {
        Method::POST
    }

    fn endpoint(&self, endpoints: &Endpoints) -> Result<Url> {
        endpoints.entitlement_info(self.entitlement_id)
    }

    fn body(&self) -> Result<Option<serde_json::Value>> {
        Ok(Some(serde_json::json!({ "entitlement_ids": [0] })))
    }

    fn from_remote(response: RemoteResponse) -> Option<Self::Response> {
        match response {
            RemoteResponse::EntitlementInfo(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BranchInfoRequest {
    pub project_id: u32,
    pub branch_id: u32,
}

impl RemoteRequest for BranchInfoRequest {
    type Response = BranchInfoResponse;
    const KIND: ResponseKind = ResponseKind::BranchInfo;
    const HEADERS: HeaderSet = HeaderSet::new(BaseHeaders::BuildInfo, ExtraHeaders::NONE);

    fn method(&self) -> Method {
        Method::GET
    }

    fn endpoint(&self, endpoints: &Endpoints) -> Result<Url> {
        endpoints.branch_info(self.project_id, self.branch_id)
    }

    fn from_remote(response: RemoteResponse) -> Option<Self::Response> {
        match response {
            RemoteResponse::BranchInfo(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LaunchArgsRequest {
    pub project_id: u32,
}

impl RemoteRequest for LaunchArgsRequest {
    type Response = LaunchArgsResponse;
    const KIND: ResponseKind = ResponseKind::LaunchArgs;
    const HEADERS: HeaderSet = HeaderSet::new(BaseHeaders::BuildInfo, ExtraHeaders::NONE);

    fn method(&self) -> Method {
        Method::GET
    }

    fn endpoint(&self, endpoints: &Endpoints) -> Result<Url> {
        endpoints.launch_args(self.project_id)
    }

    fn from_remote(response: RemoteResponse) -> Option<Self::Response> {
        match response {
            RemoteResponse::LaunchArgs(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameCodeRequest {
    pub project_id: u32,
}

impl RemoteRequest for GameCodeRequest {
    type Response = GameCodeResponse;
    const KIND: ResponseKind = ResponseKind::GameCode;
    const HEADERS: HeaderSet =
        HeaderSet::new(BaseHeaders::ServicesAny, ExtraHeaders::VENDOR_AUTH);

    fn method(&self) -> Method {
        Method::GET
    }

    fn endpoint(&self, endpoints: &Endpoints) -> Result<Url> {
        endpoints.game_code(self.project_id)
    }

    fn from_remote(response: RemoteResponse) -> Option<Self::Response> {
        match response {
            RemoteResponse::GameCode(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServerStatusRequest;

impl RemoteRequest for ServerStatusRequest {
    type Response = ServerStatusResponse;
    const KIND: ResponseKind = ResponseKind::ServerStatus;
    const HEADERS: HeaderSet = HeaderSet::new(BaseHeaders::ServicesAny, ExtraHeaders::NONE);

    fn method(&self) -> Method {
        Method::GET
    }

    fn endpoint(&self, endpoints: &Endpoints) -> Result<Url> {
        endpoints.server_status()
    }

    fn from_remote(response: RemoteResponse) -> Option<Self::Response> {
        match response {
            RemoteResponse::ServerStatus(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GameUpdateRequest;

impl RemoteRequest for GameUpdateRequest {
    type Response = GameUpdateResponse;
    const KIND: ResponseKind = ResponseKind::GameUpdate;
    const HEADERS: HeaderSet = HeaderSet::new(BaseHeaders::Empty, ExtraHeaders::LAUNCHER);

    fn method(&self) -> Method {
        Method::GET
    }

    fn endpoint(&self, endpoints: &Endpoints) -> Result<Url> {
        endpoints.game_update()
    }

    fn from_remote(response: RemoteResponse) -> Option<Self::Response> {
        match response {
            RemoteResponse::GameUpdate(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LauncherUpdateRequest;

impl RemoteRequest for LauncherUpdateRequest {
    type Response = LauncherUpdateResponse;
    const KIND: ResponseKind = ResponseKind::LauncherUpdate;
    const HEADERS: HeaderSet = HeaderSet::new(BaseHeaders::Empty, ExtraHeaders::LAUNCHER);

    fn method(&self) -> Method {
        Method::GET
    }

    fn endpoint(&self, endpoints: &Endpoints) -> Result<Url> {
        endpoints.launcher_update()
    }

    fn from_remote(response: RemoteResponse) -> Option<Self::Response> {
        match response {
            RemoteResponse::LauncherUpdate(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_body_and_session_id() {
        let a = AuthRequest::new("user", "pw");
        let b = AuthRequest::new("user", "pw");
        assert_ne!(a.session_id, b.session_id);
        assert!(Uuid::parse_str(&a.session_id).is_ok());

        let body = a.body().unwrap().unwrap();
        assert_eq!(body["username"], "user");
        assert_eq!(body["password"], "pw");
        assert_eq!(body["session_id"], a.session_id.as_str());
    }

    #[test]
    fn test_debug_hides_password() {
        let rendered = format!("{:?}", PreSaveVerifyRequest::new("user", "hunter2"));
        assert!(rendered.contains("user"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_header_groups_per_request() {
        assert_eq!(AuthRequest::HEADERS.extra, ExtraHeaders::VENDOR);
        assert_eq!(VerifyRequest::HEADERS.extra, ExtraHeaders::VENDOR_AUTH);
        assert_eq!(GameCodeRequest::HEADERS.extra, ExtraHeaders::VENDOR_AUTH);
        assert_eq!(EntitlementInfoRequest::HEADERS.extra, ExtraHeaders::VENDOR);
        assert_eq!(GameUpdateRequest::HEADERS.extra, ExtraHeaders::LAUNCHER);
        assert_eq!(LauncherUpdateRequest::HEADERS.extra, ExtraHeaders::LAUNCHER);
        assert_eq!(BranchInfoRequest::HEADERS.extra, ExtraHeaders::NONE);
        assert_eq!(ServerStatusRequest::HEADERS.extra, ExtraHeaders::NONE);
    }

    #[test]
    fn test_reads_are_get_without_body() {
        let request = BranchInfoRequest {
            project_id: 11,
            branch_id: 3,
        };
        assert_eq!(request.method(), Method::GET);
        assert!(request.body().unwrap().is_none());
        assert_eq!(VerifyRequest::default().method(), Method::POST);
    }

    #[test]
    fn test_from_remote_rejects_other_variants() {
        let response = RemoteResponse::Auth(AuthResponse::default());
        assert!(PreSaveVerifyRequest::from_remote(response.clone()).is_none());
        assert!(AuthRequest::from_remote(response).is_some());
    }
}
