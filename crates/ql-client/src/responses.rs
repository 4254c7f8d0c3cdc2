use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::value::RawValue;
use tracing::{debug, error};

use crate::config::Product;
use crate::errors::{ClientError, Result};

/// Tag for each of the response shapes the launcher understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    PreSaveVerify,
    Auth,
    EntitlementInfo,
    BranchInfo,
    LaunchArgs,
    GameCode,
    ServerStatus,
    GameUpdate,
    LauncherUpdate,
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PreSaveVerify => "pre-save verification",
            Self::Auth => "auth/verify",
            Self::EntitlementInfo => "entitlement info",
            Self::BranchInfo => "branch info",
            Self::LaunchArgs => "launch args",
            Self::GameCode => "game code",
            Self::ServerStatus => "server status",
            Self::GameUpdate => "game update",
            Self::LauncherUpdate => "launcher update",
        };
        f.write_str(name)
    }
}

/// Body bytes held until they are decoded into the shape `kind` names
#[derive(Debug)]
pub struct RawResponse {
    pub kind: ResponseKind,
    pub data: Box<RawValue>,
}

impl RawResponse {
    pub fn from_body(kind: ResponseKind, body: &str) -> Result<Self> {
        let data = serde_json::from_str::<Box<RawValue>>(body)
            .map_err(|source| ClientError::Decode { kind, source })?;
        Ok(Self { kind, data })
    }
}

fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }))
}

#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthResponse {
    pub token: String,
    pub session_id: String,
    pub entitlement_ids: Vec<u32>,
    pub beam_client_api_key: String,
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse")
            .field("token", &"[REDACTED]")
            .field("session_id", &self.session_id)
            .field("entitlement_ids", &self.entitlement_ids)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Project {
    pub id: u32,
    pub name: String,
    pub check_filter: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Branch {
    pub id: u32,
    pub project: u32,
    pub branch_type: u32,
    #[serde(alias = "build_id")]
    pub build: u64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EntitlementInfoResponse {
    pub projects: Vec<Project>,
    pub branches: Vec<Branch>,
}

impl EntitlementInfoResponse {
    /// Branch of `product.project_id` whose name matches `product.branch_name`, ignoring case
    pub fn find_branch(&self, product: &Product) -> Option<&Branch> {
        self.branches.iter().find(|b| {
            b.project == product.project_id && b.name.eq_ignore_ascii_case(&product.branch_name)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BranchInfoResponse {
    pub storage_url: String,
    pub launchinfo_list: Vec<u32>,
    pub available: bool,
    pub project: u32,
    pub name: String,
    pub build: u64,
    pub on_deck_build: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LaunchInfoItem {
    pub architecture: u32,
    pub description: String,
    pub exe_path: String,
    pub launch_args: String,
    pub name: String,
    pub platform: u32,
    pub registry: String,
    pub working_dir: String,
}

impl LaunchInfoItem {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Launch-info entries keyed by their numeric id in the payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LaunchInfoSet {
    #[serde(rename = "8")]
    pub retail: LaunchInfoItem,
    #[serde(rename = "9")]
    pub temp: LaunchInfoItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchVariant {
    Retail,
    Temp,
}

impl LaunchVariant {
    pub fn from_key(key: u32) -> Option<Self> {
        match key {
            8 => Some(Self::Retail),
            9 => Some(Self::Temp),
            _ => None,
        }
    }

    pub fn key(self) -> u32 {
        match self {
            Self::Retail => 8,
            Self::Temp => 9,
        }
    }
}

impl LaunchInfoSet {
    pub fn item(&self, variant: LaunchVariant) -> &LaunchInfoItem {
        match variant {
            LaunchVariant::Retail => &self.retail,
            LaunchVariant::Temp => &self.temp,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.retail.is_empty() && self.temp.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LaunchArgsResponse {
    pub name: String,
    pub default_branch: u32,
    pub install_folder: String,
    pub require_latest: bool,
    pub server_status: bool,
    pub launchinfo_set: LaunchInfoSet,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameCodeResponse {
    pub gamecode: String,
    pub project: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlatformStatus {
    pub code: i64,
    pub message: String,
    pub response: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerStatusResponse {
    pub platform: PlatformStatus,
}

impl ServerStatusResponse {
    pub fn status_of(&self, key: &str) -> Option<&str> {
        self.platform.response.get(key).map(String::as_str)
    }

    pub fn is_down(&self, key: &str) -> bool {
        self.status_of(key)
            .is_some_and(|s| s.eq_ignore_ascii_case("down"))
    }
}

/// One manifest entry: install-relative path and expected SHA-256 hex digest
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileHash {
    pub file: String,
    pub hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameUpdateResponse {
    pub id: u64,
    #[serde(deserialize_with = "lenient_date")]
    pub date: Option<DateTime<Utc>>,
    pub hashes: Vec<FileHash>,
    /// Build version, also used for the client version headers
    pub bver: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LauncherUpdateResponse {
    pub latest: f32,
    #[serde(deserialize_with = "lenient_date")]
    pub date: Option<DateTime<Utc>>,
    pub url: String,
}

/// Decoded and validated response, one variant per [`ResponseKind`]
#[derive(Debug, Clone)]
pub enum RemoteResponse {
    PreSaveVerify(AuthResponse),
    Auth(AuthResponse),
    EntitlementInfo(EntitlementInfoResponse),
    BranchInfo(BranchInfoResponse),
    LaunchArgs(LaunchArgsResponse),
    GameCode(GameCodeResponse),
    ServerStatus(ServerStatusResponse),
    GameUpdate(GameUpdateResponse),
    LauncherUpdate(LauncherUpdateResponse),
}

impl RemoteResponse {
    pub fn kind(&self) -> ResponseKind {
        match self {
            Self::PreSaveVerify(_) => ResponseKind::PreSaveVerify,
            Self::Auth(_) => ResponseKind::Auth,
            Self::EntitlementInfo(_) => ResponseKind::EntitlementInfo,
            Self::BranchInfo(_) => ResponseKind::BranchInfo,
            Self::LaunchArgs(_) => ResponseKind::LaunchArgs,
            Self::GameCode(_) => ResponseKind::GameCode,
            Self::ServerStatus(_) => ResponseKind::ServerStatus,
            Self::GameUpdate(_) => ResponseKind::GameUpdate,
            Self::LauncherUpdate(_) => ResponseKind::LauncherUpdate,
        }
    }
}

fn decode<T: for<'de> Deserialize<'de>>(raw: &RawResponse) -> Result<T> {
    serde_json::from_str(raw.data.get()).map_err(|source| {
        error!("Could not decode {} response: {}", raw.kind, source);
        ClientError::Decode {
            kind: raw.kind,
            source,
        }
    })
}

fn invalid(kind: ResponseKind, reason: impl Into<String>) -> ClientError {
    let reason = reason.into();
    error!("{} response failed validation: {}", kind, reason);
    ClientError::Validation { kind, reason }
}

fn validate_auth(kind: ResponseKind, r: &AuthResponse, product: &Product) -> Result<()> {
    if r.token.is_empty() {
        return Err(invalid(kind, "empty token"));
    }
    if r.entitlement_ids.is_empty() {
        return Err(invalid(kind, "no entitlement ids present"));
    }
    if !r.entitlement_ids.contains(&product.entitlement_id) {
        return Err(invalid(kind, "account does not own the game"));
    }
    Ok(())
}

/// Decode `raw` into the shape its tag names and run that shape's validation
pub fn parse_remote_response(raw: &RawResponse, product: &Product) -> Result<RemoteResponse> {
    let kind = raw.kind;

    let response = match kind {
        ResponseKind::PreSaveVerify | ResponseKind::Auth => {
            let r: AuthResponse = decode(raw)?;
            validate_auth(kind, &r, product)?;
            if kind == ResponseKind::PreSaveVerify {
                RemoteResponse::PreSaveVerify(r)
            } else {
                RemoteResponse::Auth(r)
            }
        }
        ResponseKind::EntitlementInfo => {
            let r: EntitlementInfoResponse = decode(raw)?;
            if r.projects.is_empty() {
                return Err(invalid(kind, "no project info present"));
            }
            if r.branches.is_empty() {
                return Err(invalid(kind, "no branch info present"));
            }
            RemoteResponse::EntitlementInfo(r)
        }
        ResponseKind::BranchInfo => {
            let r: BranchInfoResponse = decode(raw)?;
            if r.launchinfo_list.is_empty() {
                return Err(invalid(kind, "no launch info present"));
            }
            RemoteResponse::BranchInfo(r)
        }
        ResponseKind::LaunchArgs => RemoteResponse::LaunchArgs(decode(raw)?),
        ResponseKind::GameCode => {
            let r: GameCodeResponse = decode(raw)?;
            if r.gamecode.is_empty() {
                return Err(invalid(kind, "empty game code"));
            }
            RemoteResponse::GameCode(r)
        }
        ResponseKind::ServerStatus => {
            let r: ServerStatusResponse = decode(raw)?;
            if r.platform.message.is_empty() {
                return Err(invalid(kind, "empty platform message"));
            }
            if !r.platform.message.eq_ignore_ascii_case("success") {
                return Err(invalid(
                    kind,
                    format!("non-successful platform message: {}", r.platform.message),
                ));
            }
            RemoteResponse::ServerStatus(r)
        }
        ResponseKind::GameUpdate => {
            let r: GameUpdateResponse = decode(raw)?;
            if r.hashes.is_empty() {
                return Err(invalid(kind, "empty file hash list"));
            }
            RemoteResponse::GameUpdate(r)
        }
        ResponseKind::LauncherUpdate => RemoteResponse::LauncherUpdate(decode(raw)?),
    };

    debug!("Parsed {} response", kind);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(kind: ResponseKind, body: &str) -> RawResponse {
        RawResponse::from_body(kind, body).unwrap()
    }

    fn parse(kind: ResponseKind, body: &str) -> Result<RemoteResponse> {
        parse_remote_response(&raw(kind, body), &Product::default())
    }

    #[test]
    fn test_auth_requires_product_entitlement() {
        let ok = parse(
            ResponseKind::Auth,
            r#"{"token":"t","session_id":"s","entitlement_ids":[1,48329]}"#,
        )
        .unwrap();
        assert_eq!(ok.kind(), ResponseKind::Auth);

        let missing = parse(
            ResponseKind::Auth,
            r#"{"token":"t","entitlement_ids":[1,2]}"#,
        );
        assert!(matches!(
            missing,
            Err(ClientError::Validation {
                kind: ResponseKind::Auth,
                ..
            })
        ));

        let empty_token = parse(ResponseKind::PreSaveVerify, r#"{"entitlement_ids":[48329]}"#);
        assert!(matches!(
            empty_token,
            Err(ClientError::Validation {
                kind: ResponseKind::PreSaveVerify,
                ..
            })
        ));
    }

    #[test]
    fn test_pre_save_dispatches_to_its_own_variant() {
        let r = parse(
            ResponseKind::PreSaveVerify,
            r#"{"token":"t","entitlement_ids":[48329]}"#,
        )
        .unwrap();
        assert!(matches!(r, RemoteResponse::PreSaveVerify(_)));
    }

    #[test]
    fn test_branch_info_requires_launch_info() {
        let err = parse(ResponseKind::BranchInfo, r#"{"launchinfo_list":[]}"#).unwrap_err();
        assert!(err.is_request_failure());

        let ok = parse(ResponseKind::BranchInfo, r#"{"launchinfo_list":[8],"build":123}"#);
        assert!(matches!(ok, Ok(RemoteResponse::BranchInfo(b)) if b.launchinfo_list == vec![8]));
    }

    #[test]
    fn test_entitlement_info_finds_default_branch() {
        let r = parse(
            ResponseKind::EntitlementInfo,
            r#"{
                "projects":[{"id":11,"name":"Quake Champions"}],
                "branches":[
                    {"id":1,"project":12,"name":"Default","build_id":5},
                    {"id":2,"project":11,"name":"PTS","build_id":6},
                    {"id":3,"project":11,"name":"default","build_id":7}
                ]
            }"#,
        )
        .unwrap();

        let RemoteResponse::EntitlementInfo(info) = r else {
            panic!("wrong variant");
        };
        let branch = info.find_branch(&Product::default()).unwrap();
        assert_eq!(branch.id, 3);
        assert_eq!(branch.build, 7);
    }

    #[test]
    fn test_launch_info_set_keys() {
        let r = parse(
            ResponseKind::LaunchArgs,
            r#"{"launchinfo_set":{"8":{"launch_args":"--retail"},"9":{"launch_args":"--temp"}}}"#,
        )
        .unwrap();
        let RemoteResponse::LaunchArgs(args) = r else {
            panic!("wrong variant");
        };

        assert_eq!(
            args.launchinfo_set
                .item(LaunchVariant::from_key(9).unwrap())
                .launch_args,
            "--temp"
        );
        assert_eq!(LaunchVariant::from_key(10), None);
        assert_eq!(LaunchVariant::Retail.key(), 8);
    }

    #[test]
    fn test_server_status_message_must_be_success() {
        let down = parse(
            ResponseKind::ServerStatus,
            r#"{"platform":{"code":200,"message":"SUCCESS","response":{"Quake":"DOWN"}}}"#,
        )
        .unwrap();
        let RemoteResponse::ServerStatus(status) = down else {
            panic!("wrong variant");
        };
        assert!(status.is_down("Quake"));

        let failed = parse(
            ResponseKind::ServerStatus,
            r#"{"platform":{"message":"error"}}"#,
        );
        assert!(matches!(failed, Err(ClientError::Validation { .. })));
    }

    #[test]
    fn test_game_update_requires_hashes_and_tolerates_odd_dates() {
        let ok = parse(
            ResponseKind::GameUpdate,
            r#"{"id":1,"date":"not a date","bver":"1.40","hashes":[{"file":"a/b.exe","hash":"ab"}]}"#,
        )
        .unwrap();
        let RemoteResponse::GameUpdate(update) = ok else {
            panic!("wrong variant");
        };
        assert_eq!(update.date, None);
        assert_eq!(update.hashes.len(), 1);

        assert!(parse(ResponseKind::GameUpdate, r#"{"hashes":[]}"#).is_err());
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        let result = RawResponse::from_body(ResponseKind::GameCode, "<html>");
        assert!(matches!(
            result,
            Err(ClientError::Decode {
                kind: ResponseKind::GameCode,
                ..
            })
        ));

        let wrong_shape = parse(ResponseKind::GameCode, r#"{"gamecode": 5}"#);
        assert!(matches!(wrong_shape, Err(ClientError::Decode { .. })));
    }
}
