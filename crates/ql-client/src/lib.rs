//! Remote protocol client for qlauncher.
//!
//! Requests are typed: each [`RemoteRequest`] names its verb, URL, header
//! groups and the response shape it expects. [`LauncherClient::send`] runs the
//! exchange, turns 401 into [`ClientError::AuthenticationFailed`] and any
//! other non-2xx status into [`ClientError::Status`], then decodes the body
//! through [`parse_remote_response`], which validates every shape before it
//! reaches the caller.
//!
//! [`SessionManager`] sits on top and owns the token lifecycle: verify a
//! stored token, authenticate fresh when there is none, clear a rejected one.

pub mod client;
pub mod config;
pub mod errors;
pub mod headers;
pub mod requests;
pub mod responses;
pub mod session;

pub use client::{LauncherClient, ServerHealth};
pub use config::{ClientConfig, Endpoints, PROBE_TIMEOUT, Product};
pub use errors::{ClientError, Result};
pub use headers::{BaseHeaders, ExtraHeaders, HeaderSet};
pub use requests::RemoteRequest;
pub use responses::{
    AuthResponse, Branch, BranchInfoResponse, EntitlementInfoResponse, FileHash,
    GameCodeResponse, GameUpdateResponse, LaunchArgsResponse, LaunchInfoItem, LaunchInfoSet,
    LaunchVariant, LauncherUpdateResponse, RawResponse, RemoteResponse, ResponseKind,
    ServerStatusResponse, parse_remote_response,
};
pub use session::{AuthFlow, Session, SessionManager};
