use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue,
    USER_AGENT,
};
use tracing::error;

use ql_store::DataStore;

use crate::config::ClientConfig;
use crate::errors::{ClientError, Result};

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.2; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/53.0.2785.116 Safari/537.36";
const VENDOR_APP: &str = "Bethesda Launcher";
const VENDOR_PLATFORM: &str = "Win/32";

pub const X_CDP_APP: &str = "x-cdp-app";
pub const X_CDP_PLATFORM: &str = "x-cdp-platform";
pub const X_CDP_APP_VER: &str = "x-cdp-app-ver";
pub const X_CDP_LIB_VER: &str = "x-cdp-lib-ver";
pub const X_SRC_FP: &str = "x-src-fp";
pub const LAUNCHER_VER: &str = "lver";

/// Base header map a request starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseHeaders {
    /// Identity service calls with a JSON body
    ServicesJson,
    /// Identity service reads
    ServicesAny,
    /// Build-info host
    BuildInfo,
    /// Third-party update metadata
    Empty,
}

/// Optional header groups merged on top of the base map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtraHeaders {
    /// Vendor client identity: app, platform, fingerprint and versions
    pub vendor: bool,
    /// `Authorization: Token <stored token>`
    pub auth: bool,
    /// Launcher version marker
    pub launcher: bool,
}

impl ExtraHeaders {
    pub const NONE: Self = Self {
        vendor: false,
        auth: false,
        launcher: false,
    };
    pub const VENDOR: Self = Self {
        vendor: true,
        auth: false,
        launcher: false,
    };
    pub const VENDOR_AUTH: Self = Self {
        vendor: true,
        auth: true,
        launcher: false,
    };
    pub const LAUNCHER: Self = Self {
        vendor: false,
        auth: false,
        launcher: true,
    };
}

/// Headers a request declares; resolved by [`build_headers`] at send time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSet {
    pub base: BaseHeaders,
    pub extra: ExtraHeaders,
}

impl HeaderSet {
    pub const fn new(base: BaseHeaders, extra: ExtraHeaders) -> Self {
        Self { base, extra }
    }
}

fn value(name: &'static str, raw: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(raw).map_err(|_| ClientError::InvalidHeader { name })
}

pub fn base_headers(base: BaseHeaders) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let json = HeaderValue::from_static("application/json");

    match base {
        BaseHeaders::ServicesJson => {
            headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
            headers.insert(ACCEPT, json.clone());
            headers.insert(CONTENT_TYPE, json);
            headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        }
        BaseHeaders::ServicesAny => {
            headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
            headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
            headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        }
        BaseHeaders::BuildInfo => {
            headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
            headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
            headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        }
        BaseHeaders::Empty => {}
    }

    headers
}

/// Merge the base map with the requested extra groups.
///
/// The auth group reads the current token from `store` on every call.
pub async fn build_headers(
    set: HeaderSet,
    config: &ClientConfig,
    store: &DataStore,
) -> Result<HeaderMap> {
    let mut headers = base_headers(set.base);

    if set.extra.vendor {
        headers.insert(
            HeaderName::from_static(X_CDP_APP),
            HeaderValue::from_static(VENDOR_APP),
        );
        headers.insert(
            HeaderName::from_static(X_CDP_PLATFORM),
            HeaderValue::from_static(VENDOR_PLATFORM),
        );
        headers.insert(
            HeaderName::from_static(X_SRC_FP),
            value(X_SRC_FP, &config.source_fingerprint)?,
        );
        headers.insert(
            HeaderName::from_static(X_CDP_APP_VER),
            value(X_CDP_APP_VER, &config.app_version)?,
        );
        headers.insert(
            HeaderName::from_static(X_CDP_LIB_VER),
            value(X_CDP_LIB_VER, &config.lib_version)?,
        );
    }

    if set.extra.auth {
        let token = store.auth_token().await.map_err(|e| {
            error!("Could not read auth token for request headers: {}", e);
            e
        })?;
        let mut auth = value("authorization", &format!("Token {}", token))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
    }

    if set.extra.launcher {
        headers.insert(
            HeaderName::from_static(LAUNCHER_VER),
            value(LAUNCHER_VER, &format!("v{:.2}", config.launcher_version))?,
        );
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ql_store::{CoreSettings, ExperimentalSettings, LauncherSettings};
    use tempfile::TempDir;

    async fn store_with_token(token: &str) -> (DataStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = DataStore::in_dir(temp.path());
        store.stage_pending_token(token).unwrap();
        store
            .save_configuration(
                &CoreSettings {
                    username: "u".to_string(),
                    password: "p".to_string(),
                    file_path: "QuakeChampions.exe".into(),
                    language: "en".to_string(),
                    fingerprint: String::new(),
                },
                &ExperimentalSettings::default(),
                &LauncherSettings::default(),
            )
            .await
            .unwrap();
        (store, temp)
    }

    #[tokio::test]
    async fn test_vendor_and_auth_groups() {
        let (store, _temp) = store_with_token("abc123").await;
        let config = ClientConfig::default();

        let headers = build_headers(
            HeaderSet::new(BaseHeaders::ServicesJson, ExtraHeaders::VENDOR_AUTH),
            &config,
            &store,
        )
        .await
        .unwrap();

        assert_eq!(headers[AUTHORIZATION], "Token abc123");
        assert_eq!(headers[X_CDP_APP], "Bethesda Launcher");
        assert_eq!(headers[X_SRC_FP], config.source_fingerprint.as_str());
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert!(!headers.contains_key(LAUNCHER_VER));
    }

    #[tokio::test]
    async fn test_launcher_group_without_store_access() {
        let temp = TempDir::new().unwrap();
        let store = DataStore::in_dir(temp.path());
        let config = ClientConfig::default();

        let headers = build_headers(
            HeaderSet::new(BaseHeaders::Empty, ExtraHeaders::LAUNCHER),
            &config,
            &store,
        )
        .await
        .unwrap();

        assert_eq!(headers.len(), 1);
        assert_eq!(headers[LAUNCHER_VER], "v1.05");
    }

    #[tokio::test]
    async fn test_auth_group_fails_without_data_file() {
        let temp = TempDir::new().unwrap();
        let store = DataStore::in_dir(temp.path());

        let result = build_headers(
            HeaderSet::new(BaseHeaders::ServicesJson, ExtraHeaders::VENDOR_AUTH),
            &ClientConfig::default(),
            &store,
        )
        .await;

        assert!(matches!(result, Err(ClientError::Store(_))));
    }
}
