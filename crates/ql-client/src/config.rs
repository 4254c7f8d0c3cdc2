use std::time::Duration;

use url::Url;

use crate::errors::Result;

/// Remote hosts and fixed URLs
pub mod hosts {
    pub const SERVICES: &str = "services.bethesda.net";
    pub const BUILD_INFO: &str = "buildinfo.cdp.bethesda.net";
    pub const GAME_UPDATE: &str = "https://qc.syncore.org/launcher/v2/checkforupdate";
    pub const LAUNCHER_UPDATE: &str = "https://qc.syncore.org/qcl_latest_version.json";
}

/// Default `x-cdp-app-ver` / `x-cdp-lib-ver` values until the startup probe replaces them
pub const DEFAULT_APP_VERSION: &str = "1.36.2";
pub const DEFAULT_LIB_VERSION: &str = "1.36.2";

/// Running launcher version, compared against the remote "latest" value
pub const LAUNCHER_VERSION: f32 = 1.05;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(7);

/// Base URLs for the two API hosts plus the update metadata URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub services: String,
    pub build_info: String,
    pub game_update: String,
    pub launcher_update: String,
}

impl Endpoints {
    pub fn remote() -> Self {
        Self {
            services: format!("https://{}", hosts::SERVICES),
            build_info: format!("https://{}", hosts::BUILD_INFO),
            game_update: hosts::GAME_UPDATE.to_string(),
            launcher_update: hosts::LAUNCHER_UPDATE.to_string(),
        }
    }

    /// Point both API hosts at a local test server (`host:port` or a full URL)
    pub fn local(addr: &str) -> Self {
        let base = if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", addr.trim_end_matches('/'))
        };
        Self {
            services: base.clone(),
            build_info: base,
            ..Self::remote()
        }
    }

    /// Every URL pointed at `base`; update URLs under `/update/...`
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            services: base.to_string(),
            build_info: base.to_string(),
            game_update: format!("{}/update/game", base),
            launcher_update: format!("{}/update/launcher", base),
        }
    }

    pub fn auth(&self) -> Result<Url> {
        Ok(Url::parse(&format!("{}/cdp-user/auth", self.services))?)
    }

    pub fn verify(&self) -> Result<Url> {
        Ok(Url::parse(&format!("{}/cdp-user/verify/.json", self.services))?)
    }

    pub fn server_status(&self) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}/status/ext-server-status?product_id=5",
            self.services
        ))?)
    }

    pub fn game_code(&self, project_id: u32) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}/cdp-user/projects/{}/gamecode/.json",
            self.services, project_id
        ))?)
    }

    pub fn entitlement_info(&self, entitlement_id: u32) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}/projects/get_from_entitlement/{}/.json",
            self.build_info, entitlement_id
        ))?)
    }

    pub fn branch_info(&self, project_id: u32, branch_id: u32) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}/projects/{}/branches/{}/.json",
            self.build_info, project_id, branch_id
        ))?)
    }

    pub fn launch_args(&self, project_id: u32) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}/projects/{}/.json",
            self.build_info, project_id
        ))?)
    }

    pub fn game_update(&self) -> Result<Url> {
        Ok(Url::parse(&self.game_update)?)
    }

    pub fn launcher_update(&self) -> Result<Url> {
        Ok(Url::parse(&self.launcher_update)?)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::remote()
    }
}

/// Identifiers of the game product on the remote services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub entitlement_id: u32,
    pub project_id: u32,
    pub branch_name: String,
    /// Key under `platform.response` in the server status payload
    pub status_key: String,
}

impl Default for Product {
    fn default() -> Self {
        Self {
            entitlement_id: 48329,
            project_id: 11,
            branch_name: "Default".to_string(),
            status_key: "Quake".to_string(),
        }
    }
}

/// Configuration for [`crate::LauncherClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoints: Endpoints,
    pub product: Product,
    pub timeout: Duration,
    pub app_version: String,
    pub lib_version: String,
    pub launcher_version: f32,
    /// Value of the `x-src-fp` header
    pub source_fingerprint: String,
}

impl ClientConfig {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            product: Product::default(),
            timeout: DEFAULT_TIMEOUT,
            app_version: DEFAULT_APP_VERSION.to_string(),
            lib_version: DEFAULT_LIB_VERSION.to_string(),
            launcher_version: LAUNCHER_VERSION,
            source_fingerprint: random_source_fingerprint(),
        }
    }

    /// Whether either version header still carries its built-in default
    pub fn uses_default_versions(&self) -> bool {
        self.app_version == DEFAULT_APP_VERSION || self.lib_version == DEFAULT_LIB_VERSION
    }

    /// Replace defaulted version headers with the build version from the update manifest
    pub fn adopt_build_version(&mut self, build_version: &str) {
        if build_version.is_empty() {
            return;
        }
        if self.app_version == DEFAULT_APP_VERSION {
            self.app_version = build_version.to_string();
        }
        if self.lib_version == DEFAULT_LIB_VERSION {
            self.lib_version = build_version.to_string();
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(Endpoints::remote())
    }
}

/// Random 160-bit value, upper-case hex
pub fn random_source_fingerprint() -> String {
    let mut bytes = [0u8; 20];
    if getrandom::fill(&mut bytes).is_err() {
        // OS RNG unavailable: time-derived value
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        bytes[..8].copy_from_slice(&nanos.to_le_bytes());
    }
    hex::encode_upper(bytes)
}
