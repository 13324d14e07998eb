use ipnet::IpNet;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::access::ip_range::parse_range_list;
use crate::access::IpRange;
use crate::auth::{TrustedNetworks, WhitelistMode};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub access: AccessConfig,
    pub tokens: TokenConfig,
    pub tracks: TrackConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Proxy CIDRs whose `X-Forwarded-For` is honoured. Empty trusts none.
    pub trusted_proxies: Vec<String>,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Evaluated in order; the first containing range wins.
    pub auto_login_ip_ranges: Vec<IpRange>,
    pub groups_file: PathBuf,
    pub users_file: PathBuf,
    pub access_denied_url: String,
    pub session_idle_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub private_key_path: Option<PathBuf>,
    pub public_key_path: Option<PathBuf>,
    pub ttl_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Root of `organism/assembly/type/file` track data.
    pub data_dir: PathBuf,
    /// JBrowse2 metadata: `assemblies/*.json` and `tracks/...`.
    pub metadata_dir: PathBuf,
    pub trusted_networks: Vec<String>,
    pub whitelist_mode: WhitelistMode,
    /// Public URL prefix of the site, used when rewriting track URIs.
    pub site_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub enable_audit_logging: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl AppConfig {
    /// Profile from `APP_ENV`, or the YAML file named by `MOOP_CONFIG`, then
    /// per-field environment overrides.
    pub fn from_env() -> Self {
        let base = match env::var("MOOP_CONFIG") {
            Ok(path) => Self::from_yaml_file(Path::new(&path)).unwrap_or_else(|e| {
                tracing::warn!("{}; falling back to environment profile", e);
                Self::profile(env::var("APP_ENV").ok().as_deref())
            }),
            Err(_) => Self::profile(env::var("APP_ENV").ok().as_deref()),
        };

        base.with_env_overrides()
    }

    pub fn profile(app_env: Option<&str>) -> Self {
        match app_env {
            Some("production") | Some("prod") => Self::production(),
            Some("staging") | Some("stage") => Self::staging(),
            _ => Self::development(),
        }
    }

    /// Fields missing from the file take development defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Server overrides
        if let Some(v) = lookup("MOOP_PORT").or_else(|| lookup("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = lookup("SERVER_TRUSTED_PROXIES") {
            self.server.trusted_proxies = split_list(&v);
        }
        if let Some(v) = lookup("SERVER_ENABLE_REQUEST_LOGGING") {
            self.server.enable_request_logging = v.parse().unwrap_or(self.server.enable_request_logging);
        }

        // Access overrides
        if let Some(v) = lookup("ACCESS_AUTO_LOGIN_IP_RANGES") {
            self.access.auto_login_ip_ranges = parse_range_list(&v);
        }
        if let Some(v) = lookup("ACCESS_GROUPS_FILE") {
            self.access.groups_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("ACCESS_USERS_FILE") {
            self.access.users_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("ACCESS_DENIED_URL") {
            self.access.access_denied_url = v;
        }
        if let Some(v) = lookup("ACCESS_SESSION_IDLE_MINUTES") {
            self.access.session_idle_minutes = v.parse().unwrap_or(self.access.session_idle_minutes);
        }

        // Token overrides
        if let Some(v) = lookup("TOKEN_PRIVATE_KEY_PATH") {
            self.tokens.private_key_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("TOKEN_PUBLIC_KEY_PATH") {
            self.tokens.public_key_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("TOKEN_TTL_SECS") {
            self.tokens.ttl_secs = v.parse().unwrap_or(self.tokens.ttl_secs);
        }

        // Track overrides
        if let Some(v) = lookup("TRACKS_DATA_DIR") {
            self.tracks.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("TRACKS_METADATA_DIR") {
            self.tracks.metadata_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("TRACKS_TRUSTED_NETWORKS") {
            self.tracks.trusted_networks = split_list(&v);
        }
        if let Some(v) = lookup("TRACKS_WHITELIST_MODE") {
            match v.parse() {
                Ok(mode) => self.tracks.whitelist_mode = mode,
                Err(e) => tracing::warn!("Ignoring TRACKS_WHITELIST_MODE: {}", e),
            }
        }
        if let Some(v) = lookup("TRACKS_SITE_PREFIX") {
            self.tracks.site_prefix = v;
        }

        // Security overrides
        if let Some(v) = lookup("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }
        if let Some(v) = lookup("SECURITY_ENABLE_AUDIT_LOGGING") {
            self.security.enable_audit_logging = v.parse().unwrap_or(self.security.enable_audit_logging);
        }

        self
    }

    pub fn trusted_networks(&self) -> TrustedNetworks {
        TrustedNetworks::from_list(&self.tracks.trusted_networks.join(","))
    }

    /// Parsed `server.trusted_proxies`; bare addresses become host networks.
    pub fn trusted_proxies(&self) -> Vec<IpNet> {
        self.server
            .trusted_proxies
            .iter()
            .filter_map(|entry| {
                let parsed = entry
                    .parse::<IpNet>()
                    .or_else(|_| entry.parse::<IpAddr>().map(IpNet::from));
                if parsed.is_err() {
                    tracing::warn!("Ignoring invalid trusted proxy entry: {}", entry);
                }
                parsed.ok()
            })
            .collect()
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.tokens.ttl_secs)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                trusted_proxies: Vec::new(),
                enable_request_logging: true,
            },
            access: AccessConfig {
                auto_login_ip_ranges: Vec::new(),
                groups_file: PathBuf::from("metadata/organism_assembly_groups.json"),
                users_file: PathBuf::from("users.json"),
                access_denied_url: "/access_denied".to_string(),
                session_idle_minutes: 24 * 60,
            },
            tokens: TokenConfig {
                private_key_path: Some(PathBuf::from("certs/jwt_private_key.pem")),
                public_key_path: Some(PathBuf::from("certs/jwt_public_key.pem")),
                ttl_secs: 3600,
            },
            tracks: TrackConfig {
                data_dir: PathBuf::from("data/tracks"),
                metadata_dir: PathBuf::from("metadata/jbrowse2-configs"),
                trusted_networks: default_trusted_networks(),
                whitelist_mode: WhitelistMode::Bypass,
                site_prefix: "/moop".to_string(),
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string()],
                enable_audit_logging: false,
            },
        }
    }

    fn staging() -> Self {
        let dev = Self::development();
        Self {
            environment: Environment::Staging,
            access: AccessConfig {
                session_idle_minutes: 8 * 60,
                ..dev.access
            },
            tracks: TrackConfig {
                whitelist_mode: WhitelistMode::RelaxedExpiry,
                ..dev.tracks
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.org".to_string()],
                enable_audit_logging: true,
            },
            ..dev
        }
    }

    fn production() -> Self {
        let dev = Self::development();
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 8080,
                enable_request_logging: false,
                ..dev.server
            },
            access: AccessConfig {
                session_idle_minutes: 2 * 60,
                ..dev.access
            },
            tracks: TrackConfig {
                whitelist_mode: WhitelistMode::RelaxedExpiry,
                ..dev.tracks
            },
            security: SecurityConfig {
                enable_cors: false,
                cors_origins: Vec::new(),
                enable_audit_logging: true,
            },
            ..dev
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn default_trusted_networks() -> Vec<String> {
    TrustedNetworks::default()
        .networks()
        .iter()
        .map(|net| net.to_string())
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        AppConfig::development().server
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        AppConfig::development().access
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        AppConfig::development().tokens
    }
}

impl Default for TrackConfig {
    fn default() -> Self {
        AppConfig::development().tracks
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        AppConfig::development().security
    }
}

// Global singleton config for the binaries - request code gets it through AppState
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
