use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dev server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub static_files: StaticFilesConfig,

    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub allow_lan_access: bool,
}

impl ServerConfig {
    pub fn bind_address(&self) -> &str {
        if self.allow_lan_access {
            "0.0.0.0"
        } else {
            &self.host
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allow_lan_access: false,
        }
    }
}

/// Document root served to requests no proxy rule claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticFilesConfig {
    #[serde(default = "default_static_root")]
    pub root: PathBuf,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: default_static_root(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Total time budget for one proxied request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

/// One proxy rule, as written in the config file.
///
/// Requests whose path starts with `prefix` are rewritten and forwarded
/// to `target`; everything else is served from the static root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Path prefix to intercept, e.g. "/api". Must start with '/'.
    pub prefix: String,

    /// Upstream origin, e.g. "https://api.example.com".
    pub target: String,

    /// Send the upstream's own host as the Host header instead of the
    /// inbound one.
    #[serde(default)]
    pub change_origin: bool,

    /// Validate the upstream TLS certificate. Disabling this is a trust
    /// downgrade for local development only.
    #[serde(default = "default_secure")]
    pub secure: bool,

    /// Require the prefix to end at a path-segment boundary ('/' or
    /// end of path). Off by default: "/api" also matches "/apikeys".
    #[serde(default)]
    pub segment_boundary: bool,

    /// Custom rewrite applied to the first match in the request path.
    /// When absent, the leading prefix itself is stripped.
    #[serde(default)]
    pub rewrite: Option<RewriteConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteConfig {
    pub pattern: String,

    #[serde(default)]
    pub replace: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            static_files: StaticFilesConfig::default(),
            timeouts: TimeoutsConfig::default(),
            rules: Vec::new(),
        }
    }
}

// Default value functions
fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_request_timeout() -> u64 {
    120
}
fn default_connect_timeout() -> u64 {
    20
}
fn default_secure() -> bool {
    true
}
fn default_static_root() -> PathBuf {
    PathBuf::from(".")
}

/// Get default config file path
/// Uses ~/.config/devrelay/config.toml for Unix-like CLI experience
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("devrelay")
        .join("config.toml")
}

/// Load config from file, or return defaults if not found.
///
/// Loading order:
/// 1. Specified path (if provided)
/// 2. ./devrelay.toml (if exists)
/// 3. default_config_path() (usually ~/.config/devrelay/config.toml)
pub fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    if let Some(config_path) = path {
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            tracing::info!("Loaded config from specified path {:?}", config_path);
            return Ok(config);
        } else {
            anyhow::bail!("Specified config file not found: {:?}", config_path);
        }
    }

    // Try current directory devrelay.toml
    let local_config = PathBuf::from("devrelay.toml");
    if local_config.exists() {
        match std::fs::read_to_string(&local_config) {
            Ok(content) => match toml::from_str::<Config>(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from current directory {:?}", local_config);
                    return Ok(config);
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to parse ./devrelay.toml: {}. Falling back to default path.",
                        e
                    );
                }
            },
            Err(e) => {
                tracing::error!(
                    "Failed to read ./devrelay.toml: {}. Falling back to default path.",
                    e
                );
            }
        }
    }

    let default_path = default_config_path();
    if default_path.exists() {
        let content = std::fs::read_to_string(&default_path)?;
        let config: Config = toml::from_str(&content)?;
        tracing::info!("Loaded config from default path {:?}", default_path);
        Ok(config)
    } else {
        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }
}

/// Expand ~ in path to home directory
pub fn expand_path(path: &PathBuf) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if path_str.starts_with("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(&path_str[2..]);
            }
        }
    }
    path.clone()
}
