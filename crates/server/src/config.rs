// Server configuration.
//
// Loaded once at startup from a TOML file, with secrets and the listen
// address overridable from the environment. The validated value is passed
// into every component by the caller; nothing reads configuration globally.

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use subsync_common::path::normalize_mount_path;
use subsync_common::types::SubmoduleBinding;
use thiserror::Error;
use url::Url;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_WEBHOOK_PATH: &str = "/webhook";

pub const AUTH_TOKEN_ENV: &str = "SUBSYNC_AUTH_TOKEN";
pub const WEBHOOK_SECRET_ENV: &str = "SUBSYNC_WEBHOOK_SECRET";
pub const LISTEN_ADDR_ENV: &str = "SUBSYNC_LISTEN_ADDR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// On-disk shape of `subsync.toml`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    owner: String,
    auth_token: Option<String>,
    webhook_secret: Option<String>,
    #[serde(default)]
    debug: bool,
    listen_addr: Option<String>,
    api_base_url: Option<String>,
    webhook_path: Option<String>,
    #[serde(default)]
    submodules: Vec<SubmoduleBinding>,
}

/// Validated, immutable server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Listen address (host:port) of the webhook endpoint.
    pub listen_addr: SocketAddr,
    /// Account that owns both submodule and parent repositories.
    pub owner: String,
    /// Token used for every call to the parent's VCS API.
    pub auth_token: String,
    /// Shared secret for webhook signatures.
    pub webhook_secret: String,
    /// Lowers the default log filter to `debug`.
    pub debug: bool,
    /// Root of the REST API (`https://api.github.com` or an Enterprise host).
    pub api_base_url: Url,
    /// Route that receives webhook deliveries.
    pub webhook_path: String,
    /// Monitored submodules, in file order.
    pub submodules: Vec<SubmoduleBinding>,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("listen_addr", &self.listen_addr)
            .field("owner", &self.owner)
            .field("auth_token", &"<redacted>")
            .field("webhook_secret", &"<redacted>")
            .field("debug", &self.debug)
            .field("api_base_url", &self.api_base_url.as_str())
            .field("webhook_path", &self.webhook_path)
            .field("submodules", &self.submodules)
            .finish()
    }
}

impl ServerConfig {
    /// Load from `path`, applying overrides from the process environment.
    ///
    /// | Variable | Overrides |
    /// |---|---|
    /// | `SUBSYNC_AUTH_TOKEN` | `auth_token` |
    /// | `SUBSYNC_WEBHOOK_SECRET` | `webhook_secret` |
    /// | `SUBSYNC_LISTEN_ADDR` | `listen_addr` |
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_with_env(&contents, |key| std::env::var(key))
    }

    /// Testable constructor that accepts an environment lookup function.
    pub fn from_toml_with_env<F>(contents: &str, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let file: ConfigFile = toml::from_str(contents)?;

        let auth_token = env(AUTH_TOKEN_ENV).ok().or(file.auth_token).unwrap_or_default();
        let webhook_secret =
            env(WEBHOOK_SECRET_ENV).ok().or(file.webhook_secret).unwrap_or_default();

        let raw_listen_addr = env(LISTEN_ADDR_ENV)
            .ok()
            .or(file.listen_addr)
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = raw_listen_addr.parse::<SocketAddr>().map_err(|error| {
            ConfigError::Invalid(format!("listen_addr `{raw_listen_addr}`: {error}"))
        })?;

        let raw_base_url = file.api_base_url.unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = Url::parse(&raw_base_url).map_err(|error| {
            ConfigError::Invalid(format!("api_base_url `{raw_base_url}`: {error}"))
        })?;

        let config = Self {
            listen_addr,
            owner: file.owner.trim().to_string(),
            auth_token,
            webhook_secret,
            debug: file.debug,
            api_base_url,
            webhook_path: file.webhook_path.unwrap_or_else(|| DEFAULT_WEBHOOK_PATH.to_string()),
            submodules: file.submodules,
        };
        config.validate()
    }

    /// Check invariants and canonicalize mount paths.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.owner.is_empty() {
            return Err(ConfigError::Invalid("owner must not be empty".into()));
        }
        if self.auth_token.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "auth_token must be set in the config file or {AUTH_TOKEN_ENV}"
            )));
        }
        if self.webhook_secret.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "webhook_secret must be set in the config file or {WEBHOOK_SECRET_ENV}"
            )));
        }
        if !matches!(self.api_base_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "api_base_url must be http(s), got `{}`",
                self.api_base_url
            )));
        }
        if !self.webhook_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "webhook_path must start with `/`, got `{}`",
                self.webhook_path
            )));
        }

        let mut seen = HashSet::new();
        for (index, binding) in self.submodules.iter_mut().enumerate() {
            for (field, value) in [
                ("submodule_repo", &binding.submodule_repo),
                ("submodule_branch", &binding.submodule_branch),
                ("parent_repo", &binding.parent_repo),
                ("parent_branch", &binding.parent_branch),
            ] {
                if value.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "submodules[{index}].{field} must not be empty"
                    )));
                }
            }

            binding.mount_path = normalize_mount_path(&binding.mount_path).map_err(|error| {
                ConfigError::Invalid(format!("submodules[{index}].mount_path: {error}"))
            })?;

            if !seen.insert(binding.submodule_repo.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "submodule_repo `{}` is listed more than once",
                    binding.submodule_repo
                )));
            }
        }

        Ok(self)
    }

    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}
