//! Gateway configuration types.
//!
//! Settings come from an optional JSON file (`CONFIG_PATH`) with
//! environment variables layered on top. [`AuthSettings::options`] turns
//! the auth block into service options; nothing else in the auth core
//! reads configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use scopejwt_auth::options::{
    with_blacklist, with_expiration, with_key, with_signing_method_name, with_token_id,
};
use scopejwt_auth::{Algorithm, KeyFamily, Key, MapBlacklist, ServiceOption, ShardedBlacklist};
use scopejwt_core::ScopeKey;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        /// The file path.
        path: PathBuf,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for this schema.
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        /// The file path.
        path: PathBuf,
        /// The decode error.
        #[source]
        source: serde_json::Error,
    },

    /// An environment variable holds an unusable value.
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue {
        /// The variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Configuration for the gateway service.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen address (e.g., "0.0.0.0:8080").
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Allowed CORS origins.
    #[serde(default = "GatewayConfig::default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    #[serde(default = "GatewayConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Serve `POST /v1/tokens`. It issues tokens to any caller, so it is
    /// meant for development only.
    #[serde(default)]
    pub token_endpoint: bool,

    /// Token settings.
    #[serde(default)]
    pub auth: AuthSettings,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    fn default_cors_origins() -> Vec<String> {
        vec!["*".to_string()]
    }

    const fn default_max_body() -> usize {
        64 * 1024
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Load a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from `CONFIG_PATH` (if set) and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error for unreadable files or invalid variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`GatewayConfig::from_env`] with a custom variable source.
    ///
    /// # Errors
    ///
    /// Returns an error for unreadable files or invalid variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup("CONFIG_PATH") {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(addr) = lookup("LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(value) = lookup("ENABLE_TOKEN_ENDPOINT") {
            config.token_endpoint = parse_var("ENABLE_TOKEN_ENDPOINT", value)?;
        }
        let auth = &mut config.auth;
        if let Some(alg) = lookup("JWT_ALG") {
            auth.algorithm = alg;
        }
        if let Some(value) = lookup("JWT_EXPIRE_SECONDS") {
            auth.expire_seconds = parse_var("JWT_EXPIRE_SECONDS", value)?;
        }
        if let Some(value) = lookup("JWT_ENABLE_JTI") {
            auth.enable_jti = parse_var("JWT_ENABLE_JTI", value)?;
        }
        if let Some(path) = lookup("JWT_KEY_PATH") {
            auth.key_path = Some(PathBuf::from(path));
        }
        if let Some(password) = lookup("JWT_KEY_PASSWORD") {
            auth.key_password = Some(password);
        }
        if let Some(secret) = lookup("JWT_HMAC_SECRET") {
            auth.hmac_secret = Some(secret);
        }
        if let Some(value) = lookup("JWT_REVOCATION") {
            auth.revocation = parse_var("JWT_REVOCATION", value)?;
        }
        Ok(config)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            cors_origins: Self::default_cors_origins(),
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
            token_endpoint: false,
            auth: AuthSettings::default(),
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { name, value })
}

/// Which revocation store to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevocationMode {
    /// Revocation disabled.
    #[default]
    None,
    /// One in-memory map.
    Memory,
    /// Sharded in-memory maps.
    Sharded,
}

impl FromStr for RevocationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" | "" => Ok(Self::None),
            "memory" | "map" => Ok(Self::Memory),
            "sharded" => Ok(Self::Sharded),
            other => Err(format!("unknown revocation mode: {other}")),
        }
    }
}

/// Token settings for the default scope and per-website overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// Signing algorithm name.
    #[serde(default = "AuthSettings::default_algorithm")]
    pub algorithm: String,

    /// Token lifetime in seconds.
    #[serde(default = "AuthSettings::default_expire_seconds")]
    pub expire_seconds: u64,

    /// Add a `jti` claim to new tokens.
    #[serde(default = "AuthSettings::default_enable_jti")]
    pub enable_jti: bool,

    /// PEM private key for RSA and ECDSA algorithms.
    #[serde(default)]
    pub key_path: Option<PathBuf>,

    /// Password for an encrypted PEM key.
    #[serde(default)]
    pub key_password: Option<String>,

    /// HMAC secret. A random one is generated when absent.
    #[serde(default)]
    pub hmac_secret: Option<String>,

    /// Revocation store.
    #[serde(default)]
    pub revocation: RevocationMode,

    /// Per-website settings.
    #[serde(default)]
    pub websites: Vec<WebsiteOverride>,
}

/// Settings for one website scope. Unset fields inherit the defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct WebsiteOverride {
    /// The website id.
    pub website_id: u32,
    /// Signing algorithm name.
    #[serde(default)]
    pub algorithm: Option<String>,
    /// Token lifetime in seconds.
    #[serde(default)]
    pub expire_seconds: Option<u64>,
    /// HMAC secret for this website.
    #[serde(default)]
    pub secret: Option<String>,
}

impl AuthSettings {
    fn default_algorithm() -> String {
        "HS256".to_string()
    }

    const fn default_expire_seconds() -> u64 {
        3600
    }

    const fn default_enable_jti() -> bool {
        true
    }

    /// Translate the settings into service options.
    ///
    /// Unknown algorithm names and unusable keys surface as option errors
    /// when the service is built.
    #[must_use]
    pub fn options(&self) -> Vec<ServiceOption> {
        let default = ScopeKey::DEFAULT;
        let password = self.key_password.as_deref().map(str::as_bytes);
        let key = match (&self.key_path, &self.hmac_secret) {
            (Some(path), _) => Key::private_pem_file(path, password),
            (None, Some(secret)) => Key::hmac(secret),
            (None, None) => generated_key(&self.algorithm),
        };

        let mut options = vec![
            with_key(default, key),
            with_signing_method_name(default, &self.algorithm),
            with_expiration(default, Duration::from_secs(self.expire_seconds)),
            with_token_id(default, self.enable_jti),
        ];

        match self.revocation {
            RevocationMode::None => {}
            RevocationMode::Memory => options.push(with_blacklist(Arc::new(MapBlacklist::new()))),
            RevocationMode::Sharded => {
                options.push(with_blacklist(Arc::new(ShardedBlacklist::default())));
            }
        }

        for site in &self.websites {
            let scope = ScopeKey::website(site.website_id);
            let algorithm = site.algorithm.as_deref().unwrap_or(&self.algorithm);
            let key = site
                .secret
                .as_ref()
                .map_or_else(|| generated_key(algorithm), Key::hmac);
            let expire = site.expire_seconds.unwrap_or(self.expire_seconds);
            options.extend([
                with_key(scope, key),
                with_signing_method_name(scope, algorithm),
                with_expiration(scope, Duration::from_secs(expire)),
                with_token_id(scope, self.enable_jti),
            ]);
        }
        options
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            algorithm: Self::default_algorithm(),
            expire_seconds: Self::default_expire_seconds(),
            enable_jti: Self::default_enable_jti(),
            key_path: None,
            key_password: None,
            hmac_secret: None,
            revocation: RevocationMode::default(),
            websites: Vec::new(),
        }
    }
}

/// A fresh key for `algorithm`; process-local, lost on restart.
fn generated_key(algorithm: &str) -> Key {
    match algorithm.parse::<Algorithm>() {
        Ok(alg) => match alg.family() {
            KeyFamily::Hmac => Key::random_hmac(),
            KeyFamily::Rsa => Key::generate_rsa(2048),
            KeyFamily::Ecdsa => Key::generate_ecdsa(alg),
        },
        // the signing method option reports the bad name
        Err(_) => Key::random_hmac(),
    }
}
