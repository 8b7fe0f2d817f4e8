//! Shared configuration for fiskal tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `fiskal_api::ClientConfig`. The CLI adds
//! `GlobalOpts`-aware overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fiskal_api::{ClientConfig, DEFAULT_BASE_URL, TlsMode, TransportConfig, Verbosity};

/// Keyring service name under which API credentials are stored.
pub const KEYRING_SERVICE: &str = "fiskal";

/// Overrides the config file location when set.
pub const CONFIG_PATH_ENV: &str = "FISKAL_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {field} configured for profile '{profile}'")]
    NoCredentials { profile: String, field: &'static str },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named middleware profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// 0 = errors, 1 = warnings, 2 = info.
    #[serde(default = "default_log_level")]
    pub log_level: u8,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
            log_level: default_log_level(),
        }
    }
}

fn default_output() -> String {
    "json".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_log_level() -> u8 {
    2
}

/// A named middleware profile.
#[derive(Debug, Deserialize, Serialize)]
pub struct Profile {
    /// API root, e.g. "https://kassensichv-middleware.fiskaly.com/api/v2/".
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key (plaintext, prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// API secret (plaintext, prefer keyring or env var).
    pub api_secret: Option<String>,

    /// Environment variable name containing the API secret.
    pub api_secret_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Override log level.
    pub log_level: Option<u8>,

    /// Access token persisted from an earlier session.
    pub token: Option<String>,

    /// Expiry of `token`, epoch seconds.
    pub token_expire_at: Option<i64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            api_key_env: None,
            api_secret: None,
            api_secret_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            log_level: None,
            token: None,
            token_expire_at: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `FISKAL_CONFIG`, else XDG / platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "fiskal", "fiskal").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fiskal");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, layered over defaults and under
/// `FISKAL_*` env vars (`__` separates nested keys).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FISKAL_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Which credential a lookup is for. Selects env var, keyring slot,
/// and plaintext field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    ApiKey,
    ApiSecret,
}

impl Credential {
    pub fn field(self) -> &'static str {
        match self {
            Self::ApiKey => "api_key",
            Self::ApiSecret => "api_secret",
        }
    }

    /// Keyring account for this credential under `profile_name`.
    pub fn keyring_account(self, profile_name: &str) -> String {
        match self {
            Self::ApiKey => format!("{profile_name}/api-key"),
            Self::ApiSecret => format!("{profile_name}/api-secret"),
        }
    }

    fn env_name(self, profile: &Profile) -> Option<&str> {
        match self {
            Self::ApiKey => profile.api_key_env.as_deref(),
            Self::ApiSecret => profile.api_secret_env.as_deref(),
        }
    }

    fn plaintext(self, profile: &Profile) -> Option<&str> {
        match self {
            Self::ApiKey => profile.api_key.as_deref(),
            Self::ApiSecret => profile.api_secret.as_deref(),
        }
    }
}

/// Resolve a credential from the chain: profile env var, system keyring,
/// plaintext in config.
pub fn resolve_credential(
    profile: &Profile,
    profile_name: &str,
    credential: Credential,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's *_env → env var lookup
    if let Some(env_name) = credential.env_name(profile) {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &credential.keyring_account(profile_name)) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(value) = credential.plaintext(profile) {
        return Ok(SecretString::from(value.to_owned()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
        field: credential.field(),
    })
}

/// Store a credential in the system keyring.
pub fn store_credential(
    profile_name: &str,
    credential: Credential,
    value: &str,
) -> Result<(), ConfigError> {
    let keyring_err = |e: keyring::Error| ConfigError::Validation {
        field: "keyring".into(),
        reason: e.to_string(),
    };
    keyring::Entry::new(KEYRING_SERVICE, &credential.keyring_account(profile_name))
        .map_err(keyring_err)?
        .set_password(value)
        .map_err(keyring_err)
}

/// TLS mode from profile fields.
pub fn profile_tls(profile: &Profile, insecure_default: bool) -> TlsMode {
    if profile.insecure.unwrap_or(insecure_default) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    }
}

/// Build a `ClientConfig` from a profile, no CLI flag overrides.
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    validate_base_url(&profile.base_url)?;

    let api_key = resolve_credential(profile, profile_name, Credential::ApiKey)?;
    let api_secret = resolve_credential(profile, profile_name, Credential::ApiSecret)?;

    let transport = TransportConfig {
        tls: profile_tls(profile, defaults.insecure),
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        ..TransportConfig::default()
    };

    Ok(ClientConfig {
        api_key: Some(api_key),
        api_secret: Some(api_secret),
        base_url: profile.base_url.clone(),
        token: profile.token.clone().map(SecretString::from),
        token_expire_at: profile.token_expire_at,
        transport,
        log_level: Verbosity::from_level(profile.log_level.unwrap_or(defaults.log_level)),
    })
}

/// Reject anything that is not an absolute http(s) URL.
pub fn validate_base_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "base_url".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if matches!(url.scheme(), "http" | "https") {
        Ok(url)
    } else {
        Err(ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        })
    }
}
