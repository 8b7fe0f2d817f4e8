// Client configuration and overlay merging.

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::auth::AuthToken;
use crate::error::Error;
use crate::log::Verbosity;
use crate::transport::TransportConfig;

/// Production endpoint of the KassenSichV middleware.
pub const DEFAULT_BASE_URL: &str = "https://kassensichv-middleware.fiskaly.com/api/v2/";

/// Everything a [`TseClient`](crate::TseClient) needs to talk to the service.
///
/// `token` + `token_expire_at` seed a session from an earlier run so the
/// first request can skip `POST auth`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: Option<SecretString>,
    pub api_secret: Option<SecretString>,
    pub base_url: String,
    pub token: Option<SecretString>,
    pub token_expire_at: Option<i64>,
    pub transport: TransportConfig,
    pub log_level: Verbosity,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            base_url: DEFAULT_BASE_URL.to_owned(),
            token: None,
            token_expire_at: None,
            transport: TransportConfig::default(),
            log_level: Verbosity::default(),
        }
    }
}

/// A partial configuration. `Some` fields overwrite, `None` fields keep
/// whatever was there.
#[derive(Debug, Clone, Default)]
pub struct ConfigPatch {
    pub api_key: Option<SecretString>,
    pub api_secret: Option<SecretString>,
    pub base_url: Option<String>,
    pub token: Option<SecretString>,
    pub token_expire_at: Option<i64>,
    pub transport: Option<TransportConfig>,
    pub log_level: Option<Verbosity>,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: Some(SecretString::from(api_key.into())),
            api_secret: Some(SecretString::from(api_secret.into())),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>, expire_at: i64) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self.token_expire_at = Some(expire_at);
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_log_level(mut self, level: Verbosity) -> Self {
        self.log_level = level;
        self
    }

    /// Overlay `patch` onto this config. Keys are never removed.
    pub fn merge(&mut self, patch: ConfigPatch) {
        if let Some(v) = patch.api_key {
            self.api_key = Some(v);
        }
        if let Some(v) = patch.api_secret {
            self.api_secret = Some(v);
        }
        if let Some(v) = patch.base_url {
            self.base_url = v;
        }
        if let Some(v) = patch.token {
            self.token = Some(v);
        }
        if let Some(v) = patch.token_expire_at {
            self.token_expire_at = Some(v);
        }
        if let Some(v) = patch.transport {
            self.transport = v;
        }
        if let Some(v) = patch.log_level {
            self.log_level = v;
        }
    }

    /// Fail unless `api_key`, `api_secret` and `base_url` are all non-empty.
    pub fn check(&self) -> Result<(), Error> {
        let mut missing = Vec::new();
        if is_blank(self.api_key.as_ref()) {
            missing.push("api_key");
        }
        if is_blank(self.api_secret.as_ref()) {
            missing.push("api_secret");
        }
        if self.base_url.trim().is_empty() {
            missing.push("base_url");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Configuration { missing })
        }
    }

    /// The base URL with a guaranteed trailing `/`.
    pub fn normalized_base_url(&self) -> Result<Url, Error> {
        let trimmed = self.base_url.trim();
        if trimmed.ends_with('/') {
            Ok(Url::parse(trimmed)?)
        } else {
            Ok(Url::parse(&format!("{trimmed}/"))?)
        }
    }

    /// Token seeded from `token` + `token_expire_at`, if both are set.
    pub(crate) fn seed_token(&self) -> Option<AuthToken> {
        let token = self.token.as_ref()?.expose_secret();
        let expire_at = self.token_expire_at?;
        (!token.is_empty()).then(|| AuthToken::seeded(token, expire_at))
    }
}

fn is_blank(secret: Option<&SecretString>) -> bool {
    secret.is_none_or(|s| s.expose_secret().trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn complete_config_passes() {
        ClientConfig::new("k", "s").check().unwrap();
    }

    #[test]
    fn reports_every_missing_key() {
        let config = ClientConfig {
            api_secret: Some(SecretString::from(String::new())),
            base_url: "  ".into(),
            ..ClientConfig::default()
        };
        let err = config.check().unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration { ref missing } if missing == &["api_key", "api_secret", "base_url"]
        ));
    }

    #[test]
    fn seeds_are_not_required() {
        let config = ClientConfig::new("k", "s");
        assert!(config.token.is_none());
        assert!(config.check().is_ok());
        assert!(config.seed_token().is_none());
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let config = ClientConfig::new("k", "s").with_base_url("https://x/api/v2");
        assert_eq!(config.normalized_base_url().unwrap().as_str(), "https://x/api/v2/");
        let config = config.with_base_url("https://x/api/v2/");
        assert_eq!(config.normalized_base_url().unwrap().as_str(), "https://x/api/v2/");
    }

    #[test]
    fn merge_overlays_without_removing() {
        let mut config = ClientConfig::new("k", "s").with_base_url("https://a/");
        config.merge(ConfigPatch {
            api_secret: Some(SecretString::from("s2".to_owned())),
            log_level: Some(Verbosity::Warning),
            ..ConfigPatch::default()
        });
        assert_eq!(config.api_key.as_ref().unwrap().expose_secret(), "k");
        assert_eq!(config.api_secret.as_ref().unwrap().expose_secret(), "s2");
        assert_eq!(config.base_url, "https://a/");
        assert_eq!(config.log_level, Verbosity::Warning);
    }

    #[test]
    fn seed_needs_both_fields() {
        let mut config = ClientConfig::new("k", "s");
        config.token = Some(SecretString::from("t".to_owned()));
        assert!(config.seed_token().is_none());
        config.token_expire_at = Some(4_102_444_800);
        assert!(config.seed_token().unwrap().is_alive());
    }
}
