//! CLI-side profile resolution: `GlobalOpts` overrides layered on top of
//! `fiskal_config`, producing the `ClientConfig` the API client consumes.

use std::time::Duration;

use secrecy::SecretString;

use fiskal_api::{ClientConfig, TlsMode, TransportConfig, Verbosity};
use fiskal_config::{Config, Credential, Defaults, Profile};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use fiskal_config::{config_path, load_config, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated profile names for diagnostics.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

/// Build a `ClientConfig` from the config file, active profile, and CLI
/// overrides.
///
/// A profile named explicitly with `--profile` must exist; otherwise a
/// missing profile falls back to flags and env vars alone.
pub fn build_client_config(global: &GlobalOpts) -> Result<ClientConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let fallback = Profile::default();
    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile,
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        None => &fallback,
    };

    resolve_profile(profile, &profile_name, &cfg.defaults, global)
}

/// Translate a `Profile` + global flags into a `ClientConfig`.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<ClientConfig, CliError> {
    // 1. Base URL (flag > env > profile)
    let base_url = global.base_url.as_deref().unwrap_or(&profile.base_url);
    fiskal_config::validate_base_url(base_url)?;

    // 2. Credentials (flag > env > profile chain)
    let api_key = match global.api_key {
        Some(ref key) => SecretString::from(key.clone()),
        None => fiskal_config::resolve_credential(profile, profile_name, Credential::ApiKey)?,
    };
    let api_secret = match global.api_secret {
        Some(ref secret) => SecretString::from(secret.clone()),
        None => fiskal_config::resolve_credential(profile, profile_name, Credential::ApiSecret)?,
    };

    // 3. TLS verification
    let tls = if global.insecure {
        TlsMode::DangerAcceptInvalid
    } else {
        fiskal_config::profile_tls(profile, defaults.insecure)
    };

    // 4. Timeout (flag > profile > defaults)
    let timeout = Duration::from_secs(
        global
            .timeout
            .or(profile.timeout)
            .unwrap_or(defaults.timeout),
    );

    Ok(ClientConfig {
        api_key: Some(api_key),
        api_secret: Some(api_secret),
        base_url: base_url.to_owned(),
        token: profile.token.clone().map(SecretString::from),
        token_expire_at: profile.token_expire_at,
        transport: TransportConfig {
            tls,
            timeout,
            ..TransportConfig::default()
        },
        log_level: Verbosity::from_level(profile.log_level.unwrap_or(defaults.log_level)),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["fiskal"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["config", "path"]);
        Cli::try_parse_from(argv).unwrap().global
    }

    #[test]
    fn flags_override_profile() {
        let profile = Profile {
            base_url: "https://profile.example/api/v2".into(),
            api_key: Some("profile-key".into()),
            api_secret: Some("profile-secret".into()),
            timeout: Some(5),
            ..Profile::default()
        };
        let opts = global(&[
            "--base-url",
            "https://flag.example/api/v2",
            "--api-key",
            "flag-key",
            "--timeout",
            "9",
            "--insecure",
        ]);

        let config = resolve_profile(&profile, "fiskal-cli-test", &Defaults::default(), &opts).unwrap();

        assert_eq!(config.base_url, "https://flag.example/api/v2");
        assert_eq!(config.api_key.unwrap().expose_secret(), "flag-key");
        assert_eq!(config.api_secret.unwrap().expose_secret(), "profile-secret");
        assert_eq!(config.transport.timeout, Duration::from_secs(9));
        assert_eq!(config.transport.tls, TlsMode::DangerAcceptInvalid);
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let opts = global(&["--base-url", "nope", "--api-key", "k", "--api-secret", "s"]);
        let err = resolve_profile(&Profile::default(), "fiskal-cli-test", &Defaults::default(), &opts)
            .unwrap_err();
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "base_url"));
    }

    #[test]
    fn profile_name_precedence() {
        let cfg = Config::default();
        assert_eq!(active_profile_name(&global(&[]), &cfg), "default");
        assert_eq!(active_profile_name(&global(&["-p", "till"]), &cfg), "till");
    }
}
