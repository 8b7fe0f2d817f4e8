//! Config subcommand handlers.

use dialoguer::{Input, Select};

use fiskal_api::DEFAULT_BASE_URL;
use fiskal_config::{Credential, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

const SECRET_FIELDS: &[&str] = &["api_key", "api_secret", "token"];

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_secret(label: &str, field: &str) -> Result<String, CliError> {
    let value = rpassword::prompt_password(label).map_err(prompt_err)?;
    if value.is_empty() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "value cannot be empty".into(),
        });
    }
    Ok(value)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let mut view = serde_json::to_value(&cfg)?;
            output::mask(&mut view, SECRET_FIELDS);
            output::emit(global.output, &view, global.quiet)
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: fiskal config init");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetSecret ──────────────────────────────────────────────
        ConfigCommand::SetSecret { profile } => {
            let cfg = config::load_config()?;
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));

            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name: profile_name,
                });
            }

            let key = prompt_secret("API key: ", "api_key")?;
            let secret = prompt_secret("API secret: ", "api_secret")?;
            fiskal_config::store_credential(&profile_name, Credential::ApiKey, &key)?;
            fiskal_config::store_credential(&profile_name, Credential::ApiSecret, &secret)?;

            eprintln!("✓ Credentials stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

/// Interactive wizard. Adds (or replaces) one profile, keeping the rest.
fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    let mut cfg = config::load_config()?;
    eprintln!("fiskal configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    // 2. Base URL
    let base_url: String = Input::new()
        .with_prompt("API base URL")
        .default(DEFAULT_BASE_URL.into())
        .interact_text()
        .map_err(prompt_err)?;
    fiskal_config::validate_base_url(&base_url)?;

    // 3. Credentials
    let key = prompt_secret("API key: ", "api_key")?;
    let secret = prompt_secret("API secret: ", "api_secret")?;

    let store_choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store the credentials?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let (api_key, api_secret) = if store_selection == 0 {
        fiskal_config::store_credential(&profile_name, Credential::ApiKey, &key)?;
        fiskal_config::store_credential(&profile_name, Credential::ApiSecret, &secret)?;
        eprintln!("   ✓ Credentials stored in system keyring");
        (None, None)
    } else {
        (Some(key), Some(secret))
    };

    // 4. Merge into existing config
    if cfg.profiles.is_empty() {
        cfg.default_profile = Some(profile_name.clone());
    }
    cfg.profiles.insert(
        profile_name.clone(),
        Profile {
            base_url,
            api_key,
            api_secret,
            ..Profile::default()
        },
    );

    let path = config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    eprintln!("  Profile: {profile_name}");
    eprintln!("\n  Test it: fiskal auth --profile {profile_name}");

    Ok(())
}
