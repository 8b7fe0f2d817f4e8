//! CLI error types with miette diagnostics.
//!
//! Maps `fiskal_api::Error` and `ConfigError` into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use fiskal_api::Error as ApiError;
use fiskal_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to the middleware at {url}")]
    #[diagnostic(
        code(fiskal::connection_failed),
        help(
            "Check the base URL and your network connection.\n\
             URL: {url}"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS setup failed: {message}")]
    #[diagnostic(
        code(fiskal::tls_error),
        help("Check ca_cert in your profile, or use --insecure (-k) against test deployments.")
    )]
    TlsError { message: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(fiskal::timeout),
        help("Increase the timeout with --timeout or check the middleware's responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed ({status})")]
    #[diagnostic(
        code(fiskal::auth_failed),
        help(
            "Verify the API key and secret for this profile.\n\
             Response: {body}\n\
             Run: fiskal config set-secret"
        )
    )]
    AuthFailed { status: u16, body: String },

    #[error("No {field} configured for profile '{profile}'")]
    #[diagnostic(
        code(fiskal::no_credentials),
        help(
            "Configure credentials with: fiskal config init\n\
             Or set FISKAL_API_KEY and FISKAL_API_SECRET."
        )
    )]
    NoCredentials { profile: String, field: String },

    #[error("Missing configuration: {missing}")]
    #[diagnostic(
        code(fiskal::missing_config),
        help("Pass --api-key/--api-secret/--base-url or configure a profile with: fiskal config init")
    )]
    MissingConfig { missing: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("Unsupported operation '{name}'")]
    #[diagnostic(
        code(fiskal::unsupported_operation),
        help(
            "Names look like get_tss, put_tss or patch_tss_<id>_admin.\n\
             The first segment must be one of: get, post, put, patch, delete."
        )
    )]
    UnsupportedOperation { name: String },

    #[error("Not found: {body}")]
    #[diagnostic(code(fiskal::not_found))]
    NotFound { body: String },

    #[error("Conflict: {body}")]
    #[diagnostic(code(fiskal::conflict))]
    Conflict { body: String },

    #[error("API error ({status}): {body}")]
    #[diagnostic(code(fiskal::api_error))]
    Api { status: u16, body: String },

    #[error(transparent)]
    #[diagnostic(code(fiskal::client))]
    Client(Box<ApiError>),

    // ── Provisioning ─────────────────────────────────────────────────

    #[error("TSS provisioning stopped during {step}")]
    #[diagnostic(
        code(fiskal::provisioning),
        help(
            "Nothing was rolled back. Device record at the time of failure:\n{record}"
        )
    )]
    Provisioning {
        step: String,
        record: String,
        #[source]
        source: Box<CliError>,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fiskal::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(fiskal::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: fiskal config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(fiskal::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(fiskal::json), help("Check the JSON argument or file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    #[diagnostic(code(fiskal::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } | Self::MissingConfig { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::UnsupportedOperation { .. } => exit_code::USAGE,
            Self::Provisioning { source, .. } => source.exit_code(),
            _ => exit_code::GENERAL,
        }
    }
}

// ── ApiError → CliError mapping ──────────────────────────────────────

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Configuration { missing } => Self::MissingConfig {
                missing: missing.join(", "),
            },

            ApiError::UnsupportedOperation { name } => Self::UnsupportedOperation { name },

            ApiError::HttpStatus {
                status: status @ (401 | 403),
                body,
            } => Self::AuthFailed { status, body },

            ApiError::HttpStatus { status: 404, body } => Self::NotFound { body },

            ApiError::HttpStatus { status: 409, body } => Self::Conflict { body },

            ApiError::HttpStatus { status, body } => Self::Api { status, body },

            ApiError::Transport(e) if e.is_timeout() => Self::Timeout,

            ApiError::Transport(e) if e.is_connect() => Self::ConnectionFailed {
                url: e.url().map(ToString::to_string).unwrap_or_default(),
                source: Box::new(e),
            },

            ApiError::Tls(message) => Self::TlsError { message },

            ApiError::Workflow {
                step,
                record,
                source,
            } => Self::Provisioning {
                step: step.to_string(),
                record: record
                    .and_then(|r| serde_json::to_string_pretty(&r).ok())
                    .unwrap_or_else(|| "(not created)".into()),
                source: Box::new(Self::from(*source)),
            },

            other => Self::Client(Box::new(other)),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile, field } => Self::NoCredentials {
                profile,
                field: field.into(),
            },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use fiskal_api::ProvisionStep;

    use super::*;

    #[test]
    fn http_statuses_map_to_exit_codes() {
        let cases = [
            (401, exit_code::AUTH),
            (404, exit_code::NOT_FOUND),
            (409, exit_code::CONFLICT),
            (500, exit_code::GENERAL),
        ];
        for (status, code) in cases {
            let err = CliError::from(ApiError::HttpStatus {
                status,
                body: String::new(),
            });
            assert_eq!(err.exit_code(), code, "status {status}");
        }
    }

    #[test]
    fn provisioning_failure_keeps_inner_exit_code() {
        let err = CliError::from(ApiError::Workflow {
            step: ProvisionStep::AdminAuth,
            record: None,
            source: Box::new(ApiError::HttpStatus {
                status: 401,
                body: "bad pin".into(),
            }),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
        assert_eq!(err.to_string(), "TSS provisioning stopped during admin_auth");
    }

    #[test]
    fn local_failures_are_usage_errors() {
        let err = CliError::from(ApiError::UnsupportedOperation {
            name: "fetch_tss".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
