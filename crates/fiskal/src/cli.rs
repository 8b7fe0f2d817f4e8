//! Clap derive structures for the `fiskal` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fiskal -- command-line client for the KassenSichV TSE middleware
#[derive(Debug, Parser)]
#[command(
    name = "fiskal",
    version,
    about = "Provision and drive TSE devices through the KassenSichV middleware",
    long_about = "Command-line client for the KassenSichV TSE middleware API.\n\n\
        Authenticates with an API key/secret pair, issues arbitrary API calls\n\
        by symbolic name, and provisions new TSS devices end to end.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "FISKAL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API base URL (overrides profile)
    #[arg(long, short = 'u', env = "FISKAL_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// API key
    #[arg(long, env = "FISKAL_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// API secret
    #[arg(long, env = "FISKAL_API_SECRET", global = true, hide_env_values = true)]
    pub api_secret: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FISKAL_OUTPUT",
        default_value = "json",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "FISKAL_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "FISKAL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Obtain (or reuse) an access token
    Auth(AuthArgs),

    /// Issue an API call by symbolic name, e.g. `get_tss` or `patch_tss_<id>`
    Call(CallArgs),

    /// Provision and administer TSS devices
    Tss(TssArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AUTH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AuthArgs {
    /// Fetch a new token even if the current one is still valid
    #[arg(long, short = 'f')]
    pub force: bool,

    /// Print the raw access token instead of masking it
    #[arg(long)]
    pub show_token: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CALL
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CallArgs {
    /// Operation name: `<verb>_<segment>_<segment>...[?query]`
    pub name: String,

    /// Request body as inline JSON (query parameters for GET)
    #[arg(long, short = 'd', conflicts_with = "from_file")]
    pub data: Option<String>,

    /// Read the request body from a JSON file
    #[arg(long, short = 'F')]
    pub from_file: Option<PathBuf>,

    /// Append a fresh UUID as the last path segment
    #[arg(long)]
    pub uuid: bool,

    /// Extra request header, `Name: value` (repeatable)
    #[arg(long = "header", short = 'H', value_name = "NAME: VALUE")]
    pub headers: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TSS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TssArgs {
    #[command(subcommand)]
    pub command: TssCommand,
}

#[derive(Debug, Subcommand)]
pub enum TssCommand {
    /// Create a TSS and bring it to INITIALIZED
    Create {
        /// Creation body as inline JSON, e.g. '{"metadata":{"till":"3"}}'
        #[arg(long, short = 'm', conflicts_with = "from_file")]
        metadata: Option<String>,

        /// Read the creation body from a JSON file
        #[arg(long, short = 'F')]
        from_file: Option<PathBuf>,

        /// Admin PIN to set (a random 10-digit PIN is generated otherwise)
        #[arg(long)]
        admin_pin: Option<String>,
    },

    /// Replace the admin PIN using the admin PUK
    ChangeAdminPin {
        /// TSS identifier
        tss_id: String,

        /// Admin PUK issued at creation
        #[arg(long)]
        puk: String,

        /// New admin PIN
        #[arg(long)]
        new_pin: String,
    },

    /// Log in as admin on a TSS
    AdminAuth {
        /// TSS identifier
        tss_id: String,

        /// Admin PIN
        #[arg(long)]
        pin: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or extend the config file with guided setup
    Init,

    /// Display the current configuration (secrets masked)
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the API key and secret in the system keyring
    SetSecret {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
