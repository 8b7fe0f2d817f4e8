//! Command dispatch: bridges CLI args -> client calls -> output formatting.

pub mod auth;
pub mod call;
pub mod config_cmd;
pub mod tss;
pub mod util;

use fiskal_api::TseClient;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a middleware-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    client: &mut TseClient,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Auth(args) => auth::handle(client, &args, global).await,
        Command::Call(args) => call::handle(client, &args, global).await,
        Command::Tss(args) => tss::handle(client, &args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
