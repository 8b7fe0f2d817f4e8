//! `fiskal tss ...`: provisioning and admin operations.

use fiskal_api::TseClient;

use crate::cli::{GlobalOpts, TssArgs, TssCommand};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

pub async fn handle(
    client: &mut TseClient,
    args: &TssArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match &args.command {
        TssCommand::Create {
            metadata,
            from_file,
            admin_pin,
        } => {
            let body = util::body_from("metadata", metadata.as_deref(), from_file.as_deref())?;
            let tss = client.create_tss(&body, admin_pin.as_deref()).await?;
            // Never suppressed: carries the admin PIN.
            output::emit(global.output, &tss, false)
        }

        TssCommand::ChangeAdminPin {
            tss_id,
            puk,
            new_pin,
        } => {
            let result = client.change_admin_pin(tss_id, puk, new_pin).await?;
            output::emit(global.output, &result, global.quiet)
        }

        TssCommand::AdminAuth { tss_id, pin } => {
            let result = client.admin_auth(tss_id, pin).await?;
            output::emit(global.output, &result, global.quiet)
        }
    }
}
