//! `fiskal call <name>`: dynamic API call by symbolic operation name.

use fiskal_api::TseClient;

use crate::cli::{CallArgs, GlobalOpts};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

pub async fn handle(
    client: &mut TseClient,
    args: &CallArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    for raw in &args.headers {
        let (name, value) = util::parse_header(raw)?;
        client.add_header(name, value)?;
    }

    let body = util::body_from("data", args.data.as_deref(), args.from_file.as_deref())?;
    let result = client.call(&args.name, &body, args.uuid).await?;

    output::emit(global.output, &result, global.quiet)
}
