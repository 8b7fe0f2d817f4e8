//! `fiskal auth`: obtain or reuse an access token.

use secrecy::ExposeSecret;
use serde_json::json;

use fiskal_api::{FromBody, TseClient};

use crate::cli::{AuthArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    client: &mut TseClient,
    args: &AuthArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let token = client.ensure_auth(args.force).await?;

    let mut view = token.summary();
    if args.show_token {
        if let (Some(map), Some(value)) = (view.as_object_mut(), token.token()) {
            map.insert("access_token".into(), json!(value.expose_secret()));
        }
    }

    let out = json!({
        "alive": token.is_alive(),
        "expires_at": token.expires_at().map(|at| at.to_rfc3339()),
        "token": view,
    });
    output::emit(global.output, &out, global.quiet)
}
