//! `probe` -- connect and run the client's test path.

use serde::Serialize;

use restsync_config::Manifest;
use restsync_core::{ApiClient, CancellationToken};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Probed<'a> {
    uri: &'a str,
    test_path: Option<&'a str>,
    status: &'static str,
}

pub async fn handle(
    manifest: &Manifest,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let client = ApiClient::connect(config::client_config(global, manifest)?, cancel).await?;

    let probed = Probed {
        uri: client.http().base_url(),
        test_path: client.test_path(),
        status: if client.test_path().is_some() {
            "ok"
        } else {
            "skipped"
        },
    };
    output::print_output(&output::render(&global.output, &probed)?, global.quiet);
    Ok(())
}
