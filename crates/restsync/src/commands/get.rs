//! `get` -- read an object and print its full state.

use restsync_config::Manifest;
use restsync_core::CancellationToken;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::bind;

pub async fn handle(
    manifest: &Manifest,
    name: &str,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let object = bind(manifest, name, global, cancel).await?;
    if object.is_locatable() {
        object.read(cancel).await?;
    }
    if object.id().is_empty() {
        return Err(CliError::NotFound {
            object: name.to_owned(),
        });
    }

    output::print_output(
        &output::render(&global.output, &object.snapshot())?,
        global.quiet,
    );
    Ok(())
}
