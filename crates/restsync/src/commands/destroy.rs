//! `destroy` -- delete an object if it exists.

use serde::Serialize;

use restsync_config::Manifest;
use restsync_core::CancellationToken;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::{Action, bind};

#[derive(Debug, Serialize)]
struct Destroyed {
    object: String,
    action: Action,
    #[serde(skip_serializing_if = "String::is_empty")]
    id: String,
}

pub async fn handle(
    manifest: &Manifest,
    name: &str,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let object = bind(manifest, name, global, cancel).await?;

    // Without a known id the object can only be found by searching.
    if object.id().is_empty() && object.is_locatable() {
        object.read(cancel).await?;
    }

    let id = object.id();
    let action = if id.is_empty() {
        Action::None
    } else {
        object.delete(cancel).await?;
        Action::Delete
    };

    let destroyed = Destroyed {
        object: name.to_owned(),
        action,
        id,
    };
    output::print_output(&output::render(&global.output, &destroyed)?, global.quiet);
    Ok(())
}
