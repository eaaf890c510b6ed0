//! `apply` -- converge an object on its declaration.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use restsync_config::Manifest;
use restsync_core::CancellationToken;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::{Action, bind, plan_object};

#[derive(Debug, Serialize)]
struct Applied {
    object: String,
    action: Action,
    id: String,
    api_data: Map<String, Value>,
}

pub async fn handle(
    manifest: &Manifest,
    name: &str,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let object = bind(manifest, name, global, cancel).await?;
    let planned = plan_object(name, &object, cancel).await?;

    match planned.action {
        Action::Create => object.create(cancel).await?,
        Action::Update => object.update(cancel).await?,
        Action::Delete | Action::None => {}
    }
    info!(object = name, action = planned.action.as_str(), id = %object.id(), "applied");

    let applied = Applied {
        object: name.to_owned(),
        action: planned.action,
        id: object.id(),
        api_data: object.api_data(),
    };
    output::print_output(&output::render(&global.output, &applied)?, global.quiet);
    Ok(())
}
