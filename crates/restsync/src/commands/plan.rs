//! `plan` -- read an object and report the drift without changing anything.

use restsync_config::Manifest;
use restsync_core::CancellationToken;

use crate::cli::{GlobalOpts, PlanArgs};
use crate::error::CliError;
use crate::output;

use super::{Action, bind, plan_object};

pub async fn handle(
    manifest: &Manifest,
    args: PlanArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let name = args.target.object;
    let object = bind(manifest, &name, global, cancel).await?;
    let planned = plan_object(&name, &object, cancel).await?;

    output::print_output(&output::render(&global.output, &planned)?, global.quiet);

    if args.fail_on_drift && planned.action != Action::None {
        return Err(CliError::Drift {
            object: name,
            action: planned.action.as_str().to_owned(),
        });
    }
    Ok(())
}
