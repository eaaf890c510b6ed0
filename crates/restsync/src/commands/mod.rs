//! Command dispatch: bridges CLI args -> core objects -> output formatting.

pub mod apply;
pub mod destroy;
pub mod get;
pub mod plan;
pub mod probe;

use serde::Serialize;
use serde_json::{Map, Value};

use restsync_config::Manifest;
use restsync_core::{ApiClient, ApiObject, CancellationToken};

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// Dispatch a manifest-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let manifest = config::load(global)?;
    match cmd {
        Command::Plan(args) => plan::handle(&manifest, args, global, cancel).await,
        Command::Apply(args) => apply::handle(&manifest, &args.object, global, cancel).await,
        Command::Get(args) => get::handle(&manifest, &args.object, global, cancel).await,
        Command::Destroy(args) => destroy::handle(&manifest, &args.object, global, cancel).await,
        Command::Probe => probe::handle(&manifest, global, cancel).await,
        // Completions are handled before dispatch
        Command::Completions(_) => unreachable!(),
    }
}

/// Connect the client (running its test-path probe) and bind one object.
pub async fn bind(
    manifest: &Manifest,
    name: &str,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<ApiObject, CliError> {
    let object_config = config::object_config(global, manifest, name)?;
    let client = ApiClient::connect(config::client_config(global, manifest)?, cancel).await?;
    Ok(ApiObject::new(client, object_config)?)
}

// ── Planning ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
    None,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::None => "none",
        }
    }
}

/// What apply would do, and the document it would converge on.
#[derive(Debug, Serialize)]
pub struct Planned {
    pub object: String,
    pub action: Action,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub has_changes: bool,
    pub document: Map<String, Value>,
}

/// Read the object (when it can be located) and decide create / update / none.
pub async fn plan_object(
    name: &str,
    object: &ApiObject,
    cancel: &CancellationToken,
) -> Result<Planned, CliError> {
    if object.is_locatable() {
        object.read(cancel).await?;
    }

    let id = object.id();
    if id.is_empty() {
        return Ok(Planned {
            object: name.to_owned(),
            action: Action::Create,
            id,
            has_changes: true,
            document: object.declared(),
        });
    }

    let delta = object.drift();
    Ok(Planned {
        object: name.to_owned(),
        action: if delta.has_changes {
            Action::Update
        } else {
            Action::None
        },
        id,
        has_changes: delta.has_changes,
        document: delta.modified,
    })
}
