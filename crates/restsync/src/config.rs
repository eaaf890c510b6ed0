//! CLI configuration: thin wrapper around `restsync_config`.
//!
//! Loads the manifest and applies `GlobalOpts` overrides (--insecure,
//! --debug) on top of the resolved client and object settings.

use std::path::PathBuf;

use restsync_config::{ConfigError, Manifest, default_manifest_path, load_manifest};
use restsync_core::{ClientConfig, ObjectConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The manifest path from `--manifest`, or the platform default.
pub fn manifest_path(global: &GlobalOpts) -> PathBuf {
    global.manifest.clone().unwrap_or_else(default_manifest_path)
}

pub fn load(global: &GlobalOpts) -> Result<Manifest, CliError> {
    let path = manifest_path(global);
    if !path.is_file() {
        return Err(CliError::manifest(
            &path,
            ConfigError::Io {
                field: "manifest".into(),
                path: path.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            },
        ));
    }
    load_manifest(&path).map_err(|e| CliError::manifest(&path, e))
}

/// Resolve `[client]`, with flag overrides applied.
pub fn client_config(global: &GlobalOpts, manifest: &Manifest) -> Result<ClientConfig, CliError> {
    let mut config = restsync_config::resolve_client(&manifest.client)?;
    if global.insecure {
        config.http.transport.tls.insecure = true;
    }
    if global.debug {
        config.http.debug = true;
    }
    Ok(config)
}

/// Resolve `[objects.<name>]`, with flag overrides applied.
pub fn object_config(
    global: &GlobalOpts,
    manifest: &Manifest,
    name: &str,
) -> Result<ObjectConfig, CliError> {
    let settings = manifest.object(name)?;
    let mut config = restsync_config::resolve_object(name, settings)?;
    if global.debug {
        config.debug = true;
    }
    Ok(config)
}
