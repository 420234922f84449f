//! Configuration loading: the mode selector, hook path, and `hookversion`.

use crate::errors::ConfigError;
use crate::oracle::{Mode, OracleConfig};
use serde::Deserialize;

/// Raw configuration as it would be deserialized from the content-tracking
/// system's config store. Mirrors the three keys the refresh protocol
/// is configured by.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(test, derive(Default))]
pub struct RawConfig {
    /// `disabled | hook | ipc`.
    pub mode: Option<String>,
    /// Path to the hook program.
    pub hook_path: Option<String>,
    /// `core.fsmonitorhookversion`, before validation.
    pub hook_version: Option<i64>,
}

/// Parse [`RawConfig`] into an [`OracleConfig`], sanitizing `hook_version`
/// (an out-of-range value is reported via the returned warning and treated
/// as unset, matching the `UnknownVersion` taxonomy) and checking platform
/// compatibility for the selected mode.
pub fn load(raw: &RawConfig) -> Result<(OracleConfig, Option<ConfigError>), ConfigError> {
    let mode = match raw.mode.as_deref() {
        None | Some("disabled") => Mode::Disabled,
        Some("ipc") => Mode::Ipc,
        Some("hook") => Mode::Hook,
        Some(_) => Mode::Disabled,
    };

    check_compatibility(mode)?;

    let (hook_version, warning) = match raw.hook_version {
        None => (None, None),
        Some(1) => (Some(1), None),
        Some(2) => (Some(2), None),
        Some(other) => (None, Some(ConfigError::InvalidHookVersion(other))),
    };

    Ok((OracleConfig { mode, hook_path: raw.hook_path.clone(), hook_version }, warning))
}

/// Refuse to run IPC mode on a platform with no local-socket support. This
/// crate's concrete IPC transport is a Unix domain socket, so anything else
/// is incompatible; a one-shot warning is the caller's responsibility (see
/// [`crate::errors::ConfigError::Incompatible`]).
fn check_compatibility(mode: Mode) -> Result<(), ConfigError> {
    if mode == Mode::Ipc && !cfg!(unix) {
        return Err(ConfigError::Incompatible {
            mode: "ipc",
            reason: "no local IPC socket support on this platform",
        });
    }
    Ok(())
}
