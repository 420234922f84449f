//! Errors for the `fsmonitor-core` crate.

use thiserror::Error;

/// Top-level error returned by the public operations of this crate.
///
/// Each variant wraps the error domain that produced it; see
/// [`ExtensionError`], [`OracleError`] and [`ConfigError`] for the specific
/// failure cases within each domain.
#[derive(Error, Debug)]
pub enum FsmonitorError {
    /// Failed to read or write the on-disk bitmap extension.
    #[error(transparent)]
    Extension(#[from] ExtensionError),
    /// The oracle transport failed or returned a response this crate does not understand.
    #[error(transparent)]
    Oracle(#[from] OracleError),
    /// The feature is configured in a way that cannot run on this platform.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A [Result] type for [FsmonitorError].
pub type FsmonitorResult<T> = Result<T, FsmonitorError>;

/// Errors produced while parsing or emitting the index's clean-bitmap extension.
///
/// [ExtensionError::Corrupt] and [ExtensionError::BadVersion] abort loading the
/// extension entirely; entries are left without `CLEAN` set in that case.
#[derive(Error, Debug)]
pub enum ExtensionError {
    /// The extension payload is shorter than the minimum header size.
    #[error("corrupt fsmonitor extension (too short)")]
    Corrupt,
    /// The extension header names a version this crate does not know how to read.
    #[error("bad fsmonitor extension version {0}")]
    BadVersion(u32),
    /// The bitmap payload did not parse as exactly `ewah_size` bytes.
    #[error("failed to parse compressed bitmap reading fsmonitor index extension")]
    CorruptBitmap,
    /// The token embedded in a V2 extension was not valid UTF-8, or was not
    /// NUL-terminated within the remaining bytes.
    #[error("fsmonitor extension token is not a NUL-terminated UTF-8 string")]
    MalformedToken,
    /// The parsed bitmap claims more bits than the index has entries, and no
    /// split-index is in effect to explain the discrepancy.
    #[error("fsmonitor_dirty has more entries than the index ({bitmap_bits} > {entries})")]
    BitmapExceedsIndex {
        /// Number of bits claimed by the parsed bitmap.
        bitmap_bits: usize,
        /// Number of entries in the index the bitmap was read against.
        entries: usize,
    },
}

/// Errors produced while querying the change oracle.
#[derive(Error, Debug)]
pub enum OracleError {
    /// The IPC transport failed to send the request or receive a response.
    #[error("fsmonitor daemon is not available: {0}")]
    IpcUnavailable(String),
    /// The configured hook exited non-zero, or could not be spawned.
    #[error("fsmonitor hook is not available: {0}")]
    HookUnavailable(String),
    /// The response from the transport was not valid UTF-8 where a string was expected.
    #[error("oracle response is malformed: {0}")]
    Malformed(String),
    /// A configured (non auto-negotiated) hook protocol version outside `{1, 2}`.
    #[error("unknown fsmonitor hook protocol version {0}")]
    UnknownVersion(i64),
}

/// Errors produced while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `core.fsmonitorhookversion` was set to something other than `1` or `2`.
    ///
    /// This is reported so the caller can log a single warning; the core itself
    /// treats it as "unset" and auto-negotiates instead.
    #[error("invalid hook version '{0}' in fsmonitor hookversion config, must be 1 or 2")]
    InvalidHookVersion(i64),
    /// The configured mode cannot run in the current environment (e.g. IPC mode
    /// requested on a platform with no local-socket support).
    #[error("fsmonitor mode '{mode}' is not supported on this platform: {reason}")]
    Incompatible {
        /// The configured mode, rendered for the warning message.
        mode: &'static str,
        /// Human-readable reason the mode is incompatible.
        reason: &'static str,
    },
}
