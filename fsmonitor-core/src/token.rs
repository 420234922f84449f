//! The opaque oracle token.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// The literal token an IPC query sends when no token has been stored yet.
pub const BUILTIN_FAKE: &str = "builtin:fake";

/// An opaque, NUL-free byte string understood only by the oracle.
///
/// Two historical wire variants exist (a decimal nanosecond timestamp and an
/// opaque string); both are represented identically here once acquired.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Wrap an already-acquired token string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The literal `"builtin:fake"` token used when an IPC query has no
    /// prior token to send and no real token was produced.
    pub fn builtin_fake() -> Self {
        Self::new(BUILTIN_FAKE)
    }

    /// Synthesize a fresh V1-style token from the current wall clock,
    /// formatted as decimal nanoseconds since the Unix epoch.
    ///
    /// Uses `u64::to_string`, which matches the upstream `%PRIu64` formatting
    /// exactly: no leading zeros, no thousands separators. This must stay
    /// stable across versions since a V1 reader reconstructs the same string.
    pub fn synthesize_now() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::from_nanos(nanos)
    }

    /// Format a raw nanosecond timestamp the same way [`Self::synthesize_now`] does.
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos.to_string())
    }

    /// Borrow the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the token, returning the owned string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}
