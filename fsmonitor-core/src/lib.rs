#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! Refresh protocol, path invalidation, and on-disk codec that let a
//! content-tracking system's index consult an external filesystem-change
//! oracle instead of stat-ing every tracked path.

pub mod errors;

mod bitmap;
pub use bitmap::CleanBitmap;

mod token;
pub use token::Token;

mod extension;
pub use extension::{check_bitmap_bounds, emit, parse};

mod index;
pub use index::{Index, IndexView, MemIndex};

mod untracked;
pub use untracked::{InMemoryUntrackedCache, UntrackedCache};

mod invalidate;
pub use invalidate::Invalidator;

mod oracle;
pub use oracle::{
    HookTransport, IpcTransport, Mode, OracleClient, OracleConfig, OracleOutcome, OracleResponse,
    Payload,
};

mod refresh;
pub use refresh::{refresh, RefreshOutcome, FORCE_UPDATE_THRESHOLD};

mod lifecycle;
pub use lifecycle::{
    apply_loaded_bitmap, disable, enable, materialize_bitmap, read_extension, write_extension,
};

pub mod config;

pub mod ipc;
