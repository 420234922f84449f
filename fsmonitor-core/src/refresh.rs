//! The refresh driver.
//!
//! Orchestrates one refresh cycle: gate on mode and the once-per-process
//! guard, query the oracle, apply the response via the path invalidator (or
//! bulk-invalidate on a trivial/failed response), and advance the token.

use crate::index::{Index, IndexView};
use crate::invalidate::Invalidator;
use crate::oracle::{HookTransport, IpcTransport, Mode, OracleClient, OracleOutcome, Payload};
use crate::token::Token;

/// Above this many invalidated paths in one refresh, force an index rewrite
/// so the token advances on disk and bounds future response sizes.
pub const FORCE_UPDATE_THRESHOLD: usize = 100;

/// What happened during a [`refresh`] call, for the caller to log or assert on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The feature is disabled; nothing was done.
    Disabled,
    /// A refresh already ran this process; nothing was done.
    AlreadyRefreshed,
    /// A refresh ran. `paths_invalidated` counts successful invalidations
    /// across all reported paths; `forced_rewrite` mirrors whether
    /// `FSMONITOR_CHANGED` was set.
    Ran { paths_invalidated: usize, forced_rewrite: bool },
}

/// Run one refresh cycle against `index` using `oracle`.
pub fn refresh<T, I, H>(index: &mut Index<T>, oracle: &mut OracleClient<I, H>) -> RefreshOutcome
where
    T: IndexView,
    I: IpcTransport,
    H: HookTransport,
{
    if oracle.mode() == Mode::Disabled {
        return RefreshOutcome::Disabled;
    }
    if index.has_refreshed_this_process {
        return RefreshOutcome::AlreadyRefreshed;
    }
    index.has_refreshed_this_process = true;

    tracing::trace!(target: "fsmonitor", "refresh: querying oracle");
    let outcome = oracle.query(index.token.as_ref());

    let (new_token, paths_invalidated, forced_rewrite, use_fsmonitor) = match outcome {
        OracleOutcome::Success(response) => match response.payload {
            Payload::Trivial => {
                let cleared = clear_all(index);
                (response.token, 0, cleared > 0, false)
            }
            Payload::Paths(paths) => {
                let mut invalidator = Invalidator::new(index);
                let count: usize =
                    paths.iter().filter(|p| !p.is_empty()).map(|p| invalidator.invalidate_path(p)).sum();
                (response.token, count, count > FORCE_UPDATE_THRESHOLD, true)
            }
        },
        OracleOutcome::Failed(token) | OracleOutcome::Skipped(token) => {
            let cleared = clear_all(index);
            (token, 0, cleared > 0, false)
        }
    };

    if let Some(cache) = index.untracked_cache.as_mut() {
        cache.set_use_fsmonitor(use_fsmonitor);
    }
    if forced_rewrite {
        index.fsmonitor_changed = true;
    }
    index.token = Some(new_token);

    tracing::trace!(target: "fsmonitor", paths_invalidated, forced_rewrite, "refresh: done");
    RefreshOutcome::Ran { paths_invalidated, forced_rewrite }
}

/// Clear `CLEAN` on every entry. Returns the number of entries that were
/// actually cleared (already-dirty entries don't count, matching the
/// upstream "if any bit was cleared" gate on forcing a rewrite).
fn clear_all<T: IndexView>(index: &mut Index<T>) -> usize {
    let mut cleared = 0;
    for idx in 0..index.entries.len() {
        if index.entries.is_clean(idx) {
            index.entries.set_clean(idx, false);
            cleared += 1;
        }
    }
    cleared
}
