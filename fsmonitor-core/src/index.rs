//! The index-state projection this crate operates on.
//!
//! The index itself — ordered lookup by exact path, case-insensitive
//! name-hash lookups, and a mutable flag word per entry — is treated as an
//! external collaborator. [`IndexView`] is the
//! seam; [`MemIndex`] is a reference implementation used by tests and the
//! demonstration CLI, not a production index.

use crate::token::Token;
use crate::untracked::UntrackedCache;

/// Read/write access to the subset of index state the fsmonitor core needs.
///
/// Paths are ordered (ascending, byte order) so that [`Self::insertion_point`]
/// can locate a directory cone with a single binary search plus forward scan.
pub trait IndexView {
    /// Number of entries.
    fn len(&self) -> usize;

    /// Whether there are no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The path stored at `idx`.
    fn path_at(&self, idx: usize) -> &str;

    /// Exact lookup by path. Returns `None` if no entry has this exact path.
    fn find_exact(&self, path: &str) -> Option<usize>;

    /// The position at which `path` would be inserted to keep entries sorted;
    /// equivalently, the first index whose path is `>= path`.
    fn insertion_point(&self, path: &str) -> usize;

    /// Whether the `CLEAN` flag is set on `idx`.
    fn is_clean(&self, idx: usize) -> bool;

    /// Set or clear the `CLEAN` flag on `idx`.
    fn set_clean(&mut self, idx: usize, clean: bool);

    /// Whether `idx` is marked for removal (excluded when materializing the
    /// on-disk bitmap).
    fn is_marked_for_removal(&self, idx: usize) -> bool;

    /// Whether `idx` is a submodule entry (excluded when applying a loaded
    /// bitmap's implicit "set CLEAN on everything" step).
    fn is_submodule(&self, idx: usize) -> bool;

    /// Whether this index's filesystem is case-insensitive (e.g. macOS
    /// default, Windows). Only consulted by the path invalidator's
    /// case-folded retry.
    fn case_insensitive(&self) -> bool;

    /// Case-folded file lookup. Only called after an exact lookup already
    /// failed on a case-insensitive filesystem.
    fn name_hash_lookup(&self, path: &str) -> Option<usize>;

    /// Case-folded directory lookup, returning the directory's canonical
    /// stored casing (without a trailing slash) if found.
    fn dir_name_hash_lookup(&self, dir: &str) -> Option<String>;
}

/// Bundles an [`IndexView`] with the process-lifetime and persisted state
/// the refresh driver and lifecycle manager need around it.
pub struct Index<T: IndexView> {
    /// The underlying entry table.
    pub entries: T,
    /// The persisted opaque token, if the feature has ever been enabled.
    pub token: Option<Token>,
    /// Guards against more than one oracle query per process.
    pub has_refreshed_this_process: bool,
    /// Mirrors the `FSMONITOR_CHANGED` bit of `cache_dirty_mask`.
    pub fsmonitor_changed: bool,
    /// The untracked-cache, if this index has one wired up.
    pub untracked_cache: Option<Box<dyn UntrackedCache>>,
}

impl<T: IndexView> Index<T> {
    /// Wrap an [`IndexView`] with fresh (disabled) fsmonitor state.
    pub fn new(entries: T) -> Self {
        Self {
            entries,
            token: None,
            has_refreshed_this_process: false,
            fsmonitor_changed: false,
            untracked_cache: None,
        }
    }

    /// Attach an untracked-cache.
    pub fn with_untracked_cache(mut self, cache: Box<dyn UntrackedCache>) -> Self {
        self.untracked_cache = Some(cache);
        self
    }
}

/// An in-memory [`IndexView`] for tests and the demonstration CLI.
#[derive(Debug, Default)]
pub struct MemIndex {
    entries: Vec<MemEntry>,
    case_insensitive: bool,
}

#[derive(Debug, Clone)]
struct MemEntry {
    path: String,
    clean: bool,
    removed: bool,
    submodule: bool,
}

impl MemIndex {
    /// Build an index from already-sorted paths, all initially `CLEAN`.
    pub fn from_paths(paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut entries: Vec<MemEntry> = paths
            .into_iter()
            .map(|p| MemEntry { path: p.into(), clean: true, removed: false, submodule: false })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Self { entries, case_insensitive: false }
    }

    /// Enable case-insensitive name-hash lookups, as on macOS/Windows filesystems.
    pub fn with_case_insensitive(mut self, value: bool) -> Self {
        self.case_insensitive = value;
        self
    }

    /// Mark an entry (by path) as a submodule.
    pub fn mark_submodule(&mut self, path: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.path == path) {
            entry.submodule = true;
        }
    }

    /// Mark an entry (by path) for removal.
    pub fn mark_removed(&mut self, path: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.path == path) {
            entry.removed = true;
        }
    }

    /// Snapshot of which paths are currently clean, for assertions in tests.
    pub fn clean_paths(&self) -> Vec<&str> {
        self.entries.iter().filter(|e| e.clean).map(|e| e.path.as_str()).collect()
    }
}

impl IndexView for MemIndex {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn path_at(&self, idx: usize) -> &str {
        &self.entries[idx].path
    }

    fn find_exact(&self, path: &str) -> Option<usize> {
        self.entries.binary_search_by(|e| e.path.as_str().cmp(path)).ok()
    }

    fn insertion_point(&self, path: &str) -> usize {
        match self.entries.binary_search_by(|e| e.path.as_str().cmp(path)) {
            Ok(idx) | Err(idx) => idx,
        }
    }

    fn is_clean(&self, idx: usize) -> bool {
        self.entries[idx].clean
    }

    fn set_clean(&mut self, idx: usize, clean: bool) {
        self.entries[idx].clean = clean;
    }

    fn is_marked_for_removal(&self, idx: usize) -> bool {
        self.entries[idx].removed
    }

    fn is_submodule(&self, idx: usize) -> bool {
        self.entries[idx].submodule
    }

    fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    fn name_hash_lookup(&self, path: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.path.eq_ignore_ascii_case(path))
    }

    fn dir_name_hash_lookup(&self, dir: &str) -> Option<String> {
        let prefix = format!("{dir}/");
        self.entries.iter().find_map(|e| {
            if e.path.len() > prefix.len() && e.path[..prefix.len()].eq_ignore_ascii_case(&prefix) {
                Some(e.path[..dir.len()].to_string())
            } else {
                None
            }
        })
    }
}
