//! The untracked-cache seam.
//!
//! The real untracked-cache is treated as an external collaborator here;
//! only its two observable effects matter to this crate.

/// What the path invalidator and refresh driver are allowed to do to the
/// untracked-cache.
pub trait UntrackedCache {
    /// Invalidate any cached untracked-file listing under `path`.
    ///
    /// `path` is passed without a trailing slash, matching the upstream call
    /// convention.
    fn invalidate_path(&mut self, path: &str);

    /// Whether the untracked-cache currently trusts the fsmonitor to keep it
    /// up to date. The refresh driver flips this on a successful,
    /// non-trivial refresh and off whenever it falls back to full
    /// invalidation.
    fn use_fsmonitor(&self) -> bool;

    /// Set [`Self::use_fsmonitor`].
    fn set_use_fsmonitor(&mut self, value: bool);
}

/// A reference [`UntrackedCache`] used by tests and the demonstration CLI.
#[derive(Debug, Default)]
pub struct InMemoryUntrackedCache {
    invalidated: Vec<String>,
    use_fsmonitor: bool,
}

impl InMemoryUntrackedCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths passed to [`UntrackedCache::invalidate_path`] so far, in call order.
    pub fn invalidated_paths(&self) -> &[String] {
        &self.invalidated
    }
}

impl UntrackedCache for InMemoryUntrackedCache {
    fn invalidate_path(&mut self, path: &str) {
        self.invalidated.push(path.to_string());
    }

    fn use_fsmonitor(&self) -> bool {
        self.use_fsmonitor
    }

    fn set_use_fsmonitor(&mut self, value: bool) {
        self.use_fsmonitor = value;
    }
}
