//! The path invalidator.
//!
//! Clears `CLEAN` on every index entry a single reported path logically
//! affects, and notifies the untracked-cache. Dispatch is non-recursive by
//! construction: stage A is an exact/cone match, stage B is a case-folded
//! retry that only runs when stage A found nothing on a case-insensitive
//! filesystem. Stage B never re-enters stage A, unlike the recursive
//! callback chain this is modeled on.

use crate::index::{Index, IndexView};

/// Borrows an [`Index`] mutably for the duration of one invalidation pass.
/// Construct one per refresh; all dispatch logic lives as private methods
/// on this value rather than free functions threading the index through.
pub struct Invalidator<'a, T: IndexView> {
    index: &'a mut Index<T>,
}

impl<'a, T: IndexView> Invalidator<'a, T> {
    /// Borrow `index` for one invalidation pass.
    pub fn new(index: &'a mut Index<T>) -> Self {
        Self { index }
    }

    /// Invalidate every entry affected by the single reported path `p`.
    /// Returns the number of entries invalidated ("in-cone count").
    pub fn invalidate_path(&mut self, p: &str) -> usize {
        self.notify_untracked_cache(p);

        let count = self.stage_a(p);
        if count > 0 || !self.index.entries.case_insensitive() {
            return count;
        }
        self.stage_b(p)
    }

    fn notify_untracked_cache(&mut self, p: &str) {
        let trimmed = p.strip_suffix('/').unwrap_or(p);
        if let Some(cache) = self.index.untracked_cache.as_mut() {
            cache.invalidate_path(trimmed);
        }
    }

    /// Stage A: case-sensitive exact match or directory-cone scan.
    fn stage_a(&mut self, p: &str) -> usize {
        if let Some(dir) = p.strip_suffix('/') {
            let _ = dir;
            self.invalidate_cone(p)
        } else if let Some(idx) = self.index.entries.find_exact(p) {
            self.clear_clean(idx);
            1
        } else {
            let cone = format!("{p}/");
            self.invalidate_cone(&cone)
        }
    }

    /// Stage B: case-folded retry. Only invoked when stage A found nothing
    /// and the filesystem is case-insensitive. Never calls back into stage A.
    fn stage_b(&mut self, p: &str) -> usize {
        if let Some(dir) = p.strip_suffix('/') {
            // (a) case-folded file lookup on the full slash path: this only
            // matches sparse directory entries, which carry a trailing slash
            // in the index.
            if let Some(idx) = self.index.entries.name_hash_lookup(p) {
                self.clear_clean(idx);
                return 1;
            }
            // (b) case-folded directory lookup, then cone-scan the canonical name.
            match self.index.entries.dir_name_hash_lookup(dir) {
                Some(canonical) => self.invalidate_cone(&format!("{canonical}/")),
                None => 0,
            }
        } else {
            // (a) case-folded file lookup.
            if let Some(idx) = self.index.entries.name_hash_lookup(p) {
                self.clear_clean(idx);
                return 1;
            }
            // (b) case-folded directory lookup, then cone-scan the canonical name.
            //
            // A directory lookup that byte-matches the canonical spelling on
            // its first `len` bytes is treated as a hit even without
            // independently checking the canonical path extends beyond
            // `len`: the contract of `dir_name_hash_lookup` is to return
            // `None` unless it found a genuine directory prefix, so any
            // `Some` here is conclusive.
            match self.index.entries.dir_name_hash_lookup(p) {
                Some(canonical) => self.invalidate_cone(&format!("{canonical}/")),
                None => 0,
            }
        }
    }

    /// Clear `CLEAN` on every entry whose path has `dir_path_with_slash` as a
    /// prefix, starting from its insertion point. Returns the count cleared.
    fn invalidate_cone(&mut self, dir_path_with_slash: &str) -> usize {
        let mut pos = self.index.entries.insertion_point(dir_path_with_slash);
        let mut count = 0;
        while pos < self.index.entries.len()
            && self.index.entries.path_at(pos).starts_with(dir_path_with_slash)
        {
            self.clear_clean(pos);
            count += 1;
            pos += 1;
        }
        count
    }

    fn clear_clean(&mut self, idx: usize) {
        self.index.entries.set_clean(idx, false);
        tracing::trace!(target: "fsmonitor", entry = self.index.entries.path_at(idx), "invalidated");
    }
}
