//! Builds an in-memory index from a directory on disk, standing in for the
//! real content-tracking system's index when driving the demonstration CLI.

use anyhow::Result;
use fsmonitor_core::{Index, InMemoryUntrackedCache, MemIndex};
use std::path::{Path, PathBuf};

/// Walk `root` and build a sorted [`MemIndex`] of every regular file found,
/// skipping `.git`-style metadata directories and any path starting with `.fsmonitor`.
pub fn build_index(root: &Path, wire_untracked_cache: bool) -> Result<Index<MemIndex>> {
    let mut paths = Vec::new();
    walk(root, root, &mut paths)?;
    paths.sort();

    let mut index = Index::new(MemIndex::from_paths(paths).with_case_insensitive(cfg!(target_os = "macos") || cfg!(windows)));
    if wire_untracked_cache {
        index = index.with_untracked_cache(Box::new(InMemoryUntrackedCache::new()));
    }
    Ok(index)
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if file_name.starts_with('.') {
            continue;
        }

        if entry.file_type()?.is_dir() {
            walk(root, &path, out)?;
        } else {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            out.push(relative.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/"));
        }
    }
    Ok(())
}

/// Default IPC socket path for a given working-tree root.
pub fn socket_path_for(root: &Path) -> PathBuf {
    root.join(".fsmonitor.sock")
}
