//! The lifecycle manager: enable/disable the feature on an index,
//! and materialize/apply the bitmap extension around index I/O.

use crate::bitmap::CleanBitmap;
use crate::errors::{FsmonitorError, FsmonitorResult};
use crate::extension;
use crate::index::{Index, IndexView};
use crate::oracle::{HookTransport, IpcTransport, OracleClient};
use crate::refresh::refresh;
use crate::token::Token;

/// Read and validate the extension payload for `index`. Its bitmap's bit
/// range must not exceed the number of entries,
/// unless `split_index` is set to explain the discrepancy.
pub fn read_extension<T: IndexView>(
    bytes: &[u8],
    index: &Index<T>,
    split_index: bool,
) -> FsmonitorResult<(Token, CleanBitmap)> {
    let (token, bitmap) = extension::parse(bytes)?;
    extension::check_bitmap_bounds(&bitmap, index.entries.len(), split_index)?;
    tracing::trace!(
        target: "fsmonitor",
        token = token.as_str(),
        bit_count = bitmap.bit_count(),
        "extension: read token"
    );
    Ok((token, bitmap))
}

/// Turn the feature on: synthesize a token if none is stored, mark every
/// entry dirty, request an index rewrite, arm the untracked-cache, then run
/// one refresh immediately.
pub fn enable<T, I, H>(index: &mut Index<T>, oracle: &mut OracleClient<I, H>)
where
    T: IndexView,
    I: IpcTransport,
    H: HookTransport,
{
    if index.token.is_none() {
        index.token = Some(Token::synthesize_now());
    }
    for idx in 0..index.entries.len() {
        index.entries.set_clean(idx, false);
    }
    index.fsmonitor_changed = true;
    if let Some(cache) = index.untracked_cache.as_mut() {
        cache.set_use_fsmonitor(true);
    }

    refresh(index, oracle);
}

/// Turn the feature off: discard the token and request an index rewrite.
/// `CLEAN` bits are left as-is; they become meaningless without a token, and
/// the next writer won't emit the extension at all.
pub fn disable<T: IndexView>(index: &mut Index<T>) {
    if index.token.take().is_some() {
        index.fsmonitor_changed = true;
    }
}

/// Apply a bitmap parsed from the on-disk extension at index-load time.
///
/// If the feature is currently enabled: set `CLEAN` on every non-submodule
/// entry, then clear it again on every entry the bitmap names, then run one
/// refresh. If the feature is disabled, this is a no-op beyond freeing the
/// bitmap (which, in Rust, happens automatically when it's dropped).
pub fn apply_loaded_bitmap<T, I, H>(
    index: &mut Index<T>,
    bitmap: CleanBitmap,
    feature_enabled: bool,
    oracle: &mut OracleClient<I, H>,
) where
    T: IndexView,
    I: IpcTransport,
    H: HookTransport,
{
    if !feature_enabled {
        return;
    }

    for idx in 0..index.entries.len() {
        if !index.entries.is_submodule(idx) {
            index.entries.set_clean(idx, true);
        }
    }
    for bit in bitmap.iter_set_bits() {
        let idx = bit as usize;
        if idx < index.entries.len() {
            index.entries.set_clean(idx, false);
        }
    }

    refresh(index, oracle);
}

/// Build the bitmap to persist before writing the index: one bit per
/// non-removed entry, in written order, set wherever `CLEAN` is *not* set.
pub fn materialize_bitmap<T: IndexView>(index: &Index<T>) -> CleanBitmap {
    let written_count = (0..index.entries.len()).filter(|&i| !index.entries.is_marked_for_removal(i)).count();
    let mut bitmap = CleanBitmap::new(written_count as u32);

    let mut written_pos = 0u32;
    for idx in 0..index.entries.len() {
        if index.entries.is_marked_for_removal(idx) {
            continue;
        }
        if !index.entries.is_clean(idx) {
            bitmap.set(written_pos);
        }
        written_pos += 1;
    }
    bitmap
}

/// Serialize the current token and a freshly materialized bitmap as an
/// extension payload, per [`extension::emit`]. Fails if the feature is
/// enabled but no token is stored.
pub fn write_extension<T: IndexView>(index: &Index<T>) -> Option<Vec<u8>> {
    let token = index.token.as_ref()?;
    let bitmap = materialize_bitmap(index);
    tracing::trace!(
        target: "fsmonitor",
        token = token.as_str(),
        bit_count = bitmap.bit_count(),
        "extension: write token"
    );
    Some(extension::emit(token, &bitmap))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::index::MemIndex;
    use crate::oracle::{IpcTransport, Mode, OracleConfig};

    struct NoopIpc;
    impl IpcTransport for NoopIpc {
        fn send_recv(&self, _request: &[u8]) -> std::io::Result<Vec<u8>> {
            Ok(b"t\0/".to_vec())
        }
    }
    struct NoopHook;
    impl HookTransport for NoopHook {
        fn invoke(&self, _hook_path: &str, _args: &[&str]) -> std::io::Result<Vec<u8>> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "unused"))
        }
    }
    fn oracle() -> OracleClient<NoopIpc, NoopHook> {
        OracleClient::new(OracleConfig { mode: Mode::Ipc, hook_path: None, hook_version: None }, NoopIpc, NoopHook)
    }

    #[test]
    fn materialize_then_apply_round_trips_clean_set() {
        let mut index = Index::new(MemIndex::from_paths(["a", "b", "c", "d"]));
        index.entries.set_clean(1, false);
        index.entries.set_clean(3, false);

        let bitmap = materialize_bitmap(&index);
        assert_eq!(bitmap.iter_set_bits().collect::<Vec<_>>(), vec![1, 3]);

        let mut reloaded = Index::new(MemIndex::from_paths(["a", "b", "c", "d"]));
        let mut oracle = oracle();
        reloaded.token = Some(Token::new("t"));
        reloaded.has_refreshed_this_process = true; // isolate this test from refresh's side effects
        apply_loaded_bitmap(&mut reloaded, bitmap, true, &mut oracle);

        assert_eq!(reloaded.entries.clean_paths(), vec!["a", "c"]);
    }

    #[test]
    fn materialize_skips_removed_entries() {
        let mut index = Index::new(MemIndex::from_paths(["a", "b", "c"]));
        index.entries.mark_removed("b");
        index.entries.set_clean(2, false); // "c"

        let bitmap = materialize_bitmap(&index);
        assert_eq!(bitmap.bit_count(), 2);
        // "c" is written at position 1 once "b" is skipped.
        assert_eq!(bitmap.iter_set_bits().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn enable_synthesizes_token_and_marks_everything_dirty() {
        let mut index = Index::new(MemIndex::from_paths(["a", "b"]));
        let mut oracle = oracle();
        enable(&mut index, &mut oracle);

        assert!(index.token.is_some());
        assert!(index.fsmonitor_changed);
    }

    #[test]
    fn disable_without_token_does_not_force_rewrite() {
        let mut index = Index::new(MemIndex::from_paths(["a"]));
        disable(&mut index);
        assert!(!index.fsmonitor_changed);
    }

    #[test]
    fn write_extension_is_none_without_a_token() {
        let index = Index::new(MemIndex::from_paths(["a"]));
        assert!(write_extension(&index).is_none());
    }

    #[test]
    fn write_then_read_extension_round_trips() {
        let mut index = Index::new(MemIndex::from_paths(["a", "b", "c"]));
        index.token = Some(Token::new("tok"));
        index.entries.set_clean(1, false);

        let bytes = write_extension(&index).unwrap();
        let (token, bitmap) = read_extension(&bytes, &index, false).unwrap();
        assert_eq!(token.as_str(), "tok");
        assert_eq!(bitmap.iter_set_bits().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn read_extension_rejects_bitmap_larger_than_index() {
        let index = Index::new(MemIndex::from_paths(["a"]));
        let token = Token::new("tok");
        let oversized = CleanBitmap::new(5);
        let bytes = extension::emit(&token, &oversized);

        assert!(matches!(
            read_extension(&bytes, &index, false),
            Err(FsmonitorError::Extension(crate::errors::ExtensionError::BitmapExceedsIndex { .. }))
        ));
    }
}
