//! Concrete end-to-end scenarios covering the refresh protocol's main
//! branches and edge cases.

use fsmonitor_core::{
    refresh, Index, InMemoryUntrackedCache, MemIndex, Mode, OracleClient, OracleConfig,
    RefreshOutcome, Token, UntrackedCache,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Shares one [`InMemoryUntrackedCache`] between the index under test and
/// the assertions, the same trick `invalidate.rs`'s unit tests use.
#[derive(Clone, Default)]
struct SharedUntrackedCache(Rc<RefCell<InMemoryUntrackedCache>>);

impl UntrackedCache for SharedUntrackedCache {
    fn invalidate_path(&mut self, path: &str) {
        self.0.borrow_mut().invalidate_path(path);
    }
    fn use_fsmonitor(&self) -> bool {
        self.0.borrow().use_fsmonitor()
    }
    fn set_use_fsmonitor(&mut self, value: bool) {
        self.0.borrow_mut().set_use_fsmonitor(value);
    }
}

struct ScriptedIpc(std::io::Result<Vec<u8>>);
impl fsmonitor_core::IpcTransport for ScriptedIpc {
    fn send_recv(&self, _request: &[u8]) -> std::io::Result<Vec<u8>> {
        match &self.0 {
            Ok(bytes) => Ok(bytes.clone()),
            Err(e) => Err(std::io::Error::new(e.kind(), e.to_string())),
        }
    }
}

struct UnusedHook;
impl fsmonitor_core::HookTransport for UnusedHook {
    fn invoke(&self, _hook_path: &str, _args: &[&str]) -> std::io::Result<Vec<u8>> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "hook not used in IPC scenarios"))
    }
}

fn ipc_oracle(response: Vec<u8>) -> OracleClient<ScriptedIpc, UnusedHook> {
    OracleClient::new(
        OracleConfig { mode: Mode::Ipc, hook_path: None, hook_version: None },
        ScriptedIpc(Ok(response)),
        UnusedHook,
    )
}

#[test]
fn scenario_1_empty_index_trivial_response() {
    let cache = SharedUntrackedCache::default();
    let mut index = Index::new(MemIndex::from_paths(Vec::<&str>::new()))
        .with_untracked_cache(Box::new(cache.clone()));
    index.token = Some(Token::new("t0"));
    let mut oracle = ipc_oracle(b"t1\0/".to_vec());

    let outcome = refresh(&mut index, &mut oracle);
    assert_eq!(outcome, RefreshOutcome::Ran { paths_invalidated: 0, forced_rewrite: false });
    assert_eq!(index.token.unwrap().as_str(), "t1");
    assert!(!index.fsmonitor_changed);
    assert!(!cache.use_fsmonitor());
}

#[test]
fn scenario_2_three_entries_one_reported_dirty() {
    let mut index = Index::new(MemIndex::from_paths(["a", "b/c", "d"]));
    index.token = Some(Token::new("t0"));
    let mut oracle = ipc_oracle(b"tok\0b/c\0".to_vec());

    let outcome = refresh(&mut index, &mut oracle);
    assert_eq!(outcome, RefreshOutcome::Ran { paths_invalidated: 1, forced_rewrite: false });
    assert_eq!(index.entries.clean_paths(), vec!["a", "d"]);
    assert_eq!(index.token.as_ref().unwrap().as_str(), "tok");
}

#[test]
fn scenario_3_directory_cone_event() {
    let mut index = Index::new(MemIndex::from_paths(["src/a", "src/b", "srcfoo"]));
    index.token = Some(Token::new("t0"));
    let mut oracle = ipc_oracle(b"tok\0src/\0".to_vec());

    let outcome = refresh(&mut index, &mut oracle);
    assert_eq!(outcome, RefreshOutcome::Ran { paths_invalidated: 2, forced_rewrite: false });
    assert_eq!(index.entries.clean_paths(), vec!["srcfoo"]);
}

#[test]
fn scenario_4_case_insensitive_resolution() {
    let mut index = Index::new(MemIndex::from_paths(["Src/A"]).with_case_insensitive(true));
    index.token = Some(Token::new("t0"));
    let mut oracle = ipc_oracle(b"tok\0src/a\0".to_vec());

    let outcome = refresh(&mut index, &mut oracle);
    assert_eq!(outcome, RefreshOutcome::Ran { paths_invalidated: 1, forced_rewrite: false });
    assert!(index.entries.clean_paths().is_empty());
}

#[test]
fn scenario_5_threshold_crossing() {
    let paths: Vec<String> = (0..150).map(|i| format!("f{i:03}")).collect();
    let mut index = Index::new(MemIndex::from_paths(paths.iter().map(String::as_str)));
    index.token = Some(Token::new("t0"));

    let mut response = b"tok\0".to_vec();
    for i in 0..101 {
        response.extend_from_slice(format!("f{i:03}").as_bytes());
        response.push(0);
    }
    let mut oracle = ipc_oracle(response);

    let outcome = refresh(&mut index, &mut oracle);
    assert_eq!(outcome, RefreshOutcome::Ran { paths_invalidated: 101, forced_rewrite: true });
    assert!(index.fsmonitor_changed);
}

#[test]
fn scenario_6_extension_round_trip_v1_to_v2() {
    let mut v1 = 1u32.to_be_bytes().to_vec();
    v1.extend_from_slice(&1_700_000_000_000_000_000u64.to_be_bytes());
    let mut bitmap = fsmonitor_core::CleanBitmap::new(4);
    bitmap.set(0);
    bitmap.set(2);
    v1.extend_from_slice(&(bitmap.serialize().len() as u32).to_be_bytes());
    v1.extend_from_slice(&bitmap.serialize());

    let (token, parsed) = fsmonitor_core::parse(&v1).unwrap();
    assert_eq!(token.as_str(), "1700000000000000000");

    let reemitted = fsmonitor_core::emit(&token, &parsed);
    let (token2, parsed2) = fsmonitor_core::parse(&reemitted).unwrap();
    assert_eq!(token, token2);
    assert_eq!(parsed, parsed2);
}

#[test]
fn ipc_failure_invalidates_everything_and_disarms_untracked_cache() {
    let cache = SharedUntrackedCache::default();
    cache.0.borrow_mut().set_use_fsmonitor(true); // armed by an earlier successful refresh

    let mut index = Index::new(MemIndex::from_paths(["a", "b"])).with_untracked_cache(Box::new(cache.clone()));
    index.token = Some(Token::new("t0"));
    let mut oracle = OracleClient::new(
        OracleConfig { mode: Mode::Ipc, hook_path: None, hook_version: None },
        ScriptedIpc(Err(std::io::Error::new(std::io::ErrorKind::Other, "daemon down"))),
        UnusedHook,
    );

    refresh(&mut index, &mut oracle);
    assert!(index.entries.clean_paths().is_empty());
    assert_eq!(index.token.unwrap().as_str(), "builtin:fake");
    assert!(!cache.use_fsmonitor());
}
