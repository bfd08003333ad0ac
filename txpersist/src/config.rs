use std::path::PathBuf;
use std::time::Duration;

/// Configuration surface for opening a [`crate::store::Persistence`].
///
/// Mirrors the enumerated options in the external-interfaces section: a
/// missing store path is a fatal init error, everything else has a sane
/// default.
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Directory the KV store is opened in. Required.
    pub store_path: PathBuf,

    /// Size of the internal pool of read-only file handles reused by
    /// concurrent scan iterators. Advisory; the embedded log-structured
    /// engine underneath opens a single file, so this only bounds how many
    /// scan iterators may be outstanding before callers should back off.
    pub open_files_cache_capacity: usize,

    /// When true, every write forces a durability barrier (`flush()` after
    /// each engine mutation) instead of relying on background flushing.
    pub sync_writes: bool,

    /// Duration within which the local last-nonce view is trusted without
    /// consulting the remote node.
    pub nonce_state_timeout: Duration,
}

impl PersistenceConfig {
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        Self { store_path: store_path.into(), ..Self::default() }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("storage/txpersist"),
            open_files_cache_capacity: 64,
            sync_writes: false,
            nonce_state_timeout: Duration::from_secs(60),
        }
    }
}
