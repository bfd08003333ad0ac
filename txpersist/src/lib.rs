//! `txpersist` is the managed-transaction persistence core of a blockchain
//! transaction manager: an ordered-index transaction store plus a
//! per-signer nonce allocator, built on the `txstore` embedded KV engine.
//!
//! Transactions are stored once by primary ID and referenced from three
//! derived indexes (creation time, pending status, per-signer nonce). The
//! indexes may transiently point at a missing primary after a crash; list
//! scans detect and sweep these orphans opportunistically. See
//! [`store::Persistence`], [`writer`], and [`nonce::NonceAllocator`].

pub mod config;
pub mod crud;
pub mod error;
pub mod keys;
pub mod logging;
pub mod model;
pub mod nonce;
pub mod store;
pub mod writer;

use std::sync::Arc;

use txstore::storage::log_cask::LogCask;
use txstore::storage::memory::Memory;

use crate::config::PersistenceConfig;
use crate::error::{Error, Result};
use crate::store::Persistence;

/// A disk-backed persistence core, the production configuration.
pub type DiskPersistence = Persistence<LogCask>;

/// An in-memory persistence core, used by tests that don't need durability.
pub type MemoryPersistence = Persistence<Memory>;

impl DiskPersistence {
    /// Opens (or creates) the log-structured store at `config.store_path`,
    /// compacting on open if garbage exceeds 20% of the file.
    pub fn open(config: PersistenceConfig) -> Result<Arc<Self>> {
        let engine = LogCask::new_compact(config.store_path.clone(), 0.2)
            .map_err(|err| Error::InitError(err.to_string()))?;
        log::info!("opened persistence store at {:?}", config.store_path);
        Ok(Arc::new(Persistence::new(engine, config)))
    }
}

impl MemoryPersistence {
    /// Opens an in-memory store. `config.store_path` is ignored.
    pub fn open_in_memory(config: PersistenceConfig) -> Arc<Self> {
        Arc::new(Persistence::new(Memory::new(), config))
    }
}
