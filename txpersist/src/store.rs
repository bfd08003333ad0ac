use std::ops::Bound;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use txstore::storage::engine::Engine;

use crate::config::PersistenceConfig;
use crate::error::{Error, Result};

/// Direction of a range scan; see `4.1 Key encoding and iteration engine`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// The persistence facade wrapping an ordered KV engine.
///
/// `engine` is guarded by a plain mutex: the underlying `Engine` trait
/// requires `&mut self` even for reads (it's a single-threaded-access
/// design), so every operation already serializes through this mutex. It is
/// an `Option` so `close()` can take the engine out and drop it (flushing
/// and releasing any OS-level file lock) without needing unique ownership of
/// the `Persistence` itself, which normally lives behind an `Arc`.
/// `tx_lock` is a *separate* lock whose only job is letting a reader tell a
/// partial write in progress apart from a genuine crash orphan: it is held
/// shared during reads/lists and exclusively during writes/sweeps, per
/// `5. CONCURRENCY & RESOURCE MODEL`.
pub struct Persistence<E: Engine> {
    pub(crate) engine: Mutex<Option<E>>,
    pub(crate) tx_lock: RwLock<()>,
    pub(crate) config: PersistenceConfig,
}

impl<E: Engine> Persistence<E> {
    pub fn new(engine: E, config: PersistenceConfig) -> Self {
        Self { engine: Mutex::new(Some(engine)), tx_lock: RwLock::new(()), config }
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub(crate) fn read_lock(&self) -> RwLockReadGuard<'_, ()> {
        self.tx_lock.read().expect("transaction lock poisoned")
    }

    pub(crate) fn write_lock(&self) -> RwLockWriteGuard<'_, ()> {
        self.tx_lock.write().expect("transaction lock poisoned")
    }

    /// Runs `f` against the live engine, or fails with `Error::Closed` if
    /// `close()` has already run.
    fn with_engine<R>(&self, f: impl FnOnce(&mut E) -> txstore::error::CResult<R>) -> Result<R> {
        let mut slot = self.engine.lock().expect("engine mutex poisoned");
        match slot.as_mut() {
            Some(engine) => Ok(f(engine)?),
            None => Err(Error::Closed),
        }
    }

    pub(crate) fn raw_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.with_engine(|engine| engine.get(key))
    }

    pub(crate) fn raw_set(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.with_engine(|engine| {
            engine.set(key, value)?;
            if self.config.sync_writes {
                engine.flush()?;
            }
            Ok(())
        })
    }

    pub(crate) fn raw_delete(&self, key: &[u8]) -> Result<()> {
        self.with_engine(|engine| {
            engine.delete(key)?;
            if self.config.sync_writes {
                engine.flush()?;
            }
            Ok(())
        })
    }

    /// Flushes the engine unconditionally, regardless of `sync_writes`.
    pub fn flush(&self) -> Result<()> {
        self.with_engine(|engine| engine.flush())
    }

    /// Closes the persistence core: flushes and drops the underlying engine,
    /// releasing any OS-level file lock it holds. Idempotent -- a second
    /// call is a no-op. Every operation after `close()` returns
    /// `Error::Closed`; see `6. EXTERNAL INTERFACES`.
    pub fn close(&self) -> Result<()> {
        let _guard = self.write_lock();
        let mut slot = self.engine.lock().expect("engine mutex poisoned");
        if let Some(mut engine) = slot.take() {
            engine.flush()?;
        }
        Ok(())
    }

    /// Writes a raw key/value pair directly, bypassing the writer's index
    /// invariants. For simulating crash-leftover orphans and partial writes
    /// in tests; not part of the writer's public contract.
    pub fn debug_put_raw(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.raw_set(key, value)
    }

    /// Reads a raw key directly, bypassing decoding. Test-only counterpart to
    /// `debug_put_raw`, for asserting a key was (or wasn't) swept.
    pub fn debug_get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.raw_get(key)
    }

    /// Runs a bounded range scan over `[prefix, end)`, honouring `after` as
    /// an exclusive within-family cursor and `limit` (0 = unbounded).
    pub(crate) fn raw_scan(
        &self,
        prefix: Vec<u8>,
        end: Vec<u8>,
        after: &[u8],
        limit: usize,
        dir: Direction,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let (start_bound, end_bound) = match dir {
            Direction::Ascending => {
                let start = if after.is_empty() {
                    Bound::Included(prefix.clone())
                } else {
                    let mut cursor = prefix.clone();
                    cursor.extend_from_slice(after);
                    Bound::Excluded(cursor)
                };
                (start, Bound::Excluded(end))
            }
            Direction::Descending => {
                let upper = if after.is_empty() {
                    Bound::Excluded(end)
                } else {
                    let mut cursor = prefix.clone();
                    cursor.extend_from_slice(after);
                    Bound::Excluded(cursor)
                };
                (Bound::Included(prefix), upper)
            }
        };

        self.with_engine(move |engine| {
            let iter = engine.scan_dyn((start_bound, end_bound));
            match dir {
                Direction::Ascending if limit == 0 => iter.collect::<txstore::error::CResult<Vec<_>>>(),
                Direction::Ascending => iter.take(limit).collect::<txstore::error::CResult<Vec<_>>>(),
                Direction::Descending if limit == 0 => {
                    iter.rev().collect::<txstore::error::CResult<Vec<_>>>()
                }
                Direction::Descending => {
                    iter.rev().take(limit).collect::<txstore::error::CResult<Vec<_>>>()
                }
            }
        })
    }

    /// Scans a primary-keyed family directly (no index indirection), JSON
    /// decoding each value. Used by the uniform single-entity CRUD.
    pub(crate) fn list_direct<T, F>(
        &self,
        prefix: Vec<u8>,
        end: Vec<u8>,
        after: &[u8],
        limit: usize,
        dir: Direction,
        decode: F,
    ) -> Result<Vec<T>>
    where
        F: Fn(&[u8]) -> Result<Option<T>>,
    {
        let _guard = self.read_lock();
        let rows = self.raw_scan(prefix, end, after, limit, dir)?;
        let mut items = Vec::with_capacity(rows.len());
        for (_, value) in rows {
            if let Some(item) = decode(&value)? {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Scans an index family, dereferencing each value (a primary key) and
    /// decoding the primary record. Missing primaries are collected as
    /// orphans rather than surfaced as errors; a caller-supplied `decode`
    /// returning `Ok(None)` filters a record out without orphaning it.
    pub(crate) fn list_via_index<T, F>(
        &self,
        index_prefix: Vec<u8>,
        index_end: Vec<u8>,
        after: &[u8],
        limit: usize,
        dir: Direction,
        decode: F,
    ) -> Result<(Vec<T>, Vec<Vec<u8>>)>
    where
        F: Fn(&[u8]) -> Result<Option<T>>,
    {
        let mut items = Vec::new();
        let mut orphans = Vec::new();

        {
            let _guard = self.read_lock();
            let rows = self.raw_scan(index_prefix, index_end, after, limit, dir)?;
            for (index_key, primary_key) in rows {
                match self.raw_get(&primary_key)? {
                    None => orphans.push(index_key),
                    Some(primary_value) => {
                        if let Some(item) = decode(&primary_value)? {
                            items.push(item);
                        }
                    }
                }
            }
        }

        if !orphans.is_empty() {
            self.sweep_orphans(&orphans);
        }

        Ok((items, orphans))
    }

    /// Deletes dangling index entries found during a scan. Failures are
    /// logged and swallowed: the next scan will observe and retry them.
    pub(crate) fn sweep_orphans(&self, orphans: &[Vec<u8>]) {
        let _guard = self.write_lock();
        for key in orphans {
            if let Err(err) = self.raw_delete(key) {
                log::warn!("failed to sweep orphaned index key {key:?}: {err}");
            }
        }
    }
}
