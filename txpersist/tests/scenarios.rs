use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;
use txpersist::config::PersistenceConfig;
use txpersist::error::Result;
use txpersist::model::{ManagedTx, TxStatus};
use txpersist::nonce::{NextNonceCallback, NonceAllocator};
use txpersist::store::Direction;
use txpersist::MemoryPersistence;

fn store() -> Arc<MemoryPersistence> {
    MemoryPersistence::open_in_memory(PersistenceConfig::default())
}

fn tx(id: &str, from: &str, nonce: u128, created: i64, status: TxStatus) -> ManagedTx {
    ManagedTx {
        id: id.to_string(),
        sequence_id: String::new(),
        from: from.to_string(),
        nonce,
        created,
        status,
        to: None,
        gas: None,
        value: None,
        receipt: None,
    }
}

struct FixedCallback(u128);

#[async_trait::async_trait]
impl NextNonceCallback for FixedCallback {
    async fn next_nonce(
        &self,
        _signer: &str,
    ) -> std::result::Result<u128, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.0)
    }
}

struct PanicCallback;

#[async_trait::async_trait]
impl NextNonceCallback for PanicCallback {
    async fn next_nonce(
        &self,
        _signer: &str,
    ) -> std::result::Result<u128, Box<dyn std::error::Error + Send + Sync>> {
        panic!("calc_next_nonce should not consult the remote when local history is fresh");
    }
}

fn now_nanos() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos() as i64
}

/// S1 -- basic create and read.
#[test]
fn s1_basic_create_and_read() -> Result<()> {
    let store = store();
    let created = tx("tx1", "0xA", 7, 1_000_000_000, TxStatus::Pending);
    let written = store.create_transaction(created)?;

    assert!(!written.sequence_id.is_empty());

    let fetched = store.get_transaction_by_id("tx1")?.expect("tx1 must exist");
    assert_eq!(fetched.from, "0xA");
    assert_eq!(fetched.nonce, 7);

    let pending = store.list_transactions_pending(b"", 0, Direction::Ascending)?;
    assert!(pending.iter().any(|t| t.id == "tx1"));

    Ok(())
}

/// S2 -- status transition removes the tx from the pending listing but
/// leaves the other indexes untouched.
#[test]
fn s2_status_transition() -> Result<()> {
    let store = store();
    let created = store.create_transaction(tx("tx1", "0xA", 7, 1_000_000_000, TxStatus::Pending))?;

    let mut updated = created.clone();
    updated.status = TxStatus::Succeeded;
    store.update_transaction(updated)?;

    let pending = store.list_transactions_pending(b"", 0, Direction::Ascending)?;
    assert!(!pending.iter().any(|t| t.id == "tx1"));

    let by_created = store.list_transactions_by_created(b"", 0, Direction::Ascending)?;
    assert!(by_created.iter().any(|t| t.id == "tx1"));

    let by_nonce = store.get_transaction_by_nonce("0xA", 7)?.expect("nonce index intact");
    assert_eq!(by_nonce.id, "tx1");

    Ok(())
}

/// S3 -- fresh local history short-circuits the remote callback.
#[tokio::test]
async fn s3_nonce_allocation_fresh_local_history() -> Result<()> {
    let store = store();
    store.create_transaction(tx("tx1", "0xA", 42, now_nanos() - 1_000_000_000, TxStatus::Succeeded))?;

    let allocator = NonceAllocator::new(store);
    let guard = allocator
        .assign_and_lock_nonce("op-s3", "0xA", &PanicCallback, CancellationToken::new())
        .await?;
    assert_eq!(guard.nonce(), 43);
    guard.complete(true);

    Ok(())
}

/// S4 -- stale local history falls through to the remote callback.
#[tokio::test]
async fn s4_nonce_allocation_stale_local_history() -> Result<()> {
    let mut config = PersistenceConfig::default();
    config.nonce_state_timeout = Duration::from_secs(60);
    let store = MemoryPersistence::open_in_memory(config);
    store.create_transaction(tx("tx1", "0xA", 42, now_nanos() - 120_000_000_000, TxStatus::Succeeded))?;

    let allocator = NonceAllocator::new(store);
    let guard = allocator
        .assign_and_lock_nonce("op-s4", "0xA", &FixedCallback(100), CancellationToken::new())
        .await?;
    assert_eq!(guard.nonce(), 100);
    guard.complete(true);

    Ok(())
}

/// S5 -- the remote is behind stale local history; local wins.
#[tokio::test]
async fn s5_nonce_allocation_remote_behind_local() -> Result<()> {
    let store = store();
    store.create_transaction(tx("tx1", "0xA", 50, now_nanos() - 120_000_000_000, TxStatus::Succeeded))?;

    let allocator = NonceAllocator::new(store);
    let guard = allocator
        .assign_and_lock_nonce("op-s5", "0xA", &FixedCallback(49), CancellationToken::new())
        .await?;
    assert_eq!(guard.nonce(), 51);
    guard.complete(true);

    Ok(())
}

/// S6 -- concurrent allocation for the same signer serializes: the second
/// caller observes the first's completion before computing its own nonce.
#[tokio::test]
async fn s6_concurrent_allocation_same_signer() -> Result<()> {
    let store = store();
    store.create_transaction(tx("tx1", "0xB", 8, now_nanos() - 120_000_000_000, TxStatus::Succeeded))?;

    let allocator = NonceAllocator::new(store.clone());

    let first = allocator
        .assign_and_lock_nonce("op-s6-first", "0xB", &FixedCallback(9), CancellationToken::new())
        .await?;
    assert_eq!(first.nonce(), 9);

    store.create_transaction(tx("tx2", "0xB", 9, now_nanos(), TxStatus::Succeeded))?;
    first.complete(true);

    let second = allocator
        .assign_and_lock_nonce("op-s6-second", "0xB", &FixedCallback(999), CancellationToken::new())
        .await?;
    assert_eq!(second.nonce(), 10);
    second.complete(true);

    Ok(())
}

/// S7 -- orphan recovery: an index entry pointing at a missing primary is
/// surfaced as "not found" and swept on the next scan.
#[test]
fn s7_orphan_recovery() -> Result<()> {
    let store = store();

    // Manually insert a dangling nonce index entry (no corresponding primary).
    let nonce_key = txpersist::keys::nonce_key("0xC", 5)?;
    let ghost_primary = txpersist::keys::tx_key("ghost");
    store.debug_put_raw(&nonce_key, ghost_primary)?;

    let rows = store.list_transactions_by_nonce("0xC", b"", 0, Direction::Ascending)?;
    assert!(rows.is_empty());

    // The sweep runs synchronously inside the scan; the index key is gone.
    assert!(store.get_transaction_by_nonce("0xC", 5)?.is_none());

    Ok(())
}

/// close() flushes and releases the engine; further operations fail with
/// Closed, and a second close() is a harmless no-op.
#[test]
fn close_then_operate_returns_closed_error() -> Result<()> {
    let store = store();
    store.create_transaction(tx("tx1", "0xA", 1, 1_000_000_000, TxStatus::Pending))?;

    store.close()?;
    store.close()?;

    match store.get_transaction_by_id("tx1") {
        Err(txpersist::error::Error::Closed) => {}
        other => panic!("expected Error::Closed after close(), got {other:?}"),
    }

    Ok(())
}
