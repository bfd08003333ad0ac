use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use txstore::storage::engine::Engine;

use crate::error::{Error, Result};
use crate::store::Persistence;

/// Opaque pass-through to the blockchain connector: "what nonce would the
/// remote node hand out next for this signer?"
#[async_trait::async_trait]
pub trait NextNonceCallback: Send + Sync {
    async fn next_nonce(&self, signer: &str) -> std::result::Result<u128, Box<dyn std::error::Error + Send + Sync>>;
}

struct InFlight {
    nonce: Mutex<Option<u128>>,
    spent: Mutex<Option<bool>>,
    /// Starts at `false`, flipped to `true` exactly once by `complete()`.
    /// A `watch` channel (not `Notify::notify_waiters`) because it keeps the
    /// last value around: a waiter that subscribes *after* the flip still
    /// observes it on its first poll instead of blocking forever, matching
    /// the closed-channel semantics this stands in for.
    done_tx: watch::Sender<bool>,
}

impl InFlight {
    fn new() -> Self {
        let (done_tx, _) = watch::channel(false);
        Self { nonce: Mutex::new(None), spent: Mutex::new(None), done_tx }
    }

    /// Resolves as soon as `complete()` has run, even if that already
    /// happened before this call.
    async fn wait_for_completion(&self) {
        let mut rx = self.done_tx.subscribe();
        if *rx.borrow() {
            return;
        }
        let _ = rx.changed().await;
    }

    fn mark_complete(&self) {
        // Only fails if every receiver (including our own subscribe-on-wait
        // pattern) has been dropped, which is harmless here.
        let _ = self.done_tx.send(true);
    }
}

/// Per-signer in-flight allocation registry, guarded by a single mutex that
/// is released while the nonce itself is computed; serialization per
/// signer comes from `InFlight::done_tx`, not from holding the mutex.
pub struct NonceAllocator<E: Engine> {
    store: Arc<Persistence<E>>,
    registry: Mutex<HashMap<String, Arc<InFlight>>>,
}

/// RAII handle returned by `assign_and_lock_nonce`. A dropped handle that
/// never called `complete` still releases the registry entry (logged as a
/// caller bug, not silently ignored).
pub struct NonceGuard<E: Engine> {
    allocator: Arc<NonceAllocator<E>>,
    op_id: String,
    signer: String,
    nonce: u128,
    in_flight: Arc<InFlight>,
    completed: bool,
}

impl<E: Engine> NonceGuard<E> {
    pub fn nonce(&self) -> u128 {
        self.nonce
    }

    /// Marks the allocation complete. `spent` is true iff a transaction was
    /// actually submitted with this nonce.
    pub fn complete(mut self, spent: bool) {
        log::debug!(
            "op {}: releasing nonce {} for signer {} (spent={spent})",
            self.op_id,
            self.nonce,
            self.signer
        );
        self.allocator.complete(&self.signer, &self.in_flight, spent);
        self.completed = true;
    }
}

impl<E: Engine> Drop for NonceGuard<E> {
    fn drop(&mut self) {
        if !self.completed {
            log::warn!(
                "op {}: nonce guard for signer {} dropped without calling complete(); releasing as unspent",
                self.op_id,
                self.signer
            );
            self.allocator.complete(&self.signer, &self.in_flight, false);
        }
    }
}

impl<E: Engine> NonceAllocator<E> {
    pub fn new(store: Arc<Persistence<E>>) -> Arc<Self> {
        Arc::new(Self { store, registry: Mutex::new(HashMap::new()) })
    }

    /// Assigns and locks the next nonce for `signer`. Waits cooperatively if
    /// another allocation for the same signer is already in flight. `op_id`
    /// identifies the caller's request for tracing and carries no semantics
    /// of its own.
    pub async fn assign_and_lock_nonce(
        self: &Arc<Self>,
        op_id: &str,
        signer: &str,
        callback: &(dyn NextNonceCallback),
        cancel: CancellationToken,
    ) -> Result<NonceGuard<E>> {
        loop {
            let existing = {
                let registry = self.registry.lock().expect("nonce registry poisoned");
                registry.get(signer).cloned()
            };

            if let Some(in_flight) = existing {
                log::debug!("op {op_id}: waiting on in-flight nonce allocation for signer {signer}");
                tokio::select! {
                    _ = in_flight.wait_for_completion() => continue,
                    _ = cancel.cancelled() => {
                        return Err(Error::CallbackError(
                            "nonce allocation cancelled while waiting for in-flight request".into(),
                        ));
                    }
                }
            }

            let in_flight = Arc::new(InFlight::new());

            {
                let mut registry = self.registry.lock().expect("nonce registry poisoned");
                if registry.contains_key(signer) {
                    // Lost the race to another task installing its own record; retry.
                    continue;
                }
                registry.insert(signer.to_string(), in_flight.clone());
            }

            match self.calc_next_nonce(signer, callback, cancel.clone()).await {
                Ok(nonce) => {
                    log::debug!("op {op_id}: assigned nonce {nonce} to signer {signer}");
                    *in_flight.nonce.lock().expect("nonce slot poisoned") = Some(nonce);
                    return Ok(NonceGuard {
                        allocator: self.clone(),
                        op_id: op_id.to_string(),
                        signer: signer.to_string(),
                        nonce,
                        in_flight,
                        completed: false,
                    });
                }
                Err(err) => {
                    self.complete(signer, &in_flight, false);
                    return Err(err);
                }
            }
        }
    }

    fn complete(&self, signer: &str, in_flight: &Arc<InFlight>, spent: bool) {
        *in_flight.spent.lock().expect("nonce slot poisoned") = Some(spent);
        let mut registry = self.registry.lock().expect("nonce registry poisoned");
        registry.remove(signer);
        drop(registry);
        in_flight.mark_complete();
    }

    /// The hybrid lookup policy: prefer fresh local history over the remote
    /// node, but never let the remote regress behind known local state.
    async fn calc_next_nonce(
        &self,
        signer: &str,
        callback: &(dyn NextNonceCallback),
        cancel: CancellationToken,
    ) -> Result<u128> {
        let last = self.store.last_nonce_transaction(signer)?;

        if let Some(tx) = &last {
            if self.is_fresh(tx.created) {
                return Ok(tx.nonce + 1);
            }
        }

        let remote = tokio::select! {
            result = callback.next_nonce(signer) => result.map_err(Error::CallbackError)?,
            _ = cancel.cancelled() => {
                return Err(Error::CallbackError("nonce callback cancelled".into()));
            }
        };

        match &last {
            Some(tx) if remote <= tx.nonce => Ok(tx.nonce + 1),
            _ => Ok(remote),
        }
    }

    fn is_fresh(&self, created_nanos: i64) -> bool {
        let created = UNIX_EPOCH + Duration::from_nanos(created_nanos.max(0) as u64);
        let now = SystemTime::now();
        match now.duration_since(created) {
            Ok(age) => age <= self.store.config().nonce_state_timeout,
            Err(_) => true, // created is in the future relative to our clock; treat as fresh
        }
    }
}
