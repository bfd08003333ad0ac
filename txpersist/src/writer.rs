use txstore::storage::engine::Engine;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::keys;
use crate::model::{ManagedTx, TxStatus};
use crate::store::{Direction, Persistence};

impl<E: Engine> Persistence<E> {
    fn decode_tx(bytes: &[u8]) -> Result<ManagedTx> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn encode_tx(tx: &ManagedTx) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(tx)?)
    }

    /// Creates a new managed transaction. Writes `tx_created` -> (if
    /// pending) `tx_inflight` -> `nonce` -> primary, in that order, so a
    /// crash before the final write leaves only dangling indexes for a
    /// later reader to clean up; see `4.2 Transaction writer`.
    pub fn create_transaction(&self, mut tx: ManagedTx) -> Result<ManagedTx> {
        if !tx.has_required_fields() {
            return Err(Error::InvalidInput(
                "create requires id and from to be set".to_string(),
            ));
        }
        if !tx.sequence_id.is_empty() {
            return Err(Error::InvalidInput(
                "sequence_id must not be pre-set on create".to_string(),
            ));
        }

        tx.sequence_id = Uuid::now_v7().to_string();

        let primary_key = keys::tx_key(&tx.id);
        let created_key = keys::tx_created_key(tx.created, &tx.sequence_id)?;
        let inflight_key = keys::tx_inflight_key(&tx.sequence_id);
        let nonce_key = keys::nonce_key(&tx.from, tx.nonce)?;

        let _guard = self.write_lock();

        if self.raw_get(&primary_key)?.is_some() {
            return Err(Error::Conflict(format!("transaction {} already exists", tx.id)));
        }

        self.raw_set(&created_key, primary_key.clone())?;
        if tx.status.is_pending() {
            self.raw_set(&inflight_key, primary_key.clone())?;
        }
        self.raw_set(&nonce_key, primary_key.clone())?;
        self.raw_set(&primary_key, Self::encode_tx(&tx)?)?;

        Ok(tx)
    }

    /// Updates an existing managed transaction. Rejects any attempt to
    /// mutate `from`, `nonce`, `created`, or `sequence_id` — a deliberate
    /// hardening over the looser reference behavior; see REDESIGN FLAGS.
    pub fn update_transaction(&self, tx: ManagedTx) -> Result<ManagedTx> {
        if !tx.has_required_fields() {
            return Err(Error::InvalidInput(
                "update requires id and from to be set".to_string(),
            ));
        }

        let primary_key = keys::tx_key(&tx.id);
        let inflight_key = keys::tx_inflight_key(&tx.sequence_id);

        let _guard = self.write_lock();

        let existing = match self.raw_get(&primary_key)? {
            None => {
                return Err(Error::InvalidInput(format!(
                    "cannot update transaction {}: not found",
                    tx.id
                )))
            }
            Some(bytes) => Self::decode_tx(&bytes)?,
        };

        if existing.from != tx.from
            || existing.nonce != tx.nonce
            || existing.created != tx.created
            || existing.sequence_id != tx.sequence_id
        {
            return Err(Error::InvalidInput(
                "update may not change from, nonce, created, or sequence_id".to_string(),
            ));
        }

        if !tx.status.is_pending() {
            self.raw_delete(&inflight_key)?;
        }
        self.raw_set(&primary_key, Self::encode_tx(&tx)?)?;

        Ok(tx)
    }

    /// Fetches the primary record, if any. Deletes all four keys; absence
    /// of any one is not an error.
    pub fn delete_transaction(&self, id: &str) -> Result<()> {
        let primary_key = keys::tx_key(id);

        let _guard = self.write_lock();

        let existing = match self.raw_get(&primary_key)? {
            None => return Ok(()),
            Some(bytes) => Self::decode_tx(&bytes)?,
        };

        let created_key = keys::tx_created_key(existing.created, &existing.sequence_id)?;
        let inflight_key = keys::tx_inflight_key(&existing.sequence_id);
        let nonce_key = keys::nonce_key(&existing.from, existing.nonce)?;

        self.raw_delete(&created_key)?;
        self.raw_delete(&inflight_key)?;
        self.raw_delete(&nonce_key)?;
        self.raw_delete(&primary_key)?;

        Ok(())
    }

    pub fn get_transaction_by_id(&self, id: &str) -> Result<Option<ManagedTx>> {
        let _guard = self.read_lock();
        match self.raw_get(&keys::tx_key(id))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(Self::decode_tx(&bytes)?)),
        }
    }

    /// Resolves `(signer, nonce)` to its managed transaction by going
    /// through the nonce index, the same path a `list_transactions_by_nonce`
    /// scan would take for a single entry.
    pub fn get_transaction_by_nonce(&self, signer: &str, nonce: u128) -> Result<Option<ManagedTx>> {
        let nonce_key = keys::nonce_key(signer, nonce)?;

        let _guard = self.read_lock();
        let primary_key = match self.raw_get(&nonce_key)? {
            None => return Ok(None),
            Some(key) => key,
        };
        match self.raw_get(&primary_key)? {
            None => {
                drop(_guard);
                self.sweep_orphans(&[nonce_key]);
                Ok(None)
            }
            Some(bytes) => Ok(Some(Self::decode_tx(&bytes)?)),
        }
    }

    pub fn list_transactions_by_created(
        &self,
        after: &[u8],
        limit: usize,
        dir: Direction,
    ) -> Result<Vec<ManagedTx>> {
        let (items, _orphans) = self.list_via_index(
            keys::tx_created_prefix(),
            keys::tx_created_end(),
            after,
            limit,
            dir,
            |bytes| Ok(Some(Self::decode_tx(bytes)?)),
        )?;
        Ok(items)
    }

    pub fn list_transactions_by_nonce(
        &self,
        signer: &str,
        after: &[u8],
        limit: usize,
        dir: Direction,
    ) -> Result<Vec<ManagedTx>> {
        let (items, _orphans) = self.list_via_index(
            keys::nonce_signer_prefix(signer),
            keys::nonce_signer_end(signer),
            after,
            limit,
            dir,
            |bytes| Ok(Some(Self::decode_tx(bytes)?)),
        )?;
        Ok(items)
    }

    pub fn list_transactions_pending(
        &self,
        after: &[u8],
        limit: usize,
        dir: Direction,
    ) -> Result<Vec<ManagedTx>> {
        let (items, _orphans) = self.list_via_index(
            keys::tx_inflight_prefix(),
            keys::tx_inflight_end(),
            after,
            limit,
            dir,
            |bytes| {
                let tx = Self::decode_tx(bytes)?;
                Ok(if tx.status == TxStatus::Pending { Some(tx) } else { None })
            },
        )?;
        Ok(items)
    }

    /// Returns the most recently created transaction for `signer`, used by
    /// the nonce allocator's `calc_next_nonce`.
    pub(crate) fn last_nonce_transaction(&self, signer: &str) -> Result<Option<ManagedTx>> {
        let rows = self.list_transactions_by_nonce(signer, b"", 1, Direction::Descending)?;
        Ok(rows.into_iter().next())
    }
}
