use serde_derive::{Deserialize, Serialize};

/// Lifecycle status of a managed transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Succeeded,
    Failed,
    Suspended,
}

impl TxStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, TxStatus::Pending)
    }
}

/// A managed transaction record: the canonical row stored at `tx_0/<id>`,
/// referenced from the creation-time, pending, and nonce indexes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManagedTx {
    pub id: String,
    /// Minted by the writer on create; immutable afterwards. A UUIDv7, so it
    /// sorts lexicographically in creation order.
    pub sequence_id: String,
    pub from: String,
    /// 24-decimal-digit bounded non-negative integer; see [`crate::keys`].
    pub nonce: u128,
    /// Nanosecond epoch timestamp, set by the caller and never adjusted.
    pub created: i64,
    pub status: TxStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<serde_json::Value>,
}

impl ManagedTx {
    /// True if every field required by the writer's `create`/`update`
    /// contract is present. `sequence_id` is checked separately, since its
    /// presence means different things on create vs. update.
    pub fn has_required_fields(&self) -> bool {
        !self.id.is_empty() && !self.from.is_empty()
    }
}

/// A single-key event-stream record. The fields beyond `id` are an opaque
/// JSON blob as far as the persistence core is concerned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventStream {
    pub id: String,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listener {
    pub id: String,
    pub stream_id: String,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub stream_id: String,
    #[serde(flatten)]
    pub data: serde_json::Value,
}
