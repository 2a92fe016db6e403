//! # Core Domain Entities
//!
//! Defines the entities that flow between subsystems.
//!
//! ## Clusters
//!
//! - **Chain**: [`Transaction`], [`Block`], [`PohEntry`]
//! - **Propagation**: [`Shred`], [`TpuBundle`]
//! - **Networking**: [`ContactInfo`]

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

use crate::codec;

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// A 64-byte ECDSA P-256 signature (r || s, fixed width).
pub type Signature = [u8; 64];

/// A 33-byte SEC1-compressed P-256 public key.
pub type PublicKey = [u8; 33];

/// The zero hash, used as the parent of genesis.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Transaction kind.
///
/// `Exchange` mints from the configured faucet key during bootstrap;
/// `Transfer` moves value between existing accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Transfer,
    Exchange,
}

/// A value transfer signed by the sender.
///
/// `id` is the SHA-256 of the canonical body (everything except `id` and
/// `signature`); `signature` covers the canonical body plus `id`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender's public key.
    #[serde_as(as = "Bytes")]
    pub sender: PublicKey,
    /// Receiver's public key.
    #[serde_as(as = "Bytes")]
    pub receiver: PublicKey,
    /// Amount in base units.
    pub amount: u64,
    /// Transfer or faucet exchange.
    pub tx_type: TransactionType,
    /// Unix timestamp in microseconds at creation.
    pub timestamp: u64,
    /// SHA-256 of the canonical body.
    pub id: Hash,
    /// Sender's signature over the canonical body plus id.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

/// The unsigned, id-free body a transaction id commits to.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionBody {
    #[serde_as(as = "Bytes")]
    pub sender: PublicKey,
    #[serde_as(as = "Bytes")]
    pub receiver: PublicKey,
    pub amount: u64,
    pub tx_type: TransactionType,
    pub timestamp: u64,
}

impl Transaction {
    /// Canonical body bytes: all fields except `id` and `signature`.
    pub fn canonical_body(&self) -> Vec<u8> {
        let body = TransactionBody {
            sender: self.sender,
            receiver: self.receiver,
            amount: self.amount,
            tx_type: self.tx_type,
            timestamp: self.timestamp,
        };
        codec::encode(&body).expect("transaction body is always encodable")
    }

    /// Bytes covered by the sender's signature: canonical body plus id.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut bytes = self.canonical_body();
        bytes.extend_from_slice(&self.id);
        bytes
    }

    /// Recompute the transaction id from the canonical body.
    pub fn compute_id(&self) -> Hash {
        codec::hash_bytes(&self.canonical_body())
    }

    /// The accounts this transaction touches. Two transactions conflict
    /// iff their account sets intersect.
    pub fn account_set(&self) -> [PublicKey; 2] {
        [self.sender, self.receiver]
    }

    /// Short hex prefix of the id, for log lines.
    pub fn short_id(&self) -> String {
        hex::encode(&self.id[..4])
    }
}

/// One entry of a Proof-of-History sequence.
///
/// Chain rule: `hash = SHA-256(prev_hash)` for an empty tick,
/// `hash = SHA-256(prev_hash || tx_id)` when a transaction is mixed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PohEntry {
    /// Chained hash after this tick.
    pub hash: Hash,
    /// Monotonic tick index.
    pub tick: u64,
    /// Transaction mixed into this tick, if any.
    pub tx_id: Option<Hash>,
    /// Wall-clock microseconds when the tick was produced. Not part of
    /// the verified chain.
    pub timestamp: u64,
}

/// Batch partitioning and timing recorded by the parallel executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    /// Transaction indices grouped into conflict-free batches, in commit
    /// order.
    pub batches: Vec<Vec<u32>>,
    /// Wall-clock microseconds spent executing the block.
    pub execution_time_us: u64,
}

/// A full block: ordered transactions sealed by a PoH segment and the
/// proposer's signature.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Height in the chain; parent height + 1.
    pub height: u64,
    /// Block id of the parent.
    pub prev_hash: Hash,
    /// Scheduled leader that proposed this block.
    #[serde_as(as = "Bytes")]
    pub proposer: PublicKey,
    /// Unix timestamp in microseconds at assembly.
    pub timestamp: u64,
    /// Transactions in PoH order.
    pub transactions: Vec<Transaction>,
    /// PoH segment anchored to the parent's last PoH hash.
    pub poh: Vec<PohEntry>,
    /// State root after executing this block on the parent state.
    pub state_root: Hash,
    /// Parallel-execution record.
    pub execution: ExecutionMetadata,
    /// Proposer's signature over the canonical payload.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

/// The unsigned payload a block id and proposer signature commit to.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockPayload {
    pub height: u64,
    pub prev_hash: Hash,
    #[serde_as(as = "Bytes")]
    pub proposer: PublicKey,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub poh: Vec<PohEntry>,
    pub state_root: Hash,
    pub execution: ExecutionMetadata,
}

impl Block {
    /// Canonical payload bytes: every field except the signature.
    pub fn canonical_payload(&self) -> Vec<u8> {
        let payload = BlockPayload {
            height: self.height,
            prev_hash: self.prev_hash,
            proposer: self.proposer,
            timestamp: self.timestamp,
            transactions: self.transactions.clone(),
            poh: self.poh.clone(),
            state_root: self.state_root,
            execution: self.execution.clone(),
        };
        codec::encode(&payload).expect("block payload is always encodable")
    }

    /// Block id: SHA-256 of the canonical payload.
    pub fn id(&self) -> Hash {
        codec::hash_bytes(&self.canonical_payload())
    }

    /// Last PoH hash of this block, or the parent anchor for empty
    /// segments.
    pub fn last_poh_hash(&self) -> Option<Hash> {
        self.poh.last().map(|e| e.hash)
    }

    /// Lightweight header view for chain bookkeeping.
    pub fn header(&self) -> BlockHeaderView {
        BlockHeaderView {
            id: self.id(),
            height: self.height,
            prev_hash: self.prev_hash,
            proposer: self.proposer,
            timestamp: self.timestamp,
        }
    }
}

/// Block metadata kept by the chain store.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeaderView {
    pub id: Hash,
    pub height: u64,
    pub prev_hash: Hash,
    #[serde_as(as = "Bytes")]
    pub proposer: PublicKey,
    pub timestamp: u64,
}

// =============================================================================
// CLUSTER B: PROPAGATION
// =============================================================================

/// Shred kind: payload slice or erasure parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShredKind {
    Data,
    Parity,
}

/// A fixed-size slice of a block's canonical bytes, unit of Turbine
/// fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shred {
    /// Id of the block this shred belongs to.
    pub block_id: Hash,
    /// Position within the shred set.
    pub index: u32,
    /// Total shreds in the set (data + parity).
    pub total: u32,
    /// Number of data shreds in the set; the rest are parity.
    pub num_data: u32,
    /// Data or parity.
    pub kind: ShredKind,
    /// Shard bytes.
    pub payload: Vec<u8>,
}

impl Shred {
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

/// A Gulf Stream datagram: one or more transactions bundled for a single
/// target leader.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TpuBundle {
    /// Random bundle id for tracing.
    pub bundle_id: [u8; 16],
    /// Forwarding node.
    #[serde_as(as = "Bytes")]
    pub sender: PublicKey,
    /// Unix microseconds at bundle flush.
    pub timestamp: u64,
    /// Bundled transactions, arrival order preserved.
    pub transactions: Vec<Transaction>,
}

// =============================================================================
// CLUSTER C: NETWORKING
// =============================================================================

/// How to reach a peer. Fed by the external peer-exchange protocol.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Peer identity.
    #[serde_as(as = "Bytes")]
    pub pubkey: PublicKey,
    /// IP address, dotted quad or v6 text form.
    pub ip: String,
    /// Peer-exchange port.
    pub gossip_port: u16,
    /// Transaction ingress port.
    pub tpu_port: u16,
    /// Shred ingress port.
    pub tvu_port: u16,
    /// Unix microseconds of the last update; newer wins on upsert.
    pub wallclock: u64,
}

impl ContactInfo {
    /// Socket address string for the transaction ingress port.
    pub fn tpu_addr(&self) -> String {
        format!("{}:{}", self.ip, self.tpu_port)
    }

    /// Socket address string for the shred ingress port.
    pub fn tvu_addr(&self) -> String {
        format!("{}:{}", self.ip, self.tvu_port)
    }
}
