//! Witnessed latency probes.
//!
//! A round: the source signs a nonced request, the target signs a
//! receipt over the request hash, and each witness signs its own
//! receipt. The assembled [`ProbeProof`] is self-contained; any node
//! can verify it with nothing but the public keys inside and a local
//! replay window.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

use shared_crypto::ecdsa::verify_raw;
use shared_crypto::P256KeyPair;
use shared_types::codec;
use shared_types::{Hash, PublicKey, Signature};

use crate::config::ConsensusConfig;
use crate::domain::errors::ProbeError;
use crate::domain::nonce::NonceRegistry;

/// Signed probe initiation.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeRequest {
    #[serde_as(as = "Bytes")]
    pub source: PublicKey,
    #[serde_as(as = "Bytes")]
    pub target: PublicKey,
    pub nonce: u64,
    pub timestamp: u64,
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

#[serde_as]
#[derive(Serialize)]
struct RequestBody {
    #[serde_as(as = "Bytes")]
    source: PublicKey,
    #[serde_as(as = "Bytes")]
    target: PublicKey,
    nonce: u64,
    timestamp: u64,
}

impl ProbeRequest {
    /// Build and sign a request.
    pub fn new(keypair: &P256KeyPair, target: PublicKey, nonce: u64, timestamp: u64) -> Self {
        let source = *keypair.public_key().as_bytes();
        let mut request = Self {
            source,
            target,
            nonce,
            timestamp,
            signature: [0u8; 64],
        };
        request.signature = *keypair.sign(&request.signing_bytes()).as_bytes();
        request
    }

    fn signing_bytes(&self) -> Vec<u8> {
        codec::encode(&RequestBody {
            source: self.source,
            target: self.target,
            nonce: self.nonce,
            timestamp: self.timestamp,
        })
        .expect("request body is always encodable")
    }

    /// Hash binding receipts to this exact signed request.
    pub fn hash(&self) -> Hash {
        let bytes = codec::encode(self).expect("request is always encodable");
        codec::hash_bytes(&bytes)
    }

    pub fn verify_signature(&self) -> bool {
        verify_raw(&self.source, &self.signing_bytes(), &self.signature)
    }
}

/// Target's signed acknowledgement of a request.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetReceipt {
    pub request_hash: Hash,
    pub timestamp: u64,
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl TargetReceipt {
    pub fn new(keypair: &P256KeyPair, request_hash: Hash, timestamp: u64) -> Self {
        let mut receipt = Self {
            request_hash,
            timestamp,
            signature: [0u8; 64],
        };
        receipt.signature = *keypair.sign(&receipt.signing_bytes()).as_bytes();
        receipt
    }

    fn signing_bytes(&self) -> Vec<u8> {
        let mut bytes = self.request_hash.to_vec();
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes
    }

    pub fn verify_signature(&self, target: &PublicKey) -> bool {
        verify_raw(target, &self.signing_bytes(), &self.signature)
    }
}

/// A witness's signed observation of the request/receipt exchange.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WitnessReceipt {
    #[serde_as(as = "Bytes")]
    pub witness: PublicKey,
    pub request_hash: Hash,
    pub timestamp: u64,
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl WitnessReceipt {
    pub fn new(keypair: &P256KeyPair, request_hash: Hash, timestamp: u64) -> Self {
        let witness = *keypair.public_key().as_bytes();
        let mut receipt = Self {
            witness,
            request_hash,
            timestamp,
            signature: [0u8; 64],
        };
        receipt.signature = *keypair.sign(&receipt.signing_bytes()).as_bytes();
        receipt
    }

    fn signing_bytes(&self) -> Vec<u8> {
        let mut bytes = self.witness.to_vec();
        bytes.extend_from_slice(&self.request_hash);
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes
    }

    pub fn verify_signature(&self) -> bool {
        verify_raw(&self.witness, &self.signing_bytes(), &self.signature)
    }
}

/// A complete, verifiable latency measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeProof {
    pub request: ProbeRequest,
    pub receipt: TargetReceipt,
    pub witnesses: Vec<WitnessReceipt>,
    /// Round-trip latency measured by the source, microseconds.
    pub rtt_us: u64,
}

impl ProbeProof {
    /// Full verification: every signature, receipt binding, timestamp
    /// skew, witness quorum, and finally nonce freshness. The nonce is
    /// only burned once everything else holds.
    pub fn verify(
        &self,
        config: &ConsensusConfig,
        nonces: &NonceRegistry,
        now_us: u64,
    ) -> Result<(), ProbeError> {
        if now_us.saturating_sub(self.request.timestamp) > config.probe_budget_us {
            return Err(ProbeError::Expired {
                budget_us: config.probe_budget_us,
            });
        }

        if !self.request.verify_signature() {
            return Err(ProbeError::BadSourceSignature);
        }

        let request_hash = self.request.hash();
        if self.receipt.request_hash != request_hash {
            return Err(ProbeError::ReceiptMismatch);
        }
        if !self.receipt.verify_signature(&self.request.target) {
            return Err(ProbeError::BadTargetSignature);
        }
        check_skew(self.request.timestamp, self.receipt.timestamp, config)?;

        let mut distinct: Vec<PublicKey> = Vec::new();
        for witness in &self.witnesses {
            if witness.request_hash != request_hash {
                return Err(ProbeError::WitnessMismatch);
            }
            if !witness.verify_signature() {
                return Err(ProbeError::BadWitnessSignature(hex::encode(
                    &witness.witness[..4],
                )));
            }
            check_skew(self.request.timestamp, witness.timestamp, config)?;
            if !distinct.contains(&witness.witness) {
                distinct.push(witness.witness);
            }
        }
        if distinct.len() < config.witness_quorum {
            return Err(ProbeError::QuorumNotMet {
                have: distinct.len(),
                need: config.witness_quorum,
            });
        }

        if !nonces.check_and_record(
            &self.request.source,
            self.request.nonce,
            now_us,
            config.nonce_window_us,
        ) {
            return Err(ProbeError::StaleNonce {
                nonce: self.request.nonce,
            });
        }
        Ok(())
    }
}

fn check_skew(base_us: u64, other_us: u64, config: &ConsensusConfig) -> Result<(), ProbeError> {
    let skew = base_us.abs_diff(other_us);
    if skew > config.max_skew_us {
        return Err(ProbeError::ExcessiveSkew {
            skew_us: skew,
            bound_us: config.max_skew_us,
        });
    }
    Ok(())
}

/// Run a complete probe round locally, with every participant's key in
/// hand. Networked deployments split these steps across datagrams; the
/// assembled proof is identical either way.
pub fn probe_round(
    source: &P256KeyPair,
    target: &P256KeyPair,
    witnesses: &[&P256KeyPair],
    nonce: u64,
    now_us: u64,
    rtt_us: u64,
) -> ProbeProof {
    let request = ProbeRequest::new(source, *target.public_key().as_bytes(), nonce, now_us);
    let request_hash = request.hash();
    let receipt = TargetReceipt::new(target, request_hash, now_us + rtt_us / 2);
    let witness_receipts = witnesses
        .iter()
        .map(|w| WitnessReceipt::new(w, request_hash, now_us + rtt_us))
        .collect();
    ProbeProof {
        request,
        receipt,
        witnesses: witness_receipts,
        rtt_us,
    }
}
