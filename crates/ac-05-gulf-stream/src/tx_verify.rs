//! Transaction admission checks, shared by every ingress path.

use shared_crypto::ecdsa::verify_raw;
use shared_types::Transaction;

use crate::errors::MempoolError;

/// Pre-execution validation: the id must commit to the canonical body
/// and the signature must verify under the sender's key. Runs before a
/// transaction touches any pool.
pub fn verify_transaction(tx: &Transaction) -> Result<(), MempoolError> {
    if tx.id != tx.compute_id() {
        return Err(MempoolError::IdMismatch);
    }
    if !verify_raw(&tx.sender, &tx.signing_bytes(), &tx.signature) {
        return Err(MempoolError::BadSignature);
    }
    Ok(())
}
