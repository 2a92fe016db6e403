//! # Genesis Configuration
//!
//! The minimum bootstrap record a node needs: network id, the faucet key
//! allowed to mint Exchange transactions during bootstrap, and the initial
//! account balances. Loaded from JSON; keys are hex-encoded SEC1
//! compressed points.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::PublicKey;

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("bad public key {key}: {reason}")]
    BadKey { key: String, reason: String },
}

/// One pre-funded account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisAccount {
    /// Hex-encoded compressed public key.
    pub pubkey: String,
    /// Initial balance in base units.
    pub balance: u64,
}

/// Loadable bootstrap configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Network identifier; nodes on different networks ignore each other.
    pub network_id: String,
    /// Hex-encoded faucet key; the only key allowed to sign Exchange
    /// transactions.
    pub faucet_pubkey: String,
    /// Total supply minted at genesis.
    pub initial_supply: u64,
    /// Pre-funded accounts. Balances must not exceed the initial supply.
    #[serde(default)]
    pub initial_accounts: Vec<GenesisAccount>,
}

impl GenesisConfig {
    /// Load from a JSON file.
    pub fn load(path: &std::path::Path) -> Result<Self, GenesisError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, GenesisError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decode the faucet key.
    pub fn faucet_key(&self) -> Result<PublicKey, GenesisError> {
        parse_pubkey(&self.faucet_pubkey)
    }

    /// Decode the pre-funded accounts.
    pub fn funded_accounts(&self) -> Result<Vec<(PublicKey, u64)>, GenesisError> {
        self.initial_accounts
            .iter()
            .map(|a| parse_pubkey(&a.pubkey).map(|k| (k, a.balance)))
            .collect()
    }
}

fn parse_pubkey(hex_key: &str) -> Result<PublicKey, GenesisError> {
    let bytes = hex::decode(hex_key).map_err(|e| GenesisError::BadKey {
        key: hex_key.to_string(),
        reason: e.to_string(),
    })?;
    let arr: PublicKey = bytes.try_into().map_err(|_| GenesisError::BadKey {
        key: hex_key.to_string(),
        reason: "expected 33 bytes".to_string(),
    })?;
    Ok(arr)
}
