//! The HTTP `Receipt` header (spec.md §6): the server's signed acknowledgment
//! of a single off-chain call, later submitted as proof material during a
//! dispute (spec.md §4.4 O8).

use alloy::primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use channel_chain::{receipt_digest, recover_signer, CryptoError};
use alloy::primitives::Address;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptHeader {
    pub call_id: B256,
    pub endpoint: String,
    /// Decimal string rather than a JSON number, to avoid precision loss for
    /// amounts that do not fit an `f64`.
    pub cost: String,
    pub timestamp: U256,
    pub server_signature: String,
}

#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("cost {0:?} is not a valid decimal integer")]
    InvalidCost(String),
    #[error("signature is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("recovered signer {recovered} does not match expected server {expected}")]
    SignerMismatch { recovered: Address, expected: Address },
}

impl ReceiptHeader {
    pub fn cost_amount(&self) -> Result<U256, ReceiptError> {
        self.cost.parse().map_err(|_| ReceiptError::InvalidCost(self.cost.clone()))
    }

    /// Verifies the server's personal-sign receipt signature against the
    /// known server account (spec.md §6's final bullet).
    pub fn verify(&self, expected_server: Address) -> Result<(), ReceiptError> {
        let cost = self.cost_amount()?;
        let digest = receipt_digest(self.call_id, &self.endpoint, cost, self.timestamp);

        let hex_str = self.server_signature.trim_start_matches("0x");
        let sig_bytes = hex::decode(hex_str)?;
        let recovered = recover_signer(digest, &sig_bytes)?;
        if recovered != expected_server {
            return Err(ReceiptError::SignerMismatch {
                recovered,
                expected: expected_server,
            });
        }
        Ok(())
    }
}
