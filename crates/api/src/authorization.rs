//! The HTTP `Authorization` header (spec.md §6) and the payment-authorization
//! sum type (spec.md §9, "Polymorphism"): two variants, `channel` and
//! `exact`, tagged rather than modeled through inheritance. The adjudicator
//! only ever handles the `channel` variant — `exact` is carried here purely
//! as a data shape for wire compatibility with the other x402 scheme.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use channel_chain::{recover_signer, ChannelAuthorization as ChannelAuthorizationDigest, CryptoError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelAuthorizationFields {
    pub scheme: String,
    pub escrow_address: Address,
    pub session_id: String,
    pub nonce: U256,
    pub timestamp: U256,
}

/// An out-of-scope sibling scheme (per-call exact payment, no channel). Only
/// its wire shape is modeled — the adjudicator never inspects these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExactAuthorizationFields {
    pub scheme: String,
    pub asset: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum PaymentAuthorization {
    Channel(ChannelAuthorizationFields),
    Exact(ExactAuthorizationFields),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationHeader {
    pub x402_version: u32,
    pub scheme: String,
    pub agent_address: Address,
    /// 65-byte `(r, s, v)` signature, hex-encoded with a `0x` prefix.
    pub signature: String,
    pub authorization: PaymentAuthorization,
}

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("authorization header does not carry the channel scheme")]
    NotChannelScheme,
    #[error("signature is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("recovered signer {recovered} does not match agent {expected}")]
    SignerMismatch { recovered: Address, expected: Address },
}

impl AuthorizationHeader {
    /// Recovers and checks the agent's signature over the channel
    /// authorization's typed-data digest, returning the validated fields.
    /// `endpoint` is the request path being authorized — it is part of the
    /// signed message (spec.md §4.1) but not carried in the header itself,
    /// since it is implicit from the HTTP request the header accompanies.
    pub fn verify_channel(
        &self,
        chain_id: u64,
        escrow: Address,
        endpoint: &str,
    ) -> Result<&ChannelAuthorizationFields, AuthorizationError> {
        let PaymentAuthorization::Channel(fields) = &self.authorization else {
            return Err(AuthorizationError::NotChannelScheme);
        };

        let hex_str = self.signature.trim_start_matches("0x");
        let sig_bytes = hex::decode(hex_str)?;

        let digest = ChannelAuthorizationDigest {
            agent: self.agent_address,
            session_id: fields.session_id.clone(),
            endpoint: endpoint.to_string(),
            nonce: fields.nonce,
            timestamp: fields.timestamp,
        }
        .digest(chain_id, escrow);

        let recovered = recover_signer(digest, &sig_bytes)?;
        if recovered != self.agent_address {
            return Err(AuthorizationError::SignerMismatch {
                recovered,
                expected: self.agent_address,
            });
        }
        Ok(fields)
    }
}
