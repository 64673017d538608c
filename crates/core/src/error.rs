//! Typed error taxonomy (spec.md §7). Every Adjudicator operation either
//! succeeds with no partial mutation, or fails with one of these and leaves
//! state exactly as it was before the call.

use alloy::primitives::U256;
use channel_chain::CryptoError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdjudicatorError {
    #[error("channel is not Active")]
    ChannelNotActive,

    #[error("channel is not Inactive/Settled")]
    ChannelNotInactive,

    #[error("channel is not Closing")]
    ChannelNotClosing,

    #[error("channel is not Disputed")]
    ChannelNotDisputed,

    #[error("deposit {amount} is below minimum {minimum}")]
    InsufficientDeposit { amount: U256, minimum: U256 },

    #[error("amount {amount} exceeds balance {balance}")]
    InsufficientBalance { amount: U256, balance: U256 },

    #[error("requested {requested} exceeds available bond {available}")]
    InsufficientBond { requested: U256, available: U256 },

    #[error("facilitator bond {bond} is below required minimum {minimum}")]
    InsufficientFacilitatorBond { bond: U256, minimum: U256 },

    #[error("merkle proof failed to verify against checkpoint root")]
    InvalidProof,

    #[error("signature verification failed: {0}")]
    InvalidSignature(#[from] CryptoError),

    #[error("dispute window has expired")]
    DisputeWindowExpired,

    #[error("dispute window has not expired")]
    DisputeWindowNotExpired,

    #[error("proof window has expired")]
    ProofWindowExpired,

    #[error("proof window has not expired")]
    ProofWindowNotExpired,

    #[error("caller is not authorized for this operation")]
    Unauthorized,

    #[error("amount is invalid (zero, overflowed, or underflowed)")]
    InvalidAmount,

    #[error("asset transfer failed")]
    AssetTransferFailed,
}
