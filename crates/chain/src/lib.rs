//! Hash, signature and asset-custody primitives for the channel escrow.
//!
//! This crate provides:
//! - Keccak-packed digests and the Merkle leaf preimage (`crypto`)
//! - ECDSA recovery with the low-`s` malleability rule (`crypto`)
//! - EIP-712 domain separation and struct hashing for the two authorization
//!   domains the protocol signs over (`typed_data`)
//! - The settlement asset transfer interface and an in-memory stand-in for
//!   on-chain custody (`asset`)

mod asset;
mod crypto;
mod typed_data;

pub use asset::{AssetError, AssetTransfer, InMemoryCustody};
pub use crypto::{call_leaf, keccak_packed, recover_signer, CryptoError, Packed};
pub use typed_data::{digest, receipt_digest, CallAuthorization, ChannelAuthorization, Domain};
