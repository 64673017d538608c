//! Keccak-packed digests and ECDSA signature recovery.
//!
//! The packed encoding mirrors Solidity's `abi.encodePacked`: no length
//! prefixes, fixed-width types zero-padded to their native width, variable
//! bytes concatenated verbatim. Every off-chain peer that needs to agree on
//! a leaf hash or a typed-data digest must produce the exact same bytes.

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};

/// A single value contributed to a packed (`abi.encodePacked`-style) digest.
#[derive(Debug, Clone)]
pub enum Packed {
    Address(Address),
    Uint256(U256),
    B256(B256),
    Bytes(Bytes),
}

impl Packed {
    fn write_into(&self, buf: &mut Vec<u8>) {
        match self {
            Packed::Address(a) => buf.extend_from_slice(a.as_slice()),
            Packed::Uint256(v) => buf.extend_from_slice(&v.to_be_bytes::<32>()),
            Packed::B256(b) => buf.extend_from_slice(b.as_slice()),
            Packed::Bytes(b) => buf.extend_from_slice(b.as_ref()),
        }
    }
}

/// `keccak256` of the packed concatenation of `values`, bit-exact with
/// `abi.encodePacked(...)` followed by `keccak256(...)` in Solidity.
pub fn keccak_packed(values: &[Packed]) -> B256 {
    let mut buf = Vec::with_capacity(values.len() * 32);
    for v in values {
        v.write_into(&mut buf);
    }
    keccak256(&buf)
}

/// Leaf preimage for the Merkle accumulator: `keccak(call_id || cost || timestamp)`.
pub fn call_leaf(call_id: B256, cost: U256, timestamp: U256) -> B256 {
    keccak_packed(&[
        Packed::B256(call_id),
        Packed::Uint256(cost),
        Packed::Uint256(timestamp),
    ])
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("signature must be exactly 65 bytes, got {0}")]
    InvalidSignatureLength(usize),
    #[error("signature has high-s malleable form")]
    MalleableSignature,
    #[error("ECDSA recovery failed")]
    RecoveryFailed,
}

/// `secp256k1` curve order halved, the standard low-`s` boundary used by
/// OpenZeppelin's `ECDSA.sol` and EIP-2.
const SECP256K1_HALF_ORDER: U256 = U256::from_be_bytes([
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
]);

/// Recover the signer of `digest` from a 65-byte `(r, s, v)` signature,
/// rejecting high-`s` (malleable) signatures and normalizing `v < 27`.
pub fn recover_signer(digest: B256, signature: &[u8]) -> Result<Address, CryptoError> {
    if signature.len() != 65 {
        return Err(CryptoError::InvalidSignatureLength(signature.len()));
    }

    let s = U256::from_be_slice(&signature[32..64]);
    if s > SECP256K1_HALF_ORDER {
        return Err(CryptoError::MalleableSignature);
    }

    let mut v = signature[64];
    if v < 27 {
        v += 27;
    }
    let y_parity = v == 28;

    let mut rs = [0u8; 64];
    rs.copy_from_slice(&signature[..64]);
    let sig = alloy::primitives::PrimitiveSignature::from_bytes_and_parity(&rs, y_parity);

    sig.recover_address_from_prehash(&digest)
        .map_err(|_| CryptoError::RecoveryFailed)
}
