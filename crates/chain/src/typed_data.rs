//! EIP-712-style typed-data hashing for the two authorization domains the
//! adjudicator cares about: the HTTP-boundary channel authorization and the
//! on-chain call authorization used during dispute proof verification.

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};

/// `keccak256("EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)")`.
fn domain_type_hash() -> B256 {
    keccak256(b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)")
}

/// A minimal EIP-712 domain: name, version, chain id and verifying contract.
/// No `salt` field — neither authorization domain in this protocol uses one.
#[derive(Debug, Clone)]
pub struct Domain {
    pub name: &'static str,
    pub version: &'static str,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Domain {
    pub fn channel_authorization(chain_id: u64, escrow: Address) -> Self {
        Self {
            name: "x402 Channel",
            version: "1",
            chain_id,
            verifying_contract: escrow,
        }
    }

    pub fn call_authorization(chain_id: u64, escrow: Address) -> Self {
        Self {
            name: "ChannelEscrow",
            version: "1",
            chain_id,
            verifying_contract: escrow,
        }
    }

    /// `keccak(domain_type_hash || keccak(name) || keccak(version) || chainId || contract)`.
    pub fn separator(&self) -> B256 {
        let mut buf = Vec::with_capacity(32 * 5);
        buf.extend_from_slice(domain_type_hash().as_slice());
        buf.extend_from_slice(keccak256(self.name.as_bytes()).as_slice());
        buf.extend_from_slice(keccak256(self.version.as_bytes()).as_slice());
        buf.extend_from_slice(&U256::from(self.chain_id).to_be_bytes::<32>());
        buf.extend_from_slice(&left_pad_address(self.verifying_contract));
        keccak256(&buf)
    }
}

fn left_pad_address(addr: Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(addr.as_slice());
    word
}

/// Final EIP-712 digest: `keccak(0x19 0x01 || domain_separator || struct_hash)`.
pub fn digest(domain: &Domain, struct_hash: B256) -> B256 {
    let mut buf = Vec::with_capacity(2 + 32 + 32);
    buf.push(0x19);
    buf.push(0x01);
    buf.extend_from_slice(domain.separator().as_slice());
    buf.extend_from_slice(struct_hash.as_slice());
    keccak256(&buf)
}

/// `ChannelAuthorization(address agent,string sessionId,string endpoint,uint256 nonce,uint256 timestamp)`
/// — signed by the payer at the HTTP admission boundary.
#[derive(Debug, Clone)]
pub struct ChannelAuthorization {
    pub agent: Address,
    pub session_id: String,
    pub endpoint: String,
    pub nonce: U256,
    pub timestamp: U256,
}

impl ChannelAuthorization {
    fn type_hash() -> B256 {
        keccak256(
            b"ChannelAuthorization(address agent,string sessionId,string endpoint,uint256 nonce,uint256 timestamp)",
        )
    }

    pub fn struct_hash(&self) -> B256 {
        let mut buf = Vec::with_capacity(32 * 6);
        buf.extend_from_slice(Self::type_hash().as_slice());
        buf.extend_from_slice(&left_pad_address(self.agent));
        buf.extend_from_slice(keccak256(self.session_id.as_bytes()).as_slice());
        buf.extend_from_slice(keccak256(self.endpoint.as_bytes()).as_slice());
        buf.extend_from_slice(&self.nonce.to_be_bytes::<32>());
        buf.extend_from_slice(&self.timestamp.to_be_bytes::<32>());
        keccak256(&buf)
    }

    /// Digest to sign/recover against, under the `"x402 Channel"` domain.
    pub fn digest(&self, chain_id: u64, escrow: Address) -> B256 {
        digest(&Domain::channel_authorization(chain_id, escrow), self.struct_hash())
    }
}

/// `CallAuthorization(bytes32 callId,uint256 cost,uint256 timestamp,address escrow)`
/// — signed by the payer over each off-chain receipt, verified during dispute
/// proof submission (the "stronger adjudication tier", spec.md §9).
#[derive(Debug, Clone)]
pub struct CallAuthorization {
    pub call_id: B256,
    pub cost: U256,
    pub timestamp: U256,
    pub escrow: Address,
}

impl CallAuthorization {
    fn type_hash() -> B256 {
        keccak256(b"CallAuthorization(bytes32 callId,uint256 cost,uint256 timestamp,address escrow)")
    }

    pub fn struct_hash(&self) -> B256 {
        let mut buf = Vec::with_capacity(32 * 5);
        buf.extend_from_slice(Self::type_hash().as_slice());
        buf.extend_from_slice(self.call_id.as_slice());
        buf.extend_from_slice(&self.cost.to_be_bytes::<32>());
        buf.extend_from_slice(&self.timestamp.to_be_bytes::<32>());
        buf.extend_from_slice(&left_pad_address(self.escrow));
        keccak256(&buf)
    }

    /// Digest to sign/recover against, under the `"ChannelEscrow"` domain.
    pub fn digest(&self, chain_id: u64, escrow: Address) -> B256 {
        digest(&Domain::call_authorization(chain_id, escrow), self.struct_hash())
    }
}

/// The server's off-chain receipt signature: a personal-sign message over
/// `keccak_packed(call_id, endpoint, cost, timestamp)`, per spec.md §6. Not
/// EIP-712 — the client verifies it against the server's known account using
/// the standard `"\x19Ethereum Signed Message:\n32"` prefix.
pub fn receipt_digest(call_id: B256, endpoint: &str, cost: U256, timestamp: U256) -> B256 {
    use crate::crypto::{keccak_packed, Packed};

    let inner = keccak_packed(&[
        Packed::B256(call_id),
        Packed::Bytes(Bytes::copy_from_slice(endpoint.as_bytes())),
        Packed::Uint256(cost),
        Packed::Uint256(timestamp),
    ]);

    let mut buf = Vec::with_capacity(28 + 32);
    buf.extend_from_slice(b"\x19Ethereum Signed Message:\n32");
    buf.extend_from_slice(inner.as_slice());
    keccak256(&buf)
}
