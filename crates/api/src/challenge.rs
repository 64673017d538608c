//! The HTTP 402 "payment required" challenge (spec.md §6). The HTTP layer
//! that issues this header is out of scope; this crate only fixes the wire
//! shape so a payer-side client and the adjudicator's escrow agree on it.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

pub const X402_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelExtra {
    pub escrow_address: Address,
    pub min_deposit: U256,
    pub facilitator_address: Address,
    pub facilitator_bond: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub x402_version: u32,
    pub scheme: String,
    pub chain_id: u64,
    pub network: String,
    pub pay_to: Address,
    pub asset: Address,
    pub max_amount: U256,
    pub expiry: u64,
    pub extra: ChannelExtra,
}

impl Challenge {
    pub fn channel(
        chain_id: u64,
        network: impl Into<String>,
        pay_to: Address,
        asset: Address,
        max_amount: U256,
        expiry: u64,
        extra: ChannelExtra,
    ) -> Self {
        Self {
            x402_version: X402_VERSION,
            scheme: "channel".to_string(),
            chain_id,
            network: network.into(),
            pay_to,
            asset,
            max_amount,
            expiry,
            extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn challenge_round_trips_through_json() {
        let challenge = Challenge::channel(
            1,
            "base-mainnet",
            address!("0000000000000000000000000000000000000a"),
            address!("0000000000000000000000000000000000000b"),
            U256::from(1_000_000u64),
            1_700_000_000,
            ChannelExtra {
                escrow_address: address!("0000000000000000000000000000000000000c"),
                min_deposit: U256::from(10_000_000u64),
                facilitator_address: address!("0000000000000000000000000000000000000d"),
                facilitator_bond: U256::from(100_000_000u64),
            },
        );

        let json = serde_json::to_string(&challenge).unwrap();
        let back: Challenge = serde_json::from_str(&json).unwrap();
        assert_eq!(back.scheme, "channel");
        assert_eq!(back.extra.min_deposit, U256::from(10_000_000u64));
    }
}
