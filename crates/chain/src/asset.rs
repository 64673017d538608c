//! The settlement asset interface the Adjudicator consumes (spec.md §6).
//!
//! The real implementation (an ERC-20 `transferFrom`/`transfer` pair behind a
//! safe-transfer wrapper) is explicitly out of scope — it is the "test
//! ERC-20 token" and on-chain transfer plumbing spec.md §1 delegates to an
//! external collaborator. `InMemoryCustody` stands in for it in tests and
//! the demo binary, the same way the teacher's `ProviderManager` wraps a
//! real RPC endpoint behind a narrow trait-like surface.

use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("asset transfer failed moving {amount} from {from} to custody")]
    PullFailed { from: Address, amount: U256 },
    #[error("asset transfer failed pushing {amount} from custody to {to}")]
    PushFailed { to: Address, amount: U256 },
}

/// Moves the settlement asset between an external account and the
/// adjudicator's custody. A "false-returning" transfer (insufficient
/// allowance/balance without a revert) is surfaced as `Err`, the same as a
/// reverting one — the adjudicator's safe wrapper treats both as failure.
#[async_trait]
pub trait AssetTransfer: Send + Sync {
    /// Pull `amount` from `from` into custody.
    async fn pull(&self, from: Address, amount: U256) -> Result<(), AssetError>;

    /// Push `amount` from custody to `to`.
    async fn push(&self, to: Address, amount: U256) -> Result<(), AssetError>;
}

/// In-memory custody ledger: tracks external-account balances and a custody
/// pool, used by the demo binary and by every adjudicator test. Pulls fail
/// if the source account's tracked balance is insufficient; pushes never
/// fail (custody accounting guarantees the adjudicator never calls `push`
/// for more than it holds — see `Adjudicator::total_custody`).
pub struct InMemoryCustody {
    external_balances: Mutex<HashMap<Address, U256>>,
    custody: Mutex<U256>,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self {
            external_balances: Mutex::new(HashMap::new()),
            custody: Mutex::new(U256::ZERO),
        }
    }

    /// Fund an external account for test/demo setup (mint, not a transfer).
    pub fn fund(&self, account: Address, amount: U256) {
        *self.external_balances.lock().entry(account).or_insert(U256::ZERO) += amount;
    }

    pub fn external_balance(&self, account: Address) -> U256 {
        self.external_balances
            .lock()
            .get(&account)
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn custody_balance(&self) -> U256 {
        *self.custody.lock()
    }
}

impl Default for InMemoryCustody {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetTransfer for InMemoryCustody {
    async fn pull(&self, from: Address, amount: U256) -> Result<(), AssetError> {
        let mut balances = self.external_balances.lock();
        let balance = balances.entry(from).or_insert(U256::ZERO);
        if *balance < amount {
            return Err(AssetError::PullFailed { from, amount });
        }
        *balance -= amount;
        *self.custody.lock() += amount;
        Ok(())
    }

    async fn push(&self, to: Address, amount: U256) -> Result<(), AssetError> {
        let mut custody = self.custody.lock();
        if *custody < amount {
            return Err(AssetError::PushFailed { to, amount });
        }
        *custody -= amount;
        drop(custody);
        *self
            .external_balances
            .lock()
            .entry(to)
            .or_insert(U256::ZERO) += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[tokio::test]
    async fn pull_moves_funds_into_custody() {
        let custody = InMemoryCustody::new();
        let payer = address!("0000000000000000000000000000000000000a");
        custody.fund(payer, U256::from(100u64));

        custody.pull(payer, U256::from(40u64)).await.unwrap();

        assert_eq!(custody.external_balance(payer), U256::from(60u64));
        assert_eq!(custody.custody_balance(), U256::from(40u64));
    }

    #[tokio::test]
    async fn pull_fails_on_insufficient_balance() {
        let custody = InMemoryCustody::new();
        let payer = address!("0000000000000000000000000000000000000b");
        custody.fund(payer, U256::from(10u64));

        let err = custody.pull(payer, U256::from(20u64)).await.unwrap_err();
        assert_eq!(
            err,
            AssetError::PullFailed {
                from: payer,
                amount: U256::from(20u64)
            }
        );
    }

    #[tokio::test]
    async fn push_moves_funds_out_of_custody() {
        let custody = InMemoryCustody::new();
        let payer = address!("0000000000000000000000000000000000000c");
        let receiver = address!("0000000000000000000000000000000000000d");
        custody.fund(payer, U256::from(100u64));
        custody.pull(payer, U256::from(100u64)).await.unwrap();

        custody.push(receiver, U256::from(30u64)).await.unwrap();

        assert_eq!(custody.custody_balance(), U256::from(70u64));
        assert_eq!(custody.external_balance(receiver), U256::from(30u64));
    }
}
