//! Facilitator bond ledger (spec.md §4.3) plus the bond-lock accounting that
//! resolves the open question in spec.md §9: a facilitator may not withdraw
//! a bond amount that is backing a channel not yet `Settled`.

use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use channel_chain::AssetTransfer;
use dashmap::DashMap;

use crate::error::AdjudicatorError;

#[derive(Debug, Clone, Copy, Default)]
struct BondEntry {
    balance: U256,
    /// Sum of `claimed_amount - proven_amount_upper_bound` across every
    /// channel this facilitator currently backs that is not yet Settled.
    locked: U256,
}

/// Per-facilitator balance of the settlement asset, with an explicit lock
/// the Adjudicator raises while a backed channel is open.
pub struct BondLedger {
    entries: DashMap<Address, BondEntry>,
}

impl BondLedger {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn balance(&self, facilitator: Address) -> U256 {
        self.entries.get(&facilitator).map(|e| e.balance).unwrap_or(U256::ZERO)
    }

    pub fn locked(&self, facilitator: Address) -> U256 {
        self.entries.get(&facilitator).map(|e| e.locked).unwrap_or(U256::ZERO)
    }

    pub fn available(&self, facilitator: Address) -> U256 {
        self.balance(facilitator).saturating_sub(self.locked(facilitator))
    }

    /// Sum of every facilitator's bonded balance, for the pool conservation
    /// invariant (spec.md §5, §8 property 1).
    pub fn total(&self) -> U256 {
        self.entries.iter().fold(U256::ZERO, |acc, e| acc + e.balance)
    }

    pub async fn deposit_bond(
        &self,
        asset: &dyn AssetTransfer,
        facilitator: Address,
        amount: U256,
    ) -> Result<(), AdjudicatorError> {
        asset
            .pull(facilitator, amount)
            .await
            .map_err(|_| AdjudicatorError::AssetTransferFailed)?;
        let mut entry = self.entries.entry(facilitator).or_default();
        entry.balance = entry
            .balance
            .checked_add(amount)
            .ok_or(AdjudicatorError::InvalidAmount)?;
        Ok(())
    }

    pub async fn withdraw_bond(
        &self,
        asset: &dyn AssetTransfer,
        facilitator: Address,
        amount: U256,
    ) -> Result<(), AdjudicatorError> {
        let available = self.available(facilitator);
        if amount > available {
            return Err(AdjudicatorError::InsufficientBond {
                requested: amount,
                available,
            });
        }
        {
            let mut entry = self.entries.entry(facilitator).or_default();
            entry.balance -= amount;
        }
        asset
            .push(facilitator, amount)
            .await
            .map_err(|_| AdjudicatorError::AssetTransferFailed)?;
        Ok(())
    }

    /// Raise the lock a channel backed by `facilitator` requires while open.
    pub(crate) fn lock(&self, facilitator: Address, amount: U256) {
        let mut entry = self.entries.entry(facilitator).or_default();
        entry.locked = entry.locked.saturating_add(amount);
    }

    /// Release a previously-raised lock (channel settled or its lock shrank).
    pub(crate) fn unlock(&self, facilitator: Address, amount: U256) {
        let mut entry = self.entries.entry(facilitator).or_default();
        entry.locked = entry.locked.saturating_sub(amount);
    }

    /// Adjust a lock from `old` to `new` in one step (e.g. claimed_amount
    /// changes during a dispute).
    pub(crate) fn relock(&self, facilitator: Address, old: U256, new: U256) {
        self.unlock(facilitator, old);
        self.lock(facilitator, new);
    }

    /// Internal, callable only by adjudicator finalization. The effective
    /// slash is capped at the facilitator's bonded balance; the slashed
    /// amount transfers to `payer` as compensation.
    pub(crate) async fn slash(
        &self,
        asset: &dyn AssetTransfer,
        facilitator: Address,
        payer: Address,
        amount: U256,
    ) -> Result<U256, AdjudicatorError> {
        let balance = self.balance(facilitator);
        let effective = amount.min(balance);
        if effective.is_zero() {
            return Ok(U256::ZERO);
        }
        {
            let mut entry = self.entries.entry(facilitator).or_default();
            entry.balance -= effective;
        }
        asset
            .push(payer, effective)
            .await
            .map_err(|_| AdjudicatorError::AssetTransferFailed)?;
        Ok(effective)
    }

    /// Minimum bond a facilitator must hold to be "qualified" (spec.md §4.3).
    pub fn is_qualified(&self, facilitator: Address, minimum: U256) -> bool {
        self.balance(facilitator) >= minimum
    }
}

impl Default for BondLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot used by tests asserting the pool conservation invariant without
/// holding the ledger's internal lock across an `await`.
pub fn snapshot_totals(ledger: &BondLedger) -> HashMap<Address, U256> {
    ledger
        .entries
        .iter()
        .map(|e| (*e.key(), e.value().balance))
        .collect()
}
