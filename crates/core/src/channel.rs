//! Per-payer channel record (spec.md §3) and its state machine (spec.md
//! §4.6). The proven-call set is a field of `Channel` itself rather than a
//! separate `(payer, call_id)` map — a fresh `deposit` constructs a brand
//! new `Channel`, so the set is scoped to the channel's generation for
//! free, with no stale entries to leak across a payer's successive channels
//! (see DESIGN.md for the source's nested-map approach this replaces).

use std::collections::HashSet;

use alloy::primitives::{Address, B256, U256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelStatus {
    Inactive,
    Active,
    Closing,
    Disputed,
    Settled,
}

impl ChannelStatus {
    /// Whether a fresh `deposit` may (re)open a channel currently in this status.
    pub fn may_reopen(self) -> bool {
        matches!(self, ChannelStatus::Inactive | ChannelStatus::Settled)
    }
}

/// A payer's channel. Reused across generations: `deposit` resets every
/// field (including `generation` and `proven_calls`) rather than allocating
/// a new store entry, so the same `Address` key always maps to the payer's
/// current (or most recently settled) channel.
#[derive(Debug, Clone)]
pub struct Channel {
    pub payer: Address,
    pub facilitator: Address,
    pub receiver: Address,

    pub balance: U256,
    pub claimed_amount: U256,
    pub disputed_amount: U256,
    pub proven_amount: U256,
    pub checkpoint_root: B256,
    pub checkpoint_amount: U256,

    pub dispute_deadline: u64,
    pub proof_deadline: u64,

    pub status: ChannelStatus,

    /// Incremented on every `deposit`; identifies this channel's generation
    /// for external observers (events, indices) independent of any call id.
    pub generation: u64,

    /// Call ids already credited toward `proven_amount` this generation.
    pub(crate) proven_calls: HashSet<B256>,
}

impl Channel {
    /// A never-opened channel slot, as if freshly allocated in the store.
    pub fn empty(payer: Address) -> Self {
        Self {
            payer,
            facilitator: Address::ZERO,
            receiver: Address::ZERO,
            balance: U256::ZERO,
            claimed_amount: U256::ZERO,
            disputed_amount: U256::ZERO,
            proven_amount: U256::ZERO,
            checkpoint_root: B256::ZERO,
            checkpoint_amount: U256::ZERO,
            dispute_deadline: 0,
            proof_deadline: 0,
            status: ChannelStatus::Inactive,
            generation: 0,
            proven_calls: HashSet::new(),
        }
    }

    /// Reset all mutable fields for a fresh deposit, bumping the generation.
    /// `payer` is preserved (it is the store's key); everything else is
    /// overwritten.
    pub(crate) fn reopen(&mut self, facilitator: Address, receiver: Address, amount: U256) {
        self.facilitator = facilitator;
        self.receiver = receiver;
        self.balance = amount;
        self.claimed_amount = U256::ZERO;
        self.disputed_amount = U256::ZERO;
        self.proven_amount = U256::ZERO;
        self.checkpoint_root = B256::ZERO;
        self.checkpoint_amount = U256::ZERO;
        self.dispute_deadline = 0;
        self.proof_deadline = 0;
        self.status = ChannelStatus::Active;
        self.generation = self.generation.wrapping_add(1);
        self.proven_calls.clear();
    }

    /// Whether `call_id` has already been credited this generation.
    pub fn is_call_proven(&self, call_id: &B256) -> bool {
        self.proven_calls.contains(call_id)
    }

    /// `claimed_amount - proven_amount`'s current upper bound, used by the
    /// Adjudicator to size the facilitator's bond lock while this channel
    /// is open (spec.md §9's bond-withdrawal open question).
    pub fn facilitator_lock_requirement(&self) -> U256 {
        self.claimed_amount.saturating_sub(self.proven_amount)
    }

    /// Checks the invariants spec.md §3 requires to hold after every
    /// operation. Debug-only sanity check, not part of the public API.
    #[cfg(debug_assertions)]
    pub(crate) fn assert_invariants(&self) {
        assert!(
            self.proven_amount <= self.balance || self.status == ChannelStatus::Settled,
            "proven_amount must not exceed balance before settlement"
        );
        assert!(
            self.claimed_amount <= self.balance || self.claimed_amount == U256::ZERO,
            "claimed_amount must not exceed balance when recorded"
        );
    }

    #[cfg(not(debug_assertions))]
    pub(crate) fn assert_invariants(&self) {}
}
