//! The state machine and adjudicator (spec.md §4.4-§4.7, §4.6). The single
//! entry point external callers (agent, facilitator, receiver) invoke; it
//! owns the Channel Store and Bond Ledger, drives the Merkle Accumulator's
//! verification logic, and invokes the Asset Transfer interface to move
//! funds at well-defined commit points (spec.md §5).
//!
//! Every operation validates its preconditions against a snapshot of the
//! channel, performs any external asset transfer, and only then commits the
//! new channel state — so a failing transfer never leaves a half-mutated
//! channel. Callers are expected to serialize invocations against a given
//! payer (spec.md §5's single-threaded cooperative model); this type does
//! not add its own cross-operation lock beyond the store's per-key shard.

use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use dashmap::DashMap;
use tracing::{info, instrument, warn};

use crate::bond::BondLedger;
use crate::channel::{Channel, ChannelStatus};
use crate::clock::Clock;
use crate::config::ProtocolConfig;
use crate::error::AdjudicatorError;
use crate::events::{Event, EventLog};
use crate::merkle::MerkleAccumulator;
use channel_chain::{call_leaf, recover_signer, AssetTransfer, CallAuthorization};

/// Who most recently baselined `checkpoint_amount`. A payer's own
/// acknowledgement (O3) is a safe floor for `proven_amount` in any later
/// dispute, because the payer has no incentive to inflate a number it is
/// itself conceding. A facilitator's self-asserted claim (O4) is not — it is
/// exactly the figure a payer's dispute (O6) contests, so it must not count
/// as pre-proven. See DESIGN.md for the full resolution of this ambiguity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckpointSource {
    Payer,
    Facilitator,
}

/// Per-channel bookkeeping the Adjudicator needs beyond the public `Channel`
/// fields, kept out of `Channel` itself to avoid leaking internal resolution
/// details into the data model spec.md §3 describes.
#[derive(Debug, Clone, Copy, Default)]
struct ChannelAux {
    checkpoint_source: Option<CheckpointSource>,
    /// This channel's current contribution to its facilitator's bond lock.
    bond_lock: U256,
}

/// A proof entry submitted during a dispute (spec.md §4.4 O8).
pub struct ProofEntry {
    pub call_id: B256,
    pub cost: U256,
    pub timestamp: U256,
    /// The payer's typed-data signature over `{call_id, cost, timestamp,
    /// escrow}` (spec.md §9's "stronger adjudication tier"), required
    /// whenever the channel's dispute is a facilitator-asserted underclaim.
    pub payer_signature: Option<[u8; 65]>,
    pub proof: Vec<B256>,
}

pub struct Adjudicator {
    channels: DashMap<Address, Channel>,
    aux: DashMap<Address, ChannelAux>,
    bonds: BondLedger,
    asset: Arc<dyn AssetTransfer>,
    clock: Arc<dyn Clock>,
    config: ProtocolConfig,
    events: EventLog,
    chain_id: u64,
    escrow: Address,
}

impl Adjudicator {
    pub fn new(
        asset: Arc<dyn AssetTransfer>,
        clock: Arc<dyn Clock>,
        config: ProtocolConfig,
        chain_id: u64,
        escrow: Address,
    ) -> Self {
        Self {
            channels: DashMap::new(),
            aux: DashMap::new(),
            bonds: BondLedger::new(),
            asset,
            clock,
            config,
            events: EventLog::new(),
            chain_id,
            escrow,
        }
    }

    pub fn bonds(&self) -> &BondLedger {
        &self.bonds
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn channel(&self, payer: Address) -> Option<Channel> {
        self.channels.get(&payer).map(|c| c.clone())
    }

    /// Sum of every channel's balance plus every facilitator's bond, for the
    /// pool conservation invariant (spec.md §5, §8 property 1).
    pub fn total_custody(&self) -> U256 {
        let channels_total = self.channels.iter().fold(U256::ZERO, |acc, c| acc + c.balance);
        channels_total + self.bonds.total()
    }

    fn sync_bond_lock(&self, payer: Address, channel: &Channel) {
        let required = channel.facilitator_lock_requirement();
        let mut aux = self.aux.entry(payer).or_default();
        self.bonds.relock(channel.facilitator, aux.bond_lock, required);
        aux.bond_lock = required;
    }

    fn release_bond_lock(&self, payer: Address, facilitator: Address) {
        if let Some(mut aux) = self.aux.get_mut(&payer) {
            self.bonds.unlock(facilitator, aux.bond_lock);
            aux.bond_lock = U256::ZERO;
        }
    }

    // ---- O1: deposit ----------------------------------------------------

    #[instrument(skip(self))]
    pub async fn deposit(
        &self,
        payer: Address,
        facilitator: Address,
        receiver: Address,
        amount: U256,
    ) -> Result<(), AdjudicatorError> {
        if amount < self.config.min_deposit {
            return Err(AdjudicatorError::InsufficientDeposit {
                amount,
                minimum: self.config.min_deposit,
            });
        }
        let bond_balance = self.bonds.balance(facilitator);
        if bond_balance < self.config.min_facilitator_bond {
            return Err(AdjudicatorError::InsufficientFacilitatorBond {
                bond: bond_balance,
                minimum: self.config.min_facilitator_bond,
            });
        }
        if let Some(existing) = self.channels.get(&payer) {
            if !existing.status.may_reopen() {
                return Err(AdjudicatorError::ChannelNotInactive);
            }
        }

        self.asset
            .pull(payer, amount)
            .await
            .map_err(|_| AdjudicatorError::AssetTransferFailed)?;

        let mut entry = self.channels.entry(payer).or_insert_with(|| Channel::empty(payer));
        entry.reopen(facilitator, receiver, amount);
        entry.assert_invariants();
        self.aux.insert(payer, ChannelAux::default());

        self.events.push(Event::ChannelOpened {
            payer,
            facilitator,
            receiver,
            amount,
        });
        info!(%payer, %facilitator, %receiver, %amount, "channel opened");
        Ok(())
    }

    // ---- O2: top_up -------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn top_up(&self, payer: Address, amount: U256) -> Result<(), AdjudicatorError> {
        {
            let ch = self.channels.get(&payer).ok_or(AdjudicatorError::ChannelNotActive)?;
            if ch.status != ChannelStatus::Active {
                return Err(AdjudicatorError::ChannelNotActive);
            }
        }

        self.asset
            .pull(payer, amount)
            .await
            .map_err(|_| AdjudicatorError::AssetTransferFailed)?;

        let mut ch = self.channels.get_mut(&payer).ok_or(AdjudicatorError::ChannelNotActive)?;
        ch.balance = ch.balance.checked_add(amount).ok_or(AdjudicatorError::InvalidAmount)?;
        ch.assert_invariants();

        self.events.push(Event::ChannelToppedUp { payer, amount });
        info!(%payer, %amount, "channel topped up");
        Ok(())
    }

    // ---- O3: initiate_close (payer) ---------------------------------------

    #[instrument(skip(self))]
    pub fn initiate_close(
        &self,
        payer: Address,
        acknowledged_amount: U256,
        checkpoint_root: B256,
    ) -> Result<(), AdjudicatorError> {
        let mut ch = self.channels.get_mut(&payer).ok_or(AdjudicatorError::ChannelNotActive)?;
        if ch.status != ChannelStatus::Active {
            return Err(AdjudicatorError::ChannelNotActive);
        }
        if acknowledged_amount > ch.balance {
            return Err(AdjudicatorError::InsufficientBalance {
                amount: acknowledged_amount,
                balance: ch.balance,
            });
        }

        ch.claimed_amount = acknowledged_amount;
        ch.checkpoint_root = checkpoint_root;
        ch.checkpoint_amount = acknowledged_amount;
        ch.dispute_deadline = self.clock.now() + self.config.dispute_window_secs;
        ch.status = ChannelStatus::Closing;
        ch.assert_invariants();
        self.aux.entry(payer).or_default().checkpoint_source = Some(CheckpointSource::Payer);
        let facilitator = ch.facilitator;
        drop(ch);
        self.sync_bond_lock(payer, &self.channel(payer).unwrap());

        self.events.push(Event::CloseInitiated {
            payer,
            initiator: payer,
            claimed_amount: acknowledged_amount,
        });
        info!(%payer, %facilitator, amount = %acknowledged_amount, "close initiated by payer");
        Ok(())
    }

    // ---- O4: claim_settlement (facilitator) --------------------------------

    #[instrument(skip(self))]
    pub fn claim_settlement(
        &self,
        caller: Address,
        payer: Address,
        amount: U256,
        merkle_root: B256,
    ) -> Result<(), AdjudicatorError> {
        let mut ch = self.channels.get_mut(&payer).ok_or(AdjudicatorError::ChannelNotActive)?;
        if ch.status != ChannelStatus::Active {
            return Err(AdjudicatorError::ChannelNotActive);
        }
        if caller != ch.facilitator {
            return Err(AdjudicatorError::Unauthorized);
        }
        if amount > ch.balance {
            return Err(AdjudicatorError::InsufficientBalance {
                amount,
                balance: ch.balance,
            });
        }

        ch.claimed_amount = amount;
        ch.checkpoint_root = merkle_root;
        ch.checkpoint_amount = amount;
        ch.dispute_deadline = self.clock.now() + self.config.dispute_window_secs;
        ch.status = ChannelStatus::Closing;
        ch.assert_invariants();
        self.aux.entry(payer).or_default().checkpoint_source = Some(CheckpointSource::Facilitator);
        drop(ch);
        self.sync_bond_lock(payer, &self.channel(payer).unwrap());

        self.events.push(Event::CloseInitiated {
            payer,
            initiator: caller,
            claimed_amount: amount,
        });
        info!(%payer, facilitator = %caller, %amount, "close claimed by facilitator");
        Ok(())
    }

    // ---- O5: facilitator_confirm -------------------------------------------

    #[instrument(skip(self))]
    pub async fn facilitator_confirm(&self, caller: Address, payer: Address) -> Result<(), AdjudicatorError> {
        let (facilitator, receiver, balance, claimed) = {
            let ch = self.channels.get(&payer).ok_or(AdjudicatorError::ChannelNotClosing)?;
            if ch.status != ChannelStatus::Closing {
                return Err(AdjudicatorError::ChannelNotClosing);
            }
            if caller != ch.facilitator {
                return Err(AdjudicatorError::Unauthorized);
            }
            (ch.facilitator, ch.receiver, ch.balance, ch.claimed_amount)
        };
        self.settle(payer, facilitator, receiver, balance, claimed).await
    }

    /// `confirm_after_window` in spec.md §4.6's diagram: anyone may finalize
    /// a Closing channel at `claimed_amount` once the dispute window has
    /// elapsed without a dispute being raised.
    #[instrument(skip(self))]
    pub async fn confirm_close(&self, payer: Address) -> Result<(), AdjudicatorError> {
        let (facilitator, receiver, balance, claimed) = {
            let ch = self.channels.get(&payer).ok_or(AdjudicatorError::ChannelNotClosing)?;
            if ch.status != ChannelStatus::Closing {
                return Err(AdjudicatorError::ChannelNotClosing);
            }
            if self.clock.now() <= ch.dispute_deadline {
                return Err(AdjudicatorError::DisputeWindowNotExpired);
            }
            (ch.facilitator, ch.receiver, ch.balance, ch.claimed_amount)
        };
        self.settle(payer, facilitator, receiver, balance, claimed).await
    }

    // ---- O6: dispute (payer) -----------------------------------------------

    #[instrument(skip(self))]
    pub fn dispute(&self, payer: Address, counter_amount: U256) -> Result<(), AdjudicatorError> {
        let mut ch = self.channels.get_mut(&payer).ok_or(AdjudicatorError::ChannelNotClosing)?;
        if ch.status != ChannelStatus::Closing {
            return Err(AdjudicatorError::ChannelNotClosing);
        }
        if self.clock.now() > ch.dispute_deadline {
            return Err(AdjudicatorError::DisputeWindowExpired);
        }
        if ch.balance < self.config.dispute_fee {
            return Err(AdjudicatorError::InsufficientBalance {
                amount: self.config.dispute_fee,
                balance: ch.balance,
            });
        }

        let source = self.aux.get(&payer).and_then(|a| a.checkpoint_source);
        let proven_baseline = match source {
            Some(CheckpointSource::Payer) => ch.checkpoint_amount,
            _ => U256::ZERO,
        };

        ch.balance -= self.config.dispute_fee;
        ch.disputed_amount = counter_amount;
        ch.proven_amount = proven_baseline;
        ch.proof_deadline = self.clock.now() + self.config.proof_window_secs;
        ch.status = ChannelStatus::Disputed;
        ch.assert_invariants();
        drop(ch);

        self.events.push(Event::DisputeRaised {
            payer,
            disputant: payer,
            counter_amount,
        });
        info!(%payer, %counter_amount, "dispute raised by payer");
        Ok(())
    }

    // ---- O7: facilitator_dispute --------------------------------------------

    #[instrument(skip(self))]
    pub fn facilitator_dispute(
        &self,
        caller: Address,
        payer: Address,
        counter_amount: U256,
        merkle_root: B256,
    ) -> Result<(), AdjudicatorError> {
        let mut ch = self.channels.get_mut(&payer).ok_or(AdjudicatorError::ChannelNotClosing)?;
        if ch.status != ChannelStatus::Closing {
            return Err(AdjudicatorError::ChannelNotClosing);
        }
        if caller != ch.facilitator {
            return Err(AdjudicatorError::Unauthorized);
        }
        if self.clock.now() > ch.dispute_deadline {
            return Err(AdjudicatorError::DisputeWindowExpired);
        }
        if counter_amount <= ch.claimed_amount {
            return Err(AdjudicatorError::InvalidAmount);
        }

        // `proven_amount` is left at its current value (0: neither O3 nor O4
        // touch it) — unlike O6, nothing here is trustworthy enough to seed
        // a baseline. The facilitator must prove the whole underclaim.
        ch.disputed_amount = counter_amount;
        ch.checkpoint_root = merkle_root;
        ch.proof_deadline = self.clock.now() + self.config.proof_window_secs;
        ch.status = ChannelStatus::Disputed;
        ch.assert_invariants();
        drop(ch);

        self.events.push(Event::DisputeRaised {
            payer,
            disputant: caller,
            counter_amount,
        });
        info!(%payer, facilitator = %caller, %counter_amount, "dispute raised by facilitator");
        Ok(())
    }

    // ---- O8: submit_proofs --------------------------------------------------

    #[instrument(skip(self, entries))]
    pub fn submit_proofs(
        &self,
        caller: Address,
        payer: Address,
        entries: &[ProofEntry],
    ) -> Result<(), AdjudicatorError> {
        let mut ch = self.channels.get_mut(&payer).ok_or(AdjudicatorError::ChannelNotDisputed)?;
        if ch.status != ChannelStatus::Disputed {
            return Err(AdjudicatorError::ChannelNotDisputed);
        }
        if caller != ch.facilitator {
            return Err(AdjudicatorError::Unauthorized);
        }
        if self.clock.now() > ch.proof_deadline {
            return Err(AdjudicatorError::ProofWindowExpired);
        }

        // The stronger tier (payer signature over each call) is mandatory
        // whenever the facilitator is asserting an underclaim, and whenever
        // the checkpoint root in force was never vouched for by the payer in
        // the first place — a facilitator-asserted root (O4/O7) is only as
        // trustworthy as the signatures behind each leaf (spec.md §9,
        // Adjudication tiers).
        let checkpoint_source = self.aux.get(&payer).and_then(|a| a.checkpoint_source);
        let require_signature = ch.disputed_amount > ch.claimed_amount
            || checkpoint_source != Some(CheckpointSource::Payer);

        let mut batch_total = U256::ZERO;
        let mut newly_proven = Vec::new();
        for e in entries {
            if ch.is_call_proven(&e.call_id) {
                continue; // idempotent: already credited this generation
            }

            let leaf = call_leaf(e.call_id, e.cost, e.timestamp);
            if !MerkleAccumulator::verify(leaf, &e.proof, ch.checkpoint_root) {
                return Err(AdjudicatorError::InvalidProof);
            }

            if require_signature {
                let sig = e.payer_signature.ok_or(AdjudicatorError::InvalidSignature(
                    channel_chain::CryptoError::InvalidSignatureLength(0),
                ))?;
                let auth = CallAuthorization {
                    call_id: e.call_id,
                    cost: e.cost,
                    timestamp: e.timestamp,
                    escrow: self.escrow,
                };
                let digest = auth.digest(self.chain_id, self.escrow);
                let signer = recover_signer(digest, &sig)?;
                if signer != payer {
                    return Err(AdjudicatorError::Unauthorized);
                }
            }

            batch_total = batch_total.checked_add(e.cost).ok_or(AdjudicatorError::InvalidAmount)?;
            newly_proven.push(e.call_id);
        }

        for call_id in newly_proven {
            ch.proven_calls.insert(call_id);
        }
        ch.proven_amount = ch.proven_amount.checked_add(batch_total).ok_or(AdjudicatorError::InvalidAmount)?;
        ch.assert_invariants();
        let proven_amount = ch.proven_amount;
        drop(ch);
        self.sync_bond_lock(payer, &self.channel(payer).unwrap());

        self.events.push(Event::ProofSubmitted {
            payer,
            batch_total,
            proven_amount,
        });
        info!(%payer, %batch_total, %proven_amount, "proof batch submitted");
        Ok(())
    }

    // ---- O9: finalize_dispute -----------------------------------------------

    #[instrument(skip(self))]
    pub async fn finalize_dispute(&self, payer: Address) -> Result<(), AdjudicatorError> {
        let (facilitator, receiver, mut balance, claimed, disputed, proven) = {
            let ch = self.channels.get(&payer).ok_or(AdjudicatorError::ChannelNotDisputed)?;
            if ch.status != ChannelStatus::Disputed {
                return Err(AdjudicatorError::ChannelNotDisputed);
            }
            if self.clock.now() <= ch.proof_deadline {
                return Err(AdjudicatorError::ProofWindowNotExpired);
            }
            (ch.facilitator, ch.receiver, ch.balance, ch.claimed_amount, ch.disputed_amount, ch.proven_amount)
        };

        let settlement;
        if disputed > claimed {
            // Scenario A: facilitator asserts an underclaim.
            settlement = proven.min(disputed).min(balance);
            if settlement > claimed {
                let underclaim = settlement - claimed;
                let penalty = self.config.penalty(underclaim);
                let bumped = settlement.checked_add(penalty).ok_or(AdjudicatorError::InvalidAmount)?;
                let final_settlement = if balance >= bumped { bumped } else { settlement };
                if final_settlement > settlement {
                    self.events.push(Event::PayerPenalized { payer, penalty });
                    warn!(%payer, %penalty, "payer penalized for confirmed underclaim");
                }
                self.finish_dispute(payer, facilitator, receiver, balance, final_settlement).await?;
                return Ok(());
            }
        } else {
            // Scenario B: payer asserts an overclaim.
            settlement = proven.min(disputed);
            if proven < claimed {
                let overclaim = claimed - proven;
                let slashed = self
                    .bonds
                    .slash(self.asset.as_ref(), facilitator, payer, overclaim)
                    .await?;
                if !slashed.is_zero() {
                    self.events.push(Event::BondSlashed {
                        facilitator,
                        payer,
                        amount: slashed,
                    });
                    warn!(%facilitator, %payer, amount = %slashed, "facilitator bond slashed for confirmed overclaim");
                }
            }
            if settlement <= disputed {
                balance = balance
                    .checked_add(self.config.dispute_fee)
                    .ok_or(AdjudicatorError::InvalidAmount)?;
            }
        }

        self.finish_dispute(payer, facilitator, receiver, balance, settlement).await
    }

    async fn finish_dispute(
        &self,
        payer: Address,
        facilitator: Address,
        receiver: Address,
        balance: U256,
        settlement: U256,
    ) -> Result<(), AdjudicatorError> {
        if let Some(mut ch) = self.channels.get_mut(&payer) {
            ch.balance = balance;
        }
        self.settle(payer, facilitator, receiver, balance, settlement).await
    }

    // ---- O10: internal settlement -------------------------------------------

    async fn settle(
        &self,
        payer: Address,
        facilitator: Address,
        receiver: Address,
        balance: U256,
        amount: U256,
    ) -> Result<(), AdjudicatorError> {
        let refund = balance.checked_sub(amount).ok_or(AdjudicatorError::InvalidAmount)?;

        if !amount.is_zero() {
            self.asset
                .push(receiver, amount)
                .await
                .map_err(|_| AdjudicatorError::AssetTransferFailed)?;
        }
        if !refund.is_zero() {
            self.asset
                .push(payer, refund)
                .await
                .map_err(|_| AdjudicatorError::AssetTransferFailed)?;
        }

        if let Some(mut ch) = self.channels.get_mut(&payer) {
            ch.balance = U256::ZERO;
            ch.status = ChannelStatus::Settled;
            ch.assert_invariants();
        }
        self.release_bond_lock(payer, facilitator);

        self.events.push(Event::ChannelSettled {
            payer,
            receiver_amount: amount,
            payer_refund: refund,
        });
        info!(%payer, %receiver, receiver_amount = %amount, %refund, "channel settled");
        Ok(())
    }

    // ---- Bond Ledger passthroughs --------------------------------------------

    #[instrument(skip(self))]
    pub async fn deposit_bond(&self, facilitator: Address, amount: U256) -> Result<(), AdjudicatorError> {
        self.bonds.deposit_bond(self.asset.as_ref(), facilitator, amount).await?;
        self.events.push(Event::BondDeposited { facilitator, amount });
        info!(%facilitator, %amount, "bond deposited");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn withdraw_bond(&self, facilitator: Address, amount: U256) -> Result<(), AdjudicatorError> {
        self.bonds.withdraw_bond(self.asset.as_ref(), facilitator, amount).await?;
        self.events.push(Event::BondWithdrawn { facilitator, amount });
        info!(%facilitator, %amount, "bond withdrawn");
        Ok(())
    }
}
