//! Channel escrow adjudication core.
//!
//! This crate provides the engine that adjudicates x402 payment channels:
//! - A sorted-pair Merkle accumulator over off-chain receipt leaves
//! - A facilitator bond ledger with open-dispute lock accounting
//! - The per-payer channel record and its Inactive/Active/Closing/Disputed/
//!   Settled state machine
//! - The Adjudicator: the single entry point driving all ten operations
//!   (deposit, top_up, initiate_close, claim_settlement, facilitator_confirm,
//!   confirm_close, dispute, facilitator_dispute, submit_proofs,
//!   finalize_dispute) plus bond deposit/withdrawal
//! - Protocol configuration, the typed error taxonomy, the event log and an
//!   injectable wall clock

mod adjudicator;
mod bond;
mod channel;
pub mod clock;
pub mod config;
mod error;
mod events;
mod merkle;

pub use adjudicator::{Adjudicator, ProofEntry};
pub use bond::{snapshot_totals, BondLedger};
pub use channel::{Channel, ChannelStatus};
pub use clock::{Clock, FrozenClock, SystemClock};
pub use config::{ConfigError, ProtocolConfig};
pub use error::AdjudicatorError;
pub use events::{Event, EventLog};
pub use merkle::MerkleAccumulator;
