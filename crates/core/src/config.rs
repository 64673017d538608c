//! Protocol constants (spec.md §6), grouped the way the teacher groups
//! tuning parameters into a profiled config struct (`config/bot.rs`'s
//! `BotConfig`/`PositionConfig`). Named profiles stand in for the teacher's
//! `testing`/`production`/`aggressive` split; a `from_toml` loader mirrors
//! `config/loader.rs`'s file-driven overrides.
//!
//! Unlike the teacher's `init_config`/`config()` global singleton, this is
//! plain data passed to `Adjudicator::new` — a channel adjudicator is a
//! library entry point a host process may embed more than once (one per
//! chain, say), and a process-wide global would leak state across
//! instances. See DESIGN.md.

use std::path::Path;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

const MINOR_UNIT: u64 = 1_000_000;
const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Minimum deposit to open a channel, in minor units.
    #[serde(default = "default_min_deposit")]
    pub min_deposit: U256,

    /// Dispute window length, in seconds.
    #[serde(default = "default_dispute_window")]
    pub dispute_window_secs: u64,

    /// Proof window length, in seconds.
    #[serde(default = "default_proof_window")]
    pub proof_window_secs: u64,

    /// Fee withheld from the payer's balance on raising a dispute.
    #[serde(default = "default_dispute_fee")]
    pub dispute_fee: U256,

    /// Minimum bond a facilitator must hold to be chosen at channel open.
    #[serde(default = "default_min_facilitator_bond")]
    pub min_facilitator_bond: U256,

    /// Underclaim penalty fraction numerator (denominator is fixed at 10).
    #[serde(default = "default_underclaim_penalty_numerator")]
    pub underclaim_penalty_numerator: U256,
}

const UNDERCLAIM_PENALTY_DENOMINATOR: u64 = 10;

fn default_min_deposit() -> U256 {
    U256::from(10u64 * MINOR_UNIT)
}
fn default_dispute_window() -> u64 {
    7 * SECONDS_PER_DAY
}
fn default_proof_window() -> u64 {
    5 * SECONDS_PER_DAY
}
fn default_dispute_fee() -> U256 {
    U256::from(MINOR_UNIT / 2)
}
fn default_min_facilitator_bond() -> U256 {
    U256::from(100u64 * MINOR_UNIT)
}
fn default_underclaim_penalty_numerator() -> U256 {
    U256::from(1u64)
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl ProtocolConfig {
    /// The literal values from spec.md §6.
    pub fn mainnet() -> Self {
        Self {
            min_deposit: default_min_deposit(),
            dispute_window_secs: default_dispute_window(),
            proof_window_secs: default_proof_window(),
            dispute_fee: default_dispute_fee(),
            min_facilitator_bond: default_min_facilitator_bond(),
            underclaim_penalty_numerator: default_underclaim_penalty_numerator(),
        }
    }

    /// Short windows for integration tests exercising dispute/proof
    /// timeouts without a `FrozenClock`-driven long wait.
    pub fn testing() -> Self {
        Self {
            min_deposit: U256::from(10u64),
            dispute_window_secs: 60,
            proof_window_secs: 60,
            dispute_fee: U256::from(1u64),
            min_facilitator_bond: U256::from(100u64),
            underclaim_penalty_numerator: default_underclaim_penalty_numerator(),
        }
    }

    pub fn underclaim_penalty_denominator(&self) -> U256 {
        U256::from(UNDERCLAIM_PENALTY_DENOMINATOR)
    }

    pub fn penalty(&self, underclaim: U256) -> U256 {
        (underclaim * self.underclaim_penalty_numerator) / self.underclaim_penalty_denominator()
    }

    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(String),
    #[error("failed to parse config file: {0}")]
    Parse(String),
}
