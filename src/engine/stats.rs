use serde::Serialize;

use super::Simulation;
use super::lifecycle::Phase;

/// Display difficulty stops climbing here.
const DISPLAY_DIFFICULTY_CAP: u32 = 8;
/// Blocks per step of cosmetic difficulty escalation.
const BLOCKS_PER_DISPLAY_STEP: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub blocks: usize,
    pub transactions: u64,
    pub pending: usize,
    /// Cosmetic; mining always uses the configured difficulty.
    pub difficulty: u32,
    pub hash_rate: u64,
    pub miners: usize,
    pub nodes: usize,
    pub phase: Phase,
    pub is_mining: bool,
    pub total_rewards: f64,
    /// Seconds, averaged over the recent block window.
    pub average_block_time: f64,
}

impl Simulation {
    /// Simulated hashes per second of one miner at the current settings.
    /// Saturates at `u64::MAX` for very large speeds.
    pub fn per_miner_hash_rate(&self) -> u64 {
        let exp = self.difficulty.saturating_sub(1).min(62) as i32;
        // Float to int `as` casts saturate.
        (1200.0 / 2f64.powi(exp) * self.speed).floor() as u64
    }

    /// Whole-network estimate: miners times the per-miner rate.
    pub fn network_hash_rate(&self) -> u64 {
        (self.network.miners.len() as u64).saturating_mul(self.per_miner_hash_rate())
    }

    pub fn stats(&self) -> Stats {
        let blocks = self.ledger.len();
        let escalation = (blocks as u64 / BLOCKS_PER_DISPLAY_STEP) as u32;
        Stats {
            blocks,
            transactions: self.total_transactions,
            pending: self.ledger.pending.len(),
            difficulty: (self.difficulty + escalation).min(DISPLAY_DIFFICULTY_CAP),
            hash_rate: self.network_hash_rate(),
            miners: self.network.miners.len(),
            nodes: self.network.len(),
            phase: self.lifecycle.phase(),
            is_mining: self.lifecycle.is_mining(),
            total_rewards: self.total_rewards,
            average_block_time: self.average_block_time_ms / 1000.0,
        }
    }
}
