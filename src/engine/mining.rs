use log::debug;

use super::Simulation;
use super::lifecycle::Lifecycle;
use crate::blockchain::{Block, FAST_PATH_MAX_DIFFICULTY, MAX_TXS_PER_BLOCK};

impl Simulation {
    /// Build a candidate from the front of the pool and start hashing it.
    ///
    /// No-op (returns false) while another block is in flight or when the
    /// pool is empty. Pool entries stay pending until their block commits.
    pub fn start_mining(&mut self) -> bool {
        if !matches!(self.lifecycle, Lifecycle::Idle) || self.ledger.pending.is_empty() {
            return false;
        }

        let tip = self.ledger.last_block();
        let block = Block::candidate(
            tip.index + 1,
            self.now_ms(),
            tip.hash.clone(),
            self.ledger.front_of_pool(MAX_TXS_PER_BLOCK),
        );
        debug!(
            "mining block #{} with {} txs at difficulty {}",
            block.index,
            block.transactions.len(),
            self.difficulty
        );
        self.lifecycle = Lifecycle::Mining(block);
        true
    }

    /// Nonce attempts allowed per tick. Scales with speed, shrinks with
    /// difficulty, never below 10.
    pub fn nonce_budget(&self) -> u64 {
        let per_tick = 200.0 / (f64::from(self.difficulty) * 0.2).max(0.1) * self.speed;
        (per_tick.floor() as u64).max(10)
    }

    /// One tick of proof-of-work. Returns true when a hash was found and the
    /// block handed to the lifecycle.
    pub fn mine_block(&mut self) -> bool {
        let budget = self.nonce_budget();
        let difficulty = self.difficulty;
        let Lifecycle::Mining(block) = &mut self.lifecycle else {
            return false;
        };

        let found = (0..budget).any(|_| block.try_next_nonce(difficulty));
        let nonce = block.nonce;
        self.network.refresh_miners(Some(nonce), self.per_miner_hash_rate());
        if !found {
            return false;
        }

        let mut block = match std::mem::replace(&mut self.lifecycle, Lifecycle::Idle) {
            Lifecycle::Mining(block) => block,
            other => {
                self.lifecycle = other;
                return false;
            }
        };
        block.glow_intensity = 1.0;
        block.difficulty = difficulty;

        if difficulty <= FAST_PATH_MAX_DIFFICULTY {
            self.commit_fast(block);
        } else {
            self.begin_ceremony(block);
        }
        true
    }
}
