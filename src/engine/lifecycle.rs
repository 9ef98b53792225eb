use log::{debug, info, warn};
use serde::Serialize;

use super::Simulation;
use super::particles::{EffectKind, Steer};
use super::schedule::Event;
use crate::blockchain::{BLOCK_TIME_WINDOW, Block};
use crate::transaction::Transaction;

/// Extra pause between the end of finalization and the commit.
pub const COMMIT_DELAY_MS: i64 = 400;

/// Observable name of where the block lifecycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Mining,
    MiningSuccess,
    Validation,
    Propagation,
    Consensus,
    Finalization,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Mining => "mining",
            Phase::MiningSuccess => "mining_success",
            Phase::Validation => "validation",
            Phase::Propagation => "propagation",
            Phase::Consensus => "consensus",
            Phase::Finalization => "finalization",
        }
    }
}

/// Timed stages of the full ceremony after a hash is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    MiningSuccess,
    Validation,
    Propagation,
    Consensus,
    Finalization,
}

impl Stage {
    /// Wall-clock dwell before the next stage.
    pub fn dwell_ms(self) -> i64 {
        match self {
            Stage::MiningSuccess => 1_200,
            Stage::Validation => 1_500,
            Stage::Propagation => 1_800,
            Stage::Consensus => 1_500,
            Stage::Finalization => 1_000,
        }
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::MiningSuccess => Some(Stage::Validation),
            Stage::Validation => Some(Stage::Propagation),
            Stage::Propagation => Some(Stage::Consensus),
            Stage::Consensus => Some(Stage::Finalization),
            Stage::Finalization => None,
        }
    }

    pub fn phase(self) -> Phase {
        match self {
            Stage::MiningSuccess => Phase::MiningSuccess,
            Stage::Validation => Phase::Validation,
            Stage::Propagation => Phase::Propagation,
            Stage::Consensus => Phase::Consensus,
            Stage::Finalization => Phase::Finalization,
        }
    }
}

/// At most one block is ever in flight: either being hashed or walking
/// through the ceremony.
#[derive(Debug, Clone, PartialEq)]
pub enum Lifecycle {
    Idle,
    Mining(Block),
    Ceremony { stage: Stage, block: Block },
}

impl Lifecycle {
    pub fn phase(&self) -> Phase {
        match self {
            Lifecycle::Idle => Phase::Idle,
            Lifecycle::Mining(_) => Phase::Mining,
            Lifecycle::Ceremony { stage, .. } => stage.phase(),
        }
    }

    pub fn block(&self) -> Option<&Block> {
        match self {
            Lifecycle::Idle => None,
            Lifecycle::Mining(block) | Lifecycle::Ceremony { block, .. } => Some(block),
        }
    }

    pub fn is_mining(&self) -> bool {
        matches!(self, Lifecycle::Mining(_))
    }
}

impl Simulation {
    /// Start the full ceremony for a freshly mined block.
    pub(crate) fn begin_ceremony(&mut self, block: Block) {
        info!(
            "block #{} mined (nonce={}, hash={}), starting ceremony",
            block.index,
            block.nonce,
            &block.hash[..16]
        );
        self.lifecycle = Lifecycle::Ceremony {
            stage: Stage::MiningSuccess,
            block,
        };
        self.enter_stage(Stage::MiningSuccess);
    }

    /// Run a stage's entry effects and arm its dwell timer.
    fn enter_stage(&mut self, stage: Stage) {
        debug!("lifecycle -> {}", stage.phase().name());
        match stage {
            Stage::MiningSuccess => {
                for pos in self.network.miner_positions() {
                    self.effects.burst(&mut self.rng, EffectKind::Mining, pos, 16);
                }
            }
            Stage::Validation => {
                self.network.set_validating(true);
                self.network.pulse_all();
                let positions: Vec<_> = self.network.nodes.iter().map(|n| n.position).collect();
                for pos in positions {
                    self.effects.burst(&mut self.rng, EffectKind::Validation, pos, 8);
                }
            }
            Stage::Propagation => {
                let anchor = self.block_anchor();
                let targets: Vec<_> = self
                    .network
                    .nodes
                    .iter()
                    .map(|n| (n.id, n.position))
                    .collect();
                for (id, pos) in targets {
                    self.effects.add_arrow(id, anchor, pos);
                    self.effects
                        .converge(&mut self.rng, anchor, Steer::Node(id), 6);
                    self.network.pulse(id);
                }
            }
            Stage::Consensus => {
                self.network.set_validating(false);
                self.network.pulse_all();
                let anchor = self.block_anchor();
                let positions: Vec<_> = self.network.nodes.iter().map(|n| n.position).collect();
                for pos in positions {
                    self.effects.burst(&mut self.rng, EffectKind::Consensus, pos, 6);
                    // Votes travel back to the block.
                    self.effects
                        .converge(&mut self.rng, pos, Steer::Point(anchor), 2);
                }
            }
            Stage::Finalization => {
                let anchor = self.block_anchor();
                self.effects
                    .burst(&mut self.rng, EffectKind::Finalization, anchor, 24);
            }
        }
        self.schedule(stage.dwell_ms(), Event::AdvanceStage);
    }

    /// Dwell elapsed: move to the next stage, or queue the commit after
    /// finalization.
    pub(crate) fn advance_stage(&mut self) {
        let Lifecycle::Ceremony { stage, .. } = &mut self.lifecycle else {
            debug!("stage timer fired outside a ceremony, ignoring");
            return;
        };
        match stage.next() {
            Some(next) => {
                *stage = next;
                self.enter_stage(next);
            }
            None => self.schedule(COMMIT_DELAY_MS, Event::Commit),
        }
    }

    /// Commit at the end of the full ceremony.
    pub(crate) fn commit_ceremony(&mut self) {
        let block = match std::mem::replace(&mut self.lifecycle, Lifecycle::Idle) {
            Lifecycle::Ceremony {
                stage: Stage::Finalization,
                block,
            } => block,
            other => {
                debug!("commit fired in phase {}, ignoring", other.phase().name());
                self.lifecycle = other;
                return;
            }
        };

        let now = self.now_ms();
        let elapsed_ms = (now - block.timestamp).max(0) as f64;
        let reward = block.reward_total();
        let contracts = block.transactions.iter().filter(|t| t.is_contract()).count();

        if self.append(block) {
            self.block_times_ms.push_back(elapsed_ms);
            while self.block_times_ms.len() > BLOCK_TIME_WINDOW {
                self.block_times_ms.pop_front();
            }
            self.average_block_time_ms =
                self.block_times_ms.iter().sum::<f64>() / self.block_times_ms.len() as f64;
            self.total_rewards += reward;

            let anchor = self.block_anchor();
            for _ in 0..contracts {
                self.effects
                    .burst(&mut self.rng, EffectKind::ContractExecution, anchor, 10);
            }
            self.effects
                .burst(&mut self.rng, EffectKind::BlockCreation, anchor, 30);
            for pos in self.network.miner_positions() {
                self.effects.burst(&mut self.rng, EffectKind::Reward, pos, 8);
            }
        }

        self.add_synthetic_transaction();
        let delay = (200 - i64::from(self.difficulty) * 50).max(10);
        self.schedule(delay, Event::StartMining { replenish: false });
    }

    /// Direct commit for low difficulty: no ceremony, rewards or timing.
    pub(crate) fn commit_fast(&mut self, block: Block) {
        info!(
            "block #{} mined (nonce={}), fast commit",
            block.index, block.nonce
        );
        self.lifecycle = Lifecycle::Idle;
        self.append(block);
        let delay = (50 - i64::from(self.difficulty) * 20).max(5);
        self.schedule(delay, Event::StartMining { replenish: true });
    }

    fn append(&mut self, block: Block) -> bool {
        let index = block.index;
        match self.ledger.append_block(block) {
            Ok(b) => {
                info!(
                    "block #{} committed: {} txs, hash={}",
                    b.index,
                    b.transactions.len(),
                    &b.hash[..16]
                );
                self.total_blocks += 1;
                debug_assert!(self.ledger.is_partitioned());
                true
            }
            Err(e) => {
                warn!("block #{} dropped: {}", index, e);
                false
            }
        }
    }

    pub(crate) fn add_synthetic_transaction(&mut self) {
        let tx = Transaction::synthetic(&mut self.rng);
        debug!("new pending tx {} ({:?})", tx.id, tx.kind);
        self.ledger.push_pending(tx);
        self.total_transactions += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{Phase, Stage};

    #[test]
    fn stages_run_in_fixed_order() {
        let mut order = vec![Stage::MiningSuccess];
        while let Some(next) = order.last().and_then(|s| s.next()) {
            order.push(next);
        }
        let names: Vec<&str> = order.iter().map(|s| s.phase().name()).collect();
        assert_eq!(
            names,
            vec![
                "mining_success",
                "validation",
                "propagation",
                "consensus",
                "finalization"
            ]
        );
    }

    #[test]
    fn every_stage_dwells() {
        for stage in [
            Stage::MiningSuccess,
            Stage::Validation,
            Stage::Propagation,
            Stage::Consensus,
            Stage::Finalization,
        ] {
            assert!(stage.dwell_ms() > 0);
        }
        assert_eq!(Phase::Idle.name(), "idle");
    }
}
