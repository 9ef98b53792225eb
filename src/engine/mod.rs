pub mod clock;
pub mod lifecycle;
pub mod mining;
pub mod network;
pub mod particles;
pub mod schedule;
pub mod stats;

use std::collections::{BTreeMap, VecDeque};

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::blockchain::{Block, DEFAULT_DIFFICULTY, DIFF_MAX, DIFF_MIN, Ledger};
use crate::transaction::{Transaction, genesis_transactions, seed_transactions};
use clock::{Clock, SystemClock};
use lifecycle::{Lifecycle, Phase};
use network::{Miner, Network, NetworkConfig, NetworkNode};
use particles::{EffectKind, Effects, ParticleView, PropagationArrow};
use schedule::{Event, Scheduler};

pub use stats::Stats;

/// Wall-clock time a leaving node keeps drifting before it is removed.
pub const NODE_LEAVE_ANIMATION_MS: i64 = 1_500;
/// Block highlight lost per scaled second.
const GLOW_DECAY_PER_SEC: f64 = 0.5;

/// Plain 2D point/vector in scene units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(self, k: f64) -> Vec2 {
        Vec2::new(self.x * k, self.y * k)
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Unit vector, or zero for a zero vector.
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len > f64::EPSILON {
            self.scale(1.0 / len)
        } else {
            Vec2::ZERO
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Size of the drawing surface; only used to place the network.
    pub scene_width: f64,
    pub scene_height: f64,
    pub default_difficulty: u32,
    pub network: NetworkConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scene_width: 1200.0,
            scene_height: 800.0,
            default_difficulty: DEFAULT_DIFFICULTY,
            network: NetworkConfig {
                min_nodes: 4,
                max_nodes: 12,
                initial_nodes: 8,
                join_interval_ms: 8_000,
                leave_interval_ms: 11_000,
                redistribute_interval_ms: 1_200,
            },
        }
    }
}

/// Renderer toggles. Stored and echoed back; the simulation ignores them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayOptions {
    pub show_hashes: bool,
    pub show_mining: bool,
    pub show_network: bool,
    pub auto_mine: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_hashes: true,
            show_mining: true,
            show_network: true,
            auto_mine: true,
        }
    }
}

/// Read-only view of one frame for the renderer.
#[derive(Debug, Serialize)]
pub struct Scene<'a> {
    pub phase: Phase,
    pub difficulty: u32,
    pub speed: f64,
    pub display: DisplayOptions,
    pub blocks: &'a [Block],
    pub pending: &'a [Transaction],
    pub mining_block: Option<&'a Block>,
    pub nodes: &'a [NetworkNode],
    pub miners: &'a [Miner],
    pub particles: BTreeMap<EffectKind, Vec<ParticleView>>,
    pub arrows: &'a [PropagationArrow],
}

/// The whole simulation, owned by whoever drives `update`.
pub struct Simulation {
    config: EngineConfig,
    clock: Box<dyn Clock>,
    rng: StdRng,
    scheduler: Scheduler,
    epoch: u64,
    pub(crate) ledger: Ledger,
    pub(crate) network: Network,
    pub(crate) effects: Effects,
    pub(crate) lifecycle: Lifecycle,
    difficulty: u32,
    speed: f64,
    display: DisplayOptions,
    total_blocks: u64,
    total_transactions: u64,
    total_rewards: f64,
    block_times_ms: VecDeque<f64>,
    average_block_time_ms: f64,
}

impl Simulation {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock), StdRng::from_entropy())
    }

    /// Build with an explicit wall clock and RNG, then start mining.
    pub fn with_clock(config: EngineConfig, clock: Box<dyn Clock>, rng: StdRng) -> Self {
        let now = clock.now_ms();
        let (ledger, network) = Self::fresh_world(&config, 1, now);
        let difficulty = config.default_difficulty.clamp(DIFF_MIN, DIFF_MAX);
        let mut sim = Self {
            total_transactions: ledger.last_block().transactions.len() as u64,
            config,
            clock,
            rng,
            scheduler: Scheduler::new(),
            epoch: 0,
            ledger,
            network,
            effects: Effects::new(),
            lifecycle: Lifecycle::Idle,
            difficulty,
            speed: 1.0,
            display: DisplayOptions::default(),
            total_blocks: 1,
            total_rewards: 0.0,
            block_times_ms: VecDeque::new(),
            average_block_time_ms: 0.0,
        };
        sim.start_mining();
        sim
    }

    fn fresh_world(config: &EngineConfig, next_node_id: u32, now: i64) -> (Ledger, Network) {
        let genesis = Block::genesis(now, genesis_transactions());
        let ledger = Ledger::new(genesis, seed_transactions());

        let (w, h) = (config.scene_width, config.scene_height);
        let center = Vec2::new(w / 2.0, h * 0.6);
        let radius = w.min(h) * 0.28;
        let network = Network::new(config.network.clone(), center, radius, next_node_id, now);
        (ledger, network)
    }

    pub(crate) fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub(crate) fn schedule(&mut self, delay_ms: i64, event: Event) {
        let now = self.now_ms();
        self.scheduler.schedule(now, delay_ms, self.epoch, event);
    }

    /// Where committed blocks appear on screen.
    pub(crate) fn block_anchor(&self) -> Vec2 {
        Vec2::new(self.config.scene_width / 2.0, self.config.scene_height * 0.12)
    }

    /// Advance one frame. Due wall-clock events run first, then the
    /// speed-scaled updates: network, mining, effects, pulses, glow, stats.
    pub fn update(&mut self, delta_time: f64) {
        let now = self.now_ms();
        self.run_due_events(now);

        let dt = delta_time.max(0.0) * self.speed;

        if let Some(id) = self
            .network
            .step_membership(now, &mut self.rng, &mut self.effects)
        {
            self.schedule(NODE_LEAVE_ANIMATION_MS, Event::RemoveNode(id));
        }
        self.network.animate(dt);

        if self.lifecycle.is_mining() {
            self.mine_block();
        }

        let network = &self.network;
        self.effects.update(dt, |id| network.node_position(id));

        self.network.decay_pulses(dt);
        self.ledger.decay_glow(dt * GLOW_DECAY_PER_SEC);
        self.refresh_statistics();
    }

    fn run_due_events(&mut self, now: i64) {
        while let Some((epoch, event)) = self.scheduler.pop_due(now) {
            if epoch != self.epoch {
                debug!("dropping {:?} from epoch {}", event, epoch);
                continue;
            }
            self.dispatch(event);
        }
    }

    fn dispatch(&mut self, event: Event) {
        debug!("event {:?}", event);
        match event {
            Event::AdvanceStage => self.advance_stage(),
            Event::Commit => self.commit_ceremony(),
            Event::StartMining { replenish } => {
                if replenish {
                    self.add_synthetic_transaction();
                }
                self.start_mining();
            }
            Event::RemoveNode(id) => {
                self.network.evict(id);
            }
        }
    }

    fn refresh_statistics(&mut self) {
        let nonce = self.lifecycle.block().map(|b| b.nonce);
        let rate = self.per_miner_hash_rate();
        self.network.refresh_miners(nonce, rate);
    }

    /// Scale for physics and mining throughput. Rejects non-positive values.
    pub fn set_speed(&mut self, speed: f64) -> bool {
        if !speed.is_finite() || speed <= 0.0 {
            return false;
        }
        self.speed = speed;
        info!("speed set to {}", speed);
        true
    }

    /// Change the target for subsequent attempts. The in-flight block keeps
    /// its nonce; its hash is refreshed and rechecked on the next tick.
    pub fn set_difficulty(&mut self, difficulty: u32) -> u32 {
        self.difficulty = difficulty.clamp(DIFF_MIN, DIFF_MAX);
        if let Lifecycle::Mining(block) = &mut self.lifecycle {
            block.hash = block.compute_hash();
        }
        info!("difficulty set to {}", self.difficulty);
        self.difficulty
    }

    pub fn set_show_hashes(&mut self, on: bool) {
        self.display.show_hashes = on;
    }

    pub fn set_show_mining(&mut self, on: bool) {
        self.display.show_mining = on;
    }

    pub fn set_show_network(&mut self, on: bool) {
        self.display.show_network = on;
    }

    pub fn set_auto_mine(&mut self, on: bool) {
        self.display.auto_mine = on;
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn display(&self) -> DisplayOptions {
        self.display
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Back to a freshly constructed state. Events already queued belong to
    /// the old epoch and are dropped when they come due.
    pub fn reset(&mut self) {
        self.epoch += 1;
        let now = self.now_ms();
        let (ledger, network) = Self::fresh_world(&self.config, self.network.next_id(), now);
        self.total_transactions = ledger.last_block().transactions.len() as u64;
        self.ledger = ledger;
        self.network = network;
        self.effects.clear();
        self.lifecycle = Lifecycle::Idle;
        self.difficulty = self.config.default_difficulty.clamp(DIFF_MIN, DIFF_MAX);
        self.speed = 1.0;
        self.display = DisplayOptions::default();
        self.total_blocks = 1;
        self.total_rewards = 0.0;
        self.block_times_ms.clear();
        self.average_block_time_ms = 0.0;
        info!(
            "simulation reset (epoch {}, {} queued events now stale)",
            self.epoch,
            self.scheduler.len()
        );
        self.start_mining();
    }

    pub fn scene(&self) -> Scene<'_> {
        Scene {
            phase: self.lifecycle.phase(),
            difficulty: self.difficulty,
            speed: self.speed,
            display: self.display,
            blocks: &self.ledger.chain,
            pending: &self.ledger.pending,
            mining_block: self.lifecycle.block(),
            nodes: &self.network.nodes,
            miners: &self.network.miners,
            particles: self.effects.views(),
            arrows: &self.effects.arrows,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::clock::ManualClock;
    use super::lifecycle::{COMMIT_DELAY_MS, Lifecycle, Phase};
    use super::*;

    const START_MS: i64 = 1_700_000_000_000;
    const FRAME_MS: i64 = 16;

    pub(crate) fn sim_with_clock() -> (Simulation, ManualClock) {
        let clock = ManualClock::starting_at(START_MS);
        let sim = Simulation::with_clock(
            EngineConfig::default(),
            Box::new(clock.clone()),
            StdRng::seed_from_u64(42),
        );
        (sim, clock)
    }

    pub(crate) fn sim() -> Simulation {
        sim_with_clock().0
    }

    fn frame(sim: &mut Simulation, clock: &ManualClock) {
        clock.advance(FRAME_MS);
        sim.update(FRAME_MS as f64 / 1000.0);
    }

    /// Run frames until the chain grows, recording every phase change.
    fn run_until_commit(sim: &mut Simulation, clock: &ManualClock, max_frames: usize) -> Vec<Phase> {
        let start_len = sim.ledger.len();
        let mut seen = vec![sim.phase()];
        for _ in 0..max_frames {
            frame(sim, clock);
            if seen.last() != Some(&sim.phase()) {
                seen.push(sim.phase());
            }
            if sim.ledger.len() > start_len {
                return seen;
            }
        }
        panic!("no block committed within {max_frames} frames");
    }

    #[test]
    fn vec2_basics() {
        let v = Vec2::new(3.0, 4.0);
        assert_eq!(v.length(), 5.0);
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
        assert!((v.normalized().length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn construction_starts_mining() {
        let s = sim();
        assert_eq!(s.phase(), Phase::Mining);
        assert_eq!(s.ledger.len(), 1);
        assert!(s.ledger.chain[0].is_genesis);
        assert_eq!(s.difficulty(), DEFAULT_DIFFICULTY);
    }

    #[test]
    fn difficulty_is_clamped() {
        let mut s = sim();
        assert_eq!(s.set_difficulty(0), DIFF_MIN);
        assert_eq!(s.set_difficulty(99), DIFF_MAX);
    }

    #[test]
    fn speed_must_be_positive() {
        let mut s = sim();
        assert!(!s.set_speed(0.0));
        assert!(!s.set_speed(-1.0));
        assert!(!s.set_speed(f64::NAN));
        assert!(s.set_speed(2.5));
        assert_eq!(s.speed(), 2.5);
    }

    #[test]
    fn display_toggles_are_stored() {
        let mut s = sim();
        s.set_show_hashes(false);
        s.set_show_mining(false);
        s.set_show_network(false);
        s.set_auto_mine(false);
        assert_eq!(
            s.display(),
            DisplayOptions {
                show_hashes: false,
                show_mining: false,
                show_network: false,
                auto_mine: false,
            }
        );
    }

    #[test]
    fn low_difficulty_skips_the_ceremony() {
        let (mut s, clock) = sim_with_clock();
        s.set_difficulty(3);
        let seen = run_until_commit(&mut s, &clock, 20_000);
        for skipped in [Phase::MiningSuccess, Phase::Validation, Phase::Propagation, Phase::Consensus] {
            assert!(!seen.contains(&skipped), "saw {:?}", skipped);
        }
        assert_eq!(s.total_rewards, 0.0);
        assert!(s.block_times_ms.is_empty());
    }

    #[test]
    fn fast_path_restarts_mining_with_a_new_transaction() {
        let (mut s, clock) = sim_with_clock();
        s.set_difficulty(1);
        assert!(s.mine_block());
        let pending = s.ledger.pending.len();
        assert_eq!(s.phase(), Phase::Idle);

        // Keep the restarted attempt from succeeding inside the same frame.
        s.set_difficulty(6);
        s.set_speed(0.01);
        clock.advance(30);
        s.update(0.0);
        assert_eq!(s.ledger.pending.len(), pending + 1);
        assert_eq!(s.stats().transactions, 4);
        assert_eq!(s.phase(), Phase::Mining);
    }

    #[test]
    fn high_difficulty_walks_every_stage() {
        let (mut s, clock) = sim_with_clock();
        s.set_difficulty(4);
        s.set_speed(10.0);
        let seen = run_until_commit(&mut s, &clock, 50_000);

        let stages: Vec<Phase> = seen
            .into_iter()
            .filter(|p| !matches!(p, Phase::Idle))
            .collect();
        assert_eq!(
            stages,
            vec![
                Phase::Mining,
                Phase::MiningSuccess,
                Phase::Validation,
                Phase::Propagation,
                Phase::Consensus,
                Phase::Finalization,
            ]
        );
        assert_eq!(s.phase(), Phase::Idle);
        assert!(s.total_rewards > 0.0);
        assert_eq!(s.block_times_ms.len(), 1);
        assert!(s.stats().average_block_time > 0.0);
        assert!(s.ledger.is_partitioned());
        assert!(s.ledger.last_block().hash.starts_with("0000"));

        s.set_difficulty(6);
        s.set_speed(0.01);
        for _ in 0..20 {
            frame(&mut s, &clock);
        }
        assert_eq!(s.phase(), Phase::Mining);
    }

    #[test]
    fn stage_timers_ignore_speed() {
        let (mut s, clock) = sim_with_clock();
        s.set_difficulty(4);
        let Lifecycle::Mining(mut block) = std::mem::replace(&mut s.lifecycle, Lifecycle::Idle)
        else {
            panic!("expected mining");
        };
        while !block.try_next_nonce(4) {}
        block.difficulty = 4;
        let contracts = block.transactions.iter().filter(|t| t.is_contract()).count();
        assert_eq!(contracts, 1);
        s.begin_ceremony(block);
        assert_eq!(s.phase(), Phase::MiningSuccess);
        assert_eq!(
            s.effects.count(EffectKind::Mining),
            16 * s.network.miners.len()
        );
        s.set_speed(50.0);

        clock.advance(1_199);
        s.update(5.0);
        assert_eq!(s.phase(), Phase::MiningSuccess);
        clock.advance(1);
        s.update(0.0);
        assert_eq!(s.phase(), Phase::Validation);
        assert!(s.network.nodes.iter().all(|n| n.is_validating || n.membership == network::Membership::Leaving));
        assert!(s.effects.count(EffectKind::Validation) > 0);

        clock.advance(1_500);
        s.update(0.0);
        assert_eq!(s.phase(), Phase::Propagation);
        assert_eq!(s.effects.arrows.len(), s.network.len());
        assert!(s.effects.count(EffectKind::Network) > 0);

        clock.advance(1_800);
        s.update(0.0);
        assert_eq!(s.phase(), Phase::Consensus);
        assert!(s.network.nodes.iter().all(|n| !n.is_validating));
        assert!(s.effects.count(EffectKind::Consensus) > 0);

        clock.advance(1_500);
        s.update(0.0);
        assert_eq!(s.phase(), Phase::Finalization);
        assert_eq!(s.effects.count(EffectKind::Finalization), 24);
        assert_eq!(s.effects.count(EffectKind::BlockCreation), 0);

        // Finalization dwell, then the extra commit delay.
        clock.advance(1_000);
        s.update(0.0);
        assert_eq!(s.phase(), Phase::Finalization);
        assert_eq!(s.ledger.len(), 1);
        clock.advance(COMMIT_DELAY_MS);
        s.update(0.0);
        assert_eq!(s.ledger.len(), 2);
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(
            s.effects.count(EffectKind::ContractExecution),
            10 * contracts
        );
        assert_eq!(s.effects.count(EffectKind::BlockCreation), 30);
        assert_eq!(
            s.effects.count(EffectKind::Reward),
            8 * s.network.miners.len()
        );
    }

    #[test]
    fn chain_stays_linked_across_many_frames() {
        let (mut s, clock) = sim_with_clock();
        s.set_difficulty(2);
        for i in 0..4_000 {
            if i == 2_000 {
                s.set_difficulty(1);
            }
            frame(&mut s, &clock);
        }
        assert!(s.ledger.len() > 3);
        assert!(s.ledger.is_valid_chain());
        assert!(s.ledger.is_partitioned());
        for pair in s.ledger.chain.windows(2) {
            assert_eq!(pair[1].previous_hash, pair[0].hash);
            assert!(pair[1].hash.starts_with(&"0".repeat(pair[1].difficulty as usize)));
            assert!(pair[1].difficulty >= 1);
        }
        assert_eq!(s.stats().blocks as u64, s.total_blocks);
    }

    #[test]
    fn node_count_stays_in_bounds() {
        let (mut s, clock) = sim_with_clock();
        let cfg = EngineConfig::default().network;
        let mut saw_join = false;
        let mut saw_leave = false;
        for _ in 0..8_000 {
            clock.advance(500);
            s.update(0.5);
            let n = s.network.len();
            assert!(n >= cfg.min_nodes && n <= cfg.max_nodes, "{n} nodes");
            saw_join |= s.network.nodes.iter().any(|n| n.membership == network::Membership::Joining);
            saw_leave |= s.network.nodes.iter().any(|n| n.membership == network::Membership::Leaving);
        }
        assert!(saw_join && saw_leave);
        assert_eq!(s.network.miners.len(), 3);
        for miner in &s.network.miners {
            assert!(s.network.node(miner.node_id).is_some());
        }
    }

    #[test]
    fn no_expired_particle_survives_an_update() {
        let (mut s, clock) = sim_with_clock();
        s.set_difficulty(4);
        s.set_speed(10.0);
        for _ in 0..3_000 {
            frame(&mut s, &clock);
            for layer in s.effects.views().values() {
                assert!(layer.iter().all(|p| p.life_fraction > 0.0));
            }
            assert!(s.effects.arrows.iter().all(|a| a.progress < 1.0));
        }
    }

    #[test]
    fn reset_matches_fresh_state_and_drops_stale_events() {
        let (mut s, clock) = sim_with_clock();
        s.set_difficulty(4);
        s.set_speed(10.0);
        for _ in 0..20_000 {
            frame(&mut s, &clock);
            if matches!(s.phase(), Phase::Validation) {
                break;
            }
        }
        s.set_show_network(false);
        s.reset();

        let fresh = sim().stats();
        let after = s.stats();
        assert_eq!(after.blocks, fresh.blocks);
        assert_eq!(after.transactions, fresh.transactions);
        assert_eq!(after.pending, fresh.pending);
        assert_eq!(after.nodes, fresh.nodes);
        assert_eq!(after.difficulty, fresh.difficulty);
        assert_eq!(s.difficulty(), DEFAULT_DIFFICULTY);
        assert_eq!(s.speed(), 1.0);
        assert!(s.display().show_network);
        assert_eq!(s.effects.total(), 0);
        assert_eq!(s.phase(), Phase::Mining);

        // Old stage timers come due but must not drive the new lifecycle.
        s.set_difficulty(6);
        s.set_speed(0.01);
        for _ in 0..5 {
            clock.advance(2_000);
            s.update(0.0);
        }
        assert!(!matches!(
            s.phase(),
            Phase::Propagation | Phase::Consensus | Phase::Finalization
        ));
        assert!(s.ledger.len() <= 2);
    }

    #[test]
    fn node_ids_are_never_reused_after_reset() {
        let mut s = sim();
        let max_before = s.network.nodes.iter().map(|n| n.id).max().unwrap();
        s.reset();
        let min_after = s.network.nodes.iter().map(|n| n.id).min().unwrap();
        assert!(min_after > max_before);
    }

    #[test]
    fn scene_snapshot_serializes() {
        let (mut s, clock) = sim_with_clock();
        for _ in 0..10 {
            frame(&mut s, &clock);
        }
        let json = serde_json::to_value(s.scene()).unwrap();
        assert_eq!(json["blocks"].as_array().unwrap().len(), s.ledger.len());
        assert_eq!(json["nodes"].as_array().unwrap().len(), s.network.len());
        assert!(json["display"]["auto_mine"].as_bool().unwrap());
        assert!(json["particles"].is_object());
    }
}
