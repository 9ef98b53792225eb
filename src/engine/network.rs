use std::f64::consts::TAU;

use log::{debug, info};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use super::Vec2;
use super::particles::{EffectKind, Effects};

/// Nodes created at start-up that also act as miners.
pub const MINER_COUNT: usize = 3;

/// Fraction of the remaining distance covered per tick while moving.
const APPROACH: f64 = 0.08;
/// Scaled seconds a join or a redistribution move lasts.
const SETTLE_SECONDS: f64 = 1.5;
/// Outward drift per tick while leaving.
const LEAVE_DRIFT: f64 = 2.0;
const LEAVE_FADE_SECONDS: f64 = 1.5;
/// Joining nodes appear this far out, relative to the layout radius.
const SPAWN_DISTANCE: f64 = 2.5;
const PULSE_DECAY_PER_SEC: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    Steady,
    Joining,
    Leaving,
    Redistributing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkNode {
    pub id: u32,
    pub position: Vec2,
    pub target: Vec2,
    pub angle: f64,
    pub is_mining: bool,
    pub is_validating: bool,
    pub is_active: bool,
    pub membership: Membership,
    pub progress: f64,
    pub opacity: f64,
    pub pulse: f64,
}

impl NetworkNode {
    fn settle(&mut self) {
        self.position = self.target;
        self.membership = Membership::Steady;
        self.progress = 1.0;
        self.is_active = true;
    }
}

/// Mining bookkeeping for one of the miner nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Miner {
    pub node_id: u32,
    pub nonce: u64,
    pub hash_rate: u64,
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub min_nodes: usize,
    pub max_nodes: usize,
    pub initial_nodes: usize,
    pub join_interval_ms: i64,
    pub leave_interval_ms: i64,
    pub redistribute_interval_ms: i64,
}

/// Simulated peer set. Membership changes on wall-clock timers; motion
/// advances with scaled tick time.
#[derive(Debug)]
pub struct Network {
    pub nodes: Vec<NetworkNode>,
    pub miners: Vec<Miner>,
    pub center: Vec2,
    pub radius: f64,
    config: NetworkConfig,
    next_id: u32,
    last_join_ms: i64,
    last_leave_ms: i64,
    last_layout_ms: i64,
}

impl Network {
    /// Lay out `initial_nodes` steady nodes on a circle; the first
    /// [`MINER_COUNT`] are miners. `next_id` keeps ids unique across resets.
    pub fn new(config: NetworkConfig, center: Vec2, radius: f64, next_id: u32, now_ms: i64) -> Self {
        let mut net = Self {
            nodes: Vec::with_capacity(config.max_nodes),
            miners: Vec::with_capacity(MINER_COUNT),
            center,
            radius,
            config,
            next_id,
            last_join_ms: now_ms,
            last_leave_ms: now_ms,
            last_layout_ms: now_ms,
        };

        let count = net.config.initial_nodes;
        for i in 0..count {
            let angle = i as f64 * TAU / count as f64;
            let position = net.ring_point(angle, 1.0);
            let id = net.allocate_id();
            let is_mining = i < MINER_COUNT;
            net.nodes.push(NetworkNode {
                id,
                position,
                target: position,
                angle,
                is_mining,
                is_validating: false,
                is_active: true,
                membership: Membership::Steady,
                progress: 1.0,
                opacity: 1.0,
                pulse: 0.0,
            });
            if is_mining {
                net.miners.push(Miner {
                    node_id: id,
                    nonce: 0,
                    hash_rate: 0,
                });
            }
        }
        net
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    fn ring_point(&self, angle: f64, scale: f64) -> Vec2 {
        self.center
            .add(Vec2::new(angle.cos(), angle.sin()).scale(self.radius * scale))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes that are not on their way out.
    pub fn staying_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.membership != Membership::Leaving)
            .count()
    }

    pub fn node(&self, id: u32) -> Option<&NetworkNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_position(&self, id: u32) -> Option<Vec2> {
        self.node(id).map(|n| n.position)
    }

    pub fn miner_positions(&self) -> Vec<Vec2> {
        self.miners
            .iter()
            .filter_map(|m| self.node_position(m.node_id))
            .collect()
    }

    /// First of `max_nodes` evenly spaced sectors that no node sits in.
    fn open_slot_angle(&self) -> f64 {
        let sector = TAU / self.config.max_nodes as f64;
        let taken = |angle: f64| {
            self.nodes.iter().any(|n| {
                let d = (n.angle - angle).rem_euclid(TAU);
                d.min(TAU - d) < sector / 2.0
            })
        };
        (0..self.config.max_nodes)
            .map(|k| k as f64 * sector)
            .find(|a| !taken(*a))
            .unwrap_or(self.nodes.len() as f64 * sector)
    }

    /// Spawn a node off-screen that flies into the next open slot.
    /// Returns false at capacity.
    pub fn add_node<R: Rng + ?Sized>(
        &mut self,
        now_ms: i64,
        rng: &mut R,
        effects: &mut Effects,
    ) -> bool {
        if self.nodes.len() >= self.config.max_nodes {
            return false;
        }
        let angle = self.open_slot_angle();
        let spawn = self.ring_point(angle, SPAWN_DISTANCE);
        let id = self.allocate_id();
        self.nodes.push(NetworkNode {
            id,
            position: spawn,
            target: self.ring_point(angle, 1.0),
            angle,
            is_mining: false,
            is_validating: false,
            is_active: false,
            membership: Membership::Joining,
            progress: 0.0,
            opacity: 1.0,
            pulse: 0.0,
        });
        effects.burst(rng, EffectKind::NodeJoin, spawn, 12);
        self.last_layout_ms = now_ms;
        info!("node {} joining ({} nodes)", id, self.nodes.len());
        true
    }

    /// Mark a random non-mining node as leaving. The caller schedules its
    /// removal. Returns the node id, or `None` when nothing may leave.
    pub fn remove_node<R: Rng + ?Sized>(
        &mut self,
        now_ms: i64,
        rng: &mut R,
        effects: &mut Effects,
    ) -> Option<u32> {
        if self.staying_count() <= self.config.min_nodes {
            return None;
        }
        let candidates: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.is_mining && n.membership != Membership::Leaving)
            .map(|(i, _)| i)
            .collect();
        let idx = *candidates.choose(rng)?;

        let node = &mut self.nodes[idx];
        node.membership = Membership::Leaving;
        node.is_active = false;
        node.is_validating = false;
        node.progress = 0.0;
        let (id, position) = (node.id, node.position);

        effects.burst(rng, EffectKind::NodeLeave, position, 12);
        self.last_layout_ms = now_ms;
        info!("node {} leaving", id);
        Some(id)
    }

    /// Physically drop a node whose exit animation finished.
    pub fn evict(&mut self, id: u32) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != id);
        let removed = self.nodes.len() < before;
        if removed {
            debug!("node {} removed ({} nodes)", id, self.nodes.len());
        }
        removed
    }

    /// Give every settled or moving node a fresh evenly spaced target.
    /// Joining and leaving nodes are left alone.
    pub fn redistribute(&mut self) {
        let movable: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| {
                matches!(n.membership, Membership::Steady | Membership::Redistributing)
            })
            .map(|(i, _)| i)
            .collect();
        let count = movable.len();
        for (slot, idx) in movable.into_iter().enumerate() {
            let angle = slot as f64 * TAU / count as f64;
            let target = self.ring_point(angle, 1.0);
            let node = &mut self.nodes[idx];
            node.angle = angle;
            if node.position.sub(target).length() > 0.5 {
                node.target = target;
                node.membership = Membership::Redistributing;
                node.progress = 0.0;
            }
        }
    }

    /// Fire join/leave/redistribute timers. Returns the id of a node that
    /// started leaving, if any.
    pub fn step_membership<R: Rng + ?Sized>(
        &mut self,
        now_ms: i64,
        rng: &mut R,
        effects: &mut Effects,
    ) -> Option<u32> {
        if now_ms - self.last_join_ms >= self.config.join_interval_ms {
            self.last_join_ms = now_ms;
            self.add_node(now_ms, rng, effects);
        }

        let mut leaving = None;
        if now_ms - self.last_leave_ms >= self.config.leave_interval_ms {
            self.last_leave_ms = now_ms;
            leaving = self.remove_node(now_ms, rng, effects);
        }

        if now_ms - self.last_layout_ms >= self.config.redistribute_interval_ms {
            self.last_layout_ms = now_ms;
            self.redistribute();
        }
        leaving
    }

    /// Per-tick motion, driven by scaled time.
    pub fn animate(&mut self, dt: f64) {
        let center = self.center;
        for node in self.nodes.iter_mut() {
            match node.membership {
                Membership::Joining | Membership::Redistributing => {
                    let remaining = node.target.sub(node.position);
                    node.position = node.position.add(remaining.scale(APPROACH));
                    node.progress += dt / SETTLE_SECONDS;
                    if node.progress >= 1.0 {
                        node.settle();
                    }
                }
                Membership::Leaving => {
                    let outward = node.position.sub(center).normalized();
                    node.position = node.position.add(outward.scale(LEAVE_DRIFT));
                    node.opacity = (node.opacity - dt / LEAVE_FADE_SECONDS).max(0.0);
                }
                Membership::Steady => {}
            }
        }
    }

    pub fn set_validating(&mut self, validating: bool) {
        for node in self.nodes.iter_mut() {
            node.is_validating = validating && node.membership != Membership::Leaving;
        }
    }

    pub fn pulse(&mut self, id: u32) {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
            node.pulse = 1.0;
        }
    }

    pub fn pulse_all(&mut self) {
        for node in self.nodes.iter_mut() {
            node.pulse = 1.0;
        }
    }

    pub fn decay_pulses(&mut self, dt: f64) {
        for node in self.nodes.iter_mut() {
            node.pulse = (node.pulse - dt * PULSE_DECAY_PER_SEC).max(0.0);
        }
    }

    /// Mirror the in-flight nonce and a per-miner rate onto every miner.
    pub fn refresh_miners(&mut self, nonce: Option<u64>, per_miner_rate: u64) {
        for miner in self.miners.iter_mut() {
            if let Some(nonce) = nonce {
                miner.nonce = nonce;
            }
            miner.hash_rate = per_miner_rate;
        }
    }
}
