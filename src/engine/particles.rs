use std::collections::BTreeMap;
use std::f64::consts::TAU;

use rand::Rng;
use serde::Serialize;

use super::Vec2;

/// Separate collections the renderer draws in its own style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Mining,
    Validation,
    Network,
    ContractExecution,
    BlockCreation,
    Consensus,
    Finalization,
    Reward,
    NodeJoin,
    NodeLeave,
}

impl EffectKind {
    /// Downward acceleration in units/s²; `None` for steered particles.
    fn gravity(self) -> Option<f64> {
        match self {
            EffectKind::Network => None,
            EffectKind::Validation | EffectKind::Consensus | EffectKind::NodeJoin => Some(20.0),
            EffectKind::ContractExecution => Some(25.0),
            EffectKind::Mining | EffectKind::Finalization => Some(30.0),
            EffectKind::Reward => Some(35.0),
            EffectKind::BlockCreation | EffectKind::NodeLeave => Some(40.0),
        }
    }

    fn color(self) -> &'static str {
        match self {
            EffectKind::Mining => "#f7931a",
            EffectKind::Validation => "#4ade80",
            EffectKind::Network => "#38bdf8",
            EffectKind::ContractExecution => "#a855f7",
            EffectKind::BlockCreation => "#facc15",
            EffectKind::Consensus => "#22d3ee",
            EffectKind::Finalization => "#f472b6",
            EffectKind::Reward => "#fbbf24",
            EffectKind::NodeJoin => "#34d399",
            EffectKind::NodeLeave => "#f87171",
        }
    }

    /// (min, max) lifetime in seconds.
    fn lifetime(self) -> (f64, f64) {
        match self {
            EffectKind::Network => (1.2, 1.8),
            EffectKind::BlockCreation | EffectKind::Reward => (1.5, 2.5),
            EffectKind::NodeJoin | EffectKind::NodeLeave => (0.8, 1.4),
            _ => (1.0, 2.0),
        }
    }

    /// (min, max) launch speed in units/s.
    fn launch_speed(self) -> (f64, f64) {
        match self {
            EffectKind::BlockCreation | EffectKind::Reward => (60.0, 140.0),
            EffectKind::Mining => (40.0, 110.0),
            _ => (25.0, 80.0),
        }
    }
}

/// Where a steered particle is heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Steer {
    Point(Vec2),
    Node(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub life: f64,
    pub max_life: f64,
    pub color: &'static str,
    pub size: f64,
    pub steer: Option<Steer>,
}

/// Directed arrow from a block anchor to a node, drawn by interpolation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropagationArrow {
    pub node_id: u32,
    pub from: Vec2,
    pub to: Vec2,
    pub progress: f64,
}

/// What the renderer receives for one particle.
#[derive(Debug, Clone, Serialize)]
pub struct ParticleView {
    pub x: f64,
    pub y: f64,
    pub color: &'static str,
    pub size: f64,
    pub life_fraction: f64,
}

/// Speed of broadcast particles converging on their target.
const STEER_SPEED: f64 = 160.0;
/// Arrow progress per second of scaled time.
const ARROW_RATE: f64 = 0.8;

/// All transient effects. Nothing here feeds back into the simulation.
#[derive(Debug, Default)]
pub struct Effects {
    layers: BTreeMap<EffectKind, Vec<Particle>>,
    pub arrows: Vec<PropagationArrow>,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Radial burst of `count` particles around `origin`.
    pub fn burst<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        kind: EffectKind,
        origin: Vec2,
        count: usize,
    ) {
        let (life_lo, life_hi) = kind.lifetime();
        let (speed_lo, speed_hi) = kind.launch_speed();
        let layer = self.layers.entry(kind).or_default();
        for _ in 0..count {
            let angle = rng.gen_range(0.0..TAU);
            let speed = rng.gen_range(speed_lo..speed_hi);
            let life = rng.gen_range(life_lo..life_hi);
            layer.push(Particle {
                position: origin,
                velocity: Vec2::new(angle.cos() * speed, angle.sin() * speed),
                life,
                max_life: life,
                color: kind.color(),
                size: rng.gen_range(2.0..5.0),
                steer: None,
            });
        }
    }

    /// Broadcast particles scattered around `origin`, converging on `target`.
    pub fn converge<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        origin: Vec2,
        target: Steer,
        count: usize,
    ) {
        let kind = EffectKind::Network;
        let (life_lo, life_hi) = kind.lifetime();
        let layer = self.layers.entry(kind).or_default();
        for _ in 0..count {
            let jitter = Vec2::new(rng.gen_range(-20.0..20.0), rng.gen_range(-20.0..20.0));
            let life = rng.gen_range(life_lo..life_hi);
            layer.push(Particle {
                position: origin.add(jitter),
                velocity: Vec2::ZERO,
                life,
                max_life: life,
                color: kind.color(),
                size: rng.gen_range(2.0..4.0),
                steer: Some(target),
            });
        }
    }

    pub fn add_arrow(&mut self, node_id: u32, from: Vec2, to: Vec2) {
        self.arrows.push(PropagationArrow {
            node_id,
            from,
            to,
            progress: 0.0,
        });
    }

    /// Advance every particle and arrow by `dt` scaled seconds and drop the
    /// expired ones. `node_position` resolves moving steer targets.
    pub fn update<F>(&mut self, dt: f64, node_position: F)
    where
        F: Fn(u32) -> Option<Vec2>,
    {
        for (kind, layer) in self.layers.iter_mut() {
            let gravity = kind.gravity();
            for p in layer.iter_mut() {
                p.life -= dt;
                match (gravity, p.steer) {
                    (Some(g), _) => {
                        p.velocity.y += g * dt;
                    }
                    (None, Some(steer)) => {
                        let target = match steer {
                            Steer::Point(point) => Some(point),
                            Steer::Node(id) => node_position(id),
                        };
                        if let Some(target) = target {
                            let to_target = target.sub(p.position);
                            if to_target.length() > 1.0 {
                                p.velocity = to_target.normalized().scale(STEER_SPEED);
                            } else {
                                p.velocity = Vec2::ZERO;
                            }
                        }
                    }
                    (None, None) => {}
                }
                p.position = p.position.add(p.velocity.scale(dt));
            }
            layer.retain(|p| p.life > 0.0);
        }

        for arrow in self.arrows.iter_mut() {
            arrow.progress += ARROW_RATE * dt;
        }
        self.arrows.retain(|a| a.progress < 1.0);
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.arrows.clear();
    }

    pub fn views(&self) -> BTreeMap<EffectKind, Vec<ParticleView>> {
        self.layers
            .iter()
            .map(|(kind, layer)| {
                let views = layer
                    .iter()
                    .map(|p| ParticleView {
                        x: p.position.x,
                        y: p.position.y,
                        color: p.color,
                        size: p.size,
                        life_fraction: (p.life / p.max_life).clamp(0.0, 1.0),
                    })
                    .collect();
                (*kind, views)
            })
            .collect()
    }
}

#[cfg(test)]
impl Effects {
    pub fn count(&self, kind: EffectKind) -> usize {
        self.layers.get(&kind).map_or(0, Vec::len)
    }

    pub fn total(&self) -> usize {
        self.layers.values().map(Vec::len).sum::<usize>() + self.arrows.len()
    }

    pub fn layer(&self, kind: EffectKind) -> &[Particle] {
        self.layers.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}
