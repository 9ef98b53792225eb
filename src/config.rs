use std::env;
use std::str::FromStr;

use crate::blockchain::DEFAULT_DIFFICULTY;
use crate::engine::EngineConfig;
use crate::engine::network::MINER_COUNT;

/// Runtime settings, read from the environment (after `.env`).
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub host: String,
    pub port: u16,
    pub tick_interval_ms: u64,
    pub engine: EngineConfig,
}

impl SimConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Missing or unparsable values fall back to
    /// their defaults; node bounds are made consistent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key);
        let mut engine = EngineConfig::default();

        engine.scene_width = parse_dimension(get("SCENE_WIDTH"), engine.scene_width);
        engine.scene_height = parse_dimension(get("SCENE_HEIGHT"), engine.scene_height);
        engine.default_difficulty = parse_or(get("DEFAULT_DIFFICULTY"), DEFAULT_DIFFICULTY);

        let net = &mut engine.network;
        net.min_nodes = parse_or(get("MIN_NODES"), net.min_nodes).max(1);
        net.max_nodes = parse_or(get("MAX_NODES"), net.max_nodes)
            .max(net.min_nodes)
            .max(MINER_COUNT);
        net.initial_nodes = parse_or(get("INITIAL_NODES"), net.initial_nodes)
            .max(net.min_nodes)
            .max(MINER_COUNT)
            .min(net.max_nodes);
        net.join_interval_ms = parse_or(get("NODE_JOIN_INTERVAL_MS"), net.join_interval_ms);
        net.leave_interval_ms = parse_or(get("NODE_LEAVE_INTERVAL_MS"), net.leave_interval_ms);
        net.redistribute_interval_ms =
            parse_or(get("REDISTRIBUTE_INTERVAL_MS"), net.redistribute_interval_ms);

        Self {
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(get("PORT"), 8080),
            tick_interval_ms: parse_or(get("TICK_INTERVAL_MS"), 16u64).max(1),
            engine,
        }
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Scene sizes must be finite; `inf` and `NaN` parse but fall back.
fn parse_dimension(raw: Option<String>, default: f64) -> f64 {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
        .max(1.0)
}
