use crate::blockchain::Block;
use crate::engine::{Simulation, Stats};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Shared application state: the one simulation, ticked in the background
/// and read by the renderer through the routes below.
pub struct AppState {
    pub simulation: Mutex<Simulation>,
}

impl AppState {
    pub fn new(simulation: Simulation) -> Self {
        Self {
            simulation: Mutex::new(simulation),
        }
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse<'a> {
    pub length: usize,
    pub difficulty: u32,
    pub valid: bool,
    pub chain: &'a [Block],
}

#[derive(Serialize)]
pub struct MempoolResponse<'a> {
    pub size: usize,
    pub transactions: &'a [Transaction],
}

/* ---------- Control API Models ---------- */

#[derive(Serialize, Deserialize)]
pub struct DifficultyResponse {
    pub difficulty: u32,
}

#[derive(Deserialize)]
pub struct SetDifficultyRequest {
    pub difficulty: u32,
}

#[derive(Serialize, Deserialize)]
pub struct SpeedResponse {
    pub speed: f64,
}

#[derive(Deserialize)]
pub struct SetSpeedRequest {
    pub speed: f64,
}

/// Partial update of the renderer toggles; absent fields are left alone.
#[derive(Deserialize, Default)]
pub struct DisplayRequest {
    pub show_hashes: Option<bool>,
    pub show_mining: Option<bool>,
    pub show_network: Option<bool>,
    pub auto_mine: Option<bool>,
}

#[derive(Serialize)]
pub struct ResetResponse {
    pub reset: bool,
    pub stats: Stats,
}
