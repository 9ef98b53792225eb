pub mod block;
pub mod hash;
pub mod model;

pub use block::Block;
pub use model::Ledger;

/// Starting proof-of-work difficulty (leading zero characters).
pub const DEFAULT_DIFFICULTY: u32 = 2;

/// Difficulty bounds. The digest only carries 32 bits of entropy, so keep it low.
pub const DIFF_MIN: u32 = 1;
pub const DIFF_MAX: u32 = 6;

/// Difficulties up to this value skip the validation/propagation/consensus ceremony.
pub const FAST_PATH_MAX_DIFFICULTY: u32 = 3;

/// Fixed block subsidy.
pub const BLOCK_REWARD: f64 = 6.25;

/// Transactions taken from the front of the pool per block.
pub const MAX_TXS_PER_BLOCK: usize = 3;

/// How many recent block times feed the average.
pub const BLOCK_TIME_WINDOW: usize = 10;
