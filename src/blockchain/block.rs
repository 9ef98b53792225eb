use serde::{Deserialize, Serialize};

use super::hash::{digest_of, meets_difficulty, merkle_root};
use super::BLOCK_REWARD;
use crate::transaction::Transaction;

/// A block of the simulated ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: i64, // wall clock, unix millis
    pub transactions: Vec<Transaction>,
    pub previous_hash: String,
    pub hash: String,
    pub nonce: u64,
    pub merkle_root: String,
    pub is_genesis: bool,
    pub block_reward: f64,
    pub total_fees: f64,
    /// Difficulty in force when the hash was accepted.
    pub difficulty: u32,
    pub glow_intensity: f64,
}

/// The hashed subset of a block, in canonical field order.
#[derive(Serialize)]
struct HashPreimage<'a> {
    index: u64,
    timestamp: i64,
    transactions: &'a [Transaction],
    previous_hash: &'a str,
    merkle_root: &'a str,
    nonce: u64,
}

impl Block {
    /// Create the genesis block (first block in the chain).
    pub fn genesis(timestamp: i64, transactions: Vec<Transaction>) -> Self {
        let mut block = Self::candidate(0, timestamp, String::from("0"), transactions);
        block.is_genesis = true;
        block.block_reward = 0.0;
        block.difficulty = 0;
        block.hash = block.compute_hash();
        block
    }

    /// Create a block that still needs a nonce. Its hash is computed for
    /// nonce 0 so the scene always has something to show. The block holds
    /// confirmed copies; the pool keeps its pending originals until commit.
    pub fn candidate(
        index: u64,
        timestamp: i64,
        previous_hash: String,
        transactions: Vec<Transaction>,
    ) -> Self {
        let transactions: Vec<Transaction> =
            transactions.into_iter().map(Transaction::confirmed).collect();
        let total_fees = transactions.iter().map(|t| t.fee).sum();
        let mut block = Self {
            index,
            timestamp,
            merkle_root: merkle_root(&transactions),
            transactions,
            previous_hash,
            hash: String::new(),
            nonce: 0,
            is_genesis: false,
            block_reward: BLOCK_REWARD,
            total_fees,
            difficulty: 0,
            glow_intensity: 0.0,
        };
        block.hash = block.compute_hash();
        block
    }

    /// Digest of index, timestamp, transactions, previous hash, merkle root
    /// and nonce. Any nonce change yields a new digest.
    pub fn compute_hash(&self) -> String {
        digest_of(&HashPreimage {
            index: self.index,
            timestamp: self.timestamp,
            transactions: &self.transactions,
            previous_hash: &self.previous_hash,
            merkle_root: &self.merkle_root,
            nonce: self.nonce,
        })
    }

    /// Bump the nonce once and rehash. Returns true when the new hash
    /// satisfies `difficulty`.
    pub fn try_next_nonce(&mut self, difficulty: u32) -> bool {
        self.nonce = self.nonce.wrapping_add(1);
        self.hash = self.compute_hash();
        meets_difficulty(&self.hash, difficulty)
    }

    /// Cached hash matches content, merkle root matches the transactions and,
    /// for non-genesis blocks, the stamped difficulty is met.
    pub fn is_valid(&self) -> bool {
        if self.hash != self.compute_hash() {
            return false;
        }
        if self.merkle_root != merkle_root(&self.transactions) {
            return false;
        }
        self.is_genesis || meets_difficulty(&self.hash, self.difficulty)
    }

    pub fn reward_total(&self) -> f64 {
        self.block_reward + self.total_fees
    }
}
