use std::collections::HashSet;

use super::Block;
use crate::transaction::Transaction;

/// In-memory chain of committed blocks plus the pending pool.
#[derive(Debug)]
pub struct Ledger {
    pub chain: Vec<Block>,
    pub pending: Vec<Transaction>,
}

impl Ledger {
    /// Initialize a ledger holding only `genesis` and an initial pool.
    pub fn new(genesis: Block, pending: Vec<Transaction>) -> Self {
        Self {
            chain: vec![genesis],
            pending,
        }
    }

    /// Return the last block in the chain.
    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("ledger should always hold at least the genesis block")
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Clones of the first `max` pending transactions, in arrival order.
    pub fn front_of_pool(&self, max: usize) -> Vec<Transaction> {
        self.pending.iter().take(max).cloned().collect()
    }

    pub fn push_pending(&mut self, tx: Transaction) {
        self.pending.push(tx);
    }

    /// Append a mined block if it links to the tip and carries valid work.
    /// Its transactions move from the pool into the chain.
    pub fn append_block(&mut self, block: Block) -> Result<&Block, String> {
        let tip = self.last_block();
        if block.previous_hash != tip.hash {
            return Err(format!(
                "block #{} does not extend tip {}",
                block.index, tip.index
            ));
        }
        if block.index != tip.index + 1 {
            return Err(format!(
                "block index {} does not follow {}",
                block.index, tip.index
            ));
        }
        if !block.is_valid() {
            return Err(format!("block #{} failed hash validation", block.index));
        }

        let included: HashSet<&str> = block.transactions.iter().map(|t| t.id.as_str()).collect();
        self.pending.retain(|t| !included.contains(t.id.as_str()));
        self.chain.push(block);
        Ok(self.last_block())
    }

    /// Validate the entire chain: linkage, hashes and per-block work.
    pub fn is_valid_chain(&self) -> bool {
        let Some(genesis) = self.chain.first() else {
            return false;
        };
        if !genesis.is_genesis || genesis.index != 0 || genesis.hash != genesis.compute_hash() {
            return false;
        }

        self.chain.windows(2).all(|pair| {
            let (prev, current) = (&pair[0], &pair[1]);
            current.previous_hash == prev.hash && !current.is_genesis && current.is_valid()
        })
    }

    /// True when no transaction id is both pending and committed.
    pub fn is_partitioned(&self) -> bool {
        let confirmed: HashSet<&str> = self
            .chain
            .iter()
            .flat_map(|b| b.transactions.iter().map(|t| t.id.as_str()))
            .collect();
        self.pending.iter().all(|t| !confirmed.contains(t.id.as_str()))
    }

    /// Fade every block's highlight.
    pub fn decay_glow(&mut self, amount: f64) {
        for block in &mut self.chain {
            block.glow_intensity = (block.glow_intensity - amount).max(0.0);
        }
    }
}
