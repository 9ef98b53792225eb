use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Named accounts the scene moves value between.
pub const ACCOUNTS: [&str; 6] = ["Alice", "Bob", "Charlie", "Diana", "Eve", "Frank"];

const GENESIS_SOURCE: &str = "Genesis";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Transfer,
    SmartContract,
    TokenMint,
    Stake,
}

impl TxKind {
    pub const ALL: [TxKind; 4] = [
        TxKind::Transfer,
        TxKind::SmartContract,
        TxKind::TokenMint,
        TxKind::Stake,
    ];

    fn describe(self, from: &str, to: &str, amount: f64) -> String {
        match self {
            TxKind::Transfer => format!("{from} sends {amount:.2} to {to}"),
            TxKind::SmartContract => format!("{from} calls a contract owned by {to}"),
            TxKind::TokenMint => format!("{amount:.2} tokens minted for {to}"),
            TxKind::Stake => format!("{from} stakes {amount:.2} with {to}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Pending,
    Confirmed,
}

/// A simulated transaction. It sits in the pending pool until a block that
/// includes it is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub from: String,
    pub to: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub fee: f64,
    pub status: TxStatus,
    pub description: String,
}

impl Transaction {
    pub fn new(from: &str, to: &str, amount: f64, kind: TxKind, fee: f64) -> Self {
        Self {
            id: format!("tx_{}", Uuid::new_v4().simple()),
            from: from.to_string(),
            to: to.to_string(),
            amount,
            kind,
            fee,
            status: TxStatus::Pending,
            description: kind.describe(from, to, amount),
        }
    }

    /// Random transaction between two distinct named accounts.
    pub fn synthetic<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut pair = ACCOUNTS.choose_multiple(rng, 2);
        let from = pair.next().copied().unwrap_or(ACCOUNTS[0]);
        let to = pair.next().copied().unwrap_or(ACCOUNTS[1]);
        let kind = *TxKind::ALL.choose(rng).unwrap_or(&TxKind::Transfer);
        let amount = (rng.gen_range(1.0..250.0_f64) * 100.0).round() / 100.0;
        let fee = (rng.gen_range(0.001..0.05_f64) * 1000.0).round() / 1000.0;
        Self::new(from, to, amount, kind, fee)
    }

    pub fn confirmed(mut self) -> Self {
        self.status = TxStatus::Confirmed;
        self
    }

    pub fn is_contract(&self) -> bool {
        self.kind == TxKind::SmartContract
    }
}

/// The three mints carried by the genesis block.
pub fn genesis_transactions() -> Vec<Transaction> {
    [("Alice", 1000.0), ("Bob", 750.0), ("Charlie", 500.0)]
        .into_iter()
        .map(|(to, amount)| {
            Transaction::new(GENESIS_SOURCE, to, amount, TxKind::TokenMint, 0.0).confirmed()
        })
        .collect()
}

/// The fixed pool the scene starts with.
pub fn seed_transactions() -> Vec<Transaction> {
    vec![
        Transaction::new("Alice", "Bob", 50.0, TxKind::Transfer, 0.01),
        Transaction::new("Bob", "Charlie", 25.0, TxKind::Transfer, 0.005),
        Transaction::new("Charlie", "Diana", 10.0, TxKind::SmartContract, 0.02),
        Transaction::new("Diana", "Eve", 100.0, TxKind::Stake, 0.015),
        Transaction::new("Eve", "Frank", 75.0, TxKind::TokenMint, 0.008),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn synthetic_transactions_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let tx = Transaction::synthetic(&mut rng);
            assert_ne!(tx.from, tx.to);
            assert!(tx.amount >= 1.0);
            assert!(tx.fee > 0.0);
            assert_eq!(tx.status, TxStatus::Pending);
            assert!(tx.id.starts_with("tx_"));
        }
    }

    #[test]
    fn ids_are_unique() {
        let a = Transaction::new("Alice", "Bob", 1.0, TxKind::Transfer, 0.0);
        let b = Transaction::new("Alice", "Bob", 1.0, TxKind::Transfer, 0.0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn genesis_is_three_confirmed_mints() {
        let txs = genesis_transactions();
        assert_eq!(txs.len(), 3);
        assert!(txs.iter().all(|t| t.kind == TxKind::TokenMint));
        assert!(txs.iter().all(|t| t.status == TxStatus::Confirmed));
    }

    #[test]
    fn seed_pool_has_five_pending() {
        let txs = seed_transactions();
        assert_eq!(txs.len(), 5);
        assert!(txs.iter().all(|t| t.status == TxStatus::Pending));
        assert_eq!(txs.iter().filter(|t| t.is_contract()).count(), 1);
    }

    #[test]
    fn kind_serializes_as_type_field() {
        let tx = Transaction::new("Alice", "Bob", 1.0, TxKind::SmartContract, 0.0);
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "smart_contract");
        assert_eq!(json["status"], "pending");
    }
}
