pub mod model;

pub use model::{Transaction, TxKind, TxStatus, genesis_transactions, seed_transactions};
