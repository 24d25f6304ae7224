pub mod clock;
pub mod record;
pub mod strategy;

pub use clock::{Clock, FixedClock, SystemClock};
pub use record::{mint_id, CostRecord, TransactionRecord, COST_COLLECTION, TRANSACTION_COLLECTION};
pub use strategy::{DuplicateStrategy, StrategyParseError};
