pub mod format;
pub mod provider;
pub mod transaction;

pub use format::StatementFormat;
pub use provider::BankProvider;
pub use transaction::{LedgerEntry, NormalizedTransaction};
