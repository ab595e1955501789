//! Finance module: income/expense bookkeeping and period summaries.
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod summary;
pub mod transaction;

pub use summary::{CategoryTotal, FinanceSummary, summarize};
pub use transaction::{FinanceTransaction, TransactionDraft, TransactionKind, TransactionPatch};
