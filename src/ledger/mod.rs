//! Credit Ledger
//!
//! Append-only record of every credit movement plus the cached balance
//! projection. All money movement in the crate goes through here.

pub mod entry;
pub mod ops;

pub use entry::{EntryMetadata, LedgerEntry, TransactionStatus, TransactionType};
pub use ops::{
    batch_credit, batch_debit, credit, debit, verify_balance, BatchResult, Ledger, LedgerError,
};
