//! Balance Mutation
//!
//! The only code allowed to change a balance or append a ledger entry. Every
//! function runs inside an open unit of work, so the funds check and the
//! decrement can never be separated by another writer.

use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::core::ids::{MatchId, TransactionId, UserId};
use crate::core::store::{Store, Tables, Tx};
use crate::ledger::entry::{EntryMetadata, LedgerEntry, TransactionStatus, TransactionType};

/// Ledger failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Balance below the requested debit.
    #[error("insufficient funds for {user_id}: balance {balance}, required {required}")]
    InsufficientFunds {
        /// Short account.
        user_id: UserId,
        /// Balance at check time.
        balance: i64,
        /// Amount requested.
        required: i64,
    },

    /// Negative amount passed.
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// Debit against an account that was never opened.
    #[error("unknown account: {0}")]
    UnknownAccount(UserId),

    /// Same user listed twice in a batch.
    #[error("duplicate participant in batch: {0}")]
    DuplicateParticipant(UserId),

    /// Credit would overflow the balance.
    #[error("balance overflow for {0}")]
    BalanceOverflow(UserId),

    /// Batch total does not fit in an amount.
    #[error("batch total overflow: {amount_per_user} x {participants}")]
    TotalOverflow {
        /// Per-participant amount.
        amount_per_user: i64,
        /// Number of participants.
        participants: usize,
    },
}

/// Outcome of a batch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    /// One entry per participant, in input order.
    pub entries: Vec<LedgerEntry>,
    /// Sum of absolute amounts moved.
    pub total: i64,
}

fn check_amount(amount: i64) -> Result<(), LedgerError> {
    if amount < 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}

fn batch_total(amount_per_user: i64, users: &[UserId]) -> Result<i64, LedgerError> {
    i64::try_from(users.len())
        .ok()
        .and_then(|n| amount_per_user.checked_mul(n))
        .ok_or(LedgerError::TotalOverflow {
            amount_per_user,
            participants: users.len(),
        })
}

fn check_unique(users: &[UserId]) -> Result<(), LedgerError> {
    let mut seen = BTreeSet::new();
    for user in users {
        if !seen.insert(*user) {
            return Err(LedgerError::DuplicateParticipant(*user));
        }
    }
    Ok(())
}

fn write_entry(
    tx: &mut Tx<'_>,
    user_id: UserId,
    signed_amount: i64,
    tx_type: TransactionType,
    metadata: EntryMetadata,
) -> LedgerEntry {
    let entry = LedgerEntry {
        id: TransactionId::new(),
        user_id,
        tx_type,
        amount: signed_amount,
        status: TransactionStatus::Completed,
        metadata,
        created_at: tx.now(),
    };
    tx.append_entry(entry.clone());
    entry
}

/// Take `amount` from `user_id`, failing if the balance is short.
pub fn debit(
    tx: &mut Tx<'_>,
    user_id: UserId,
    amount: i64,
    tx_type: TransactionType,
    metadata: EntryMetadata,
) -> Result<LedgerEntry, LedgerError> {
    check_amount(amount)?;
    let balance = tx.balance(user_id).ok_or(LedgerError::UnknownAccount(user_id))?;
    if balance < amount {
        return Err(LedgerError::InsufficientFunds {
            user_id,
            balance,
            required: amount,
        });
    }

    tx.set_balance(user_id, balance - amount);
    debug!(%user_id, amount, ?tx_type, "debit");
    Ok(write_entry(tx, user_id, -amount, tx_type, metadata))
}

/// Give `amount` to `user_id`, opening the account if needed.
pub fn credit(
    tx: &mut Tx<'_>,
    user_id: UserId,
    amount: i64,
    tx_type: TransactionType,
    metadata: EntryMetadata,
) -> Result<LedgerEntry, LedgerError> {
    check_amount(amount)?;
    let balance = tx.balance(user_id).unwrap_or(0);
    let updated = balance
        .checked_add(amount)
        .ok_or(LedgerError::BalanceOverflow(user_id))?;

    tx.set_balance(user_id, updated);
    debug!(%user_id, amount, ?tx_type, "credit");
    Ok(write_entry(tx, user_id, amount, tx_type, metadata))
}

/// Debit every user `amount_per_user`, or nobody.
///
/// All participants are validated before the first balance is touched.
pub fn batch_debit(
    tx: &mut Tx<'_>,
    users: &[UserId],
    amount_per_user: i64,
    tx_type: TransactionType,
    metadata: &EntryMetadata,
) -> Result<BatchResult, LedgerError> {
    check_amount(amount_per_user)?;
    check_unique(users)?;
    let total = batch_total(amount_per_user, users)?;

    for user_id in users {
        let balance = tx.balance(*user_id).ok_or(LedgerError::UnknownAccount(*user_id))?;
        if balance < amount_per_user {
            return Err(LedgerError::InsufficientFunds {
                user_id: *user_id,
                balance,
                required: amount_per_user,
            });
        }
    }

    let mut entries = Vec::with_capacity(users.len());
    for user_id in users {
        entries.push(debit(tx, *user_id, amount_per_user, tx_type, metadata.clone())?);
    }

    Ok(BatchResult { total, entries })
}

/// Credit every user `amount_per_user`.
pub fn batch_credit(
    tx: &mut Tx<'_>,
    users: &[UserId],
    amount_per_user: i64,
    tx_type: TransactionType,
    metadata: &EntryMetadata,
) -> Result<BatchResult, LedgerError> {
    check_amount(amount_per_user)?;
    check_unique(users)?;
    let total = batch_total(amount_per_user, users)?;

    let mut entries = Vec::with_capacity(users.len());
    for user_id in users {
        entries.push(credit(tx, *user_id, amount_per_user, tx_type, metadata.clone())?);
    }

    Ok(BatchResult { total, entries })
}

/// Sum of a user's entries equals their cached balance.
pub fn verify_balance(tables: &Tables, user_id: UserId) -> bool {
    let sum: i64 = tables
        .entries()
        .iter()
        .filter(|e| e.user_id == user_id)
        .map(|e| e.amount)
        .sum();
    sum == tables.balance(user_id).unwrap_or(0)
}

// =============================================================================
// LEDGER HANDLE
// =============================================================================

/// Standalone ledger access, each call its own unit of work.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<Store>,
}

impl Ledger {
    /// Wrap a store.
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// See [`debit`].
    pub async fn debit(
        &self,
        user_id: UserId,
        amount: i64,
        tx_type: TransactionType,
        metadata: EntryMetadata,
    ) -> Result<LedgerEntry, LedgerError> {
        self.store
            .atomic(|tx| debit(tx, user_id, amount, tx_type, metadata))
            .await
    }

    /// See [`credit`].
    pub async fn credit(
        &self,
        user_id: UserId,
        amount: i64,
        tx_type: TransactionType,
        metadata: EntryMetadata,
    ) -> Result<LedgerEntry, LedgerError> {
        self.store
            .atomic(|tx| credit(tx, user_id, amount, tx_type, metadata))
            .await
    }

    /// See [`batch_debit`].
    pub async fn batch_debit(
        &self,
        users: &[UserId],
        amount_per_user: i64,
        tx_type: TransactionType,
        metadata: EntryMetadata,
    ) -> Result<BatchResult, LedgerError> {
        self.store
            .atomic(|tx| batch_debit(tx, users, amount_per_user, tx_type, &metadata))
            .await
    }

    /// See [`batch_credit`].
    pub async fn batch_credit(
        &self,
        users: &[UserId],
        amount_per_user: i64,
        tx_type: TransactionType,
        metadata: EntryMetadata,
    ) -> Result<BatchResult, LedgerError> {
        self.store
            .atomic(|tx| batch_credit(tx, users, amount_per_user, tx_type, &metadata))
            .await
    }

    /// External top-up.
    pub async fn deposit(
        &self,
        user_id: UserId,
        amount: i64,
        reference: impl Into<String>,
    ) -> Result<LedgerEntry, LedgerError> {
        let metadata = EntryMetadata::Deposit { reference: reference.into() };
        self.credit(user_id, amount, TransactionType::Deposit, metadata).await
    }

    /// External cash-out, guarded like any debit.
    pub async fn withdraw(
        &self,
        user_id: UserId,
        amount: i64,
        reference: impl Into<String>,
    ) -> Result<LedgerEntry, LedgerError> {
        let metadata = EntryMetadata::Withdrawal { reference: reference.into() };
        self.debit(user_id, amount, TransactionType::Withdrawal, metadata).await
    }

    /// Current balance (0 for unknown accounts).
    pub async fn balance(&self, user_id: UserId) -> i64 {
        self.store.read(|t| t.balance(user_id).unwrap_or(0)).await
    }

    /// A user's entries in write order.
    pub async fn entries_for(&self, user_id: UserId) -> Vec<LedgerEntry> {
        self.store
            .read(|t| {
                t.entries()
                    .iter()
                    .filter(|e| e.user_id == user_id)
                    .cloned()
                    .collect()
            })
            .await
    }

    /// Entries referencing a match.
    pub async fn entries_for_match(&self, match_id: MatchId) -> Vec<LedgerEntry> {
        self.store
            .read(|t| {
                t.entries()
                    .iter()
                    .filter(|e| e.metadata.match_id() == Some(match_id))
                    .cloned()
                    .collect()
            })
            .await
    }

    /// See [`verify_balance`].
    pub async fn verify_balance(&self, user_id: UserId) -> bool {
        self.store.read(|t| verify_balance(t, user_id)).await
    }
}
