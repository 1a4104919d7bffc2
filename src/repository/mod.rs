//! Repository layer: the storage contracts used by the loan ledger and
//! their PostgreSQL and in-memory implementations.

pub mod checkouts;
pub mod maintenance;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Book, Checkout, CheckoutRecord, StudentInfo};

pub use checkouts::PgLedgerStore;
pub use memory::MemoryLedgerStore;

/// Result type for store operations. Any error is a store failure.
pub type StoreResult<T> = Result<T, sqlx::Error>;

/// Shared handle to a ledger store.
///
/// Listing methods return rows newest first by `checked_out_at`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a transaction for a single ledger operation
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>>;

    /// Active checkouts held by a student
    async fn active_for_student(&self, user_id: i32) -> StoreResult<Vec<CheckoutRecord>>;

    /// Active checkouts of a book
    async fn active_for_book(&self, book_id: i32) -> StoreResult<Vec<CheckoutRecord>>;

    /// Every checkout of a book, active and returned
    async fn history_for_book(&self, book_id: i32) -> StoreResult<Vec<CheckoutRecord>>;

    /// Every active checkout
    async fn all_active(&self) -> StoreResult<Vec<CheckoutRecord>>;

    /// Number of active checkouts (pending returns)
    async fn count_active(&self) -> StoreResult<i64>;

    /// Connectivity check
    async fn ping(&self) -> StoreResult<()>;
}

/// A unit of work covering one checkout or return.
///
/// `lock_book` and `lock_student` hold their rows until the transaction
/// ends, so a check made after them cannot be invalidated by a concurrent
/// operation on the same book or student. Callers lock the book first.
/// Dropping the transaction without `commit` rolls it back.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerTx: Send {
    async fn lock_book(&mut self, book_id: i32) -> StoreResult<Option<Book>>;

    /// Resolve a registration number to a student (role = student only)
    async fn lock_student(&mut self, registration_number: &str) -> StoreResult<Option<StudentInfo>>;

    async fn count_active_for_student(&mut self, user_id: i32) -> StoreResult<i64>;

    /// Oldest active checkout for the (student, book) pair
    async fn find_active_checkout(&mut self, user_id: i32, book_id: i32) -> StoreResult<Option<Checkout>>;

    async fn insert_checkout(&mut self, user_id: i32, book_id: i32, at: DateTime<Utc>) -> StoreResult<Checkout>;

    /// Set `returned_at` on an active checkout
    async fn mark_returned(&mut self, checkout_id: i32, at: DateTime<Utc>) -> StoreResult<Checkout>;

    /// Add `delta` to the available copies of a book. Fails if the result
    /// would leave `0..=total_copies`.
    async fn adjust_available_copies(&mut self, book_id: i32, delta: i32) -> StoreResult<Book>;

    async fn commit(&mut self) -> StoreResult<()>;
}
