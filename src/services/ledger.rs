//! Loan ledger: checkout and return of books by students.
//!
//! Keeps three things consistent: a book's `available_copies`, each
//! student's number of active checkouts (at most [`MAX_ACTIVE_CHECKOUTS`])
//! and the append-only checkout history. For every book,
//! `available_copies + active checkouts == total_copies`.
//!
//! Each operation runs in a single store transaction. The book row is
//! locked first, then the student row, and every precondition is checked
//! under those locks before anything is written. A failing precondition
//! drops the transaction untouched; a store error after a write rolls it
//! back.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::{LedgerError, LedgerResult},
    models::{Book, CheckoutRecord, LoanReceipt, StudentInfo, MAX_ACTIVE_CHECKOUTS},
    repository::{LedgerStore, LedgerTx},
};

/// Active checkouts together with their count
#[derive(Debug, Clone)]
pub struct PendingReturns {
    pub pending_count: i64,
    pub checkouts: Vec<CheckoutRecord>,
}

#[derive(Clone)]
pub struct LoanLedger {
    store: Arc<dyn LedgerStore>,
}

impl LoanLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Lend one copy of a book to a student
    pub async fn checkout(&self, book_id: i32, registration_number: &str) -> LedgerResult<LoanReceipt> {
        let mut tx = self.store.begin().await?;
        let (book, student) = lock_parties(tx.as_mut(), book_id, registration_number).await?;

        let active = tx.count_active_for_student(student.id).await?;
        if active >= MAX_ACTIVE_CHECKOUTS {
            tracing::debug!(book_id, registration_number, active, "Checkout refused: loan limit reached");
            return Err(LedgerError::LimitExceeded);
        }

        if !book.is_available() {
            tracing::debug!(book_id, registration_number, "Checkout refused: no copy available");
            return Err(LedgerError::Unavailable);
        }

        let now = Utc::now();
        let checkout = tx.insert_checkout(student.id, book.id, now).await?;
        let book = tx.adjust_available_copies(book.id, -1).await?;
        tx.commit().await?;

        tracing::info!(
            checkout_id = checkout.id,
            book_id,
            registration_number,
            available_copies = book.available_copies,
            "Book checked out"
        );

        Ok(LoanReceipt { book, student })
    }

    /// Take back a copy of a book from a student.
    ///
    /// When the student holds several copies of the same book, the oldest
    /// checkout is closed.
    pub async fn return_book(&self, book_id: i32, registration_number: &str) -> LedgerResult<LoanReceipt> {
        let mut tx = self.store.begin().await?;
        let (book, student) = lock_parties(tx.as_mut(), book_id, registration_number).await?;

        let checkout = match tx.find_active_checkout(student.id, book.id).await? {
            Some(checkout) => checkout,
            None => {
                tracing::debug!(book_id, registration_number, "Return refused: no active checkout");
                return Err(LedgerError::NoActiveCheckout);
            }
        };

        let checkout = tx.mark_returned(checkout.id, Utc::now()).await?;
        let book = tx.adjust_available_copies(book.id, 1).await?;
        tx.commit().await?;

        tracing::info!(
            checkout_id = checkout.id,
            book_id,
            registration_number,
            available_copies = book.available_copies,
            "Book returned"
        );

        Ok(LoanReceipt { book, student })
    }

    /// Books currently borrowed by a student, newest first
    pub async fn active_for_student(&self, user_id: i32) -> LedgerResult<Vec<CheckoutRecord>> {
        Ok(self.store.active_for_student(user_id).await?)
    }

    /// Students currently holding a copy of a book, newest first
    pub async fn active_for_book(&self, book_id: i32) -> LedgerResult<Vec<CheckoutRecord>> {
        Ok(self.store.active_for_book(book_id).await?)
    }

    /// Full checkout history of a book, returned loans included
    pub async fn history_for_book(&self, book_id: i32) -> LedgerResult<Vec<CheckoutRecord>> {
        Ok(self.store.history_for_book(book_id).await?)
    }

    /// All outstanding checkouts and their count
    pub async fn pending_returns(&self) -> LedgerResult<PendingReturns> {
        let checkouts = self.store.all_active().await?;
        Ok(PendingReturns {
            pending_count: checkouts.len() as i64,
            checkouts,
        })
    }

    /// Number of outstanding checkouts
    pub async fn count_active(&self) -> LedgerResult<i64> {
        Ok(self.store.count_active().await?)
    }

    pub async fn ping(&self) -> LedgerResult<()> {
        Ok(self.store.ping().await?)
    }
}

/// Lock the book, then the student. Shared prefix of both operations.
async fn lock_parties(
    tx: &mut dyn LedgerTx,
    book_id: i32,
    registration_number: &str,
) -> LedgerResult<(Book, StudentInfo)> {
    let book = tx
        .lock_book(book_id)
        .await?
        .ok_or(LedgerError::BookNotFound)?;

    let student = tx
        .lock_student(registration_number)
        .await?
        .ok_or(LedgerError::StudentNotFound)?;

    Ok((book, student))
}
