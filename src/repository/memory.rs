//! In-memory ledger store.
//!
//! A transaction takes the store lock for its whole lifetime and works on a
//! private copy of the tables; the copy replaces the shared state only on
//! commit. Operations are therefore fully serialized, which is the strongest
//! form of the row locking the Postgres store uses.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::{Book, Checkout, CheckoutRecord, StudentInfo, User};

use super::{LedgerStore, LedgerTx, StoreResult};

#[derive(Debug, Clone, Default)]
struct Tables {
    books: BTreeMap<i32, Book>,
    users: BTreeMap<i32, User>,
    checkouts: BTreeMap<i32, Checkout>,
    next_checkout_id: i32,
}

impl Tables {
    fn record(&self, checkout: &Checkout) -> Option<CheckoutRecord> {
        let book = self.books.get(&checkout.book_id)?;
        let user = self.users.get(&checkout.user_id)?;
        Some(CheckoutRecord {
            id: checkout.id,
            checked_out_at: checkout.checked_out_at,
            state: checkout.state,
            book: book.summary(),
            student: StudentInfo {
                id: user.id,
                name: user.name.clone(),
                registration_number: user.registration_number.clone().unwrap_or_default(),
            },
        })
    }

    /// Joined records matching `filter`, newest first
    fn records<F>(&self, filter: F) -> Vec<CheckoutRecord>
    where
        F: Fn(&Checkout) -> bool,
    {
        let mut records: Vec<CheckoutRecord> = self
            .checkouts
            .values()
            .filter(|c| filter(*c))
            .filter_map(|c| self.record(c))
            .collect();
        records.sort_by(|a, b| {
            b.checked_out_at
                .cmp(&a.checked_out_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        records
    }
}

/// Ledger store kept in process memory
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    tables: Arc<Mutex<Tables>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a book
    pub async fn put_book(&self, book: Book) {
        self.tables.lock().await.books.insert(book.id, book);
    }

    /// Insert or replace a user
    pub async fn put_user(&self, user: User) {
        self.tables.lock().await.users.insert(user.id, user);
    }

    pub async fn book(&self, book_id: i32) -> Option<Book> {
        self.tables.lock().await.books.get(&book_id).cloned()
    }

    /// Every checkout row, in insertion order
    pub async fn checkouts(&self) -> Vec<Checkout> {
        self.tables.lock().await.checkouts.values().cloned().collect()
    }

    /// Delete a book and, like the database cascade, its checkouts
    pub async fn delete_book(&self, book_id: i32) -> bool {
        let mut tables = self.tables.lock().await;
        tables.checkouts.retain(|_, c| c.book_id != book_id);
        tables.books.remove(&book_id).is_some()
    }

    /// Delete a user and, like the database cascade, their checkouts
    pub async fn delete_user(&self, user_id: i32) -> bool {
        let mut tables = self.tables.lock().await;
        tables.checkouts.retain(|_, c| c.user_id != user_id);
        tables.users.remove(&user_id).is_some()
    }

    /// Make the next commit fail with a store error
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = Tables::clone(&guard);
        Ok(Box::new(MemoryLedgerTx {
            guard: Some(guard),
            working,
            fail_commit: self.fail_next_commit.clone(),
        }))
    }

    async fn active_for_student(&self, user_id: i32) -> StoreResult<Vec<CheckoutRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.records(|c| c.user_id == user_id && c.is_active()))
    }

    async fn active_for_book(&self, book_id: i32) -> StoreResult<Vec<CheckoutRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.records(|c| c.book_id == book_id && c.is_active()))
    }

    async fn history_for_book(&self, book_id: i32) -> StoreResult<Vec<CheckoutRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.records(|c| c.book_id == book_id))
    }

    async fn all_active(&self) -> StoreResult<Vec<CheckoutRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.records(Checkout::is_active))
    }

    async fn count_active(&self) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        Ok(tables.checkouts.values().filter(|c| c.is_active()).count() as i64)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

pub struct MemoryLedgerTx {
    guard: Option<OwnedMutexGuard<Tables>>,
    working: Tables,
    fail_commit: Arc<AtomicBool>,
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn lock_book(&mut self, book_id: i32) -> StoreResult<Option<Book>> {
        Ok(self.working.books.get(&book_id).cloned())
    }

    async fn lock_student(&mut self, registration_number: &str) -> StoreResult<Option<StudentInfo>> {
        Ok(self
            .working
            .users
            .values()
            .filter(|u| u.registration_number.as_deref() == Some(registration_number))
            .find_map(User::student_info))
    }

    async fn count_active_for_student(&mut self, user_id: i32) -> StoreResult<i64> {
        Ok(self
            .working
            .checkouts
            .values()
            .filter(|c| c.user_id == user_id && c.is_active())
            .count() as i64)
    }

    async fn find_active_checkout(&mut self, user_id: i32, book_id: i32) -> StoreResult<Option<Checkout>> {
        Ok(self
            .working
            .checkouts
            .values()
            .filter(|c| c.user_id == user_id && c.book_id == book_id && c.is_active())
            .min_by_key(|c| (c.checked_out_at, c.id))
            .cloned())
    }

    async fn insert_checkout(&mut self, user_id: i32, book_id: i32, at: DateTime<Utc>) -> StoreResult<Checkout> {
        if !self.working.users.contains_key(&user_id) || !self.working.books.contains_key(&book_id) {
            return Err(sqlx::Error::Protocol(
                "checkout references a missing user or book".to_string(),
            ));
        }
        self.working.next_checkout_id += 1;
        let checkout = Checkout::new(self.working.next_checkout_id, user_id, book_id, at);
        self.working.checkouts.insert(checkout.id, checkout.clone());
        Ok(checkout)
    }

    async fn mark_returned(&mut self, checkout_id: i32, at: DateTime<Utc>) -> StoreResult<Checkout> {
        let checkout = self
            .working
            .checkouts
            .get_mut(&checkout_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        if !checkout.mark_returned(at) {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(checkout.clone())
    }

    async fn adjust_available_copies(&mut self, book_id: i32, delta: i32) -> StoreResult<Book> {
        let book = self
            .working
            .books
            .get_mut(&book_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        book.available_copies = book
            .adjusted_available(delta)
            .ok_or(sqlx::Error::RowNotFound)?;
        Ok(book.clone())
    }

    async fn commit(&mut self) -> StoreResult<()> {
        let mut guard = self.guard.take().ok_or_else(|| {
            sqlx::Error::Protocol("ledger transaction already committed".to_string())
        })?;
        if self.fail_commit.swap(false, Ordering::SeqCst) {
            return Err(sqlx::Error::Protocol("injected commit failure".to_string()));
        }
        *guard = std::mem::take(&mut self.working);
        Ok(())
    }
}
