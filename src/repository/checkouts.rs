//! PostgreSQL implementation of the ledger store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, Transaction};

use crate::models::{
    checkout::{CheckoutRecordRow, CheckoutRow},
    Book, Checkout, CheckoutRecord, Role, StudentInfo,
};

use super::{LedgerStore, LedgerTx, StoreResult};

const BOOK_COLUMNS: &str = "id, title, author, isbn, image_url, subject, research_area, \
                            location, total_copies, available_copies, description";

const RECORD_SELECT: &str = r#"
    SELECT c.id, c.user_id, c.book_id, c.checked_out_at, c.returned_at,
           b.title, b.author, b.isbn, b.image_url,
           u.name, u.registration_number
    FROM checkouts c
    JOIN books b ON b.id = c.book_id
    JOIN users u ON u.id = c.user_id
"#;

const RECORD_ORDER: &str = "ORDER BY c.checked_out_at DESC, c.id DESC";

#[derive(Clone)]
pub struct PgLedgerStore {
    pool: Pool<Postgres>,
}

impl PgLedgerStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn records(&self, filter: &str, bind: Option<i32>) -> StoreResult<Vec<CheckoutRecord>> {
        let sql = format!("{} {} {}", RECORD_SELECT, filter, RECORD_ORDER);
        let mut query = sqlx::query_as::<_, CheckoutRecordRow>(&sql);
        if let Some(id) = bind {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(CheckoutRecord::from).collect())
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx: Some(tx) }))
    }

    async fn active_for_student(&self, user_id: i32) -> StoreResult<Vec<CheckoutRecord>> {
        self.records("WHERE c.user_id = $1 AND c.returned_at IS NULL", Some(user_id))
            .await
    }

    async fn active_for_book(&self, book_id: i32) -> StoreResult<Vec<CheckoutRecord>> {
        self.records("WHERE c.book_id = $1 AND c.returned_at IS NULL", Some(book_id))
            .await
    }

    async fn history_for_book(&self, book_id: i32) -> StoreResult<Vec<CheckoutRecord>> {
        self.records("WHERE c.book_id = $1", Some(book_id)).await
    }

    async fn all_active(&self) -> StoreResult<Vec<CheckoutRecord>> {
        self.records("WHERE c.returned_at IS NULL", None).await
    }

    async fn count_active(&self) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM checkouts WHERE returned_at IS NULL")
            .fetch_one(&self.pool)
            .await
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// One ledger transaction. Rolled back by sqlx when dropped uncommitted.
pub struct PgLedgerTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgLedgerTx {
    fn conn(&mut self) -> StoreResult<&mut PgConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| sqlx::Error::Protocol("ledger transaction already committed".to_string()))
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_book(&mut self, book_id: i32) -> StoreResult<Option<Book>> {
        let sql = format!("SELECT {} FROM books WHERE id = $1 FOR UPDATE", BOOK_COLUMNS);
        sqlx::query_as::<_, Book>(&sql)
            .bind(book_id)
            .fetch_optional(self.conn()?)
            .await
    }

    async fn lock_student(&mut self, registration_number: &str) -> StoreResult<Option<StudentInfo>> {
        sqlx::query_as::<_, StudentInfo>(
            r#"
            SELECT id, name, registration_number
            FROM users
            WHERE registration_number = $1 AND role = $2
            FOR UPDATE
            "#,
        )
        .bind(registration_number)
        .bind(Role::Student)
        .fetch_optional(self.conn()?)
        .await
    }

    async fn count_active_for_student(&mut self, user_id: i32) -> StoreResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM checkouts WHERE user_id = $1 AND returned_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(self.conn()?)
        .await
    }

    async fn find_active_checkout(&mut self, user_id: i32, book_id: i32) -> StoreResult<Option<Checkout>> {
        let row = sqlx::query_as::<_, CheckoutRow>(
            r#"
            SELECT id, user_id, book_id, checked_out_at, returned_at
            FROM checkouts
            WHERE user_id = $1 AND book_id = $2 AND returned_at IS NULL
            ORDER BY checked_out_at, id
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(row.map(Checkout::from))
    }

    async fn insert_checkout(&mut self, user_id: i32, book_id: i32, at: DateTime<Utc>) -> StoreResult<Checkout> {
        let row = sqlx::query_as::<_, CheckoutRow>(
            r#"
            INSERT INTO checkouts (user_id, book_id, checked_out_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, book_id, checked_out_at, returned_at
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(at)
        .fetch_one(self.conn()?)
        .await?;

        Ok(row.into())
    }

    async fn mark_returned(&mut self, checkout_id: i32, at: DateTime<Utc>) -> StoreResult<Checkout> {
        // The returned_at guard keeps a returned row from ever changing again
        let row = sqlx::query_as::<_, CheckoutRow>(
            r#"
            UPDATE checkouts SET returned_at = $2
            WHERE id = $1 AND returned_at IS NULL
            RETURNING id, user_id, book_id, checked_out_at, returned_at
            "#,
        )
        .bind(checkout_id)
        .bind(at)
        .fetch_optional(self.conn()?)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(row.into())
    }

    async fn adjust_available_copies(&mut self, book_id: i32, delta: i32) -> StoreResult<Book> {
        let sql = format!(
            r#"
            UPDATE books
            SET available_copies = available_copies + $2, updated_at = NOW()
            WHERE id = $1 AND available_copies + $2 BETWEEN 0 AND total_copies
            RETURNING {}
            "#,
            BOOK_COLUMNS
        );
        sqlx::query_as::<_, Book>(&sql)
            .bind(book_id)
            .bind(delta)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    async fn commit(&mut self) -> StoreResult<()> {
        match self.tx.take() {
            Some(tx) => tx.commit().await,
            None => Err(sqlx::Error::Protocol("ledger transaction already committed".to_string())),
        }
    }
}
