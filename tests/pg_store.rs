//! Postgres ledger store tests.
//!
//! These need a database: set DATABASE_URL and run with
//! `cargo test --test pg_store -- --ignored`.

use std::sync::Arc;

use booknexus_server::{
    error::LedgerError,
    repository::{maintenance, LedgerStore, PgLedgerStore},
    services::ledger::LoanLedger,
};
use sqlx::PgPool;

async fn insert_book(pool: &PgPool, total: i32) -> i32 {
    sqlx::query_scalar(
        "INSERT INTO books (title, author, isbn, total_copies, available_copies)
         VALUES ('JavaScript', 'David Flanagan', '9781491952023', $1, $1)
         RETURNING id",
    )
    .bind(total)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn insert_student(pool: &PgPool, registration_number: &str) -> i32 {
    sqlx::query_scalar(
        "INSERT INTO users (name, password, role, registration_number)
         VALUES ($1, 'x', 'student', $1)
         RETURNING id",
    )
    .bind(registration_number)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn available(pool: &PgPool, book_id: i32) -> i32 {
    sqlx::query_scalar("SELECT available_copies FROM books WHERE id = $1")
        .bind(book_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn ledger(pool: &PgPool) -> LoanLedger {
    LoanLedger::new(Arc::new(PgLedgerStore::new(pool.clone())))
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_checkout_and_return_update_both_tables(pool: PgPool) {
    let book_id = insert_book(&pool, 2).await;
    insert_student(&pool, "S1").await;
    let ledger = ledger(&pool);

    let receipt = ledger.checkout(book_id, "S1").await.unwrap();
    assert_eq!(receipt.book.available_copies, 1);
    assert_eq!(ledger.count_active().await.unwrap(), 1);

    ledger.return_book(book_id, "S1").await.unwrap();
    assert_eq!(available(&pool, book_id).await, 2);

    let err = ledger.return_book(book_id, "S1").await.unwrap_err();
    assert!(matches!(err, LedgerError::NoActiveCheckout));

    let history = ledger.history_for_book(book_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].state.returned_at().is_some());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_concurrent_checkouts_of_last_copy(pool: PgPool) {
    let book_id = insert_book(&pool, 1).await;
    insert_student(&pool, "S1").await;
    insert_student(&pool, "S2").await;
    let ledger = ledger(&pool);

    let (a, b) = tokio::join!(ledger.checkout(book_id, "S1"), ledger.checkout(book_id, "S2"));

    assert!(a.is_ok() != b.is_ok());
    let err = a.err().or(b.err()).unwrap();
    assert!(matches!(err, LedgerError::Unavailable));
    assert_eq!(available(&pool, book_id).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_concurrent_checkouts_respect_the_cap(pool: PgPool) {
    insert_student(&pool, "S1").await;
    let mut books = Vec::new();
    for _ in 0..5 {
        books.push(insert_book(&pool, 1).await);
    }
    let ledger = ledger(&pool);
    ledger.checkout(books[0], "S1").await.unwrap();
    ledger.checkout(books[1], "S1").await.unwrap();

    let (a, b, c) = tokio::join!(
        ledger.checkout(books[2], "S1"),
        ledger.checkout(books[3], "S1"),
        ledger.checkout(books[4], "S1"),
    );

    let results = [a, b, c];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, LedgerError::LimitExceeded)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_deleting_a_user_cascades(pool: PgPool) {
    let book_id = insert_book(&pool, 1).await;
    let user_id = insert_student(&pool, "S1").await;
    let store = PgLedgerStore::new(pool.clone());
    LoanLedger::new(Arc::new(store.clone()))
        .checkout(book_id, "S1")
        .await
        .unwrap();

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap();

    assert_eq!(store.count_active().await.unwrap(), 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_purge_removes_orphans(pool: PgPool) {
    let book_id = insert_book(&pool, 1).await;
    let user_id = insert_student(&pool, "S1").await;

    // Simulate a store that lost its foreign keys
    sqlx::query("ALTER TABLE checkouts DROP CONSTRAINT checkouts_user_id_fkey")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO checkouts (user_id, book_id) VALUES ($1, $2), ($3, $2)")
        .bind(user_id)
        .bind(book_id)
        .bind(user_id + 1000)
        .execute(&pool)
        .await
        .unwrap();

    let report = maintenance::purge_orphaned_checkouts(&pool).await.unwrap();
    assert_eq!(report.missing_user, 1);
    assert_eq!(report.missing_book, 0);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM checkouts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}
