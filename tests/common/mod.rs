//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use booknexus_server::{
    models::{Book, Role, User},
    repository::MemoryLedgerStore,
    services::ledger::LoanLedger,
};

pub fn book(id: i32, total: i32, available: i32) -> Book {
    Book {
        id,
        title: format!("Book {}", id),
        author: "Anne Frank".to_string(),
        isbn: format!("978055329{:04}", id),
        image_url: None,
        subject: Some("History & Politics".to_string()),
        research_area: None,
        location: Some("H-1".to_string()),
        total_copies: total,
        available_copies: available,
        description: None,
    }
}

pub fn student(id: i32, registration_number: &str) -> User {
    User {
        id,
        name: format!("Student {}", id),
        role: Role::Student,
        registration_number: Some(registration_number.to_string()),
        email: None,
    }
}

pub fn librarian(id: i32) -> User {
    User {
        id,
        name: "Admin User".to_string(),
        role: Role::Admin,
        registration_number: None,
        email: Some("admin@example.com".to_string()),
    }
}

/// Memory store seeded with the given books and users, and a ledger over it
pub async fn seeded(books: Vec<Book>, users: Vec<User>) -> (MemoryLedgerStore, LoanLedger) {
    let store = MemoryLedgerStore::new();
    for b in books {
        store.put_book(b).await;
    }
    for u in users {
        store.put_user(u).await;
    }
    let ledger = LoanLedger::new(Arc::new(store.clone()));
    (store, ledger)
}

/// Active checkout rows for a book
pub async fn active_for_book(store: &MemoryLedgerStore, book_id: i32) -> i32 {
    store
        .checkouts()
        .await
        .iter()
        .filter(|c| c.book_id == book_id && c.is_active())
        .count() as i32
}

/// Panics unless `available + active == total` holds for the book
pub async fn assert_copies_balanced(store: &MemoryLedgerStore, book_id: i32) {
    let book = store.book(book_id).await.expect("book exists");
    let active = active_for_book(store, book_id).await;
    assert_eq!(
        book.available_copies + active,
        book.total_copies,
        "book {} has {} available and {} on loan out of {}",
        book_id,
        book.available_copies,
        active,
        book.total_copies
    );
}
