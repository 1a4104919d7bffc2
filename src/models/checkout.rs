//! Checkout (loan) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::book::{Book, BookSummary};
use super::user::StudentInfo;

/// Maximum number of simultaneously active checkouts per student
pub const MAX_ACTIVE_CHECKOUTS: i64 = 3;

/// Loan state of a checkout. `Returned` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LoanState {
    Active,
    Returned { at: DateTime<Utc> },
}

impl LoanState {
    pub fn returned_at(&self) -> Option<DateTime<Utc>> {
        match self {
            LoanState::Active => None,
            LoanState::Returned { at } => Some(*at),
        }
    }
}

impl From<Option<DateTime<Utc>>> for LoanState {
    fn from(returned_at: Option<DateTime<Utc>>) -> Self {
        match returned_at {
            None => LoanState::Active,
            Some(at) => LoanState::Returned { at },
        }
    }
}

/// Internal row structure for the checkouts table
#[derive(Debug, Clone, FromRow)]
pub struct CheckoutRow {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub checked_out_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl From<CheckoutRow> for Checkout {
    fn from(row: CheckoutRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            book_id: row.book_id,
            checked_out_at: row.checked_out_at,
            state: row.returned_at.into(),
        }
    }
}

/// One entry of the checkout ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Checkout {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub checked_out_at: DateTime<Utc>,
    /// `{"status": "active"}` or `{"status": "returned", "at": ...}`
    #[schema(value_type = Object)]
    pub state: LoanState,
}

impl Checkout {
    /// A freshly created checkout is always active
    pub fn new(id: i32, user_id: i32, book_id: i32, checked_out_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            book_id,
            checked_out_at,
            state: LoanState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == LoanState::Active
    }

    /// Moves an active checkout to `Returned`. Returns false if it was
    /// already returned, in which case nothing changes.
    pub fn mark_returned(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_active() {
            self.state = LoanState::Returned { at };
            true
        } else {
            false
        }
    }
}

/// Checkout joined with its book and borrower, for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CheckoutRecord {
    pub id: i32,
    pub checked_out_at: DateTime<Utc>,
    /// `{"status": "active"}` or `{"status": "returned", "at": ...}`
    #[schema(value_type = Object)]
    pub state: LoanState,
    pub book: BookSummary,
    pub student: StudentInfo,
}

/// Flat row for the joined checkout listing queries
#[derive(Debug, Clone, FromRow)]
pub struct CheckoutRecordRow {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub checked_out_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub image_url: Option<String>,
    pub name: String,
    pub registration_number: Option<String>,
}

impl From<CheckoutRecordRow> for CheckoutRecord {
    fn from(row: CheckoutRecordRow) -> Self {
        Self {
            id: row.id,
            checked_out_at: row.checked_out_at,
            state: row.returned_at.into(),
            book: BookSummary {
                id: row.book_id,
                title: row.title,
                author: row.author,
                isbn: row.isbn,
                image_url: row.image_url,
            },
            student: StudentInfo {
                id: row.user_id,
                name: row.name,
                registration_number: row.registration_number.unwrap_or_default(),
            },
        }
    }
}

/// Result of a successful checkout or return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LoanReceipt {
    pub book: Book,
    pub student: StudentInfo,
}
