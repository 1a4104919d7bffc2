//! Error types for BookNexus server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes exposed in error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchStudent = 4,
    NoSuchBook = 5,
    BookNotAvailable = 7,
    MaxBorrowsReached = 11,
    BadValue = 18,
    NoActiveCheckout = 22,
}

/// Outcomes of a loan ledger operation other than success.
///
/// The display strings are shown verbatim to librarians, keep them stable.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Book not found")]
    BookNotFound,

    #[error("Student not found with this registration number")]
    StudentNotFound,

    #[error("The student has borrowed 3 books!")]
    LimitExceeded,

    #[error("Book is not available")]
    Unavailable,

    #[error("No active checkout found for this student and book")]
    NoActiveCheckout,

    #[error("Store failure: {0}")]
    Store(#[from] sqlx::Error),
}

impl LedgerError {
    /// True for the expected, caller-recoverable outcomes.
    pub fn is_domain(&self) -> bool {
        !matches!(self, LedgerError::Store(_))
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

fn database_failure(e: &sqlx::Error) -> (StatusCode, ErrorCode, String) {
    tracing::error!("Database error: {:?}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::DbFailure,
        "Database error".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Ledger(e) => {
                let message = e.to_string();
                match e {
                    LedgerError::BookNotFound => {
                        (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook, message)
                    }
                    LedgerError::StudentNotFound => {
                        (StatusCode::NOT_FOUND, ErrorCode::NoSuchStudent, message)
                    }
                    LedgerError::NoActiveCheckout => {
                        (StatusCode::NOT_FOUND, ErrorCode::NoActiveCheckout, message)
                    }
                    LedgerError::LimitExceeded => {
                        (StatusCode::BAD_REQUEST, ErrorCode::MaxBorrowsReached, message)
                    }
                    LedgerError::Unavailable => {
                        (StatusCode::BAD_REQUEST, ErrorCode::BookNotAvailable, message)
                    }
                    LedgerError::Store(e) => database_failure(e),
                }
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for loan ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
