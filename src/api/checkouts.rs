//! Checkout and return endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{Book, CheckoutRecord, LoanReceipt, StudentInfo},
};

use super::AuthenticatedUser;

/// Checkout or return request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoanRequest {
    /// Registration number of the borrowing student
    #[validate(length(min = 1, message = "Registration number is required"))]
    pub registration_number: String,
}

/// Checkout or return result
#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    /// Status message
    pub message: String,
    /// Book with its updated copy counters
    pub book: Book,
    pub student: StudentInfo,
}

impl LoanResponse {
    fn new(message: &str, receipt: LoanReceipt) -> Self {
        Self {
            message: message.to_string(),
            book: receipt.book,
            student: receipt.student,
        }
    }
}

/// Outstanding checkouts across the library
#[derive(Serialize, ToSchema)]
pub struct PendingReturnsResponse {
    /// Number of books not yet returned
    pub pending_count: i64,
    pub checkouts: Vec<CheckoutRecord>,
}

fn validated(request: &LoanRequest) -> AppResult<()> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))
}

/// Check out a book to a student
#[utoipa::path(
    post,
    path = "/books/{id}/checkout",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = LoanRequest,
    responses(
        (status = 200, description = "Book checked out", body = LoanResponse),
        (status = 400, description = "Loan limit reached or no copy available"),
        (status = 404, description = "Book or student not found")
    )
)]
pub async fn checkout_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
    Json(request): Json<LoanRequest>,
) -> AppResult<Json<LoanResponse>> {
    claims.require_admin()?;
    validated(&request)?;

    let receipt = state
        .services
        .ledger
        .checkout(book_id, &request.registration_number)
        .await?;

    Ok(Json(LoanResponse::new("Book checked out successfully", receipt)))
}

/// Return a book borrowed by a student
#[utoipa::path(
    put,
    path = "/books/{id}/return",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = LoanRequest,
    responses(
        (status = 200, description = "Book returned", body = LoanResponse),
        (status = 404, description = "Book, student or active checkout not found")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
    Json(request): Json<LoanRequest>,
) -> AppResult<Json<LoanResponse>> {
    claims.require_admin()?;
    validated(&request)?;

    let receipt = state
        .services
        .ledger
        .return_book(book_id, &request.registration_number)
        .await?;

    Ok(Json(LoanResponse::new("Book returned successfully", receipt)))
}

/// Books currently borrowed by the authenticated student
#[utoipa::path(
    get,
    path = "/books/my-checkouts",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active checkouts, newest first", body = Vec<CheckoutRecord>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_checkouts(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<CheckoutRecord>>> {
    claims.require_student()?;

    let checkouts = state.services.ledger.active_for_student(claims.user_id).await?;
    Ok(Json(checkouts))
}

/// All active checkouts with the number of pending returns
#[utoipa::path(
    get,
    path = "/books/active-checkouts",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending returns", body = PendingReturnsResponse)
    )
)]
pub async fn active_checkouts(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<PendingReturnsResponse>> {
    claims.require_admin()?;

    let pending = state.services.ledger.pending_returns().await?;
    Ok(Json(PendingReturnsResponse {
        pending_count: pending.pending_count,
        checkouts: pending.checkouts,
    }))
}

/// Students currently holding a book
#[utoipa::path(
    get,
    path = "/books/{id}/checkouts",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Active checkouts of the book", body = Vec<CheckoutRecord>)
    )
)]
pub async fn book_checkouts(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<Vec<CheckoutRecord>>> {
    claims.require_admin()?;

    let checkouts = state.services.ledger.active_for_book(book_id).await?;
    Ok(Json(checkouts))
}

/// Checkout history of a book, returned loans included
#[utoipa::path(
    get,
    path = "/books/{id}/checkout-history",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Checkout history of the book", body = Vec<CheckoutRecord>)
    )
)]
pub async fn book_checkout_history(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<Vec<CheckoutRecord>>> {
    claims.require_admin()?;

    let history = state.services.ledger.history_for_book(book_id).await?;
    Ok(Json(history))
}
