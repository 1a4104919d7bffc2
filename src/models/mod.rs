//! Data models for BookNexus

pub mod book;
pub mod checkout;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookSummary};
pub use checkout::{Checkout, CheckoutRecord, LoanReceipt, LoanState, MAX_ACTIVE_CHECKOUTS};
pub use user::{Role, StudentInfo, User, UserClaims};
