//! Book model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Catalog book with its copy counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub image_url: Option<String>,
    pub subject: Option<String>,
    pub research_area: Option<String>,
    pub location: Option<String>,
    pub total_copies: i32,
    /// Always within `0..=total_copies`
    pub available_copies: i32,
    pub description: Option<String>,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    /// Counter value after applying `delta`, if it stays within bounds
    pub fn adjusted_available(&self, delta: i32) -> Option<i32> {
        let next = self.available_copies.checked_add(delta)?;
        (0..=self.total_copies).contains(&next).then_some(next)
    }

    pub fn summary(&self) -> BookSummary {
        BookSummary {
            id: self.id,
            title: self.title.clone(),
            author: self.author.clone(),
            isbn: self.isbn.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

/// Short book representation embedded in checkout listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BookSummary {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(total: i32, available: i32) -> Book {
        Book {
            id: 1,
            title: "Eloquent JavaScript".to_string(),
            author: "Marijn Haverbeke".to_string(),
            isbn: "9781593279509".to_string(),
            image_url: None,
            subject: None,
            research_area: None,
            location: None,
            total_copies: total,
            available_copies: available,
            description: None,
        }
    }

    #[test]
    fn test_adjusted_available_bounds() {
        let b = book(2, 1);
        assert_eq!(b.adjusted_available(-1), Some(0));
        assert_eq!(b.adjusted_available(1), Some(2));
        assert_eq!(b.adjusted_available(2), None);
        assert_eq!(book(2, 0).adjusted_available(-1), None);
    }

    #[test]
    fn test_is_available() {
        assert!(book(3, 1).is_available());
        assert!(!book(3, 0).is_available());
    }
}
