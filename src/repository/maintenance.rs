//! Startup reconciliation for stores that did not always enforce the
//! checkout foreign keys

use sqlx::{Pool, Postgres};

/// Rows removed by [`purge_orphaned_checkouts`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrphanReport {
    pub missing_user: u64,
    pub missing_book: u64,
}

impl OrphanReport {
    pub fn total(&self) -> u64 {
        self.missing_user + self.missing_book
    }
}

/// Delete checkouts whose user or book no longer exists
pub async fn purge_orphaned_checkouts(pool: &Pool<Postgres>) -> Result<OrphanReport, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let missing_user = sqlx::query(
        "DELETE FROM checkouts c WHERE NOT EXISTS (SELECT 1 FROM users u WHERE u.id = c.user_id)",
    )
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let missing_book = sqlx::query(
        "DELETE FROM checkouts c WHERE NOT EXISTS (SELECT 1 FROM books b WHERE b.id = c.book_id)",
    )
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    Ok(OrphanReport {
        missing_user,
        missing_book,
    })
}

/// Run the purge and log the outcome. Failures are logged, never fatal.
pub async fn reconcile_on_startup(pool: &Pool<Postgres>) {
    tracing::info!("Checking for orphaned checkout records");

    match purge_orphaned_checkouts(pool).await {
        Ok(report) if report.total() > 0 => {
            tracing::warn!(
                missing_user = report.missing_user,
                missing_book = report.missing_book,
                "Cleaned up {} orphaned checkout record(s)",
                report.total()
            );
        }
        Ok(_) => tracing::info!("No orphaned checkout records found"),
        Err(e) => tracing::error!("Error cleaning up orphaned checkouts: {:?}", e),
    }
}
