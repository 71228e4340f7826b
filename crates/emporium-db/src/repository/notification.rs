//! # Payment Notification Inbox
//!
//! Durable storage between the webhook and the reconciliation worker.
//!
//! ## Row Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  webhook ──enqueue──► pending ──claim_next──► processing                │
//! │                          ▲                        │                     │
//! │                          │ schedule_retry         ├──► processed        │
//! │                          └────────────────────────┤                     │
//! │                                                   ├──► rejected         │
//! │                                                   └──► failed           │
//! │                                                                         │
//! │  A claim holds a lease (locked_until). If the worker dies mid-row the   │
//! │  lease expires and the row becomes claimable again.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::sql_timestamp;
use emporium_core::{QueueStatus, QueuedNotification};

const NOTIFICATION_COLUMNS: &str =
    "id, payload, status, attempts, last_error, received_at, next_attempt_at, processed_at";

#[derive(Debug, Clone, sqlx::FromRow)]
struct NotificationRow {
    id: String,
    payload: String,
    status: QueueStatus,
    attempts: i64,
    last_error: Option<String>,
    received_at: DateTime<Utc>,
    next_attempt_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl From<NotificationRow> for QueuedNotification {
    fn from(row: NotificationRow) -> Self {
        QueuedNotification {
            id: row.id,
            payload: row.payload,
            status: row.status,
            attempts: row.attempts,
            last_error: row.last_error,
            received_at: row.received_at,
            next_attempt_at: row.next_attempt_at,
            processed_at: row.processed_at,
        }
    }
}

/// Repository for the payment notification inbox.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Stores a raw notification body, due immediately.
    pub async fn enqueue(&self, payload: &str) -> DbResult<QueuedNotification> {
        let id = Uuid::new_v4().to_string();
        let now = sql_timestamp(Utc::now());

        debug!(id = %id, bytes = payload.len(), "Queuing payment notification");

        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            INSERT INTO payment_notifications (
                id, payload, status, attempts, received_at, next_attempt_at
            ) VALUES (?1, ?2, ?3, 0, ?4, ?4)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(payload)
        .bind(QueueStatus::Pending)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Claims the oldest due row and leases it for `lease`.
    ///
    /// Due means pending with `next_attempt_at <= now`, or processing with
    /// an expired lease. The claim counts as an attempt.
    pub async fn claim_next(&self, now: DateTime<Utc>, lease: Duration) -> DbResult<Option<QueuedNotification>> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            UPDATE payment_notifications
            SET status = ?1, attempts = attempts + 1, locked_until = ?2
            WHERE id = (
                SELECT id FROM payment_notifications
                WHERE (status = ?3 AND next_attempt_at <= ?4)
                   OR (status = ?1 AND locked_until <= ?4)
                ORDER BY received_at ASC
                LIMIT 1
            )
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(QueueStatus::Processing)
        .bind(sql_timestamp(now + lease))
        .bind(QueueStatus::Pending)
        .bind(sql_timestamp(now))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = &row {
            debug!(id = %row.id, attempts = row.attempts, "Claimed payment notification");
        }
        Ok(row.map(QueuedNotification::from))
    }

    pub async fn mark_processed(&self, id: &str) -> DbResult<()> {
        self.finish(id, QueueStatus::Processed, None).await
    }

    /// Terminal: the payload can never succeed.
    pub async fn mark_rejected(&self, id: &str, error: &str) -> DbResult<()> {
        self.finish(id, QueueStatus::Rejected, Some(error)).await
    }

    /// Terminal: transient failures exhausted the retry budget.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        self.finish(id, QueueStatus::Failed, Some(error)).await
    }

    /// Releases the lease and makes the row due again at `next_attempt_at`.
    pub async fn schedule_retry(&self, id: &str, error: &str, next_attempt_at: DateTime<Utc>) -> DbResult<()> {
        debug!(id = %id, next_attempt_at = %next_attempt_at, "Scheduling notification retry");

        let result = sqlx::query(
            r#"
            UPDATE payment_notifications
            SET status = ?2, last_error = ?3, next_attempt_at = ?4, locked_until = NULL
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(QueueStatus::Pending)
        .bind(error)
        .bind(sql_timestamp(next_attempt_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PaymentNotification", id));
        }
        Ok(())
    }

    async fn finish(&self, id: &str, status: QueueStatus, error: Option<&str>) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE payment_notifications
            SET status = ?2, last_error = COALESCE(?3, last_error),
                processed_at = ?4, locked_until = NULL
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(error)
        .bind(sql_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PaymentNotification", id));
        }
        Ok(())
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<QueuedNotification>> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM payment_notifications WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(QueuedNotification::from))
    }

    pub async fn count_by_status(&self, status: QueueStatus) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payment_notifications WHERE status = ?1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn repo() -> NotificationRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.notifications()
    }

    #[tokio::test]
    async fn test_enqueue_and_claim() {
        let repo = repo().await;
        let queued = repo.enqueue(r#"{"order_id":"INV-20261016-0001"}"#).await.unwrap();
        assert_eq!(queued.status, QueueStatus::Pending);

        let claimed = repo
            .claim_next(Utc::now() + Duration::seconds(1), Duration::seconds(30))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, queued.id);
        assert_eq!(claimed.status, QueueStatus::Processing);
        assert_eq!(claimed.attempts, 1);

        // Leased rows are not handed out twice.
        assert!(repo
            .claim_next(Utc::now() + Duration::seconds(1), Duration::seconds(30))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_expired_lease_is_reclaimed() {
        let repo = repo().await;
        let queued = repo.enqueue("{}").await.unwrap();
        let now = Utc::now() + Duration::seconds(1);

        repo.claim_next(now, Duration::seconds(30)).await.unwrap().unwrap();
        let reclaimed = repo
            .claim_next(now + Duration::seconds(31), Duration::seconds(30))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reclaimed.id, queued.id);
        assert_eq!(reclaimed.attempts, 2);
    }

    #[tokio::test]
    async fn test_retry_respects_next_attempt() {
        let repo = repo().await;
        let queued = repo.enqueue("{}").await.unwrap();
        let now = Utc::now() + Duration::seconds(1);

        repo.claim_next(now, Duration::seconds(30)).await.unwrap().unwrap();
        repo.schedule_retry(&queued.id, "database is locked", now + Duration::seconds(10))
            .await
            .unwrap();

        assert!(repo.claim_next(now, Duration::seconds(30)).await.unwrap().is_none());
        let retried = repo
            .claim_next(now + Duration::seconds(10), Duration::seconds(30))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(retried.last_error.as_deref(), Some("database is locked"));
    }

    #[tokio::test]
    async fn test_terminal_states() {
        let repo = repo().await;
        let a = repo.enqueue("{}").await.unwrap();
        let b = repo.enqueue("{}").await.unwrap();

        repo.mark_processed(&a.id).await.unwrap();
        repo.mark_rejected(&b.id, "invalid signature").await.unwrap();

        assert_eq!(repo.count_by_status(QueueStatus::Processed).await.unwrap(), 1);
        let rejected = repo.get(&b.id).await.unwrap().unwrap();
        assert_eq!(rejected.status, QueueStatus::Rejected);
        assert!(rejected.processed_at.is_some());

        assert!(repo
            .claim_next(Utc::now() + Duration::seconds(1), Duration::seconds(30))
            .await
            .unwrap()
            .is_none());
        assert!(repo.mark_processed("missing").await.unwrap_err().is_not_found());
    }
}
