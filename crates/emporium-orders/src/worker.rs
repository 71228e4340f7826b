//! # Notification Worker
//!
//! Drains the payment notification inbox through the reconciler.
//!
//! ## Processing Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   wake (webhook) ─┐                                                     │
//! │   poll interval ──┼──► drain: claim_next ──► reconcile                  │
//! │   shutdown ───────┘         (lease)            │                        │
//! │                                                ├─ Ok ──────► processed  │
//! │                                                ├─ permanent ► rejected  │
//! │                                                └─ transient             │
//! │                                                     │                   │
//! │                       attempts < max_attempts ◄─────┤                   │
//! │                       retry at now + backoff        │                   │
//! │                                                     └──────► failed     │
//! │                                                                         │
//! │   If the inbox itself is unreachable the loop backs off exponentially   │
//! │   before the next drain.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};

use emporium_core::QueuedNotification;
use emporium_db::{DbResult, NotificationRepository};

use crate::config::WorkerSettings;
use crate::error::{ReconcileError, WorkerError};
use crate::reconciler::{NotificationReconciler, ReconcileOutcome};

/// Whatever turns a raw payload into an order change.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn handle(&self, payload: &str) -> Result<ReconcileOutcome, ReconcileError>;
}

#[async_trait]
impl NotificationHandler for NotificationReconciler {
    async fn handle(&self, payload: &str) -> Result<ReconcileOutcome, ReconcileError> {
        self.reconcile(payload).await
    }
}

/// What happened to one claimed inbox row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Processed(ReconcileOutcome),
    Rejected,
    Retrying { next_attempt_at: DateTime<Utc> },
    Failed,
}

pub struct NotificationWorker {
    inbox: NotificationRepository,
    handler: Arc<dyn NotificationHandler>,
    settings: WorkerSettings,
    wake: Arc<Notify>,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for waking and stopping the worker.
#[derive(Clone)]
pub struct NotificationWorkerHandle {
    wake: Arc<Notify>,
    shutdown_tx: mpsc::Sender<()>,
}

impl NotificationWorkerHandle {
    /// Asks the worker to drain now instead of waiting for the next poll.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    pub async fn shutdown(&self) -> Result<(), WorkerError> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| WorkerError::ChannelClosed("shutdown".into()))
    }
}

impl NotificationWorker {
    pub fn new(
        inbox: NotificationRepository,
        handler: Arc<dyn NotificationHandler>,
        settings: WorkerSettings,
    ) -> (Self, NotificationWorkerHandle) {
        let wake = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let worker = NotificationWorker {
            inbox,
            handler,
            settings,
            wake: wake.clone(),
            shutdown_rx,
        };

        (worker, NotificationWorkerHandle { wake, shutdown_tx })
    }

    /// Runs until shutdown. Spawn as a background task.
    pub async fn run(mut self) {
        info!(
            poll_interval_secs = self.settings.poll_interval_secs,
            max_attempts = self.settings.max_attempts,
            "Notification worker starting"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(self.settings.poll_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut backoff = self.create_backoff();

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.wake.notified() => {}
                _ = self.shutdown_rx.recv() => {
                    info!("Notification worker shutting down");
                    break;
                }
            }

            match self.drain().await {
                Ok(count) => {
                    backoff.reset();
                    if count > 0 {
                        debug!(count, "Drained payment notifications");
                    }
                }
                Err(e) => {
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or(Duration::from_secs(self.settings.max_backoff_secs));
                    error!(?e, delay_ms = delay.as_millis() as u64, "Notification inbox unavailable");

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.shutdown_rx.recv() => {
                            info!("Notification worker shutting down");
                            break;
                        }
                    }
                }
            }
        }

        info!("Notification worker stopped");
    }

    /// Processes due rows until none remain or a batch is done.
    pub async fn drain(&self) -> DbResult<usize> {
        let mut count = 0;
        while count < self.settings.batch_size {
            match self.process_next(Utc::now()).await? {
                Some(_) => count += 1,
                None => return Ok(count),
            }
        }

        // More may be due; come back without waiting for the poll.
        self.wake.notify_one();
        Ok(count)
    }

    /// Claims and processes one row due at `now`.
    pub async fn process_next(&self, now: DateTime<Utc>) -> DbResult<Option<Disposition>> {
        let lease = chrono::Duration::seconds(self.settings.lease_secs as i64);
        let Some(item) = self.inbox.claim_next(now, lease).await? else {
            return Ok(None);
        };

        let disposition = match self.handler.handle(&item.payload).await {
            Ok(outcome) => {
                self.inbox.mark_processed(&item.id).await?;
                Disposition::Processed(outcome)
            }
            Err(e) if e.is_permanent() => {
                warn!(
                    id = %item.id,
                    error = %e,
                    payload = %item.payload,
                    "Payment notification rejected"
                );
                self.inbox.mark_rejected(&item.id, &e.to_string()).await?;
                Disposition::Rejected
            }
            Err(e) => self.retry_or_fail(&item, &e, now).await?,
        };

        Ok(Some(disposition))
    }

    async fn retry_or_fail(
        &self,
        item: &QueuedNotification,
        err: &ReconcileError,
        now: DateTime<Utc>,
    ) -> DbResult<Disposition> {
        if item.attempts >= i64::from(self.settings.max_attempts) {
            error!(
                id = %item.id,
                attempts = item.attempts,
                error = %err,
                payload = %item.payload,
                "Payment notification failed permanently after retries"
            );
            self.inbox.mark_failed(&item.id, &err.to_string()).await?;
            return Ok(Disposition::Failed);
        }

        let attempts = u32::try_from(item.attempts).unwrap_or(u32::MAX);
        let delay = self.settings.retry_delay(attempts);
        let next_attempt_at = now
            + chrono::Duration::from_std(delay)
                .unwrap_or_else(|_| chrono::Duration::seconds(self.settings.max_backoff_secs as i64));

        warn!(
            id = %item.id,
            attempts = item.attempts,
            error = %err,
            %next_attempt_at,
            "Payment notification will be retried"
        );
        self.inbox.schedule_retry(&item.id, &err.to_string(), next_attempt_at).await?;
        Ok(Disposition::Retrying { next_attempt_at })
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(self.settings.initial_backoff_ms),
            max_interval: Duration::from_secs(self.settings.max_backoff_secs),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}
