use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use orderflow_core::error::StoreError;
use orderflow_domain::event::{OrderEmailSentEvent, WireEvent};

use crate::domain::repository::{EmailSentPort, OutboxRepository};
use crate::domain::types::{OutboxFailure, PendingOutboxEvent};

/// Counts for one relay pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelaySummary {
    pub published: usize,
    /// Failed this pass, scheduled for another attempt.
    pub retrying: usize,
    /// Failed for good.
    pub failed: usize,
}

/// Publish due outbox rows and record the outcome of each.
///
/// Rows are relayed at least once: a crash between publish and
/// `mark_processed` republishes the same event id, which consumers absorb.
pub struct RelayOutboxUseCase<R: OutboxRepository, P: EmailSentPort> {
    pub repo: R,
    pub events: P,
    pub batch_size: u64,
    pub max_attempts: i32,
}

impl<R: OutboxRepository, P: EmailSentPort> RelayOutboxUseCase<R, P> {
    /// One pass over the due rows.
    pub async fn execute(&self) -> Result<RelaySummary, StoreError> {
        let due = self.repo.fetch_due(Utc::now(), self.batch_size).await?;
        let mut summary = RelaySummary::default();

        for pending in &due {
            match self.relay(pending).await {
                Ok(()) => {
                    self.repo.mark_processed(pending.id, Utc::now()).await?;
                    summary.published += 1;
                }
                Err(failure) => {
                    self.repo.record_failure(pending.id, &failure).await?;
                    if failure.failed_at.is_some() {
                        tracing::error!(
                            outbox_id = %pending.id,
                            kind = %pending.kind,
                            attempts = failure.attempts,
                            error = %failure.last_error,
                            "outbox event failed permanently"
                        );
                        summary.failed += 1;
                    } else {
                        tracing::warn!(
                            outbox_id = %pending.id,
                            kind = %pending.kind,
                            attempts = failure.attempts,
                            next_attempt_at = %failure.next_attempt_at,
                            error = %failure.last_error,
                            "outbox publish failed, will retry"
                        );
                        summary.retrying += 1;
                    }
                }
            }
        }

        Ok(summary)
    }

    async fn relay(&self, pending: &PendingOutboxEvent) -> Result<(), OutboxFailure> {
        if pending.kind != OrderEmailSentEvent::KIND {
            let error = format!("unknown outbox event kind '{}'", pending.kind);
            return Err(OutboxFailure::permanent(pending, error, Utc::now()));
        }
        let event: OrderEmailSentEvent = serde_json::from_value(pending.payload.clone())
            .map_err(|e| OutboxFailure::permanent(pending, format!("invalid payload: {e}"), Utc::now()))?;

        self.events
            .publish_email_sent(&event)
            .await
            .map_err(|e| OutboxFailure::after(pending, e.to_string(), self.max_attempts, Utc::now()))
    }

    /// Poll every `interval` until `cancel` fires.
    ///
    /// Store errors end the pass, not the loop.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) {
        tracing::info!(interval_ms = interval.as_millis() as u64, "outbox relay started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.execute().await {
                Ok(summary) if summary != RelaySummary::default() => {
                    tracing::info!(
                        published = summary.published,
                        retrying = summary.retrying,
                        failed = summary.failed,
                        "outbox pass finished"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "outbox pass aborted"),
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        tracing::info!("outbox relay stopped");
    }
}
