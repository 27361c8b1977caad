pub mod coordinator;
pub mod poller;
pub mod retry;
pub mod sweep;
pub mod worker;

use {
    crate::domain::{
        error::LifecycleError,
        job::Job,
        notify::Notifier,
        provider::PaymentGateway,
        store::{JobStore, PaymentStore},
    },
    chrono::{DateTime, Utc},
    std::{sync::Arc, time::Duration},
};

#[derive(Debug, Clone, Copy)]
pub struct LifecycleSettings {
    /// Wait between gateway lookups of a pending payment.
    pub poll_interval: Duration,
    /// Wait between a cancellation and the replacement payment.
    pub retry_delay: Duration,
    /// Highest attempt number a retry may create.
    pub max_retry_attempts: u32,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            retry_delay: Duration::from_secs(86_400),
            max_retry_attempts: 3,
        }
    }
}

/// Everything a poller, retry or sweep needs. Cheap to clone into tasks.
#[derive(Clone)]
pub struct LifecycleContext {
    pub gateway: Arc<dyn PaymentGateway>,
    pub store: Arc<dyn PaymentStore>,
    pub jobs: Arc<dyn JobStore>,
    pub notifier: Arc<dyn Notifier>,
    pub settings: LifecycleSettings,
}

impl LifecycleContext {
    pub fn due_in(&self, delay: Duration) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero())
    }

    /// Returns `false` when an equivalent job is already queued or running.
    pub async fn schedule(&self, job: Job, at: DateTime<Utc>) -> Result<bool, LifecycleError> {
        let inserted = self.jobs.enqueue(&job, at).await?;
        if !inserted {
            tracing::debug!(dedup_key = %job.dedup_key(), "job already active, not enqueued");
        }
        Ok(inserted)
    }

    /// Delivery failures are logged and swallowed.
    pub async fn notify(&self, message: &str) {
        if let Err(e) = self.notifier.deliver(message).await {
            tracing::warn!(error = %e, "notification failed");
        }
    }
}
