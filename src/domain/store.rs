use {
    super::error::LifecycleError,
    super::id::{PaymentId, RefundId},
    super::job::{Job, JobRow},
    super::payment::{NewPayment, Payment, PaymentStatus, StatusChange},
    super::provider::BoxFuture,
    super::refund::{NewRefund, Refund},
    chrono::{DateTime, Utc},
    std::time::Duration,
};

/// Local record of payments and refunds. Status writes are monotonic: an
/// implementation must never move a record out of a terminal state.
pub trait PaymentStore: Send + Sync {
    fn insert_payment<'a>(&'a self, payment: &'a NewPayment)
    -> BoxFuture<'a, Result<(), LifecycleError>>;

    fn get_payment<'a>(
        &'a self,
        id: &'a PaymentId,
    ) -> BoxFuture<'a, Result<Option<Payment>, LifecycleError>>;

    fn payment_ids_by_status(
        &self,
        status: PaymentStatus,
    ) -> BoxFuture<'_, Result<Vec<PaymentId>, LifecycleError>>;

    fn update_payment_status<'a>(
        &'a self,
        id: &'a PaymentId,
        status: PaymentStatus,
        cancellation_reason: Option<&'a str>,
    ) -> BoxFuture<'a, Result<StatusChange, LifecycleError>>;

    fn insert_refund<'a>(&'a self, refund: &'a NewRefund)
    -> BoxFuture<'a, Result<(), LifecycleError>>;

    fn get_refund<'a>(
        &'a self,
        id: &'a RefundId,
    ) -> BoxFuture<'a, Result<Option<Refund>, LifecycleError>>;

    fn update_refund_status<'a>(
        &'a self,
        id: &'a RefundId,
        status: PaymentStatus,
        cancellation_reason: Option<&'a str>,
    ) -> BoxFuture<'a, Result<StatusChange, LifecycleError>>;
}

/// Durable background-job queue.
pub trait JobStore: Send + Sync {
    /// Returns `false` if an active job with the same dedup key already exists.
    fn enqueue<'a>(
        &'a self,
        job: &'a Job,
        run_at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<bool, LifecycleError>>;

    /// Claim up to `limit` due jobs, marking them processing.
    fn claim(&self, limit: i64) -> BoxFuture<'_, Result<Vec<JobRow>, LifecycleError>>;

    fn complete(&self, id: uuid::Uuid) -> BoxFuture<'_, Result<(), LifecycleError>>;

    /// Put a processing job back to pending, due at `run_at`.
    fn reschedule(
        &self,
        id: uuid::Uuid,
        run_at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<(), LifecycleError>>;

    /// Mark a job permanently failed.
    fn fail<'a>(
        &'a self,
        id: uuid::Uuid,
        error: &'a str,
    ) -> BoxFuture<'a, Result<(), LifecycleError>>;

    /// Reset jobs stuck in processing for longer than `max_age`.
    fn reap_stale(&self, max_age: Duration) -> BoxFuture<'_, Result<u64, LifecycleError>>;
}
