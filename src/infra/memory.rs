//! In-process implementations of the storage and job-queue ports.
//!
//! Same semantics as the Postgres implementations (monotonic status writes,
//! dedup of active jobs), minus durability. Used by tests and local runs.

use {
    crate::domain::{
        error::LifecycleError,
        id::{PaymentId, RefundId},
        job::{Job, JobRow, JobStatus},
        payment::{NewPayment, Payment, PaymentStatus, StatusChange},
        provider::BoxFuture,
        refund::{NewRefund, Refund},
        store::{JobStore, PaymentStore},
    },
    chrono::{DateTime, Utc},
    std::{collections::HashMap, sync::Arc, time::Duration},
    tokio::sync::RwLock,
    uuid::Uuid,
};

/// A thread-safe in-memory payment/refund store.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    payments: Arc<RwLock<HashMap<PaymentId, Payment>>>,
    refunds: Arc<RwLock<HashMap<RefundId, Refund>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn payment_count(&self) -> usize {
        self.payments.read().await.len()
    }
}

fn advance(
    current: &mut PaymentStatus,
    reason_slot: &mut Option<String>,
    next: PaymentStatus,
    reason: Option<&str>,
) -> StatusChange {
    if *current == next {
        return StatusChange::Unchanged;
    }
    if !current.can_transition_to(&next) {
        return StatusChange::Rejected { current: *current };
    }
    let from = *current;
    *current = next;
    *reason_slot = reason.map(str::to_owned);
    StatusChange::Advanced { from }
}

impl PaymentStore for InMemoryStore {
    fn insert_payment<'a>(
        &'a self,
        payment: &'a NewPayment,
    ) -> BoxFuture<'a, Result<(), LifecycleError>> {
        Box::pin(async move {
            let mut payments = self.payments.write().await;
            if payments.contains_key(payment.id()) {
                return Err(LifecycleError::Validation(format!(
                    "payment {} already exists",
                    payment.id()
                )));
            }
            let now = Utc::now();
            payments.insert(
                payment.id().clone(),
                Payment {
                    id: payment.id().clone(),
                    order_ref: payment.order_ref().to_owned(),
                    user_ref: payment.user_ref().to_owned(),
                    money: *payment.money(),
                    description: payment.description().to_owned(),
                    status: payment.status(),
                    cancellation_reason: None,
                    retry_of: payment.retry_of().cloned(),
                    attempt: payment.attempt(),
                    created_at: now,
                    updated_at: now,
                },
            );
            Ok(())
        })
    }

    fn get_payment<'a>(
        &'a self,
        id: &'a PaymentId,
    ) -> BoxFuture<'a, Result<Option<Payment>, LifecycleError>> {
        Box::pin(async move { Ok(self.payments.read().await.get(id).cloned()) })
    }

    fn payment_ids_by_status(
        &self,
        status: PaymentStatus,
    ) -> BoxFuture<'_, Result<Vec<PaymentId>, LifecycleError>> {
        Box::pin(async move {
            let payments = self.payments.read().await;
            let mut matching: Vec<&Payment> =
                payments.values().filter(|p| p.status == status).collect();
            matching.sort_by_key(|p| p.created_at);
            Ok(matching.into_iter().map(|p| p.id.clone()).collect())
        })
    }

    fn update_payment_status<'a>(
        &'a self,
        id: &'a PaymentId,
        status: PaymentStatus,
        cancellation_reason: Option<&'a str>,
    ) -> BoxFuture<'a, Result<StatusChange, LifecycleError>> {
        Box::pin(async move {
            let mut payments = self.payments.write().await;
            let Some(payment) = payments.get_mut(id) else {
                return Ok(StatusChange::Untracked);
            };
            let change = advance(
                &mut payment.status,
                &mut payment.cancellation_reason,
                status,
                cancellation_reason,
            );
            if change.advanced() {
                payment.updated_at = Utc::now();
            }
            Ok(change)
        })
    }

    fn insert_refund<'a>(
        &'a self,
        refund: &'a NewRefund,
    ) -> BoxFuture<'a, Result<(), LifecycleError>> {
        Box::pin(async move {
            let mut refunds = self.refunds.write().await;
            if refunds.contains_key(&refund.id) {
                return Err(LifecycleError::Validation(format!(
                    "refund {} already exists",
                    refund.id
                )));
            }
            refunds.insert(
                refund.id.clone(),
                Refund {
                    id: refund.id.clone(),
                    payment_id: refund.payment_id.clone(),
                    money: refund.money,
                    description: refund.description.clone(),
                    status: PaymentStatus::Pending,
                    cancellation_reason: None,
                    created_at: Utc::now(),
                },
            );
            Ok(())
        })
    }

    fn get_refund<'a>(
        &'a self,
        id: &'a RefundId,
    ) -> BoxFuture<'a, Result<Option<Refund>, LifecycleError>> {
        Box::pin(async move { Ok(self.refunds.read().await.get(id).cloned()) })
    }

    fn update_refund_status<'a>(
        &'a self,
        id: &'a RefundId,
        status: PaymentStatus,
        cancellation_reason: Option<&'a str>,
    ) -> BoxFuture<'a, Result<StatusChange, LifecycleError>> {
        Box::pin(async move {
            let mut refunds = self.refunds.write().await;
            let Some(refund) = refunds.get_mut(id) else {
                return Ok(StatusChange::Untracked);
            };
            Ok(advance(
                &mut refund.status,
                &mut refund.cancellation_reason,
                status,
                cancellation_reason,
            ))
        })
    }
}

/// Snapshot of a queued job, for inspection.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: Uuid,
    pub job: Job,
    pub status: JobStatus,
    pub attempts: i32,
    pub scheduled_at: DateTime<Utc>,
    pub last_error: Option<String>,
    updated_at: DateTime<Utc>,
}

#[derive(Default, Clone)]
pub struct InMemoryJobQueue {
    jobs: Arc<RwLock<Vec<QueuedJob>>>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every job ever enqueued, in enqueue order.
    pub async fn snapshot(&self) -> Vec<QueuedJob> {
        self.jobs.read().await.clone()
    }

    /// Makes every pending job due immediately.
    pub async fn fast_forward(&self) {
        let now = Utc::now();
        for job in self.jobs.write().await.iter_mut() {
            if job.status == JobStatus::Pending {
                job.scheduled_at = now;
            }
        }
    }

    fn is_active(status: JobStatus) -> bool {
        matches!(status, JobStatus::Pending | JobStatus::Processing)
    }

    async fn set_status(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut QueuedJob),
    ) -> Result<(), LifecycleError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| LifecycleError::NotFound(format!("job {id}")))?;
        f(job);
        job.updated_at = Utc::now();
        Ok(())
    }
}

impl JobStore for InMemoryJobQueue {
    fn enqueue<'a>(
        &'a self,
        job: &'a Job,
        run_at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<bool, LifecycleError>> {
        Box::pin(async move {
            let mut jobs = self.jobs.write().await;
            let key = job.dedup_key();
            if jobs
                .iter()
                .any(|j| Self::is_active(j.status) && j.job.dedup_key() == key)
            {
                return Ok(false);
            }
            jobs.push(QueuedJob {
                id: Uuid::now_v7(),
                job: job.clone(),
                status: JobStatus::Pending,
                attempts: 0,
                scheduled_at: run_at,
                last_error: None,
                updated_at: Utc::now(),
            });
            Ok(true)
        })
    }

    fn claim(&self, limit: i64) -> BoxFuture<'_, Result<Vec<JobRow>, LifecycleError>> {
        Box::pin(async move {
            let now = Utc::now();
            let mut jobs = self.jobs.write().await;
            let mut due: Vec<&mut QueuedJob> = jobs
                .iter_mut()
                .filter(|j| j.status == JobStatus::Pending && j.scheduled_at <= now)
                .collect();
            due.sort_by_key(|j| j.scheduled_at);

            let limit = usize::try_from(limit).unwrap_or(0);
            Ok(due
                .into_iter()
                .take(limit)
                .map(|j| {
                    j.status = JobStatus::Processing;
                    j.updated_at = now;
                    JobRow {
                        id: j.id,
                        job: j.job.clone(),
                        attempts: j.attempts,
                        scheduled_at: j.scheduled_at,
                    }
                })
                .collect())
        })
    }

    fn complete(&self, id: Uuid) -> BoxFuture<'_, Result<(), LifecycleError>> {
        Box::pin(self.set_status(id, |j| {
            j.status = JobStatus::Completed;
            j.attempts += 1;
        }))
    }

    fn reschedule(
        &self,
        id: Uuid,
        run_at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<(), LifecycleError>> {
        Box::pin(self.set_status(id, move |j| {
            j.status = JobStatus::Pending;
            j.attempts += 1;
            j.scheduled_at = run_at;
        }))
    }

    fn fail<'a>(&'a self, id: Uuid, error: &'a str) -> BoxFuture<'a, Result<(), LifecycleError>> {
        Box::pin(self.set_status(id, move |j| {
            j.status = JobStatus::Failed;
            j.attempts += 1;
            j.last_error = Some(error.to_owned());
        }))
    }

    fn reap_stale(&self, max_age: Duration) -> BoxFuture<'_, Result<u64, LifecycleError>> {
        Box::pin(async move {
            let cutoff = Utc::now()
                - chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::zero());
            let mut reaped = 0;
            for job in self.jobs.write().await.iter_mut() {
                if job.status == JobStatus::Processing && job.updated_at < cutoff {
                    job.status = JobStatus::Pending;
                    job.updated_at = Utc::now();
                    reaped += 1;
                }
            }
            Ok(reaped)
        })
    }
}
