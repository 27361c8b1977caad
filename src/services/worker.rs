use {
    super::{LifecycleContext, poller, retry},
    crate::domain::{
        error::LifecycleError,
        job::{Job, JobOutcome},
        payment::PollMode,
        store::JobStore,
    },
    std::{sync::Arc, time::Duration},
    tokio::{sync::watch, task::JoinSet},
};

/// Jobs left in processing this long are assumed orphaned by a crash.
pub const STALE_JOB_AGE: Duration = Duration::from_secs(120);

/// Poll for due jobs and run them until shutdown is signalled.
pub async fn run_worker(
    ctx: LifecycleContext,
    batch_size: i64,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!("job worker started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("job worker shutting down");
                return;
            }
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        }

        if let Err(e) = poll_once(&ctx, batch_size).await {
            tracing::error!(error = %e, "worker poll error");
        }
    }
}

/// Claims one batch, runs it concurrently and settles every row. Returns the
/// number of jobs claimed. Every task is joined even when settling a row
/// fails; the first settle error is returned afterwards.
pub async fn poll_once(ctx: &LifecycleContext, batch_size: i64) -> Result<usize, LifecycleError> {
    let jobs = ctx.jobs.claim(batch_size).await?;
    let claimed = jobs.len();

    let mut running = JoinSet::new();
    for row in jobs {
        let ctx = ctx.clone();
        running.spawn(async move {
            let outcome = run_job(&ctx, &row.job).await;
            (row, outcome)
        });
    }

    let mut first_error = None;
    while let Some(joined) = running.join_next().await {
        let (row, outcome) = match joined {
            Ok(done) => done,
            Err(e) => {
                // The row stays in processing until the reaper releases it.
                tracing::error!(error = %e, "job task panicked");
                continue;
            }
        };

        let settled = match outcome {
            Ok(JobOutcome::Done) => {
                tracing::debug!(job_id = %row.id, kind = row.job.kind(), "job done");
                ctx.jobs.complete(row.id).await
            }
            Ok(JobOutcome::RunAgainAt(at)) => {
                tracing::debug!(job_id = %row.id, attempts = row.attempts, %at, "job rescheduled");
                ctx.jobs.reschedule(row.id, at).await
            }
            Err(e) => {
                tracing::error!(job_id = %row.id, kind = row.job.kind(), error = %e, "job failed");
                ctx.jobs.fail(row.id, &e.to_string()).await
            }
        };

        if let Err(e) = settled {
            tracing::error!(job_id = %row.id, error = %e, "could not settle job, leaving it to the reaper");
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(claimed),
    }
}

#[tracing::instrument(skip(ctx, job), fields(kind = job.kind()))]
pub async fn run_job(ctx: &LifecycleContext, job: &Job) -> Result<JobOutcome, LifecycleError> {
    match job {
        Job::CheckPayment { payment_id } => {
            let observation =
                poller::observe_payment(ctx, payment_id, PollMode::RunToTerminal).await?;
            Ok(observation.outcome)
        }
        Job::RetryPayment(request) => {
            retry::execute_retry(ctx, request).await?;
            Ok(JobOutcome::Done)
        }
        Job::CheckRefund { refund_id } => poller::observe_refund(ctx, refund_id).await,
    }
}

/// Periodically reset jobs stuck in processing back to pending.
pub async fn run_reaper(jobs: Arc<dyn JobStore>, mut shutdown: watch::Receiver<bool>) {
    tracing::info!("stale job reaper started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("stale job reaper shutting down");
                return;
            }
            _ = tokio::time::sleep(Duration::from_secs(60)) => {}
        }

        match jobs.reap_stale(STALE_JOB_AGE).await {
            Ok(0) => {}
            Ok(n) => tracing::info!(count = n, "reaped stale jobs"),
            Err(e) => tracing::error!(error = %e, "reaper error"),
        }
    }
}
