use {
    super::{LifecycleContext, poller},
    crate::domain::{error::LifecycleError, payment::PaymentStatus},
    tokio::task::JoinSet,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub dispatched: usize,
    /// Checks that reached the gateway and wrote a status.
    pub succeeded: usize,
    pub failed: usize,
}

/// Startup reconciliation: one one-shot check per locally pending payment,
/// all in flight at once. Returns after every check has finished; a failing
/// or panicking check does not stop the others.
#[tracing::instrument(skip(ctx))]
pub async fn run_reconciliation_sweep(ctx: &LifecycleContext) -> Result<SweepReport, LifecycleError> {
    let pending = ctx.store.payment_ids_by_status(PaymentStatus::Pending).await?;

    let mut checks = JoinSet::new();
    for id in pending {
        let ctx = ctx.clone();
        checks.spawn(async move {
            let outcome = poller::check_payment_once(&ctx, &id).await;
            (id, outcome)
        });
    }

    let mut report = SweepReport {
        dispatched: checks.len(),
        ..SweepReport::default()
    };
    tracing::info!(dispatched = report.dispatched, "reconciliation sweep started");

    while let Some(joined) = checks.join_next().await {
        match joined {
            Ok((id, Ok(result))) => {
                report.succeeded += 1;
                tracing::debug!(payment_id = %id, status = %result.status, "reconciled");
            }
            Ok((id, Err(e))) => {
                report.failed += 1;
                tracing::warn!(payment_id = %id, error = %e, "reconciliation check failed");
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!(error = %e, "reconciliation check panicked");
            }
        }
    }

    tracing::info!(
        dispatched = report.dispatched,
        succeeded = report.succeeded,
        failed = report.failed,
        "reconciliation sweep finished"
    );
    Ok(report)
}
