//! Status poller: one gateway lookup per call, written through the monotonic
//! store. Run-to-terminal polling is driven by the job queue re-running
//! `observe_payment` until it reports `JobOutcome::Done`.

use {
    super::{LifecycleContext, retry},
    crate::domain::{
        error::LifecycleError,
        id::{PaymentId, RefundId},
        job::JobOutcome,
        payment::{PaymentStatus, PollMode, PollResult, StatusChange},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub result: PollResult,
    pub outcome: JobOutcome,
}

/// Waits one poll interval, then looks the payment up once.
pub async fn check_payment_once(
    ctx: &LifecycleContext,
    id: &PaymentId,
) -> Result<PollResult, LifecycleError> {
    tokio::time::sleep(ctx.settings.poll_interval).await;
    Ok(observe_payment(ctx, id, PollMode::OneShot).await?.result)
}

#[tracing::instrument(skip(ctx, id), fields(payment_id = %id))]
pub async fn observe_payment(
    ctx: &LifecycleContext,
    id: &PaymentId,
    mode: PollMode,
) -> Result<Observation, LifecycleError> {
    let remote = ctx.gateway.find_payment(id).await?;
    let status = PaymentStatus::from_gateway(&remote.status).inspect_err(|_| {
        tracing::error!(raw_status = %remote.status, "protocol violation: unknown payment status");
    })?;

    let change = ctx
        .store
        .update_payment_status(id, status, remote.cancellation_reason.as_deref())
        .await?;

    let result = PollResult {
        payment_id: id.clone(),
        status,
        amount: remote.amount,
        description: remote.description,
        cancellation_reason: remote.cancellation_reason,
    };

    if let StatusChange::Rejected { current } = change {
        tracing::warn!(
            stored = %current,
            observed = %status,
            "gateway reported a different terminal status, keeping stored one"
        );
        return Ok(Observation {
            result,
            outcome: JobOutcome::Done,
        });
    }

    let outcome = match status {
        PaymentStatus::Pending => match mode {
            PollMode::OneShot => JobOutcome::Done,
            PollMode::RunToTerminal => {
                JobOutcome::RunAgainAt(ctx.due_in(ctx.settings.poll_interval))
            }
        },
        PaymentStatus::Succeeded => {
            if change.advanced() {
                tracing::info!("payment succeeded");
                ctx.notify(&format!(
                    "Payment {id} succeeded: {} ({})",
                    result.amount,
                    result.description.as_deref().unwrap_or("no description")
                ))
                .await;
            }
            JobOutcome::Done
        }
        PaymentStatus::Canceled => {
            // The status is already committed, so the notice goes out even
            // when planning the retry fails.
            let planned = match mode {
                PollMode::RunToTerminal => plan_retry(ctx, id).await,
                PollMode::OneShot => Ok(None),
            };
            if change.advanced() {
                tracing::info!(reason = ?result.cancellation_reason, "payment canceled");
                let reason = result.cancellation_reason.as_deref().unwrap_or("unknown");
                let mut message = format!("Payment {id} was canceled: {reason}.");
                match &planned {
                    Ok(Some(follow_up)) => {
                        message.push(' ');
                        message.push_str(follow_up);
                    }
                    Ok(None) => {}
                    Err(_) => message.push_str(" A retry could not be scheduled."),
                }
                ctx.notify(&message).await;
            } else if let Ok(Some(follow_up)) = &planned {
                tracing::info!(
                    follow_up = %follow_up,
                    "cancellation already announced, retry planned without a new notice"
                );
            }
            planned?;
            JobOutcome::Done
        }
    };

    Ok(Observation { result, outcome })
}

/// Schedules the replacement payment when the chain still has attempts left.
/// Returns the sentence the cancellation notice should carry about it.
async fn plan_retry(
    ctx: &LifecycleContext,
    id: &PaymentId,
) -> Result<Option<String>, LifecycleError> {
    let Some(payment) = ctx.store.get_payment(id).await? else {
        tracing::warn!("canceled payment has no local record, not retrying");
        return Ok(None);
    };

    if payment.attempt >= ctx.settings.max_retry_attempts {
        tracing::info!(attempt = payment.attempt, "retries exhausted");
        return Ok(Some(format!(
            "Retries exhausted after {} attempts.",
            payment.attempt + 1
        )));
    }

    let request = retry::retry_request_for(&payment);
    let not_before = ctx.due_in(ctx.settings.retry_delay);
    retry::schedule_retry(ctx, request, not_before).await?;
    Ok(Some(format!(
        "A new payment will be created at {}.",
        not_before.format("%Y-%m-%d %H:%M UTC")
    )))
}

/// Refunds follow the same state machine as payments but are never retried.
#[tracing::instrument(skip(ctx, id), fields(refund_id = %id))]
pub async fn observe_refund(
    ctx: &LifecycleContext,
    id: &RefundId,
) -> Result<JobOutcome, LifecycleError> {
    let remote = ctx.gateway.find_refund(id).await?;
    let status = PaymentStatus::from_gateway(&remote.status).inspect_err(|_| {
        tracing::error!(raw_status = %remote.status, "protocol violation: unknown refund status");
    })?;

    let change = ctx
        .store
        .update_refund_status(id, status, remote.cancellation_reason.as_deref())
        .await?;

    match (status, change) {
        (_, StatusChange::Rejected { current }) => {
            tracing::warn!(stored = %current, observed = %status, "refund status regression ignored");
            Ok(JobOutcome::Done)
        }
        (PaymentStatus::Pending, _) => Ok(JobOutcome::RunAgainAt(
            ctx.due_in(ctx.settings.poll_interval),
        )),
        (PaymentStatus::Succeeded, change) => {
            if change.advanced() {
                ctx.notify(&format!(
                    "Refund {id} of payment {} succeeded: {}",
                    remote.payment_id, remote.amount
                ))
                .await;
            }
            Ok(JobOutcome::Done)
        }
        (PaymentStatus::Canceled, change) => {
            if change.advanced() {
                ctx.notify(&format!(
                    "Refund {id} of payment {} was canceled: {}",
                    remote.payment_id,
                    remote.cancellation_reason.as_deref().unwrap_or("unknown")
                ))
                .await;
            }
            Ok(JobOutcome::Done)
        }
    }
}
