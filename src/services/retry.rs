use {
    super::LifecycleContext,
    crate::domain::{
        error::LifecycleError,
        id::PaymentId,
        job::Job,
        payment::{NewPayment, NewPaymentParams, Payment, RetryRequest},
        provider::CreatePayment,
    },
    chrono::{DateTime, Utc},
};

pub fn retry_request_for(payment: &Payment) -> RetryRequest {
    RetryRequest {
        original_id: payment.id.clone(),
        amount: payment.money,
        description: payment.description.clone(),
        order_ref: payment.order_ref.clone(),
        user_ref: payment.user_ref.clone(),
        attempt: payment.attempt + 1,
    }
}

/// Queues the replacement payment. At most one retry job per original id can
/// be active, so concurrent observers of the same cancellation schedule one.
pub async fn schedule_retry(
    ctx: &LifecycleContext,
    request: RetryRequest,
    not_before: DateTime<Utc>,
) -> Result<bool, LifecycleError> {
    let original = request.original_id.clone();
    let queued = ctx.schedule(Job::RetryPayment(request), not_before).await?;
    if queued {
        tracing::info!(payment_id = %original, %not_before, "retry scheduled");
    }
    Ok(queued)
}

/// Creates the replacement payment, persists it, announces it and starts
/// polling it. Gateway failures surface as `RetryCreation`.
#[tracing::instrument(skip(ctx, request), fields(payment_id = %request.original_id, attempt = request.attempt))]
pub async fn execute_retry(
    ctx: &LifecycleContext,
    request: &RetryRequest,
) -> Result<PaymentId, LifecycleError> {
    let create = CreatePayment {
        amount: request.amount,
        description: request.retry_description(),
        // Stable per original so a re-run after a crash hits the same payment.
        idempotence_key: format!("retry-{}", request.original_id),
        metadata: serde_json::json!({
            "order_id": request.order_ref,
            "user_id": request.user_ref,
            "retry_of": request.original_id,
        }),
    };

    let created = ctx.gateway.create_payment(create.clone()).await.map_err(|e| {
        tracing::error!(error = %e, "retry payment could not be created");
        LifecycleError::RetryCreation {
            original: request.original_id.clone(),
            reason: e.to_string(),
        }
    })?;

    if ctx.store.get_payment(&created.id).await?.is_none() {
        let payment = NewPayment::new(NewPaymentParams {
            id: created.id.clone(),
            order_ref: request.order_ref.clone(),
            user_ref: request.user_ref.clone(),
            money: request.amount,
            description: create.description,
            retry_of: Some(request.original_id.clone()),
            attempt: request.attempt,
        });
        ctx.store.insert_payment(&payment).await?;
    }

    tracing::info!(new_payment_id = %created.id, "retry payment created");
    ctx.notify(&format!(
        "Payment {} was retried as {}: {}",
        request.original_id, created.id, created.redirect_url
    ))
    .await;

    ctx.schedule(
        Job::CheckPayment {
            payment_id: created.id.clone(),
        },
        ctx.due_in(ctx.settings.poll_interval),
    )
    .await?;

    Ok(created.id)
}
