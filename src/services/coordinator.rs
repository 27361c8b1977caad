use {
    super::{
        LifecycleContext, poller,
        sweep::{self, SweepReport},
    },
    crate::domain::{
        error::LifecycleError,
        id::PaymentId,
        job::Job,
        money::Money,
        payment::{NewPayment, NewPaymentParams, PollResult},
        provider::{CreatePayment, CreateRefund},
        refund::{NewRefund, Refund},
    },
    uuid::Uuid,
};

/// Entry point for request handlers and startup.
#[derive(Clone)]
pub struct Coordinator {
    ctx: LifecycleContext,
}

impl Coordinator {
    pub fn new(ctx: LifecycleContext) -> Self {
        Self { ctx }
    }

    /// Creates the payment at the gateway, records it as pending and queues
    /// a poller for it. Returns `(redirect_url, payment_id)`. Nothing is
    /// recorded when the gateway call fails.
    #[tracing::instrument(skip(self, amount, description))]
    pub async fn create_payment(
        &self,
        order_ref: String,
        user_ref: String,
        amount: Money,
        description: String,
    ) -> Result<(String, PaymentId), LifecycleError> {
        if amount.amount().is_zero() {
            return Err(LifecycleError::Validation(
                "amount must be greater than zero".into(),
            ));
        }

        let created = self
            .ctx
            .gateway
            .create_payment(CreatePayment {
                amount,
                description: description.clone(),
                idempotence_key: Uuid::new_v4().to_string(),
                metadata: serde_json::json!({
                    "order_id": order_ref,
                    "user_id": user_ref,
                }),
            })
            .await?;

        let payment = NewPayment::new(NewPaymentParams {
            id: created.id.clone(),
            order_ref,
            user_ref,
            money: amount,
            description,
            retry_of: None,
            attempt: 0,
        });
        self.ctx.store.insert_payment(&payment).await?;

        self.ctx
            .schedule(
                Job::CheckPayment {
                    payment_id: created.id.clone(),
                },
                self.ctx.due_in(self.ctx.settings.poll_interval),
            )
            .await?;

        tracing::info!(payment_id = %created.id, "payment created");
        Ok((created.redirect_url, created.id))
    }

    /// One-shot poll, awaited to completion with no timeout of its own. The
    /// caller blocks for one poll interval plus the gateway round trip; HTTP
    /// callers are bounded by the router's request timeout.
    pub async fn get_status(&self, payment_id: &PaymentId) -> Result<PollResult, LifecycleError> {
        let ctx = self.ctx.clone();
        let id = payment_id.clone();
        tokio::spawn(async move { poller::check_payment_once(&ctx, &id).await }).await?
    }

    /// Refunds `amount` of a locally known payment and queues a refund
    /// poller. Refunds are never retried.
    #[tracing::instrument(skip(self, amount, description))]
    pub async fn create_refund(
        &self,
        payment_id: &PaymentId,
        amount: Money,
        description: Option<String>,
    ) -> Result<Refund, LifecycleError> {
        let payment = self
            .ctx
            .store
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(format!("payment {payment_id}")))?;

        if amount.currency() != payment.money.currency() {
            return Err(LifecycleError::Validation(format!(
                "refund currency {} does not match payment currency {}",
                amount.currency(),
                payment.money.currency()
            )));
        }
        if amount.amount().is_zero()
            || amount.amount().minor_units() > payment.money.amount().minor_units()
        {
            return Err(LifecycleError::Validation(format!(
                "refund amount must be between 0 and {}",
                payment.money
            )));
        }

        let created = self
            .ctx
            .gateway
            .create_refund(CreateRefund {
                payment_id: payment_id.clone(),
                amount,
                description: description.clone(),
                idempotence_key: Uuid::new_v4().to_string(),
            })
            .await?;

        let refund = NewRefund {
            id: created.id.clone(),
            payment_id: payment_id.clone(),
            money: amount,
            description,
        };
        self.ctx.store.insert_refund(&refund).await?;

        self.ctx
            .schedule(
                Job::CheckRefund {
                    refund_id: created.id.clone(),
                },
                self.ctx.due_in(self.ctx.settings.poll_interval),
            )
            .await?;

        tracing::info!(refund_id = %created.id, "refund created");
        self.ctx
            .store
            .get_refund(&created.id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(format!("refund {}", created.id)))
    }

    pub async fn run_reconciliation_sweep(&self) -> Result<SweepReport, LifecycleError> {
        sweep::run_reconciliation_sweep(&self.ctx).await
    }
}
