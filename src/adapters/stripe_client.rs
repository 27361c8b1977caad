use {
    crate::domain::{
        error::LifecycleError,
        id::{PaymentId, RefundId},
        money::{Currency, Money, MoneyAmount},
        provider::{
            BoxFuture, CreatePayment, CreateRefund, CreatedPayment, GatewayPayment, GatewayRefund,
            PaymentGateway,
        },
    },
    std::collections::HashMap,
};

/// PaymentIntent-backed gateway. Intents are confirmed client-side on a
/// hosted page at `{checkout_url}/{intent id}`, which is the redirect URL we
/// hand back.
pub struct StripeGateway {
    client: stripe::Client,
    checkout_url: String,
}

impl StripeGateway {
    pub fn new(secret_key: &str, checkout_url: impl Into<String>) -> Self {
        Self {
            client: stripe::Client::new(secret_key),
            checkout_url: checkout_url.into(),
        }
    }

    /// Points the client at another API root, e.g. a local mock. Panics if
    /// `api_base` is not a valid URL.
    pub fn with_api_base(api_base: &str, secret_key: &str, checkout_url: impl Into<String>) -> Self {
        Self {
            client: stripe::Client::from_url(api_base, secret_key),
            checkout_url: checkout_url.into(),
        }
    }

    /// Client that sends `key` as the `Idempotency-Key` header, so a replayed
    /// create returns the object made by the first call.
    fn idempotent(&self, key: &str) -> stripe::Client {
        self.client
            .clone()
            .with_strategy(stripe::RequestStrategy::Idempotent(key.to_string()))
    }
}

impl PaymentGateway for StripeGateway {
    fn create_payment(
        &self,
        request: CreatePayment,
    ) -> BoxFuture<'_, Result<CreatedPayment, LifecycleError>> {
        Box::pin(async move { self.create_payment_inner(request).await })
    }

    fn find_payment(&self, id: &PaymentId) -> BoxFuture<'_, Result<GatewayPayment, LifecycleError>> {
        let id = id.clone();
        Box::pin(async move { self.find_payment_inner(&id).await })
    }

    fn create_refund(
        &self,
        request: CreateRefund,
    ) -> BoxFuture<'_, Result<GatewayRefund, LifecycleError>> {
        Box::pin(async move { self.create_refund_inner(request).await })
    }

    fn find_refund(&self, id: &RefundId) -> BoxFuture<'_, Result<GatewayRefund, LifecycleError>> {
        let id = id.clone();
        Box::pin(async move { self.find_refund_inner(&id).await })
    }
}

impl StripeGateway {
    async fn create_payment_inner(
        &self,
        request: CreatePayment,
    ) -> Result<CreatedPayment, LifecycleError> {
        let mut metadata = HashMap::new();
        metadata.insert(
            "idempotence_key".to_string(),
            request.idempotence_key.clone(),
        );
        if let Some(fields) = request.metadata.as_object() {
            for (key, value) in fields {
                let value = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                metadata.insert(key.clone(), value);
            }
        }

        let mut params = stripe::CreatePaymentIntent::new(
            request.amount.amount().minor_units(),
            to_stripe_currency(request.amount.currency()),
        );
        params.description = Some(request.description.as_str());
        params.metadata = Some(metadata);

        let client = self.idempotent(&request.idempotence_key);
        let pi = stripe::PaymentIntent::create(&client, params)
            .await
            .map_err(|e| map_stripe_error("payment", e))?;

        let id = PaymentId::new(pi.id.to_string())?;
        let redirect_url = format!("{}/{}", self.checkout_url.trim_end_matches('/'), id);
        Ok(CreatedPayment { id, redirect_url })
    }

    async fn find_payment_inner(&self, id: &PaymentId) -> Result<GatewayPayment, LifecycleError> {
        let pi_id = id
            .as_str()
            .parse::<stripe::PaymentIntentId>()
            .map_err(|_| LifecycleError::NotFound(format!("payment {id}")))?;
        let pi = stripe::PaymentIntent::retrieve(&self.client, &pi_id, &[])
            .await
            .map_err(|e| map_stripe_error(&format!("payment {id}"), e))?;

        let currency = convert_currency(pi.currency)?;
        let amount = convert_amount(pi.amount)?;

        Ok(GatewayPayment {
            id: id.clone(),
            status: convert_pi_status(pi.status),
            amount: Money::new(amount, currency),
            description: pi.description.clone(),
            cancellation_reason: pi
                .cancellation_reason
                .as_ref()
                .map(|reason| reason.as_str().to_string()),
        })
    }

    async fn create_refund_inner(
        &self,
        request: CreateRefund,
    ) -> Result<GatewayRefund, LifecycleError> {
        let pi_id = request
            .payment_id
            .as_str()
            .parse::<stripe::PaymentIntentId>()
            .map_err(|_| LifecycleError::NotFound(format!("payment {}", request.payment_id)))?;

        let mut params = stripe::CreateRefund::new();
        params.payment_intent = Some(pi_id);
        params.amount = Some(request.amount.amount().minor_units());

        let client = self.idempotent(&request.idempotence_key);
        let refund = stripe::Refund::create(&client, params)
            .await
            .map_err(|e| map_stripe_error(&format!("payment {}", request.payment_id), e))?;

        refund_from_stripe(refund, &request.payment_id, request.description)
    }

    async fn find_refund_inner(&self, id: &RefundId) -> Result<GatewayRefund, LifecycleError> {
        let refund_id = id
            .as_str()
            .parse::<stripe::RefundId>()
            .map_err(|_| LifecycleError::NotFound(format!("refund {id}")))?;
        let refund = stripe::Refund::retrieve(&self.client, &refund_id, &[])
            .await
            .map_err(|e| map_stripe_error(&format!("refund {id}"), e))?;

        let parent = refund
            .payment_intent
            .as_ref()
            .map(|e| {
                PaymentId::new(match e {
                    stripe::Expandable::Id(id) => id.to_string(),
                    stripe::Expandable::Object(pi) => pi.id.to_string(),
                })
            })
            .transpose()?
            .ok_or_else(|| {
                LifecycleError::Gateway(format!("refund {id} has no payment_intent"))
            })?;

        refund_from_stripe(refund, &parent, None)
    }
}

fn refund_from_stripe(
    refund: stripe::Refund,
    payment_id: &PaymentId,
    description: Option<String>,
) -> Result<GatewayRefund, LifecycleError> {
    let currency = convert_currency(refund.currency)?;
    let amount = convert_amount(refund.amount)?;
    let status = convert_refund_status(refund.status.as_deref());

    Ok(GatewayRefund {
        id: RefundId::new(refund.id.to_string())?,
        payment_id: payment_id.clone(),
        cancellation_reason: (status == "canceled")
            .then(|| format!("stripe refund status: {}", refund.status.as_deref().unwrap_or("none"))),
        status,
        amount: Money::new(amount, currency),
        description,
    })
}

fn map_stripe_error(what: &str, err: stripe::StripeError) -> LifecycleError {
    match err {
        stripe::StripeError::Stripe(ref req) if req.http_status == 404 => {
            LifecycleError::NotFound(what.to_string())
        }
        other => LifecycleError::Gateway(format!("Stripe API: {other}")),
    }
}

// ── Conversion helpers ──────────────────────────────────────────────────────

fn to_stripe_currency(c: Currency) -> stripe::Currency {
    match c {
        Currency::Rub => stripe::Currency::RUB,
        Currency::Usd => stripe::Currency::USD,
        Currency::Eur => stripe::Currency::EUR,
    }
}

pub fn convert_currency(c: stripe::Currency) -> Result<Currency, LifecycleError> {
    match c {
        stripe::Currency::RUB => Ok(Currency::Rub),
        stripe::Currency::USD => Ok(Currency::Usd),
        stripe::Currency::EUR => Ok(Currency::Eur),
        other => Err(LifecycleError::Gateway(format!(
            "unsupported currency: {other:?}"
        ))),
    }
}

pub fn convert_amount(amount: i64) -> Result<MoneyAmount, LifecycleError> {
    if amount < 0 {
        return Err(LifecycleError::Gateway("negative amount".into()));
    }
    MoneyAmount::new(amount)
}

/// Collapses Stripe's intent states onto pending/succeeded/canceled. States
/// this crate does not know are passed through raw and rejected by the poller.
pub fn convert_pi_status(status: stripe::PaymentIntentStatus) -> String {
    #[allow(unreachable_patterns)]
    let known = match status {
        stripe::PaymentIntentStatus::Succeeded => "succeeded",
        stripe::PaymentIntentStatus::Canceled => "canceled",
        stripe::PaymentIntentStatus::Processing
        | stripe::PaymentIntentStatus::RequiresAction
        | stripe::PaymentIntentStatus::RequiresCapture
        | stripe::PaymentIntentStatus::RequiresConfirmation
        | stripe::PaymentIntentStatus::RequiresPaymentMethod => "pending",
        other => return format!("{other:?}"),
    };
    known.to_string()
}

pub fn convert_refund_status(status: Option<&str>) -> String {
    match status {
        Some("succeeded") => "succeeded".to_string(),
        Some("failed") | Some("canceled") => "canceled".to_string(),
        Some("pending") | Some("requires_action") | None => "pending".to_string(),
        Some(other) => other.to_string(),
    }
}
