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
    reqwest::StatusCode,
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    std::{fmt, time::Duration},
};

pub const DEFAULT_API_URL: &str = "https://api.yookassa.ru/v3";

#[derive(Clone)]
pub struct YooKassaConfig {
    pub shop_id: String,
    pub secret_key: String,
    pub api_url: String,
    /// Customer is sent back to `{return_url}/{idempotence key}` after paying.
    pub return_url: String,
    pub timeout: Duration,
}

impl fmt::Debug for YooKassaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YooKassaConfig")
            .field("shop_id", &self.shop_id)
            .field("secret_key", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .field("return_url", &self.return_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub struct YooKassaGateway {
    client: reqwest::Client,
    config: YooKassaConfig,
}

impl YooKassaGateway {
    pub fn new(config: YooKassaConfig) -> Result<Self, LifecycleError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    async fn create_payment_inner(
        &self,
        request: CreatePayment,
    ) -> Result<CreatedPayment, LifecycleError> {
        let body = CreatePaymentBody {
            amount: AmountOut::from(&request.amount),
            confirmation: ConfirmationOut {
                kind: "redirect",
                return_url: format!(
                    "{}/{}",
                    self.config.return_url.trim_end_matches('/'),
                    request.idempotence_key
                ),
            },
            capture: true,
            description: &request.description,
            metadata: &request.metadata,
        };

        let resp = self
            .client
            .post(self.url("payments"))
            .basic_auth(&self.config.shop_id, Some(&self.config.secret_key))
            .header("Idempotence-Key", &request.idempotence_key)
            .json(&body)
            .send()
            .await?;
        let payment: PaymentBody = read_json(resp, "payment").await?;

        let redirect_url = payment
            .confirmation
            .and_then(|c| c.confirmation_url)
            .ok_or_else(|| {
                LifecycleError::Gateway(format!(
                    "payment {} created without a confirmation_url",
                    payment.id
                ))
            })?;

        Ok(CreatedPayment {
            id: PaymentId::new(payment.id)?,
            redirect_url,
        })
    }

    async fn find_payment_inner(&self, id: &PaymentId) -> Result<GatewayPayment, LifecycleError> {
        let resp = self
            .client
            .get(self.url(&format!("payments/{id}")))
            .basic_auth(&self.config.shop_id, Some(&self.config.secret_key))
            .send()
            .await?;
        let body: PaymentBody = read_json(resp, &format!("payment {id}")).await?;
        payment_from_body(body)
    }

    async fn create_refund_inner(
        &self,
        request: CreateRefund,
    ) -> Result<GatewayRefund, LifecycleError> {
        let body = CreateRefundBody {
            payment_id: request.payment_id.as_str(),
            amount: AmountOut::from(&request.amount),
            description: request.description.as_deref(),
        };

        let resp = self
            .client
            .post(self.url("refunds"))
            .basic_auth(&self.config.shop_id, Some(&self.config.secret_key))
            .header("Idempotence-Key", &request.idempotence_key)
            .json(&body)
            .send()
            .await?;
        let refund: RefundBody =
            read_json(resp, &format!("payment {}", request.payment_id)).await?;
        refund_from_body(refund)
    }

    async fn find_refund_inner(&self, id: &RefundId) -> Result<GatewayRefund, LifecycleError> {
        let resp = self
            .client
            .get(self.url(&format!("refunds/{id}")))
            .basic_auth(&self.config.shop_id, Some(&self.config.secret_key))
            .send()
            .await?;
        let body: RefundBody = read_json(resp, &format!("refund {id}")).await?;
        refund_from_body(body)
    }
}

impl PaymentGateway for YooKassaGateway {
    fn create_payment(
        &self,
        request: CreatePayment,
    ) -> BoxFuture<'_, Result<CreatedPayment, LifecycleError>> {
        Box::pin(self.create_payment_inner(request))
    }

    fn find_payment(&self, id: &PaymentId) -> BoxFuture<'_, Result<GatewayPayment, LifecycleError>> {
        let id = id.clone();
        Box::pin(async move { self.find_payment_inner(&id).await })
    }

    fn create_refund(
        &self,
        request: CreateRefund,
    ) -> BoxFuture<'_, Result<GatewayRefund, LifecycleError>> {
        Box::pin(self.create_refund_inner(request))
    }

    fn find_refund(&self, id: &RefundId) -> BoxFuture<'_, Result<GatewayRefund, LifecycleError>> {
        let id = id.clone();
        Box::pin(async move { self.find_refund_inner(&id).await })
    }
}

// ── Wire format ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct AmountOut {
    value: String,
    currency: &'static str,
}

impl From<&Money> for AmountOut {
    fn from(money: &Money) -> Self {
        Self {
            value: money.amount().to_decimal_string(),
            currency: money.currency().as_str(),
        }
    }
}

#[derive(Serialize)]
struct ConfirmationOut {
    #[serde(rename = "type")]
    kind: &'static str,
    return_url: String,
}

#[derive(Serialize)]
struct CreatePaymentBody<'a> {
    amount: AmountOut,
    confirmation: ConfirmationOut,
    capture: bool,
    description: &'a str,
    metadata: &'a serde_json::Value,
}

#[derive(Serialize)]
struct CreateRefundBody<'a> {
    payment_id: &'a str,
    amount: AmountOut,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct AmountIn {
    value: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct ConfirmationIn {
    confirmation_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CancellationDetails {
    party: Option<String>,
    reason: Option<String>,
}

impl CancellationDetails {
    fn describe(self) -> Option<String> {
        match (self.party, self.reason) {
            (Some(party), Some(reason)) => Some(format!("{reason} ({party})")),
            (None, Some(reason)) => Some(reason),
            (Some(party), None) => Some(format!("canceled by {party}")),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaymentBody {
    id: String,
    status: String,
    amount: AmountIn,
    description: Option<String>,
    confirmation: Option<ConfirmationIn>,
    cancellation_details: Option<CancellationDetails>,
}

#[derive(Debug, Deserialize)]
struct RefundBody {
    id: String,
    payment_id: String,
    status: String,
    amount: AmountIn,
    description: Option<String>,
    cancellation_details: Option<CancellationDetails>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    description: Option<String>,
}

fn money_from(amount: AmountIn) -> Result<Money, LifecycleError> {
    let value = MoneyAmount::from_decimal_str(&amount.value)
        .map_err(|e| LifecycleError::Gateway(format!("undecodable amount: {e}")))?;
    let currency = Currency::try_from(amount.currency.as_str())
        .map_err(|e| LifecycleError::Gateway(format!("undecodable amount: {e}")))?;
    Ok(Money::new(value, currency))
}

fn payment_from_body(body: PaymentBody) -> Result<GatewayPayment, LifecycleError> {
    Ok(GatewayPayment {
        id: PaymentId::new(body.id)?,
        status: body.status,
        amount: money_from(body.amount)?,
        description: body.description,
        cancellation_reason: body.cancellation_details.and_then(CancellationDetails::describe),
    })
}

fn refund_from_body(body: RefundBody) -> Result<GatewayRefund, LifecycleError> {
    Ok(GatewayRefund {
        id: RefundId::new(body.id)?,
        payment_id: PaymentId::new(body.payment_id)?,
        status: body.status,
        amount: money_from(body.amount)?,
        description: body.description,
        cancellation_reason: body.cancellation_details.and_then(CancellationDetails::describe),
    })
}

/// 404 becomes `NotFound`; any other non-2xx becomes `Gateway` with the
/// gateway's own error description when it sent one.
async fn read_json<T: DeserializeOwned>(
    resp: reqwest::Response,
    what: &str,
) -> Result<T, LifecycleError> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(LifecycleError::NotFound(what.to_string()));
    }
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(ErrorBody {
                code: Some(code),
                description: Some(description),
            }) => format!("{code}: {description}"),
            Ok(ErrorBody {
                description: Some(description),
                ..
            }) => description,
            _ => text,
        };
        return Err(LifecycleError::Gateway(format!(
            "{what}: HTTP {status}: {detail}"
        )));
    }

    resp.json::<T>()
        .await
        .map_err(|e| LifecycleError::Gateway(format!("{what}: undecodable response: {e}")))
}
