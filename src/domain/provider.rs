use {
    super::error::LifecycleError,
    super::id::{PaymentId, RefundId},
    super::money::Money,
    std::{future::Future, pin::Pin},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What the coordinator asks the gateway to create.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub amount: Money,
    pub description: String,
    /// Sent as the gateway idempotence key and embedded in the return URL.
    pub idempotence_key: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPayment {
    pub id: PaymentId,
    pub redirect_url: String,
}

/// What the poller gets back after fetching from the gateway API. `status`
/// is kept raw so the poller alone decides what counts as a known status.
#[derive(Debug, Clone)]
pub struct GatewayPayment {
    pub id: PaymentId,
    pub status: String,
    pub amount: Money,
    pub description: Option<String>,
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateRefund {
    pub payment_id: PaymentId,
    pub amount: Money,
    pub description: Option<String>,
    pub idempotence_key: String,
}

#[derive(Debug, Clone)]
pub struct GatewayRefund {
    pub id: RefundId,
    pub payment_id: PaymentId,
    pub status: String,
    pub amount: Money,
    pub description: Option<String>,
    pub cancellation_reason: Option<String>,
}

/// Lookups of an id the gateway does not know must fail with
/// `LifecycleError::NotFound`; every other failure is `LifecycleError::Gateway`.
pub trait PaymentGateway: Send + Sync {
    fn create_payment(
        &self,
        request: CreatePayment,
    ) -> BoxFuture<'_, Result<CreatedPayment, LifecycleError>>;

    fn find_payment(&self, id: &PaymentId) -> BoxFuture<'_, Result<GatewayPayment, LifecycleError>>;

    fn create_refund(
        &self,
        request: CreateRefund,
    ) -> BoxFuture<'_, Result<GatewayRefund, LifecycleError>>;

    fn find_refund(&self, id: &RefundId) -> BoxFuture<'_, Result<GatewayRefund, LifecycleError>>;
}
