use {
    super::id::{PaymentId, RefundId},
    super::money::Money,
    super::payment::PaymentStatus,
    chrono::{DateTime, Utc},
    serde::Serialize,
};

#[derive(Debug, Clone, Serialize)]
pub struct Refund {
    pub id: RefundId,
    pub payment_id: PaymentId,
    pub money: Money,
    pub description: Option<String>,
    pub status: PaymentStatus,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRefund {
    pub id: RefundId,
    pub payment_id: PaymentId,
    pub money: Money,
    pub description: Option<String>,
}
