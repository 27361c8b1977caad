use {
    super::id::{PaymentId, RefundId},
    super::payment::RetryRequest,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Job {
    CheckPayment { payment_id: PaymentId },
    RetryPayment(RetryRequest),
    CheckRefund { refund_id: RefundId },
}

impl Job {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CheckPayment { .. } => "check_payment",
            Self::RetryPayment(_) => "retry_payment",
            Self::CheckRefund { .. } => "check_refund",
        }
    }

    /// At most one active job may exist per key.
    pub fn dedup_key(&self) -> String {
        match self {
            Self::CheckPayment { payment_id } => format!("check_payment:{payment_id}"),
            Self::RetryPayment(req) => format!("retry_payment:{}", req.original_id),
            Self::CheckRefund { refund_id } => format!("check_refund:{refund_id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: uuid::Uuid,
    pub job: Job,
    pub attempts: i32,
    pub scheduled_at: DateTime<Utc>,
}

/// What a job run asks the worker to do with its row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Done,
    RunAgainAt(DateTime<Utc>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_tagged_by_kind() {
        let job = Job::CheckPayment {
            payment_id: PaymentId::new("P1").unwrap(),
        };
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["kind"], "check_payment");
        assert_eq!(value["payment_id"], "P1");
        assert_eq!(serde_json::from_value::<Job>(value).unwrap(), job);
    }
}
