use {
    super::error::LifecycleError,
    super::id::PaymentId,
    super::money::Money,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Status reported by the gateway for payments and refunds alike.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Canceled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Canceled)
    }

    pub fn can_transition_to(&self, next: &PaymentStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Succeeded) | (Self::Pending, Self::Canceled)
        )
    }

    /// Parses a raw gateway status. Anything outside the known set is a
    /// contract violation by the gateway, not a validation failure.
    pub fn from_gateway(raw: &str) -> Result<Self, LifecycleError> {
        Self::try_from(raw).map_err(|_| {
            LifecycleError::ProtocolViolation(format!("unknown status: {raw}"))
        })
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = LifecycleError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "succeeded" => Ok(Self::Succeeded),
            "canceled" => Ok(Self::Canceled),
            other => Err(LifecycleError::Validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

/// Outcome of a monotonic status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Stored status moved forward; the caller owns the side effects.
    Advanced { from: PaymentStatus },
    Unchanged,
    /// Incoming status would leave a terminal state; nothing written.
    Rejected { current: PaymentStatus },
    /// No local record for this id.
    Untracked,
}

impl StatusChange {
    pub fn advanced(&self) -> bool {
        matches!(self, Self::Advanced { .. })
    }
}

/// Whether a poll returns after the first lookup or runs until terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    OneShot,
    RunToTerminal,
}

/// Full payment record from storage.
#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_ref: String,
    pub user_ref: String,
    pub money: Money,
    pub description: String,
    pub status: PaymentStatus,
    pub cancellation_reason: Option<String>,
    pub retry_of: Option<PaymentId>,
    pub attempt: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewPaymentParams {
    pub id: PaymentId,
    pub order_ref: String,
    pub user_ref: String,
    pub money: Money,
    pub description: String,
    pub retry_of: Option<PaymentId>,
    pub attempt: u32,
}

/// For INSERT. Always starts out pending.
#[derive(Debug, Clone)]
pub struct NewPayment {
    id: PaymentId,
    order_ref: String,
    user_ref: String,
    money: Money,
    description: String,
    retry_of: Option<PaymentId>,
    attempt: u32,
}

impl NewPayment {
    pub fn new(params: NewPaymentParams) -> Self {
        Self {
            id: params.id,
            order_ref: params.order_ref,
            user_ref: params.user_ref,
            money: params.money,
            description: params.description,
            retry_of: params.retry_of,
            attempt: params.attempt,
        }
    }

    pub fn id(&self) -> &PaymentId {
        &self.id
    }

    pub fn order_ref(&self) -> &str {
        &self.order_ref
    }

    pub fn user_ref(&self) -> &str {
        &self.user_ref
    }

    pub fn money(&self) -> &Money {
        &self.money
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> PaymentStatus {
        PaymentStatus::Pending
    }

    pub fn retry_of(&self) -> Option<&PaymentId> {
        self.retry_of.as_ref()
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Snapshot returned by a single poll.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PollResult {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    pub amount: Money,
    pub description: Option<String>,
    pub cancellation_reason: Option<String>,
}

/// Carried from the poller that saw a cancellation to the delayed retry job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryRequest {
    pub original_id: PaymentId,
    pub amount: Money,
    pub description: String,
    pub order_ref: String,
    pub user_ref: String,
    /// Attempt number of the payment the retry will create.
    pub attempt: u32,
}

const RETRY_MARKER: &str = " (retry of ";

impl RetryRequest {
    /// Description for the replacement payment. A retry of a retry points at
    /// its immediate predecessor only.
    pub fn retry_description(&self) -> String {
        let base = self
            .description
            .split_once(RETRY_MARKER)
            .map_or(self.description.as_str(), |(base, _)| base);
        format!("{base}{RETRY_MARKER}{})", self.original_id)
    }
}
