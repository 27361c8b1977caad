use {super::id::PaymentId, thiserror::Error};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("validation: {0}")]
    Validation(String),

    /// The gateway does not know the requested id.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("gateway: {0}")]
    Gateway(String),

    /// Gateway reported a status outside pending/succeeded/canceled.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("retry of payment {original} could not be created: {reason}")]
    RetryCreation { original: PaymentId, reason: String },

    #[error("notification: {0}")]
    Notification(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("task: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<reqwest::Error> for LifecycleError {
    fn from(err: reqwest::Error) -> Self {
        Self::Gateway(err.to_string())
    }
}
