use super::{error::LifecycleError, provider::BoxFuture};

/// Outbound message transport (chat webhook, log sink, ...).
pub trait Notifier: Send + Sync {
    fn deliver<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<(), LifecycleError>>;
}
