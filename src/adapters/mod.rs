pub mod api_errors;
pub mod http;
pub mod notifier;
pub mod stripe_client;
pub mod yookassa;

use {
    crate::{
        config::{Config, GatewayConfig},
        domain::{error::LifecycleError, notify::Notifier, provider::PaymentGateway},
    },
    std::sync::Arc,
};

pub fn build_gateway(config: &Config) -> Result<Arc<dyn PaymentGateway>, LifecycleError> {
    let gateway: Arc<dyn PaymentGateway> = match &config.gateway {
        GatewayConfig::YooKassa(yookassa) => {
            Arc::new(yookassa::YooKassaGateway::new(yookassa.clone())?)
        }
        GatewayConfig::Stripe {
            secret_key,
            checkout_url,
        } => Arc::new(stripe_client::StripeGateway::new(
            secret_key,
            checkout_url.clone(),
        )),
    };
    Ok(gateway)
}

pub fn build_notifier(config: &Config) -> Result<Arc<dyn Notifier>, LifecycleError> {
    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => Arc::new(notifier::WebhookNotifier::new(
            url.clone(),
            config.request_timeout,
        )?),
        None => {
            tracing::info!("NOTIFY_WEBHOOK_URL not set, notifications go to the log only");
            Arc::new(notifier::LogNotifier)
        }
    };
    Ok(notifier)
}
