use {
    crate::adapters::yookassa::{DEFAULT_API_URL, YooKassaConfig},
    std::{env, fmt, str::FromStr, time::Duration},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone)]
pub enum GatewayConfig {
    YooKassa(YooKassaConfig),
    Stripe {
        secret_key: String,
        checkout_url: String,
    },
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::YooKassa(config) => f.debug_tuple("YooKassa").field(config).finish(),
            Self::Stripe { checkout_url, .. } => f
                .debug_struct("Stripe")
                .field("secret_key", &"[REDACTED]")
                .field("checkout_url", checkout_url)
                .finish(),
        }
    }
}

/// Process configuration. Loaded once in `main`, immutable afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub gateway: GatewayConfig,
    pub notify_webhook_url: Option<String>,
    pub poll_interval: Duration,
    pub retry_delay: Duration,
    pub max_retry_attempts: u32,
    pub worker_batch_size: i64,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source. Empty values
    /// count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let request_timeout = Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 60)?);
        let return_url = required("RETURN_URL")?;

        let gateway = match get("GATEWAY").as_deref().unwrap_or("yookassa") {
            "yookassa" => GatewayConfig::YooKassa(YooKassaConfig {
                shop_id: required("YOOKASSA_SHOP_ID")?,
                secret_key: required("YOOKASSA_SECRET_KEY")?,
                api_url: get("YOOKASSA_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                return_url,
                timeout: request_timeout,
            }),
            "stripe" => GatewayConfig::Stripe {
                secret_key: required("STRIPE_SECRET_KEY")?,
                checkout_url: return_url,
            },
            other => {
                return Err(ConfigError::Invalid {
                    name: "GATEWAY",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            gateway,
            notify_webhook_url: get("NOTIFY_WEBHOOK_URL"),
            poll_interval: Duration::from_secs(parse_or(&get, "CHECK_PAYMENT_STATUS_PERIOD", 5)?),
            retry_delay: Duration::from_secs(parse_or(&get, "RETRY_DELAY_SECS", 86_400)?),
            max_retry_attempts: parse_or(&get, "MAX_RETRY_ATTEMPTS", 3)?,
            worker_batch_size: parse_or(&get, "WORKER_BATCH_SIZE", 10)?,
            request_timeout,
        })
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
