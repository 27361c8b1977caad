use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{
            error::LifecycleError,
            id::PaymentId,
            money::{Currency, Money, MoneyAmount},
            payment::PollResult,
            refund::Refund,
        },
    },
    axum::{
        Json, Router,
        extract::{DefaultBodyLimit, Path, State},
        http::StatusCode,
        routing::{get, post},
    },
    serde::{Deserialize, Serialize},
    std::time::Duration,
    tower_http::timeout::TimeoutLayer,
};

#[derive(Debug, Deserialize)]
pub struct AmountBody {
    pub value: String,
    pub currency: String,
}

impl TryFrom<&AmountBody> for Money {
    type Error = LifecycleError;

    fn try_from(body: &AmountBody) -> Result<Self, Self::Error> {
        Ok(Money::new(
            MoneyAmount::from_decimal_str(body.value.trim())?,
            Currency::try_from(body.currency.as_str())?,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentBody {
    pub order_id: String,
    pub user_id: String,
    pub amount: AmountBody,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedPaymentBody {
    pub confirmation_url: String,
    pub payment_id: PaymentId,
}

#[derive(Debug, Deserialize)]
pub struct CreateRefundBody {
    pub amount: AmountBody,
    pub description: Option<String>,
}

fn required(field: &str, value: String) -> Result<String, LifecycleError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(LifecycleError::Validation(format!("{field} must not be empty")));
    }
    Ok(value)
}

pub async fn create_payment(
    State(state): State<AppState>,
    Json(body): Json<CreatePaymentBody>,
) -> Result<(StatusCode, Json<CreatedPaymentBody>), ApiError> {
    let money = Money::try_from(&body.amount)?;
    let order_ref = required("order_id", body.order_id)?;
    let user_ref = required("user_id", body.user_id)?;
    let description = body
        .description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| format!("Order #{order_ref}"));

    let (confirmation_url, payment_id) = state
        .coordinator
        .create_payment(order_ref, user_ref, money, description)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedPaymentBody {
            confirmation_url,
            payment_id,
        }),
    ))
}

pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PollResult>, ApiError> {
    let id = PaymentId::new(id)?;
    Ok(Json(state.coordinator.get_status(&id).await?))
}

pub async fn create_refund(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CreateRefundBody>,
) -> Result<(StatusCode, Json<Refund>), ApiError> {
    let id = PaymentId::new(id)?;
    let money = Money::try_from(&body.amount)?;
    let description = body.description.filter(|d| !d.trim().is_empty());

    let refund = state
        .coordinator
        .create_refund(&id, money, description)
        .await?;
    Ok((StatusCode::CREATED, Json(refund)))
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/api/payment", post(create_payment))
        .route("/api/payment/{id}", get(get_status))
        .route("/api/payment/{id}/refund", post(create_refund))
        .layer(DefaultBodyLimit::max(16 * 1024))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
