use {
    crate::domain::{
        error::LifecycleError,
        id::{PaymentId, RefundId},
        money::{Currency, Money, MoneyAmount},
        payment::{NewPayment, Payment, PaymentStatus, StatusChange},
        provider::BoxFuture,
        refund::{NewRefund, Refund},
        store::PaymentStore,
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type PaymentRow = (
    String,
    String,
    String,
    i64,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    i32,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn payment_from_row(row: PaymentRow) -> Result<Payment, LifecycleError> {
    let (
        id,
        order_ref,
        user_ref,
        amount,
        currency,
        description,
        status,
        cancellation_reason,
        retry_of,
        attempt,
        created_at,
        updated_at,
    ) = row;

    Ok(Payment {
        id: PaymentId::new(id)?,
        order_ref,
        user_ref,
        money: Money::new(
            MoneyAmount::new(amount)?,
            Currency::try_from(currency.as_str())?,
        ),
        description,
        status: PaymentStatus::try_from(status.as_str())?,
        cancellation_reason,
        retry_of: retry_of.map(PaymentId::new).transpose()?,
        attempt: u32::try_from(attempt)
            .map_err(|_| LifecycleError::Validation(format!("negative attempt: {attempt}")))?,
        created_at,
        updated_at,
    })
}

/// Compare-and-set a status under a per-id advisory lock. `table` is one of
/// our own constants, never user input.
async fn write_status(
    pool: &PgPool,
    table: &'static str,
    id: &str,
    status: PaymentStatus,
    cancellation_reason: Option<&str>,
) -> Result<StatusChange, LifecycleError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SET LOCAL lock_timeout = '5s'")
        .execute(&mut *tx)
        .await?;

    // Serialize all status writes for this id, across processes.
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let current: Option<String> =
        sqlx::query_scalar(&format!("SELECT status FROM {table} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

    let Some(current) = current else {
        tx.commit().await?;
        return Ok(StatusChange::Untracked);
    };
    let current = PaymentStatus::try_from(current.as_str())?;

    if current == status {
        tx.commit().await?;
        return Ok(StatusChange::Unchanged);
    }

    if !current.can_transition_to(&status) {
        tx.commit().await?;
        tracing::warn!(
            table,
            id,
            from = %current,
            to = %status,
            "invalid status transition, not written"
        );
        return Ok(StatusChange::Rejected { current });
    }

    sqlx::query(&format!(
        "UPDATE {table} SET status = $1, cancellation_reason = $2, updated_at = now() WHERE id = $3"
    ))
    .bind(status.as_str())
    .bind(cancellation_reason)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(StatusChange::Advanced { from: current })
}

impl PaymentStore for PgStore {
    fn insert_payment<'a>(
        &'a self,
        payment: &'a NewPayment,
    ) -> BoxFuture<'a, Result<(), LifecycleError>> {
        Box::pin(async move {
            sqlx::query(
                r#"
                INSERT INTO payments
                    (id, order_ref, user_ref, amount, currency, description,
                     status, retry_of, attempt)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(payment.id().as_str())
            .bind(payment.order_ref())
            .bind(payment.user_ref())
            .bind(payment.money().amount().minor_units())
            .bind(payment.money().currency().as_str())
            .bind(payment.description())
            .bind(payment.status().as_str())
            .bind(payment.retry_of().map(PaymentId::as_str))
            .bind(i32::try_from(payment.attempt()).unwrap_or(i32::MAX))
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    fn get_payment<'a>(
        &'a self,
        id: &'a PaymentId,
    ) -> BoxFuture<'a, Result<Option<Payment>, LifecycleError>> {
        Box::pin(async move {
            let row: Option<PaymentRow> = sqlx::query_as(
                r#"
                SELECT id, order_ref, user_ref, amount, currency, description, status,
                       cancellation_reason, retry_of, attempt, created_at, updated_at
                FROM payments WHERE id = $1
                "#,
            )
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

            row.map(payment_from_row).transpose()
        })
    }

    fn payment_ids_by_status(
        &self,
        status: PaymentStatus,
    ) -> BoxFuture<'_, Result<Vec<PaymentId>, LifecycleError>> {
        Box::pin(async move {
            let ids: Vec<String> =
                sqlx::query_scalar("SELECT id FROM payments WHERE status = $1 ORDER BY created_at")
                    .bind(status.as_str())
                    .fetch_all(&self.pool)
                    .await?;

            ids.into_iter().map(PaymentId::new).collect()
        })
    }

    fn update_payment_status<'a>(
        &'a self,
        id: &'a PaymentId,
        status: PaymentStatus,
        cancellation_reason: Option<&'a str>,
    ) -> BoxFuture<'a, Result<StatusChange, LifecycleError>> {
        Box::pin(write_status(
            &self.pool,
            "payments",
            id.as_str(),
            status,
            cancellation_reason,
        ))
    }

    fn insert_refund<'a>(
        &'a self,
        refund: &'a NewRefund,
    ) -> BoxFuture<'a, Result<(), LifecycleError>> {
        Box::pin(async move {
            sqlx::query(
                r#"
                INSERT INTO refunds (id, payment_id, amount, currency, description, status)
                VALUES ($1, $2, $3, $4, $5, 'pending')
                "#,
            )
            .bind(refund.id.as_str())
            .bind(refund.payment_id.as_str())
            .bind(refund.money.amount().minor_units())
            .bind(refund.money.currency().as_str())
            .bind(refund.description.as_deref())
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    fn get_refund<'a>(
        &'a self,
        id: &'a RefundId,
    ) -> BoxFuture<'a, Result<Option<Refund>, LifecycleError>> {
        Box::pin(async move {
            let row: Option<(
                String,
                String,
                i64,
                String,
                Option<String>,
                String,
                Option<String>,
                DateTime<Utc>,
            )> = sqlx::query_as(
                r#"
                SELECT id, payment_id, amount, currency, description, status,
                       cancellation_reason, created_at
                FROM refunds WHERE id = $1
                "#,
            )
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

            row.map(
                |(id, payment_id, amount, currency, description, status, reason, created_at)| {
                    Ok(Refund {
                        id: RefundId::new(id)?,
                        payment_id: PaymentId::new(payment_id)?,
                        money: Money::new(
                            MoneyAmount::new(amount)?,
                            Currency::try_from(currency.as_str())?,
                        ),
                        description,
                        status: PaymentStatus::try_from(status.as_str())?,
                        cancellation_reason: reason,
                        created_at,
                    })
                },
            )
            .transpose()
        })
    }

    fn update_refund_status<'a>(
        &'a self,
        id: &'a RefundId,
        status: PaymentStatus,
        cancellation_reason: Option<&'a str>,
    ) -> BoxFuture<'a, Result<StatusChange, LifecycleError>> {
        Box::pin(write_status(
            &self.pool,
            "refunds",
            id.as_str(),
            status,
            cancellation_reason,
        ))
    }
}
