use {
    crate::domain::{
        error::LifecycleError,
        job::{Job, JobRow},
        provider::BoxFuture,
        store::JobStore,
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    std::time::Duration,
    uuid::Uuid,
};

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl JobStore for PgJobStore {
    /// Returns `true` if inserted, `false` if an active job with the same
    /// dedup key is already queued or running.
    fn enqueue<'a>(
        &'a self,
        job: &'a Job,
        run_at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<bool, LifecycleError>> {
        Box::pin(async move {
            let payload = serde_json::to_value(job)?;
            let inserted: Option<bool> = sqlx::query_scalar(
                r#"
                INSERT INTO lifecycle_jobs (id, kind, dedup_key, payload, scheduled_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (dedup_key) WHERE status IN ('pending', 'processing') DO NOTHING
                RETURNING true
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(job.kind())
            .bind(job.dedup_key())
            .bind(payload)
            .bind(run_at)
            .fetch_optional(&self.pool)
            .await?;

            Ok(inserted.is_some())
        })
    }

    /// Uses SKIP LOCKED to avoid contention with other workers.
    fn claim(&self, limit: i64) -> BoxFuture<'_, Result<Vec<JobRow>, LifecycleError>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;
            let rows: Vec<(Uuid, serde_json::Value, i32, DateTime<Utc>)> = sqlx::query_as(
                r#"
                UPDATE lifecycle_jobs
                SET status = 'processing', updated_at = now()
                WHERE id IN (
                    SELECT id FROM lifecycle_jobs
                    WHERE status = 'pending' AND scheduled_at <= now()
                    ORDER BY scheduled_at
                    LIMIT $1
                    FOR UPDATE SKIP LOCKED
                )
                RETURNING id, payload, attempts, scheduled_at
                "#,
            )
            .bind(limit)
            .fetch_all(&mut *tx)
            .await?;
            tx.commit().await?;

            let mut jobs = Vec::with_capacity(rows.len());
            for (id, payload, attempts, scheduled_at) in rows {
                match serde_json::from_value::<Job>(payload) {
                    Ok(job) => jobs.push(JobRow {
                        id,
                        job,
                        attempts,
                        scheduled_at,
                    }),
                    Err(e) => {
                        tracing::warn!(job_id = %id, error = %e, "undecodable job payload, failing as garbage");
                        self.fail(id, &format!("undecodable payload: {e}")).await?;
                    }
                }
            }
            Ok(jobs)
        })
    }

    fn complete(&self, id: Uuid) -> BoxFuture<'_, Result<(), LifecycleError>> {
        Box::pin(async move {
            sqlx::query(
                "UPDATE lifecycle_jobs SET status = 'completed', attempts = attempts + 1, updated_at = now() WHERE id = $1",
            )
            .bind(id)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    fn reschedule(
        &self,
        id: Uuid,
        run_at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<(), LifecycleError>> {
        Box::pin(async move {
            sqlx::query(
                r#"
                UPDATE lifecycle_jobs
                SET status = 'pending', attempts = attempts + 1,
                    scheduled_at = $2, updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(run_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    /// Failures are terminal: a failed poll is not retried by the queue.
    fn fail<'a>(&'a self, id: Uuid, error: &'a str) -> BoxFuture<'a, Result<(), LifecycleError>> {
        Box::pin(async move {
            sqlx::query(
                r#"
                UPDATE lifecycle_jobs
                SET status = 'failed', attempts = attempts + 1,
                    last_error = $2, updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(error)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    /// Returns the number of reaped jobs.
    fn reap_stale(&self, max_age: Duration) -> BoxFuture<'_, Result<u64, LifecycleError>> {
        Box::pin(async move {
            let result = sqlx::query(
                r#"
                UPDATE lifecycle_jobs
                SET status = 'pending', updated_at = now()
                WHERE status = 'processing'
                  AND updated_at < now() - make_interval(secs => $1::double precision)
                "#,
            )
            .bind(max_age.as_secs_f64())
            .execute(&self.pool)
            .await?;

            Ok(result.rows_affected())
        })
    }
}
