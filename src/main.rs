use {
    pay_sync::{
        AppState, adapters,
        config::Config,
        infra::postgres::{PgJobStore, PgStore},
        services::{LifecycleContext, LifecycleSettings, coordinator::Coordinator, worker},
    },
    sqlx::postgres::PgPoolOptions,
    std::{sync::Arc, time::Duration},
    tokio::{signal, sync::watch},
    tracing_subscriber::EnvFilter,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::info!(gateway = ?config.gateway, "configuration loaded");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let jobs = Arc::new(PgJobStore::new(pool.clone()));
    let ctx = LifecycleContext {
        gateway: adapters::build_gateway(&config)?,
        store: Arc::new(PgStore::new(pool.clone())),
        jobs: jobs.clone(),
        notifier: adapters::build_notifier(&config)?,
        settings: LifecycleSettings {
            poll_interval: config.poll_interval,
            retry_delay: config.retry_delay,
            max_retry_attempts: config.max_retry_attempts,
        },
    };
    let coordinator = Arc::new(Coordinator::new(ctx.clone()));

    // Reconcile before anything else can touch payment state.
    let report = coordinator.run_reconciliation_sweep().await?;
    tracing::info!(?report, "startup reconciliation complete");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(worker::run_worker(
        ctx,
        config.worker_batch_size,
        shutdown_rx.clone(),
    ));
    let reaper = tokio::spawn(worker::run_reaper(jobs, shutdown_rx));

    let app = adapters::http::router(AppState { coordinator }, config.request_timeout);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(worker, reaper);
    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
