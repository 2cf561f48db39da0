use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};

use stateset_checkout as checkout;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = checkout::config::load_config().context("failed to load configuration")?;
    checkout::config::init_tracing(cfg.log_level(), cfg.log_json);

    let db_pool = checkout::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;
    if cfg.auto_migrate {
        checkout::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db = Arc::new(db_pool);

    let (event_sender, event_rx) = checkout::events::channel(cfg.event_channel_capacity);
    let event_sender = Arc::new(event_sender);

    let handlers = checkout::default_event_handlers(
        db.clone(),
        Arc::new(checkout::events::listeners::LogMailer),
    );
    let policy = checkout::events::RetryPolicy {
        max_attempts: cfg.listener_max_attempts,
        ..Default::default()
    };
    tokio::spawn(checkout::events::process_events(event_rx, handlers, policy));

    if cfg.payment_processor_client_id.is_none() {
        warn!("Payment processor credentials not configured; requests are sent unauthenticated");
    }
    let processor = Arc::new(
        checkout::services::payments::HttpPaymentProcessor::new(&cfg)
            .context("failed to build payment processor client")?,
    );

    let bind_address = cfg.bind_address();
    let state = checkout::AppState::build(db, Arc::new(cfg), processor, event_sender)
        .context("failed to wire services")?;
    let app = checkout::build_router(Arc::new(state));

    info!("stateset-checkout listening on http://{}", bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
