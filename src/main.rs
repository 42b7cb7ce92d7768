use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use dosekeeper::api::router::api_router;
use dosekeeper::api::types::ApiContext;
use dosekeeper::notifier::{DisabledNotifier, Notifier, SmtpNotifier};
use dosekeeper::{config, db, evaluator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let db_path = config::database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = db::open_database(&db_path)?;
    tracing::info!(path = %db_path.display(), "Database ready");

    let notifier: Arc<dyn Notifier> = match config::SmtpConfig::from_env() {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, "SMTP notifier configured");
            Arc::new(SmtpNotifier::new(smtp))
        }
        None => {
            tracing::warn!("SMTP_HOST unset, guardian notifications disabled");
            Arc::new(DisabledNotifier)
        }
    };

    let ctx = ApiContext::new(conn, notifier);

    spawn_evaluation_loop(ctx.clone());

    let app = api_router(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config::listen_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Built-in periodic evaluator, alongside the on-demand HTTP trigger.
/// Shares the run lock with the trigger so runs never overlap.
fn spawn_evaluation_loop(ctx: ApiContext) {
    let period = Duration::from_secs(config::evaluation_interval_secs());
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // consume the immediate first tick; first run happens after one period
        interval.tick().await;
        loop {
            interval.tick().await;
            let _run_guard = ctx.run_lock.lock().await;
            let report = {
                let conn = match ctx.db() {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::error!(error = %e, "Evaluation loop could not open db");
                        continue;
                    }
                };
                evaluator::run_evaluation(&conn, ctx.notifier.as_ref(), Local::now().naive_local())
            };
            match report {
                Ok(report) => tracing::info!(
                    checked = report.medications_checked,
                    notified = report.notified.len(),
                    failed = report.failures.len(),
                    "Periodic evaluation run finished"
                ),
                Err(e) => tracing::error!(error = %e, "Periodic evaluation run failed"),
            }
        }
    });
}
