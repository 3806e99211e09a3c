use crate::cli::ServeArgs;
use crate::infra::{apply_snapshot_overrides, bootstrap, load_recommender, AppState};
use crate::routes::with_recommendation_routes;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use internship_match::error::AppError;
use internship_match::recommender::Recommender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

pub(crate) async fn run(args: ServeArgs) -> Result<(), AppError> {
    let mut config = bootstrap()?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    apply_snapshot_overrides(&mut config.data, args.snapshot);

    // Snapshots load before binding so a bad catalog never opens the port.
    let recommender = Arc::new(load_recommender(&config.data)?);
    let readiness = Arc::new(AtomicBool::new(false));
    let app = build_app(recommender, readiness.clone());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness.store(true, Ordering::Release);
    info!(?config.environment, %addr, "internship recommender listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(readiness))
        .await?;

    info!("internship recommender stopped");
    Ok(())
}

fn build_app(recommender: Arc<Recommender>, readiness: Arc<AtomicBool>) -> Router {
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let state = AppState {
        readiness,
        metrics: Arc::new(prometheus_handle),
    };

    with_recommendation_routes(recommender)
        .layer(Extension(state))
        .layer(prometheus_layer)
}

/// Resolves on Ctrl+C or SIGTERM; readiness drops first so probes stop routing traffic here.
async fn shutdown_signal(readiness: Arc<AtomicBool>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }

    readiness.store(false, Ordering::Release);
}
