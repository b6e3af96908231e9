use crate::cli::ServeArgs;
use crate::infra::{build_service, ingest_marks, load_catalog, AppState, SEED_BATCH};
use crate::routes::with_result_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use exam_results::config::AppConfig;
use exam_results::error::AppError;
use exam_results::results::BatchId;
use exam_results::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = load_catalog(args.catalog.as_deref())?;
    let service = build_service(catalog, config.results.clone());
    if args.seed {
        let outcome = ingest_marks(&service, &BatchId::from(SEED_BATCH), None)?;
        info!(created = outcome.created, "seeded sample marks");
    }

    let app = with_result_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "exam result portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}
