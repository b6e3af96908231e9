use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use exam_results::results::{
    BatchDirectory, BatchId, RegNumber, RepositoryError, ResultEntry, ResultService,
    ResultServiceError, ResultStore, StructuralError, StudentDirectory, SubjectDirectory,
};
use serde_json::json;

use crate::infra::AppState;

/// Result endpoints plus the health, readiness and metrics endpoints.
pub(crate) fn with_result_routes<C, R>(service: Arc<ResultService<C, R>>) -> Router
where
    C: BatchDirectory + SubjectDirectory + StudentDirectory + 'static,
    R: ResultStore + 'static,
{
    result_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) fn result_router<C, R>(service: Arc<ResultService<C, R>>) -> Router
where
    C: BatchDirectory + SubjectDirectory + StudentDirectory + 'static,
    R: ResultStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/batches/:batch_id/results",
            get(standings_handler::<C, R>).post(record_handler::<C, R>),
        )
        .route(
            "/api/v1/batches/:batch_id/results/bulk",
            post(bulk_handler::<C, R>),
        )
        .route(
            "/api/v1/batches/:batch_id/results/:reg_number",
            delete(remove_handler::<C, R>),
        )
        .route(
            "/api/v1/batches/:batch_id/rerank",
            post(rerank_handler::<C, R>),
        )
        .route(
            "/api/v1/batches/:batch_id/report",
            get(report_handler::<C, R>),
        )
        .route("/api/v1/report", get(overview_handler::<C, R>))
        .route("/api/v1/results/:reg_number", get(lookup_handler::<C, R>))
        .with_state(service)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn standings_handler<C, R>(
    State(service): State<Arc<ResultService<C, R>>>,
    Path(batch_id): Path<String>,
) -> Response
where
    C: BatchDirectory + SubjectDirectory + StudentDirectory + 'static,
    R: ResultStore + 'static,
{
    match service.standings(&BatchId(batch_id)) {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn record_handler<C, R>(
    State(service): State<Arc<ResultService<C, R>>>,
    Path(batch_id): Path<String>,
    Json(entry): Json<ResultEntry>,
) -> Response
where
    C: BatchDirectory + SubjectDirectory + StudentDirectory + 'static,
    R: ResultStore + 'static,
{
    let batch_id = BatchId(batch_id);
    match off_runtime(move || service.record(&batch_id, entry)).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(response) => response,
    }
}

/// CSV upload. Row problems come back in the body; only structural problems fail the request.
pub(crate) async fn bulk_handler<C, R>(
    State(service): State<Arc<ResultService<C, R>>>,
    Path(batch_id): Path<String>,
    body: String,
) -> Response
where
    C: BatchDirectory + SubjectDirectory + StudentDirectory + 'static,
    R: ResultStore + 'static,
{
    let batch_id = BatchId(batch_id);
    match off_runtime(move || service.ingest_csv(&batch_id, body.as_bytes())).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn remove_handler<C, R>(
    State(service): State<Arc<ResultService<C, R>>>,
    Path((batch_id, reg_number)): Path<(String, String)>,
) -> Response
where
    C: BatchDirectory + SubjectDirectory + StudentDirectory + 'static,
    R: ResultStore + 'static,
{
    match service.remove(&BatchId(batch_id), &RegNumber(reg_number)) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn rerank_handler<C, R>(
    State(service): State<Arc<ResultService<C, R>>>,
    Path(batch_id): Path<String>,
) -> Response
where
    C: BatchDirectory + SubjectDirectory + StudentDirectory + 'static,
    R: ResultStore + 'static,
{
    match service.rerank(&BatchId(batch_id)) {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn report_handler<C, R>(
    State(service): State<Arc<ResultService<C, R>>>,
    Path(batch_id): Path<String>,
) -> Response
where
    C: BatchDirectory + SubjectDirectory + StudentDirectory + 'static,
    R: ResultStore + 'static,
{
    match service.report(&BatchId(batch_id)) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn overview_handler<C, R>(
    State(service): State<Arc<ResultService<C, R>>>,
) -> Response
where
    C: BatchDirectory + SubjectDirectory + StudentDirectory + 'static,
    R: ResultStore + 'static,
{
    match service.overview() {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn lookup_handler<C, R>(
    State(service): State<Arc<ResultService<C, R>>>,
    Path(reg_number): Path<String>,
) -> Response
where
    C: BatchDirectory + SubjectDirectory + StudentDirectory + 'static,
    R: ResultStore + 'static,
{
    match service.lookup(&RegNumber(reg_number)) {
        Ok(card) => (StatusCode::OK, Json(card)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Writes may wait on the batch lock behind a long upload, so they run on the blocking pool.
async fn off_runtime<T, F>(work: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ResultServiceError> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(outcome) => outcome.map_err(error_response),
        Err(error) => {
            tracing::error!(error = %error, "blocking result task failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}

fn error_response(error: ResultServiceError) -> Response {
    let status = match &error {
        ResultServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ResultServiceError::NotFound(_)
        | ResultServiceError::Structural(StructuralError::UnknownBatch(_)) => {
            StatusCode::NOT_FOUND
        }
        ResultServiceError::Structural(_) => StatusCode::BAD_REQUEST,
        ResultServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        ResultServiceError::Repository(_) | ResultServiceError::Rank(_) => {
            tracing::error!(error = %error, "result request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, Json(json!({ "error": error.to_string() }))).into_response()
}
