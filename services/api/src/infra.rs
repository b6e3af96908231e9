use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use exam_results::config::ResultsConfig;
use exam_results::error::AppError;
use exam_results::results::{
    BatchId, Catalog, IngestOutcome, MemoryCatalog, MemoryResultStore, ResultService,
};
use metrics_exporter_prometheus::PrometheusHandle;

/// NIHAYA 2 batch, subjects and students the portal was first published with.
const SEED_CATALOG: &str =
    include_str!("../../../crates/exam-results/fixtures/nihaya2_catalog.json");
/// Marks of the seeded batch as exported from the reports screen.
pub(crate) const SEED_MARKS: &str =
    include_str!("../../../crates/exam-results/fixtures/nihaya2_marks.csv");
pub(crate) const SEED_BATCH: &str = "nihaya-2";

pub(crate) type PortalService = ResultService<MemoryCatalog, MemoryResultStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Catalog from a JSON file, or the seeded batch when no path is given.
pub(crate) fn load_catalog(path: Option<&Path>) -> Result<Catalog, AppError> {
    let catalog = match path {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => serde_json::from_str(SEED_CATALOG)?,
    };
    Ok(catalog)
}

pub(crate) fn build_service(catalog: Catalog, config: ResultsConfig) -> Arc<PortalService> {
    Arc::new(ResultService::new(
        Arc::new(MemoryCatalog::new(catalog)),
        Arc::new(MemoryResultStore::default()),
        config,
    ))
}

/// Apply a marks file to a batch, falling back to the seeded marks.
pub(crate) fn ingest_marks(
    service: &PortalService,
    batch: &BatchId,
    marks: Option<&Path>,
) -> Result<IngestOutcome, AppError> {
    let outcome = match marks {
        Some(path) => service.ingest_csv(batch, fs::File::open(path)?)?,
        None => service.ingest_csv(batch, Cursor::new(SEED_MARKS))?,
    };
    Ok(outcome)
}
