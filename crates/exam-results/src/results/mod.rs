//! Examination results: scoring schemes, evaluation, ranking and bulk mark ingestion.
//!
//! Writes go through [`ResultService`], which serializes every "mutate then rank" sequence
//! per batch so stored ranks always reflect the stored totals of the whole batch.

pub mod card;
mod context;
pub mod domain;
pub mod errors;
pub mod evaluation;
pub mod ingest;
mod locks;
pub mod memory;
pub mod ranking;
pub mod report;
pub mod repository;
pub mod scheme;
pub mod service;

#[cfg(test)]
mod tests;

pub use card::{ComponentLine, ResultCard, SubjectLine};
pub use context::{BatchContext, ScoredEntry};
pub use domain::{
    Batch, BatchId, ComponentKey, ExamResult, Mark, RegNumber, ResultDraft, ResultId, StudentId,
    StudentRef, Subject, SubjectId, SubjectMarks, ABSENT_LABEL,
};
pub use errors::{NotFoundError, StructuralError, ValidationError};
pub use evaluation::{
    Aggregate, EvaluatedSubject, ResultAggregator, ScoringSchemeEvaluator, SubjectMarksInput,
};
pub use ingest::{BulkIngestionPipeline, IngestOutcome, MarkTable, RowError};
pub use locks::BatchLocks;
pub use memory::{Catalog, MemoryCatalog, MemoryResultStore};
pub use ranking::{refresh_ranks, RankEngine, RankError, RefreshError};
pub use report::{
    BatchComparison, BatchReport, Grade, GradeCount, SubjectPerformance, TopPerformer,
};
pub use repository::{
    BatchDirectory, RepositoryError, ResultStore, StudentDirectory, SubjectDirectory, Upserted,
};
pub use scheme::{ComponentKind, ScoringComponent, ScoringScheme, SchemeError};
pub use service::{ResultEntry, ResultService, ResultServiceError};
