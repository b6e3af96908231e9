use std::io::Read;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::card::ResultCard;
use super::context::BatchContext;
use super::domain::{BatchId, ExamResult, RegNumber, StudentRef, Subject};
use super::errors::{NotFoundError, StructuralError, ValidationError};
use super::evaluation::SubjectMarksInput;
use super::ingest::{BulkIngestionPipeline, IngestOutcome, MarkTable};
use super::locks::BatchLocks;
use super::ranking::{refresh_ranks, standing_order, RankError, RefreshError};
use super::report::BatchReport;
use super::repository::{
    BatchDirectory, RepositoryError, ResultStore, StudentDirectory, SubjectDirectory,
};
use crate::config::ResultsConfig;

/// Marks for one student entered through a single create/edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub reg_number: RegNumber,
    pub subjects: Vec<SubjectMarksInput>,
}

/// Service composing the directories, the result store and the computation engine.
///
/// Every operation that writes results holds the batch lock from resolution until the ranks
/// of the batch are saved.
pub struct ResultService<C, R> {
    catalog: Arc<C>,
    store: Arc<R>,
    locks: BatchLocks,
    config: ResultsConfig,
}

impl<C, R> ResultService<C, R>
where
    C: BatchDirectory + SubjectDirectory + StudentDirectory + 'static,
    R: ResultStore + 'static,
{
    pub fn new(catalog: Arc<C>, store: Arc<R>, config: ResultsConfig) -> Self {
        Self {
            catalog,
            store,
            locks: BatchLocks::default(),
            config,
        }
    }

    pub fn config(&self) -> &ResultsConfig {
        &self.config
    }

    /// Batches that currently have a lock entry.
    pub fn locked_batches(&self) -> usize {
        self.locks.tracked()
    }

    /// Parse a CSV upload and apply it to the batch.
    pub fn ingest_csv<Rd: Read>(
        &self,
        batch_id: &BatchId,
        reader: Rd,
    ) -> Result<IngestOutcome, ResultServiceError> {
        let table = MarkTable::from_reader(reader).map_err(StructuralError::from)?;
        self.ingest_table(batch_id, &table)
    }

    pub fn ingest_table(
        &self,
        batch_id: &BatchId,
        table: &MarkTable,
    ) -> Result<IngestOutcome, ResultServiceError> {
        self.exclusive(batch_id, || {
            let context = BatchContext::resolve(&*self.catalog, batch_id)?;
            BulkIngestionPipeline::new(
                &context,
                &*self.catalog,
                &*self.store,
                &self.config.absence_marker,
            )
            .run(table)
        })
    }

    /// Create or edit one student's result and return it with its refreshed rank.
    pub fn record(
        &self,
        batch_id: &BatchId,
        entry: ResultEntry,
    ) -> Result<ExamResult, ResultServiceError> {
        self.exclusive(batch_id, || {
            let context = BatchContext::resolve(&*self.catalog, batch_id)?;
            let student = self.student(&entry.reg_number)?;
            let scored = context.score(&entry.subjects)?;
            let upserted = self.store.upsert(scored.into_draft(&student, batch_id))?;
            let stored = upserted.into_result();

            let ranked = refresh_ranks(&*self.store, batch_id)?;
            info!(
                batch = %batch_id,
                reg_number = %student.reg_number,
                percentage = stored.percentage,
                "result recorded"
            );
            ranked
                .into_iter()
                .find(|result| result.id == stored.id)
                .ok_or_else(|| RepositoryError::NotFound.into())
        })
    }

    /// Delete a student's result from the batch and re-rank the remainder.
    pub fn remove(
        &self,
        batch_id: &BatchId,
        reg_number: &RegNumber,
    ) -> Result<ExamResult, ResultServiceError> {
        self.exclusive(batch_id, || {
            let student = self.student(reg_number)?;
            let removed = self.store.delete(&student.id, batch_id)?.ok_or_else(|| {
                NotFoundError::Result {
                    reg_number: reg_number.clone(),
                    batch: batch_id.clone(),
                }
            })?;

            refresh_ranks(&*self.store, batch_id)?;
            info!(batch = %batch_id, reg_number = %reg_number, "result removed");
            Ok(removed)
        })
    }

    /// Recompute and persist the ranks of a batch.
    pub fn rerank(&self, batch_id: &BatchId) -> Result<Vec<ExamResult>, ResultServiceError> {
        self.exclusive(batch_id, || {
            Ok(refresh_ranks(&*self.store, batch_id)?)
        })
    }

    /// Stored results of a batch in rank order.
    pub fn standings(&self, batch_id: &BatchId) -> Result<Vec<ExamResult>, ResultServiceError> {
        self.exclusive(batch_id, || {
            let mut results = self.store.list_by_batch(batch_id)?;
            results.sort_by(|a, b| {
                a.rank
                    .unwrap_or(u32::MAX)
                    .cmp(&b.rank.unwrap_or(u32::MAX))
                    .then_with(|| standing_order(a, b))
            });
            Ok(results)
        })
    }

    /// Public lookup by registration number. A student with results in several batches gets
    /// the most recently updated one.
    pub fn lookup(&self, reg_number: &RegNumber) -> Result<ResultCard, ResultServiceError> {
        let student = self.student(reg_number)?;
        let result = self
            .store
            .list_by_student(&student.id)?
            .into_iter()
            .max_by_key(|result| result.updated_at)
            .ok_or_else(|| NotFoundError::NoResults(reg_number.clone()))?;

        let context = BatchContext::resolve(&*self.catalog, &result.batch_id)?;
        Ok(ResultCard::build(&student, &context, &result, &self.config)?)
    }

    pub fn report(&self, batch_id: &BatchId) -> Result<BatchReport, ResultServiceError> {
        let (context, results) = self.exclusive(batch_id, || {
            let context = BatchContext::resolve(&*self.catalog, batch_id)?;
            let results = self.store.list_by_batch(batch_id)?;
            Ok((context, results))
        })?;
        Ok(BatchReport::build(
            &results,
            &context.subjects,
            self.config.pass_percentage,
        ))
    }

    /// Report over every batch in the catalog, with a per-batch comparison.
    pub fn overview(&self) -> Result<BatchReport, ResultServiceError> {
        let batches = self.catalog.batches()?;
        let mut subjects: Vec<Subject> = Vec::new();
        let mut results = Vec::new();
        for batch in &batches {
            let (context, batch_results) = self.exclusive(&batch.id, || {
                let context = BatchContext::resolve(&*self.catalog, &batch.id)?;
                let results = self.store.list_by_batch(&batch.id)?;
                Ok((context, results))
            })?;
            for subject in context.subjects {
                if !subjects.iter().any(|known| known.id == subject.id) {
                    subjects.push(subject);
                }
            }
            results.extend(batch_results);
        }

        Ok(BatchReport::across_batches(
            &batches,
            &results,
            &subjects,
            self.config.pass_percentage,
        ))
    }

    /// Unknown batches are refused before a lock entry is created for them.
    fn exclusive<T>(
        &self,
        batch_id: &BatchId,
        work: impl FnOnce() -> Result<T, ResultServiceError>,
    ) -> Result<T, ResultServiceError> {
        self.require_batch(batch_id)?;
        self.locks.run_exclusive(batch_id, work)
    }

    fn student(&self, reg_number: &RegNumber) -> Result<StudentRef, ResultServiceError> {
        Ok(self
            .catalog
            .find_by_reg_number(reg_number)?
            .ok_or_else(|| NotFoundError::Student(reg_number.clone()))?)
    }

    fn require_batch(&self, batch_id: &BatchId) -> Result<(), ResultServiceError> {
        self.catalog
            .batch(batch_id)?
            .map(|_| ())
            .ok_or_else(|| StructuralError::UnknownBatch(batch_id.clone()).into())
    }
}

/// Error raised by the result service.
#[derive(Debug, thiserror::Error)]
pub enum ResultServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Rank(#[from] RankError),
}

impl From<RefreshError> for ResultServiceError {
    fn from(value: RefreshError) -> Self {
        match value {
            RefreshError::Repository(err) => Self::Repository(err),
            RefreshError::Rank(err) => Self::Rank(err),
        }
    }
}
