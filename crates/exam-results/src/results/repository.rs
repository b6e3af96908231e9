use super::domain::{
    Batch, BatchId, ExamResult, RegNumber, ResultDraft, StudentId, StudentRef, Subject, SubjectId,
};

/// Lookup of batch definitions.
pub trait BatchDirectory: Send + Sync {
    fn batch(&self, id: &BatchId) -> Result<Option<Batch>, RepositoryError>;

    fn batches(&self) -> Result<Vec<Batch>, RepositoryError>;
}

/// Lookup of subjects and their scoring schemes.
pub trait SubjectDirectory: Send + Sync {
    fn subject(&self, id: &SubjectId) -> Result<Option<Subject>, RepositoryError>;
}

/// Lookup of enrolled students by registration number.
pub trait StudentDirectory: Send + Sync {
    fn find_by_reg_number(&self, reg_number: &RegNumber)
        -> Result<Option<StudentRef>, RepositoryError>;
}

/// Storage abstraction for results so the engine can be exercised without persistence.
pub trait ResultStore: Send + Sync {
    fn find(
        &self,
        student: &StudentId,
        batch: &BatchId,
    ) -> Result<Option<ExamResult>, RepositoryError>;

    /// Create the `(student, batch)` result, or replace its marks and totals. Ranks are left
    /// untouched until the next [`ResultStore::save_ranks`].
    fn upsert(&self, draft: ResultDraft) -> Result<Upserted, RepositoryError>;

    fn list_by_batch(&self, batch: &BatchId) -> Result<Vec<ExamResult>, RepositoryError>;

    fn list_by_student(&self, student: &StudentId) -> Result<Vec<ExamResult>, RepositoryError>;

    /// Persist the ranks of a whole batch. Must apply all ranks or none.
    fn save_ranks(&self, batch: &BatchId, ranked: &[ExamResult]) -> Result<(), RepositoryError>;

    fn delete(
        &self,
        student: &StudentId,
        batch: &BatchId,
    ) -> Result<Option<ExamResult>, RepositoryError>;
}

/// Whether an upsert created a new result or replaced an existing one.
#[derive(Debug, Clone, PartialEq)]
pub enum Upserted {
    Created(ExamResult),
    Updated(ExamResult),
}

impl Upserted {
    pub fn result(&self) -> &ExamResult {
        match self {
            Upserted::Created(result) | Upserted::Updated(result) => result,
        }
    }

    pub fn into_result(self) -> ExamResult {
        match self {
            Upserted::Created(result) | Upserted::Updated(result) => result,
        }
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
