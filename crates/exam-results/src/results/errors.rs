use super::domain::{BatchId, ComponentKey, RegNumber, SubjectId};
use super::scheme::SchemeError;

/// Row-scoped problems with entered marks. Collected per row during bulk ingestion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing value for {subject}_{component}")]
    MissingValue {
        subject: String,
        component: ComponentKey,
    },
    #[error("out of range: {subject}_{component} is {value}, allowed 0 to {max}")]
    OutOfRange {
        subject: String,
        component: ComponentKey,
        value: f64,
        max: f64,
    },
    #[error("unknown component {subject}_{component}")]
    UnknownComponent {
        subject: String,
        component: ComponentKey,
    },
    #[error("{subject}_{component} is computed and cannot be entered")]
    ComputedSupplied {
        subject: String,
        component: ComponentKey,
    },
    #[error("column {column} holds '{value}', expected a number or the absence marker")]
    MalformedCell { column: String, value: String },
    #[error("no marks supplied for subject {0}")]
    MissingSubject(String),
    #[error("marks for subject {0} supplied more than once")]
    DuplicateSubject(SubjectId),
    #[error("registration number is blank")]
    MissingRegNumber,
    #[error(
        "registration number {reg_number} already appeared on row {first_row}; \
         only that first row is considered, even when it was rejected"
    )]
    DuplicateRow {
        reg_number: RegNumber,
        first_row: usize,
    },
}

/// Unknown references. Row-scoped during bulk ingestion, fatal for single edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotFoundError {
    #[error("student {0} not found")]
    Student(RegNumber),
    #[error("subject {0} is not part of this batch")]
    Subject(SubjectId),
    #[error("no result for student {reg_number} in batch {batch}")]
    Result {
        reg_number: RegNumber,
        batch: BatchId,
    },
    #[error("no results recorded for student {0}")]
    NoResults(RegNumber),
}

/// Whole-call failures raised before anything is written.
#[derive(Debug, thiserror::Error)]
pub enum StructuralError {
    #[error("batch {0} does not exist")]
    UnknownBatch(BatchId),
    #[error("scheme for subject {subject} of batch {batch} could not be read")]
    MissingSubject { batch: BatchId, subject: SubjectId },
    #[error("subject {subject} has an invalid scoring scheme: {source}")]
    InvalidScheme {
        subject: SubjectId,
        source: SchemeError,
    },
    #[error("upload is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("malformed upload: {0}")]
    Csv(#[from] csv::Error),
}
