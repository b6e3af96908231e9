mod columns;
mod parser;

pub use columns::{column_name, expected_headers, REG_NUMBER_COLUMN};
pub use parser::{MarkTable, TableRow};

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::context::BatchContext;
use super::domain::RegNumber;
use super::errors::{NotFoundError, ValidationError};
use super::evaluation::SubjectMarksInput;
use super::ranking::refresh_ranks;
use super::repository::{ResultStore, StudentDirectory, Upserted};
use super::service::ResultServiceError;
use columns::ColumnLayout;

/// Summary returned to whoever rendered the upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub created: usize,
    pub updated: usize,
    pub errors: Vec<RowError>,
}

/// A rejected row. Other rows are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    #[serde(rename = "regNumber")]
    pub reg_number: String,
    pub error: String,
}

/// Applies an upload to one batch: every row independently, then one rank recomputation.
///
/// Callers hold the batch lock for the whole run.
pub struct BulkIngestionPipeline<'a, S: ?Sized, R: ?Sized> {
    context: &'a BatchContext,
    students: &'a S,
    store: &'a R,
    absence_marker: &'a str,
}

impl<'a, S, R> BulkIngestionPipeline<'a, S, R>
where
    S: StudentDirectory + ?Sized,
    R: ResultStore + ?Sized,
{
    pub fn new(
        context: &'a BatchContext,
        students: &'a S,
        store: &'a R,
        absence_marker: &'a str,
    ) -> Self {
        Self {
            context,
            students,
            store,
            absence_marker,
        }
    }

    pub fn run(&self, table: &MarkTable) -> Result<IngestOutcome, ResultServiceError> {
        let (layout, extra) = ColumnLayout::resolve(&table.headers, &self.context.subjects)?;
        if !extra.is_empty() {
            debug!(batch = %self.context.id(), columns = ?extra, "ignoring unexpected upload columns");
        }

        let mut outcome = IngestOutcome::default();
        let mut first_rows: HashMap<RegNumber, usize> = HashMap::new();

        for row in &table.rows {
            let reg_number = row.cell(layout.reg_number).trim().to_string();
            match self.apply_row(&layout, row, &mut first_rows) {
                Ok(Upserted::Created(_)) => outcome.created += 1,
                Ok(Upserted::Updated(_)) => outcome.updated += 1,
                Err(error) => {
                    warn!(
                        batch = %self.context.id(),
                        row = row.row,
                        reg_number = %reg_number,
                        error = %error,
                        "upload row rejected"
                    );
                    outcome.errors.push(RowError {
                        row: row.row,
                        reg_number,
                        error: error.to_string(),
                    });
                }
            }
        }

        refresh_ranks(self.store, self.context.id())?;

        info!(
            batch = %self.context.id(),
            rows = table.rows.len(),
            created = outcome.created,
            updated = outcome.updated,
            rejected = outcome.errors.len(),
            "bulk upload applied"
        );
        Ok(outcome)
    }

    fn apply_row(
        &self,
        layout: &ColumnLayout,
        row: &TableRow,
        first_rows: &mut HashMap<RegNumber, usize>,
    ) -> Result<Upserted, ResultServiceError> {
        let raw_reg_number = row.cell(layout.reg_number).trim();
        if raw_reg_number.is_empty() {
            return Err(ValidationError::MissingRegNumber.into());
        }
        let reg_number = RegNumber::from(raw_reg_number);
        if let Some(first_row) = first_rows.get(&reg_number) {
            return Err(ValidationError::DuplicateRow {
                reg_number,
                first_row: *first_row,
            }
            .into());
        }
        first_rows.insert(reg_number.clone(), row.row);

        let student = self
            .students
            .find_by_reg_number(&reg_number)?
            .ok_or_else(|| NotFoundError::Student(reg_number.clone()))?;

        let inputs = self.row_inputs(layout, row)?;
        let scored = self.context.score(&inputs)?;
        let upserted = self
            .store
            .upsert(scored.into_draft(&student, self.context.id()))?;
        Ok(upserted)
    }

    fn row_inputs(
        &self,
        layout: &ColumnLayout,
        row: &TableRow,
    ) -> Result<Vec<SubjectMarksInput>, ValidationError> {
        let mut inputs = Vec::with_capacity(layout.subjects.len());
        for subject in &layout.subjects {
            let mut marks = BTreeMap::new();
            for column in &subject.columns {
                if let Some(mark) =
                    parser::parse_cell(&column.name, row.cell(column.index), self.absence_marker)?
                {
                    marks.insert(column.component.clone(), mark);
                }
            }
            inputs.push(SubjectMarksInput {
                subject: subject.subject.clone(),
                absent: false,
                marks,
            });
        }
        Ok(inputs)
    }
}
