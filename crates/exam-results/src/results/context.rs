use std::collections::HashSet;

use super::domain::{Batch, BatchId, ResultDraft, StudentRef, Subject};
use super::errors::{NotFoundError, StructuralError, ValidationError};
use super::evaluation::{
    batch_max_total, Aggregate, EvaluatedSubject, ResultAggregator, ScoringSchemeEvaluator,
    SubjectMarksInput,
};
use super::repository::{BatchDirectory, SubjectDirectory};
use super::service::ResultServiceError;

/// A batch with its subjects and validated schemes, resolved once per engine call.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub batch: Batch,
    pub subjects: Vec<Subject>,
    pub max_total: f64,
}

/// Evaluated marks of one student ready to be written.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub subjects: Vec<EvaluatedSubject>,
    pub aggregate: Aggregate,
}

impl ScoredEntry {
    pub fn into_draft(self, student: &StudentRef, batch: &BatchId) -> ResultDraft {
        ResultDraft {
            student_id: student.id.clone(),
            reg_number: student.reg_number.clone(),
            batch_id: batch.clone(),
            subject_marks: self
                .subjects
                .iter()
                .map(EvaluatedSubject::to_subject_marks)
                .collect(),
            grand_total: self.aggregate.grand_total,
            percentage: self.aggregate.percentage,
        }
    }
}

impl BatchContext {
    pub fn resolve<C>(catalog: &C, batch_id: &BatchId) -> Result<Self, ResultServiceError>
    where
        C: BatchDirectory + SubjectDirectory + ?Sized,
    {
        let batch = catalog
            .batch(batch_id)?
            .ok_or_else(|| StructuralError::UnknownBatch(batch_id.clone()))?;

        let mut subjects = Vec::with_capacity(batch.subjects.len());
        for subject_id in &batch.subjects {
            let subject =
                catalog
                    .subject(subject_id)?
                    .ok_or_else(|| StructuralError::MissingSubject {
                        batch: batch_id.clone(),
                        subject: subject_id.clone(),
                    })?;
            subject
                .scheme
                .validate()
                .map_err(|source| StructuralError::InvalidScheme {
                    subject: subject_id.clone(),
                    source,
                })?;
            subjects.push(subject);
        }

        let max_total = batch_max_total(&subjects);
        Ok(Self {
            batch,
            subjects,
            max_total,
        })
    }

    pub fn id(&self) -> &BatchId {
        &self.batch.id
    }

    /// Evaluate marks for every subject of the batch and aggregate them. Each batch subject
    /// must appear exactly once; subjects outside the batch are unknown.
    pub fn score(&self, inputs: &[SubjectMarksInput]) -> Result<ScoredEntry, ResultServiceError> {
        let mut seen = HashSet::new();
        for input in inputs {
            if !self.subjects.iter().any(|subject| subject.id == input.subject) {
                return Err(NotFoundError::Subject(input.subject.clone()).into());
            }
            if !seen.insert(&input.subject) {
                return Err(ValidationError::DuplicateSubject(input.subject.clone()).into());
            }
        }

        let mut evaluated = Vec::with_capacity(self.subjects.len());
        for subject in &self.subjects {
            let input = inputs
                .iter()
                .find(|input| input.subject == subject.id)
                .ok_or_else(|| ValidationError::MissingSubject(subject.code.clone()))?;
            evaluated.push(ScoringSchemeEvaluator::evaluate(subject, input)?);
        }

        let aggregate = ResultAggregator::aggregate(&evaluated, self.max_total);
        Ok(ScoredEntry {
            subjects: evaluated,
            aggregate,
        })
    }
}
