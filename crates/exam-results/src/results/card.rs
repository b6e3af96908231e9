use serde::Serialize;

use super::context::BatchContext;
use super::domain::{format_score, ExamResult, Mark, RegNumber, StudentRef};
use super::errors::ValidationError;
use super::evaluation::{ScoringSchemeEvaluator, SubjectMarksInput};
use super::report::Grade;
use crate::config::ResultsConfig;

/// Public view of one stored result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultCard {
    pub reg_number: RegNumber,
    pub student_name: String,
    pub batch_name: String,
    pub exam_title: String,
    pub year: u16,
    pub subjects: Vec<SubjectLine>,
    pub grand_total: f64,
    pub max_total: f64,
    pub percentage: f64,
    pub rank: Option<u32>,
    pub grade: Grade,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectLine {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_arabic: Option<String>,
    pub components: Vec<ComponentLine>,
    pub total: String,
    pub max: f64,
    pub absent: bool,
}

/// A component as printed: a score, or `AB` for an absent input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentLine {
    pub key: String,
    pub label: String,
    pub value: String,
    pub max: f64,
}

impl ResultCard {
    /// Render a stored result. Computed components are re-derived from the stored inputs.
    pub fn build(
        student: &StudentRef,
        context: &BatchContext,
        result: &ExamResult,
        config: &ResultsConfig,
    ) -> Result<Self, ValidationError> {
        let mut subjects = Vec::with_capacity(context.subjects.len());
        for subject in &context.subjects {
            let stored = result
                .marks_for(&subject.id)
                .ok_or_else(|| ValidationError::MissingSubject(subject.code.clone()))?;
            let evaluated =
                ScoringSchemeEvaluator::evaluate(subject, &SubjectMarksInput::from(stored))?;

            let components = subject
                .scheme
                .components
                .iter()
                .map(|component| {
                    let value = match evaluated.marks.get(&component.key) {
                        Some(mark) => mark.display(),
                        None if evaluated.absent => Mark::Absent.display(),
                        None => format_score(evaluated.value(&component.key).unwrap_or(0.0)),
                    };
                    ComponentLine {
                        key: component.key.to_string(),
                        label: component.label.clone(),
                        value,
                        max: subject.scheme.effective_max(&component.key).unwrap_or(0.0),
                    }
                })
                .collect();

            let total = if evaluated.absent {
                Mark::Absent.display()
            } else {
                format_score(evaluated.total())
            };

            subjects.push(SubjectLine {
                code: subject.code.clone(),
                name: subject.name.clone(),
                name_arabic: subject.name_arabic.clone(),
                components,
                total,
                max: subject.scheme.total_max(),
                absent: evaluated.absent,
            });
        }

        Ok(Self {
            reg_number: student.reg_number.clone(),
            student_name: student.name.clone(),
            batch_name: context.batch.name.clone(),
            exam_title: context.batch.exam_title.clone(),
            year: context.batch.year,
            subjects,
            grand_total: result.grand_total,
            max_total: context.max_total,
            percentage: result.percentage,
            rank: result.rank,
            grade: Grade::from_percentage(result.percentage),
            passed: result.percentage >= config.pass_percentage,
        })
    }
}
