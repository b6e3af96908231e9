use serde::{Deserialize, Serialize};

use super::super::domain::{Subject, SubjectMarks};
use super::super::errors::{NotFoundError, ValidationError};
use super::{EvaluatedSubject, ScoringSchemeEvaluator, SubjectMarksInput};

/// Grand total and percentage of one result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub grand_total: f64,
    pub percentage: f64,
}

/// Combines evaluated subjects into the cached totals of a result. Pure.
pub struct ResultAggregator;

impl ResultAggregator {
    pub fn aggregate(subjects: &[EvaluatedSubject], batch_max_total: f64) -> Aggregate {
        let grand_total = round_hundredths(subjects.iter().map(EvaluatedSubject::total).sum());
        Aggregate {
            grand_total,
            percentage: percentage_of(grand_total, batch_max_total),
        }
    }
}

/// Half-up rounding to one decimal place: `floor(10x + 0.5) / 10`.
pub fn round_one_decimal(value: f64) -> f64 {
    ((10.0 * value) + 0.5).floor() / 10.0
}

/// Rounds to two decimal places so sums of fractional marks compare equal to their exact
/// value (`0.1 + 0.2` becomes `0.3`). Negative zero comes back as zero.
pub fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0 + 0.0
}

/// Percentage of `score` against `max`; a non-positive maximum yields 0.
pub fn percentage_of(score: f64, max: f64) -> f64 {
    if max > 0.0 {
        round_one_decimal(score / max * 100.0)
    } else {
        0.0
    }
}

/// Sum of every input component maximum across the batch subjects.
pub fn batch_max_total(subjects: &[Subject]) -> f64 {
    subjects.iter().map(|subject| subject.scheme.max_total()).sum()
}

/// Re-derive the cached totals of stored marks against the batch subjects.
pub fn recompute(
    marks: &[SubjectMarks],
    subjects: &[Subject],
) -> Result<Aggregate, RecomputeError> {
    let mut evaluated = Vec::with_capacity(marks.len());
    for stored in marks {
        let subject = subjects
            .iter()
            .find(|subject| subject.id == stored.subject)
            .ok_or_else(|| NotFoundError::Subject(stored.subject.clone()))?;
        evaluated.push(ScoringSchemeEvaluator::evaluate(
            subject,
            &SubjectMarksInput::from(stored),
        )?);
    }

    Ok(ResultAggregator::aggregate(
        &evaluated,
        batch_max_total(subjects),
    ))
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecomputeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::domain::{ComponentKey, Mark, SubjectId};
    use crate::results::scheme::ScoringScheme;
    use std::collections::BTreeMap;

    fn evaluated(subject: &str, total: f64) -> EvaluatedSubject {
        let mut values = BTreeMap::new();
        values.insert(ComponentKey::from("T"), total);
        EvaluatedSubject {
            subject: SubjectId::from(subject),
            values,
            marks: BTreeMap::new(),
            absent: false,
            total_component: Some(ComponentKey::from("T")),
        }
    }

    #[test]
    fn rounds_half_up_to_one_decimal() {
        assert_eq!(round_one_decimal(81.285_714), 81.3);
        assert_eq!(round_one_decimal(80.714_285), 80.7);
        assert_eq!(round_one_decimal(71.56), 71.6);
        assert_eq!(round_one_decimal(0.0), 0.0);
    }

    #[test]
    fn fractional_sums_settle_on_their_decimal_value() {
        let subjects = vec![evaluated("a", 0.1), evaluated("b", 0.2)];
        let aggregate = ResultAggregator::aggregate(&subjects, 200.0);
        assert_eq!(aggregate.grand_total, 0.3);
        assert_eq!(round_hundredths(-0.0).to_bits(), 0.0f64.to_bits());
        assert_eq!(round_hundredths(569.004), 569.0);
    }

    #[test]
    fn aggregates_designated_totals_against_batch_max() {
        let subjects = vec![evaluated("a", 90.0), evaluated("b", 69.0)];
        let aggregate = ResultAggregator::aggregate(&subjects, 200.0);
        assert_eq!(aggregate.grand_total, 159.0);
        assert_eq!(aggregate.percentage, 79.5);
    }

    #[test]
    fn zero_batch_max_yields_zero_percent() {
        let subjects = vec![evaluated("a", 0.0)];
        let aggregate = ResultAggregator::aggregate(&subjects, 0.0);
        assert_eq!(aggregate.percentage, 0.0);
        assert_eq!(ResultAggregator::aggregate(&[], 0.0).grand_total, 0.0);
    }

    #[test]
    fn full_marks_stay_within_one_hundred_percent() {
        let subjects = vec![evaluated("a", 100.0), evaluated("b", 100.0)];
        assert_eq!(ResultAggregator::aggregate(&subjects, 200.0).percentage, 100.0);
    }

    #[test]
    fn recompute_matches_stored_marks() {
        let subjects = vec![
            Subject {
                id: SubjectId::from("bai"),
                code: "BAI".to_string(),
                name: "BAIDHAVI".to_string(),
                name_arabic: None,
                scheme: ScoringScheme::written_and_ce(90.0, 10.0),
            },
            Subject {
                id: SubjectId::from("buk"),
                code: "BUK".to_string(),
                name: "BUKHARI".to_string(),
                name_arabic: None,
                scheme: ScoringScheme::written_and_ce(90.0, 10.0),
            },
        ];

        let mut bai = BTreeMap::new();
        bai.insert(ComponentKey::from("W"), Mark::Present(80.0));
        bai.insert(ComponentKey::from("CE"), Mark::Present(10.0));
        let mut buk = BTreeMap::new();
        buk.insert(ComponentKey::from("W"), Mark::Absent);
        buk.insert(ComponentKey::from("CE"), Mark::Absent);
        let marks = vec![
            SubjectMarks {
                subject: SubjectId::from("bai"),
                marks: bai,
            },
            SubjectMarks {
                subject: SubjectId::from("buk"),
                marks: buk,
            },
        ];

        let aggregate = recompute(&marks, &subjects).expect("recomputes");
        assert_eq!(aggregate.grand_total, 90.0);
        assert_eq!(aggregate.percentage, 45.0);
    }
}
