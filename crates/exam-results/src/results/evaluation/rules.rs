use std::collections::BTreeMap;

use super::super::domain::{ComponentKey, Mark, Subject};
use super::super::errors::ValidationError;
use super::super::scheme::ScoringComponent;
use super::SubjectMarksInput;

/// Callers supply input components only; computed keys are always derived.
pub(crate) fn reject_unexpected_keys(
    subject: &Subject,
    marks: &BTreeMap<ComponentKey, Mark>,
) -> Result<(), ValidationError> {
    for key in marks.keys() {
        match subject.scheme.component(key) {
            Some(component) if component.is_computed() => {
                return Err(ValidationError::ComputedSupplied {
                    subject: subject.code.clone(),
                    component: key.clone(),
                })
            }
            Some(_) => {}
            None => {
                return Err(ValidationError::UnknownComponent {
                    subject: subject.code.clone(),
                    component: key.clone(),
                })
            }
        }
    }

    Ok(())
}

pub(crate) fn resolve_input(
    subject: &Subject,
    component: &ScoringComponent,
    input: &SubjectMarksInput,
) -> Result<Mark, ValidationError> {
    if input.absent {
        return Ok(Mark::Absent);
    }

    let max = component.max().unwrap_or(0.0);
    match input.marks.get(&component.key) {
        None => Err(ValidationError::MissingValue {
            subject: subject.code.clone(),
            component: component.key.clone(),
        }),
        Some(Mark::Absent) => Ok(Mark::Absent),
        // `+ 0.0` folds a negative zero into zero.
        Some(Mark::Present(value)) if value.is_finite() && (0.0..=max).contains(value) => {
            Ok(Mark::Present(*value + 0.0))
        }
        Some(Mark::Present(value)) => Err(ValidationError::OutOfRange {
            subject: subject.code.clone(),
            component: component.key.clone(),
            value: *value,
            max,
        }),
    }
}
