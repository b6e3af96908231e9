mod aggregate;
mod rules;

pub use aggregate::{
    batch_max_total, percentage_of, recompute, round_hundredths, round_one_decimal, Aggregate,
    RecomputeError, ResultAggregator,
};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{ComponentKey, Mark, Subject, SubjectId, SubjectMarks};
use super::errors::ValidationError;

/// Raw marks for one subject as entered by staff or read from an upload row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectMarksInput {
    pub subject: SubjectId,
    /// Declares the whole subject absent; every input component resolves to absent.
    #[serde(default)]
    pub absent: bool,
    #[serde(default)]
    pub marks: BTreeMap<ComponentKey, Mark>,
}

impl From<&SubjectMarks> for SubjectMarksInput {
    fn from(stored: &SubjectMarks) -> Self {
        Self {
            subject: stored.subject.clone(),
            absent: false,
            marks: stored.marks.clone(),
        }
    }
}

/// Validated subject marks with every component resolved to a number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedSubject {
    pub subject: SubjectId,
    /// Every component key, inputs and computed, resolved for arithmetic (absent is zero).
    pub values: BTreeMap<ComponentKey, f64>,
    /// Resolved input marks, keeping absence visible for display.
    pub marks: BTreeMap<ComponentKey, Mark>,
    pub absent: bool,
    pub total_component: Option<ComponentKey>,
}

impl EvaluatedSubject {
    pub fn value(&self, key: &ComponentKey) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Designated computed total when the scheme has one, otherwise the input sum.
    pub fn total(&self) -> f64 {
        match self
            .total_component
            .as_ref()
            .and_then(|key| self.values.get(key))
        {
            Some(total) => *total,
            None => self.marks.values().map(Mark::value).sum(),
        }
    }

    pub fn to_subject_marks(&self) -> SubjectMarks {
        SubjectMarks {
            subject: self.subject.clone(),
            marks: self.marks.clone(),
        }
    }
}

/// Applies a subject's scoring scheme to raw marks.
pub struct ScoringSchemeEvaluator;

impl ScoringSchemeEvaluator {
    /// Validate inputs against the scheme, then derive computed components from their sources.
    pub fn evaluate(
        subject: &Subject,
        input: &SubjectMarksInput,
    ) -> Result<EvaluatedSubject, ValidationError> {
        let scheme = &subject.scheme;
        rules::reject_unexpected_keys(subject, &input.marks)?;

        let mut marks = BTreeMap::new();
        let mut values = BTreeMap::new();
        for component in scheme.input_components() {
            let mark = rules::resolve_input(subject, component, input)?;
            values.insert(component.key.clone(), mark.value());
            marks.insert(component.key.clone(), mark);
        }

        for component in scheme.computed_components() {
            let value = component
                .sources()
                .iter()
                .filter_map(|source| marks.get(source))
                .map(Mark::value)
                .sum();
            values.insert(component.key.clone(), round_hundredths(value));
        }

        let absent = input.absent || (!marks.is_empty() && marks.values().all(Mark::is_absent));

        Ok(EvaluatedSubject {
            subject: subject.id.clone(),
            values,
            marks,
            absent,
            total_component: scheme.total.clone(),
        })
    }
}
