use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scheme::ScoringScheme;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

identifier!(
    /// Storage identifier of an enrolled student.
    StudentId
);
identifier!(
    /// Storage identifier of an examination batch.
    BatchId
);
identifier!(
    /// Storage identifier of a subject.
    SubjectId
);
identifier!(
    /// Storage identifier of a stored result.
    ResultId
);
identifier!(
    /// Registration number printed on admit cards. Compared as the raw stored string.
    RegNumber
);
identifier!(
    /// Key of a scoring component, unique within its scheme (e.g. `W`, `CE`, `T`).
    ComponentKey
);

/// Entered value for one input component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    Present(f64),
    Absent,
}

impl Mark {
    /// Arithmetic value; absence counts as zero.
    pub fn value(&self) -> f64 {
        match self {
            Mark::Present(value) => *value,
            Mark::Absent => 0.0,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Mark::Absent)
    }

    pub fn display(&self) -> String {
        match self {
            Mark::Present(value) => format_score(*value),
            Mark::Absent => ABSENT_LABEL.to_string(),
        }
    }
}

/// Printed in place of a score when the student was absent.
pub const ABSENT_LABEL: &str = "AB";

pub fn format_score(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

/// Stored marks for one subject of a result. Only input components are kept; computed
/// components are always re-derived from the scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectMarks {
    pub subject: SubjectId,
    pub marks: BTreeMap<ComponentKey, Mark>,
}

impl SubjectMarks {
    pub fn is_absent(&self) -> bool {
        !self.marks.is_empty() && self.marks.values().all(Mark::is_absent)
    }
}

/// Subject definition with its scoring scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_arabic: Option<String>,
    pub scheme: ScoringScheme,
}

/// Examination batch. Subject order is the column order of bulk uploads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub name: String,
    pub year: u16,
    pub semester: String,
    pub exam_title: String,
    pub subjects: Vec<SubjectId>,
}

/// Minimal student projection needed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRef {
    pub id: StudentId,
    pub reg_number: RegNumber,
    pub name: String,
}

/// Stored result of one student in one batch.
///
/// `grand_total` and `percentage` are caches of values derivable from `subject_marks` and the
/// batch schemes; `rank` is written only by rank recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: ResultId,
    pub student_id: StudentId,
    pub reg_number: RegNumber,
    pub batch_id: BatchId,
    pub subject_marks: Vec<SubjectMarks>,
    pub grand_total: f64,
    pub percentage: f64,
    pub rank: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExamResult {
    pub fn marks_for(&self, subject: &SubjectId) -> Option<&SubjectMarks> {
        self.subject_marks
            .iter()
            .find(|marks| &marks.subject == subject)
    }
}

/// Values written by an upsert; the store owns ids, timestamps and ranks.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultDraft {
    pub student_id: StudentId,
    pub reg_number: RegNumber,
    pub batch_id: BatchId,
    pub subject_marks: Vec<SubjectMarks>,
    pub grand_total: f64,
    pub percentage: f64,
}
