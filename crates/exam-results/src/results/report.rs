use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use super::domain::{Batch, BatchId, ExamResult, RegNumber, Subject, SubjectId};
use super::evaluation::{
    percentage_of, round_one_decimal, ScoringSchemeEvaluator, SubjectMarksInput,
};
use super::ranking::standing_order;

const TOP_PERFORMERS: usize = 5;

/// Letter grade derived from a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "C+")]
    CPlus,
    C,
    D,
    F,
}

impl Grade {
    pub const ALL: [Grade; 8] = [
        Grade::APlus,
        Grade::A,
        Grade::BPlus,
        Grade::B,
        Grade::CPlus,
        Grade::C,
        Grade::D,
        Grade::F,
    ];

    pub fn from_percentage(percentage: f64) -> Self {
        match percentage {
            p if p >= 90.0 => Grade::APlus,
            p if p >= 80.0 => Grade::A,
            p if p >= 70.0 => Grade::BPlus,
            p if p >= 60.0 => Grade::B,
            p if p >= 50.0 => Grade::CPlus,
            p if p >= 40.0 => Grade::C,
            p if p >= 30.0 => Grade::D,
            _ => Grade::F,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Statistics of one batch, or of every batch together, as shown on the reports screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// Distinct students behind the results.
    pub total_students: usize,
    pub total_results: usize,
    pub average_percentage: f64,
    pub pass_count: usize,
    pub pass_rate: f64,
    pub top_performers: Vec<TopPerformer>,
    pub grade_distribution: Vec<GradeCount>,
    pub subject_performance: Vec<SubjectPerformance>,
    /// Filled only for the all-batches report.
    pub batch_comparison: Vec<BatchComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopPerformer {
    pub rank: Option<u32>,
    pub reg_number: RegNumber,
    pub grand_total: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeCount {
    pub grade: Grade,
    pub count: usize,
    /// Share of all results, in percent.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchComparison {
    pub batch: BatchId,
    pub batch_name: String,
    pub average_percentage: f64,
    pub total_students: usize,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectPerformance {
    pub subject: SubjectId,
    pub code: String,
    pub name: String,
    pub average_total: f64,
    pub average_percentage: f64,
    pub pass_rate: f64,
    pub absent_count: usize,
}

impl BatchReport {
    pub fn build(results: &[ExamResult], subjects: &[Subject], pass_percentage: f64) -> Self {
        let total_results = results.len();
        let pass_count = results
            .iter()
            .filter(|result| result.percentage >= pass_percentage)
            .count();

        let mut ordered: Vec<&ExamResult> = results.iter().collect();
        ordered.sort_by(|a, b| {
            a.rank
                .unwrap_or(u32::MAX)
                .cmp(&b.rank.unwrap_or(u32::MAX))
                .then_with(|| standing_order(a, b))
        });
        let top_performers = ordered
            .into_iter()
            .take(TOP_PERFORMERS)
            .map(|result| TopPerformer {
                rank: result.rank,
                reg_number: result.reg_number.clone(),
                grand_total: result.grand_total,
                percentage: result.percentage,
            })
            .collect();

        let grade_distribution = if results.is_empty() {
            Vec::new()
        } else {
            Grade::ALL
                .iter()
                .map(|grade| {
                    let count = results
                        .iter()
                        .filter(|result| Grade::from_percentage(result.percentage) == *grade)
                        .count();
                    GradeCount {
                        grade: *grade,
                        count,
                        percentage: ratio(count, total_results),
                    }
                })
                .collect()
        };

        let subject_performance = if results.is_empty() {
            Vec::new()
        } else {
            subjects
                .iter()
                .map(|subject| subject_performance(subject, results, pass_percentage))
                .collect()
        };

        let total_students = results
            .iter()
            .map(|result| &result.student_id)
            .collect::<HashSet<_>>()
            .len();

        Self {
            total_students,
            total_results,
            average_percentage: average(results.iter().map(|result| result.percentage)),
            pass_count,
            pass_rate: ratio(pass_count, total_results),
            top_performers,
            grade_distribution,
            subject_performance,
            batch_comparison: Vec::new(),
        }
    }

    /// Report over the results of several batches, with one comparison line per batch that
    /// has results.
    pub fn across_batches(
        batches: &[Batch],
        results: &[ExamResult],
        subjects: &[Subject],
        pass_percentage: f64,
    ) -> Self {
        let mut report = Self::build(results, subjects, pass_percentage);
        report.batch_comparison = batches
            .iter()
            .filter_map(|batch| {
                let own: Vec<f64> = results
                    .iter()
                    .filter(|result| result.batch_id == batch.id)
                    .map(|result| result.percentage)
                    .collect();
                if own.is_empty() {
                    return None;
                }
                let passed = own
                    .iter()
                    .filter(|percentage| **percentage >= pass_percentage)
                    .count();
                Some(BatchComparison {
                    batch: batch.id.clone(),
                    batch_name: batch.name.clone(),
                    average_percentage: average(own.iter().copied()),
                    total_students: own.len(),
                    pass_rate: ratio(passed, own.len()),
                })
            })
            .collect();
        report
    }
}

fn subject_performance(
    subject: &Subject,
    results: &[ExamResult],
    pass_percentage: f64,
) -> SubjectPerformance {
    let max = subject.scheme.total_max();
    let mut totals = Vec::new();
    let mut absent_count = 0;

    for stored in results.iter().filter_map(|result| result.marks_for(&subject.id)) {
        // Marks that no longer fit the scheme are left out of the statistics.
        let Ok(evaluated) =
            ScoringSchemeEvaluator::evaluate(subject, &SubjectMarksInput::from(stored))
        else {
            continue;
        };
        if evaluated.absent {
            absent_count += 1;
        }
        totals.push(evaluated.total());
    }

    let passed = totals
        .iter()
        .filter(|total| percentage_of(**total, max) >= pass_percentage)
        .count();

    SubjectPerformance {
        subject: subject.id.clone(),
        code: subject.code.clone(),
        name: subject.name.clone(),
        average_total: average(totals.iter().copied()),
        average_percentage: average(totals.iter().map(|total| percentage_of(*total, max))),
        pass_rate: ratio(passed, totals.len()),
        absent_count,
    }
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        0.0
    } else {
        round_one_decimal(sum / count as f64)
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round_one_decimal(part as f64 / whole as f64 * 100.0)
    }
}
