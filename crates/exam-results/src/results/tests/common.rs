use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::ResultsConfig;
use crate::results::domain::{
    Batch, BatchId, ComponentKey, ExamResult, Mark, RegNumber, ResultDraft, StudentId, StudentRef,
    Subject, SubjectId,
};
use crate::results::evaluation::SubjectMarksInput;
use crate::results::memory::{Catalog, MemoryCatalog, MemoryResultStore};
use crate::results::repository::{RepositoryError, ResultStore, Upserted};
use crate::results::scheme::ScoringScheme;
use crate::results::service::{ResultEntry, ResultService};

pub(super) const BATCH: &str = "nihaya-2";
pub(super) const SUBJECT_CODES: [&str; 7] = ["BAI", "BUK", "MUS", "IBN", "TUR", "JAM", "LANG"];

pub(super) type MemoryService = ResultService<MemoryCatalog, MemoryResultStore>;

pub(super) fn batch_id() -> BatchId {
    BatchId::from(BATCH)
}

pub(super) fn subject_id(code: &str) -> SubjectId {
    SubjectId(code.to_ascii_lowercase())
}

/// Seven written + CE subjects, so the batch maximum is 700.
pub(super) fn subjects() -> Vec<Subject> {
    SUBJECT_CODES
        .iter()
        .map(|code| Subject {
            id: subject_id(code),
            code: code.to_string(),
            name: format!("{code} paper"),
            name_arabic: None,
            scheme: ScoringScheme::written_and_ce(90.0, 10.0),
        })
        .collect()
}

pub(super) fn catalog() -> Catalog {
    let subjects = subjects();
    Catalog {
        batches: vec![Batch {
            id: batch_id(),
            name: "NIHAYA 2".to_string(),
            year: 2025,
            semester: "Annual".to_string(),
            exam_title: "Annual Examination".to_string(),
            subjects: subjects.iter().map(|subject| subject.id.clone()).collect(),
        }],
        subjects,
        students: (1027..=1046).map(|reg| student(&reg.to_string())).collect(),
    }
}

pub(super) fn student(reg: &str) -> StudentRef {
    StudentRef {
        id: StudentId(format!("stu-{reg}")),
        reg_number: RegNumber::from(reg),
        name: format!("Student {reg}"),
    }
}

pub(super) fn service_with(
    catalog: Catalog,
) -> (MemoryService, Arc<MemoryCatalog>, Arc<MemoryResultStore>) {
    let directory = Arc::new(MemoryCatalog::new(catalog));
    let store = Arc::new(MemoryResultStore::default());
    let service = ResultService::new(directory.clone(), store.clone(), ResultsConfig::default());
    (service, directory, store)
}

pub(super) fn service() -> (MemoryService, Arc<MemoryCatalog>, Arc<MemoryResultStore>) {
    service_with(catalog())
}

/// Memory store whose rank writes always fail, to check that ranking failures surface.
#[derive(Default)]
pub(super) struct RankWriteFailingStore {
    pub(super) inner: MemoryResultStore,
}

impl ResultStore for RankWriteFailingStore {
    fn find(
        &self,
        student: &StudentId,
        batch: &BatchId,
    ) -> Result<Option<ExamResult>, RepositoryError> {
        self.inner.find(student, batch)
    }

    fn upsert(&self, draft: ResultDraft) -> Result<Upserted, RepositoryError> {
        self.inner.upsert(draft)
    }

    fn list_by_batch(&self, batch: &BatchId) -> Result<Vec<ExamResult>, RepositoryError> {
        self.inner.list_by_batch(batch)
    }

    fn list_by_student(&self, student: &StudentId) -> Result<Vec<ExamResult>, RepositoryError> {
        self.inner.list_by_student(student)
    }

    fn save_ranks(&self, _batch: &BatchId, _ranked: &[ExamResult]) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("rank write refused".to_string()))
    }

    fn delete(
        &self,
        student: &StudentId,
        batch: &BatchId,
    ) -> Result<Option<ExamResult>, RepositoryError> {
        self.inner.delete(student, batch)
    }
}

pub(super) fn failing_rank_service() -> (
    ResultService<MemoryCatalog, RankWriteFailingStore>,
    Arc<RankWriteFailingStore>,
) {
    let store = Arc::new(RankWriteFailingStore::default());
    let service = ResultService::new(
        Arc::new(MemoryCatalog::new(catalog())),
        store.clone(),
        ResultsConfig::default(),
    );
    (service, store)
}

/// Every subject entered as zero except BAI.
pub(super) fn entry_with_bai(reg: &str, written: f64, ce: f64) -> ResultEntry {
    ResultEntry {
        reg_number: RegNumber::from(reg),
        subjects: SUBJECT_CODES
            .iter()
            .map(|code| {
                if *code == "BAI" {
                    present(code, written, ce)
                } else {
                    present(code, 0.0, 0.0)
                }
            })
            .collect(),
    }
}

/// Spread `total` over the subjects, filling each to 100 (90 written, 10 CE) in turn.
pub(super) fn split_total(total: u32) -> Vec<(u32, u32)> {
    let mut remaining = total;
    SUBJECT_CODES
        .iter()
        .map(|_| {
            let part = remaining.min(100);
            remaining -= part;
            let written = part.min(90);
            (written, part - written)
        })
        .collect()
}

pub(super) fn present(code: &str, written: f64, ce: f64) -> SubjectMarksInput {
    let mut marks = BTreeMap::new();
    marks.insert(ComponentKey::from("W"), Mark::Present(written));
    marks.insert(ComponentKey::from("CE"), Mark::Present(ce));
    SubjectMarksInput {
        subject: subject_id(code),
        absent: false,
        marks,
    }
}

pub(super) fn absent(code: &str) -> SubjectMarksInput {
    SubjectMarksInput {
        subject: subject_id(code),
        absent: true,
        marks: BTreeMap::new(),
    }
}

pub(super) fn entry_with_total(reg: &str, total: u32) -> ResultEntry {
    ResultEntry {
        reg_number: RegNumber::from(reg),
        subjects: SUBJECT_CODES
            .iter()
            .zip(split_total(total))
            .map(|(code, (written, ce))| present(code, f64::from(written), f64::from(ce)))
            .collect(),
    }
}

pub(super) fn csv_header() -> String {
    let mut columns = vec!["regNumber".to_string()];
    for code in SUBJECT_CODES {
        columns.push(format!("{code}_W"));
        columns.push(format!("{code}_CE"));
    }
    columns.join(",")
}

pub(super) fn csv_row(reg: &str, total: u32) -> String {
    let mut cells = vec![reg.to_string()];
    for (written, ce) in split_total(total) {
        cells.push(written.to_string());
        cells.push(ce.to_string());
    }
    cells.join(",")
}

pub(super) fn upload(rows: &[String]) -> String {
    let mut lines = vec![csv_header()];
    lines.extend(rows.iter().cloned());
    lines.join("\n")
}

pub(super) fn ranks(service: &MemoryService) -> Vec<(String, Option<u32>)> {
    service
        .standings(&batch_id())
        .expect("standings load")
        .into_iter()
        .map(|result| (result.reg_number.to_string(), result.rank))
        .collect()
}
