//! In-memory collaborators used by the CLI, the HTTP service and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::domain::{
    Batch, BatchId, ExamResult, RegNumber, ResultDraft, ResultId, StudentId, StudentRef, Subject,
    SubjectId,
};
use super::repository::{
    BatchDirectory, RepositoryError, ResultStore, StudentDirectory, SubjectDirectory, Upserted,
};

/// Batches, subjects and students, typically loaded from a JSON fixture.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub batches: Vec<Batch>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub students: Vec<StudentRef>,
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    catalog: Mutex<Catalog>,
}

impl MemoryCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Mutex::new(catalog),
        }
    }

    pub fn add_student(&self, student: StudentRef) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.catalog)?;
        if guard
            .students
            .iter()
            .any(|existing| existing.reg_number == student.reg_number)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.students.push(student);
        Ok(())
    }
}

impl BatchDirectory for MemoryCatalog {
    fn batch(&self, id: &BatchId) -> Result<Option<Batch>, RepositoryError> {
        let guard = lock(&self.catalog)?;
        Ok(guard.batches.iter().find(|batch| &batch.id == id).cloned())
    }

    fn batches(&self) -> Result<Vec<Batch>, RepositoryError> {
        Ok(lock(&self.catalog)?.batches.clone())
    }
}

impl SubjectDirectory for MemoryCatalog {
    fn subject(&self, id: &SubjectId) -> Result<Option<Subject>, RepositoryError> {
        let guard = lock(&self.catalog)?;
        Ok(guard
            .subjects
            .iter()
            .find(|subject| &subject.id == id)
            .cloned())
    }
}

impl StudentDirectory for MemoryCatalog {
    fn find_by_reg_number(
        &self,
        reg_number: &RegNumber,
    ) -> Result<Option<StudentRef>, RepositoryError> {
        let guard = lock(&self.catalog)?;
        Ok(guard
            .students
            .iter()
            .find(|student| &student.reg_number == reg_number)
            .cloned())
    }
}

#[derive(Debug, Default)]
pub struct MemoryResultStore {
    records: Mutex<HashMap<(StudentId, BatchId), ExamResult>>,
    sequence: AtomicU64,
}

impl MemoryResultStore {
    fn next_id(&self) -> ResultId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        ResultId(format!("res-{id:06}"))
    }

    pub fn len(&self) -> Result<usize, RepositoryError> {
        Ok(lock(&self.records)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, RepositoryError> {
        Ok(lock(&self.records)?.is_empty())
    }
}

impl ResultStore for MemoryResultStore {
    fn find(
        &self,
        student: &StudentId,
        batch: &BatchId,
    ) -> Result<Option<ExamResult>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard.get(&(student.clone(), batch.clone())).cloned())
    }

    fn upsert(&self, draft: ResultDraft) -> Result<Upserted, RepositoryError> {
        let mut guard = lock(&self.records)?;
        let now = Utc::now();
        let key = (draft.student_id.clone(), draft.batch_id.clone());

        if let Some(existing) = guard.get_mut(&key) {
            existing.reg_number = draft.reg_number;
            existing.subject_marks = draft.subject_marks;
            existing.grand_total = draft.grand_total;
            existing.percentage = draft.percentage;
            existing.updated_at = now;
            return Ok(Upserted::Updated(existing.clone()));
        }

        let record = ExamResult {
            id: self.next_id(),
            student_id: draft.student_id,
            reg_number: draft.reg_number,
            batch_id: draft.batch_id,
            subject_marks: draft.subject_marks,
            grand_total: draft.grand_total,
            percentage: draft.percentage,
            rank: None,
            created_at: now,
            updated_at: now,
        };
        guard.insert(key, record.clone());
        Ok(Upserted::Created(record))
    }

    fn list_by_batch(&self, batch: &BatchId) -> Result<Vec<ExamResult>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard
            .values()
            .filter(|record| &record.batch_id == batch)
            .cloned()
            .collect())
    }

    fn list_by_student(&self, student: &StudentId) -> Result<Vec<ExamResult>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard
            .values()
            .filter(|record| &record.student_id == student)
            .cloned()
            .collect())
    }

    fn save_ranks(&self, batch: &BatchId, ranked: &[ExamResult]) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records)?;
        let all_present = ranked.iter().all(|result| {
            &result.batch_id == batch
                && guard.contains_key(&(result.student_id.clone(), batch.clone()))
        });
        if !all_present {
            return Err(RepositoryError::NotFound);
        }

        for result in ranked {
            if let Some(record) = guard.get_mut(&(result.student_id.clone(), batch.clone())) {
                record.rank = result.rank;
            }
        }
        Ok(())
    }

    fn delete(
        &self,
        student: &StudentId,
        batch: &BatchId,
    ) -> Result<Option<ExamResult>, RepositoryError> {
        let mut guard = lock(&self.records)?;
        Ok(guard.remove(&(student.clone(), batch.clone())))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store lock poisoned".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::domain::SubjectMarks;

    fn draft(student: &str, batch: &str, grand_total: f64) -> ResultDraft {
        ResultDraft {
            student_id: StudentId::from(student),
            reg_number: RegNumber::from(student),
            batch_id: BatchId::from(batch),
            subject_marks: Vec::<SubjectMarks>::new(),
            grand_total,
            percentage: grand_total,
        }
    }

    #[test]
    fn upsert_creates_then_updates_same_pair() {
        let store = MemoryResultStore::default();
        let created = store.upsert(draft("s1", "b1", 40.0)).expect("insert");
        assert!(matches!(created, Upserted::Created(_)));

        let updated = store.upsert(draft("s1", "b1", 55.0)).expect("update");
        match updated {
            Upserted::Updated(result) => {
                assert_eq!(result.id, created.result().id);
                assert_eq!(result.grand_total, 55.0);
            }
            other => panic!("expected update, got {other:?}"),
        }
        assert_eq!(store.len().expect("len"), 1);
    }

    #[test]
    fn save_ranks_is_all_or_nothing() {
        let store = MemoryResultStore::default();
        let mut stored = store
            .upsert(draft("s1", "b1", 40.0))
            .expect("insert")
            .into_result();
        stored.rank = Some(1);
        let mut ghost = stored.clone();
        ghost.student_id = StudentId::from("ghost");
        ghost.rank = Some(2);

        let error = store
            .save_ranks(&BatchId::from("b1"), &[stored.clone(), ghost])
            .expect_err("unknown result rejected");
        assert!(matches!(error, RepositoryError::NotFound));
        let unchanged = store
            .find(&StudentId::from("s1"), &BatchId::from("b1"))
            .expect("find")
            .expect("present");
        assert_eq!(unchanged.rank, None);

        store
            .save_ranks(&BatchId::from("b1"), &[stored])
            .expect("ranks saved");
        let ranked = store
            .find(&StudentId::from("s1"), &BatchId::from("b1"))
            .expect("find")
            .expect("present");
        assert_eq!(ranked.rank, Some(1));
    }

    #[test]
    fn catalog_rejects_duplicate_registration_numbers() {
        let catalog = MemoryCatalog::default();
        let student = StudentRef {
            id: StudentId::from("stu-1"),
            reg_number: RegNumber::from("1027"),
            name: "JAMSHAD O.B".to_string(),
        };
        catalog.add_student(student.clone()).expect("first insert");
        assert!(matches!(
            catalog.add_student(student),
            Err(RepositoryError::Conflict)
        ));
    }
}
