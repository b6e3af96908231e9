use std::io::Cursor;

use super::common::*;
use crate::results::domain::{ComponentKey, Mark, StudentId};
use crate::results::errors::StructuralError;
use crate::results::repository::{RepositoryError, ResultStore};
use crate::results::service::ResultServiceError;

#[test]
fn one_unknown_registration_number_fails_only_its_row() {
    let (service, _, store) = service();
    let csv = upload(&[
        csv_row("1035", 569),
        csv_row("1040", 565),
        csv_row("9999", 600),
        csv_row("1041", 569),
    ]);

    let outcome = service
        .ingest_csv(&batch_id(), Cursor::new(csv))
        .expect("upload applies");

    assert_eq!(outcome.created, 3);
    assert_eq!(outcome.updated, 0);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].row, 3);
    assert_eq!(outcome.errors[0].reg_number, "9999");
    assert!(outcome.errors[0].error.contains("9999"));
    assert_eq!(store.len().expect("store readable"), 3);
    assert_eq!(
        ranks(&service),
        vec![
            ("1035".to_string(), Some(1)),
            ("1041".to_string(), Some(1)),
            ("1040".to_string(), Some(3)),
        ]
    );
}

#[test]
fn reuploading_the_same_file_updates_in_place() {
    let (service, _, store) = service();
    let csv = upload(&[csv_row("1027", 420), csv_row("1028", 510)]);

    let first = service
        .ingest_csv(&batch_id(), Cursor::new(csv.clone()))
        .expect("first upload");
    let second = service
        .ingest_csv(&batch_id(), Cursor::new(csv))
        .expect("second upload");

    assert_eq!((first.created, first.updated), (2, 0));
    assert_eq!((second.created, second.updated), (0, 2));
    assert!(second.errors.is_empty());
    assert_eq!(store.len().expect("store readable"), 2);
}

#[test]
fn missing_columns_fail_before_any_row_is_applied() {
    let (service, _, store) = service();
    let header = csv_header().replace(",LANG_CE", "").replace(",JAM_W", "");
    let row: Vec<String> = csv_row("1027", 420).split(',').take(13).map(str::to_string).collect();
    let csv = format!("{header}\n{}", row.join(","));

    match service.ingest_csv(&batch_id(), Cursor::new(csv)) {
        Err(ResultServiceError::Structural(StructuralError::MissingColumns(columns))) => {
            assert_eq!(columns, vec!["JAM_W".to_string(), "LANG_CE".to_string()]);
        }
        other => panic!("expected missing columns, got {other:?}"),
    }
    assert!(store.is_empty().expect("store readable"));
}

#[test]
fn absence_marker_and_row_level_problems_are_reported_per_row() {
    let (service, _, store) = service();
    let mut absent_row: Vec<String> = csv_row("1027", 600)
        .split(',')
        .map(str::to_string)
        .collect();
    absent_row[1] = "a".to_string();
    absent_row[2] = "A".to_string();
    let mut over_max: Vec<String> = csv_row("1028", 500)
        .split(',')
        .map(str::to_string)
        .collect();
    over_max[3] = "95".to_string();
    let mut garbled: Vec<String> = csv_row("1029", 500)
        .split(',')
        .map(str::to_string)
        .collect();
    garbled[4] = "ten".to_string();

    let csv = upload(&[
        absent_row.join(","),
        over_max.join(","),
        garbled.join(","),
        csv_row("", 500),
        csv_row("1027", 100),
    ]);
    let outcome = service
        .ingest_csv(&batch_id(), Cursor::new(csv))
        .expect("upload applies");

    assert_eq!(outcome.created, 1);
    let failed_rows: Vec<usize> = outcome.errors.iter().map(|error| error.row).collect();
    assert_eq!(failed_rows, vec![2, 3, 4, 5]);
    assert!(outcome.errors[0].error.contains("out of range"));
    assert!(outcome.errors[1].error.contains("ten"));
    assert!(outcome.errors[3].error.contains("row 1"));

    let stored = store
        .find(&StudentId::from("stu-1027"), &batch_id())
        .expect("store readable")
        .expect("absent row stored");
    assert_eq!(stored.grand_total, 500.0);
    assert_eq!(stored.rank, Some(1));
    let bai = stored
        .marks_for(&subject_id("BAI"))
        .expect("BAI marks stored");
    assert_eq!(bai.marks.get(&ComponentKey::from("W")), Some(&Mark::Absent));
}

#[test]
fn extra_columns_are_ignored() {
    let (service, _, _) = service();
    let csv = format!(
        "{},remarks\n{},late submission",
        csv_header(),
        csv_row("1027", 420)
    );

    let outcome = service
        .ingest_csv(&batch_id(), Cursor::new(csv))
        .expect("upload applies");
    assert_eq!(outcome.created, 1);
    assert!(outcome.errors.is_empty());
}

#[test]
fn upload_against_unknown_batch_is_structural() {
    let (service, _, _) = service();
    let csv = upload(&[csv_row("1027", 420)]);

    assert!(matches!(
        service.ingest_csv(
            &crate::results::domain::BatchId::from("missing"),
            Cursor::new(csv)
        ),
        Err(ResultServiceError::Structural(StructuralError::UnknownBatch(_)))
    ));
}

#[test]
fn failed_rank_write_fails_the_whole_upload() {
    let (service, store) = failing_rank_service();
    let csv = upload(&[csv_row("1027", 420), csv_row("1028", 510)]);

    let error = service
        .ingest_csv(&batch_id(), Cursor::new(csv))
        .expect_err("rank write fails");

    assert!(matches!(
        error,
        ResultServiceError::Repository(RepositoryError::Unavailable(_))
    ));
    let stored = store.list_by_batch(&batch_id()).expect("list");
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|result| result.rank.is_none()));
}

#[test]
fn negative_zero_cells_rank_alongside_zero_cells() {
    let (service, _, _) = service();
    let negative: Vec<String> = std::iter::once("1028".to_string())
        .chain(std::iter::repeat("-0".to_string()).take(SUBJECT_CODES.len() * 2))
        .collect();
    let csv = upload(&[csv_row("1027", 0), negative.join(",")]);

    let outcome = service
        .ingest_csv(&batch_id(), Cursor::new(csv))
        .expect("upload applies");

    assert!(outcome.errors.is_empty());
    assert_eq!(
        ranks(&service),
        vec![("1027".to_string(), Some(1)), ("1028".to_string(), Some(1))]
    );
}

#[test]
fn later_row_after_a_rejected_first_row_explains_the_duplicate() {
    let (service, _, store) = service();
    let mut over_max: Vec<String> = csv_row("1030", 500)
        .split(',')
        .map(str::to_string)
        .collect();
    over_max[1] = "95".to_string();
    let csv = upload(&[over_max.join(","), csv_row("1030", 500)]);

    let outcome = service
        .ingest_csv(&batch_id(), Cursor::new(csv))
        .expect("upload applies");

    assert_eq!(outcome.created, 0);
    assert_eq!(outcome.errors.len(), 2);
    assert!(outcome.errors[0].error.contains("out of range"));
    assert!(outcome.errors[1].error.contains("row 1"));
    assert!(outcome.errors[1].error.contains("even when it was rejected"));
    assert_eq!(store.len().expect("store readable"), 0);
}
