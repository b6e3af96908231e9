use std::cmp::Ordering;

use tracing::debug;

use super::domain::{BatchId, ExamResult};
use super::repository::{RepositoryError, ResultStore};

/// Orders a batch and assigns competition ranks.
///
/// Results sort by percentage, then grand total (both descending), then registration number
/// ascending. Entries equal on percentage and grand total share the rank of the first of them;
/// the next group takes its own 1-based position, so `1, 1, 3`.
pub struct RankEngine;

impl RankEngine {
    pub fn rank(mut results: Vec<ExamResult>) -> Result<Vec<ExamResult>, RankError> {
        if let Some(first) = results.first() {
            let expected = first.batch_id.clone();
            if let Some(other) = results.iter().find(|result| result.batch_id != expected) {
                return Err(RankError::MixedBatches {
                    expected,
                    found: other.batch_id.clone(),
                });
            }
        }

        results.sort_by(standing_order);

        let mut current = 0u32;
        let mut previous: Option<(i64, i64)> = None;
        for (position, result) in results.iter_mut().enumerate() {
            let key = standing_key(result);
            if previous != Some(key) {
                current = u32::try_from(position + 1).unwrap_or(u32::MAX);
            }
            result.rank = Some(current);
            previous = Some(key);
        }

        Ok(results)
    }
}

/// Sort order of a ranked batch.
pub fn standing_order(a: &ExamResult, b: &ExamResult) -> Ordering {
    standing_key(b)
        .cmp(&standing_key(a))
        .then_with(|| a.reg_number.cmp(&b.reg_number))
}

/// Percentage and grand total in integer hundredths. Results with equal keys share a rank.
fn standing_key(result: &ExamResult) -> (i64, i64) {
    (hundredths(result.percentage), hundredths(result.grand_total))
}

fn hundredths(value: f64) -> i64 {
    // Saturating cast; NaN maps to 0.
    (value * 100.0).round() as i64
}

/// Re-rank every stored result of the batch and persist the ranks in one call.
pub fn refresh_ranks<R: ResultStore + ?Sized>(
    store: &R,
    batch: &BatchId,
) -> Result<Vec<ExamResult>, RefreshError> {
    let results = store.list_by_batch(batch)?;
    let ranked = RankEngine::rank(results)?;
    store.save_ranks(batch, &ranked)?;
    debug!(batch = %batch, results = ranked.len(), "batch ranks recomputed");
    Ok(ranked)
}

#[derive(Debug, thiserror::Error)]
pub enum RankError {
    #[error("cannot rank results of batch {found} together with batch {expected}")]
    MixedBatches { expected: BatchId, found: BatchId },
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Rank(#[from] RankError),
}
