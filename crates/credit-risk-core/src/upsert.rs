//! Latest-wins merge of a new batch into a persisted table.
//!
//! Existing and incoming rows are concatenated, ordered by a recency column
//! (most recent first) and deduplicated on the natural key, keeping the first
//! row seen. Rows with equal recency resolve in favour of the incoming batch.

use std::collections::HashSet;

use serde::de::DeserializeOwned;

use crate::storage::TableStore;
use crate::CreditRiskResult;

/// A row that can be merged by natural key.
pub trait Upsertable {
    type Recency: Ord;

    fn key(&self) -> &str;

    /// Larger values are more recent.
    fn recency(&self) -> Self::Recency;
}

/// Merge `incoming` over `existing`, one row per key, most recent wins.
/// Output is ordered most recent first.
pub fn merge_latest<T: Upsertable>(existing: Vec<T>, incoming: Vec<T>) -> Vec<T> {
    let mut combined = incoming;
    combined.extend(existing);
    // stable: equal recency keeps incoming ahead of existing
    combined.sort_by(|a, b| b.recency().cmp(&a.recency()));

    let mut seen: HashSet<String> = HashSet::with_capacity(combined.len());
    combined
        .into_iter()
        .filter(|row| seen.insert(row.key().to_string()))
        .collect()
}

/// Read the persisted state of `location` and merge `incoming` over it.
pub fn upsert<T, S>(store: &S, location: &str, incoming: Vec<T>) -> CreditRiskResult<Vec<T>>
where
    T: Upsertable + DeserializeOwned,
    S: TableStore,
{
    let existing: Vec<T> = store.read_table(location)?;
    if existing.is_empty() {
        tracing::info!(location, records = incoming.len(), "no existing table, writing initial data");
        return Ok(merge_latest(Vec::new(), incoming));
    }

    let existing_count = existing.len();
    let incoming_count = incoming.len();
    let merged = merge_latest(existing, incoming);
    tracing::info!(
        location,
        existing = existing_count,
        incoming = incoming_count,
        merged = merged.len(),
        "upserted table"
    );
    Ok(merged)
}
