use super::rules::CollectionMerge;
use crate::core::{ChildRow, DedupKey, Fields, Record, RecordId, StoreResult, Value};
use crate::storage::RecordStore;
use log::debug;
use std::collections::HashSet;

/// Counters reported by one collection merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub appended: usize,
    pub duplicates: usize,
    pub missing_key: usize,
}

/// Merges a child collection of the linked record into the draft, unique by dedup key.
pub struct ChildCollectionAggregator;

impl ChildCollectionAggregator {
    /// Fetches the linked rows and appends the first-seen ones to `draft`.
    pub async fn merge<S: RecordStore + ?Sized>(
        store: &S,
        linked_type: &str,
        linked_id: &RecordId,
        merge: &CollectionMerge,
        draft: &mut Record,
    ) -> StoreResult<MergeReport> {
        let rows = store.child_rows(linked_type, linked_id, &merge.from).await?;
        let report = Self::merge_rows(rows, merge, draft);
        debug!(
            "merged {}.{} into {}.{}: {} appended, {} duplicates, {} without key",
            linked_type,
            merge.from,
            draft.doc_type,
            merge.into,
            report.appended,
            report.duplicates,
            report.missing_key
        );
        Ok(report)
    }

    /// Rows already present in the target collection count as seen.
    pub fn merge_rows(
        rows: Vec<ChildRow>,
        merge: &CollectionMerge,
        draft: &mut Record,
    ) -> MergeReport {
        let target = draft.children.entry(merge.into.clone()).or_default();
        let mut seen: HashSet<DedupKey> = target
            .iter()
            .filter_map(|row| row.get(&merge.dedup_key).and_then(Value::dedup_key))
            .collect();
        let mut report = MergeReport::default();

        for row in rows {
            let Some(key) = row.get(&merge.dedup_key).and_then(Value::dedup_key) else {
                report.missing_key += 1;
                continue;
            };
            if !seen.insert(key) {
                report.duplicates += 1;
                continue;
            }
            target.push(project(row, merge));
            report.appended += 1;
        }

        report
    }
}

fn project(row: ChildRow, merge: &CollectionMerge) -> ChildRow {
    if merge.fields.is_empty() {
        return row;
    }
    let fields: Fields = row
        .fields
        .into_iter()
        .filter(|(name, _)| *name == merge.dedup_key || merge.fields.contains(name))
        .collect();
    ChildRow { fields }
}
