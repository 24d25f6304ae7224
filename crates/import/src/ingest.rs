use crate::csv::parse_ledger_csv;
use crate::decode::decode_upload;
use crate::resolver::{DuplicateResolver, Resolution};
use kontera_core::{mint_id, Clock, DuplicateStrategy, COST_COLLECTION};
use kontera_storage::{DocStore, StorageError};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Upper bound on the existing-record listing used to build the duplicate
/// index. Batches against collections larger than this can miss
/// duplicates — a known scalability limit of the full-listing approach.
pub const DEFAULT_INDEX_CAP: i64 = 10_000;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no parseable records in upload: {details}")]
    NoRecords { details: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub imported: usize,
    pub skipped: usize,
    pub replaced: usize,
    pub message: String,
}

/// Decode, parse and persist one uploaded batch.
///
/// Decoding never fails (it degrades, see [`decode_upload`]); an upload
/// with zero parseable rows is an error carrying the leading diagnostics.
/// Records are written one upsert at a time, in input order.
pub async fn ingest(
    store: &DocStore,
    raw: &[u8],
    strategy: DuplicateStrategy,
    clock: &dyn Clock,
    index_cap: i64,
) -> Result<IngestSummary, IngestError> {
    let text = decode_upload(raw);
    let batch = parse_ledger_csv(&text, clock);
    if batch.records.is_empty() {
        let details = batch
            .diagnostics
            .iter()
            .take(5)
            .cloned()
            .collect::<Vec<_>>()
            .join("; ");
        return Err(IngestError::NoRecords { details });
    }

    let index = match strategy {
        DuplicateStrategy::Keep => HashMap::new(),
        DuplicateStrategy::Skip | DuplicateStrategy::Replace => {
            build_vernr_index(store, index_cap).await?
        }
    };
    let resolver = DuplicateResolver::new(strategy, index);

    let (mut imported, mut skipped, mut replaced) = (0usize, 0usize, 0usize);
    for mut record in batch.records {
        match resolver.resolve(&record.vernr) {
            Resolution::Insert => {
                let id = mint_id();
                record.id = Some(id.clone());
                store.upsert(COST_COLLECTION, &id, &record).await?;
                imported += 1;
            }
            Resolution::Skip => skipped += 1,
            Resolution::Replace { existing_id } => {
                record.id = Some(existing_id.clone());
                store.upsert(COST_COLLECTION, &existing_id, &record).await?;
                replaced += 1;
            }
        }
    }

    let message = match strategy {
        DuplicateStrategy::Keep => format!("Imported {imported} records"),
        DuplicateStrategy::Skip => {
            format!("Imported {imported} records, skipped {skipped} duplicates")
        }
        DuplicateStrategy::Replace => {
            format!("Replaced {replaced} records, {} in batch", imported + replaced)
        }
    };
    tracing::info!(%strategy, imported, skipped, replaced, "ingestion finished");

    Ok(IngestSummary { imported, skipped, replaced, message })
}

async fn build_vernr_index(
    store: &DocStore,
    cap: i64,
) -> Result<HashMap<String, String>, StorageError> {
    let docs = store.list(COST_COLLECTION, cap, 0, None).await?;
    let mut index = HashMap::new();
    for doc in docs {
        if let (Some(vernr), Some(id)) = (
            doc.get("vernr").and_then(Value::as_str),
            doc.get("id").and_then(Value::as_str),
        ) {
            index
                .entry(vernr.to_string())
                .or_insert_with(|| id.to_string());
        }
    }
    Ok(index)
}
