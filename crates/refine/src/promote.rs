use crate::RefineError;
use kontera_core::{mint_id, CostRecord, TransactionRecord, COST_COLLECTION, TRANSACTION_COLLECTION};
use kontera_storage::{DocStore, StorageError};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize)]
pub struct PromotionSummary {
    pub processed: usize,
    pub skipped: usize,
    pub created: usize,
}

/// Copy qualifying cost records into the transaction collection.
///
/// A cost record qualifies when the decimal string of its account number
/// starts with a digit of 4 or higher; the predicate runs store-side.
/// The full `vernr` set of the transaction collection is loaded once up
/// front, so a second run with unchanged costs writes nothing.
pub async fn promote(store: &DocStore) -> Result<PromotionSummary, RefineError> {
    let mut existing: HashSet<String> = store
        .query(
            "SELECT DISTINCT json_extract(body, '$.vernr') AS vernr \
             FROM documents WHERE collection = ?",
            &[Value::from(TRANSACTION_COLLECTION)],
        )
        .await?
        .into_iter()
        .filter_map(|row| row.get("vernr").and_then(Value::as_str).map(str::to_string))
        .collect();

    let candidates = store
        .query(
            "SELECT body FROM documents WHERE collection = ? \
             AND substr(CAST(json_extract(body, '$.account_number') AS TEXT), 1, 1) >= '4'",
            &[Value::from(COST_COLLECTION)],
        )
        .await?;

    let mut summary = PromotionSummary { processed: 0, skipped: 0, created: 0 };
    for row in candidates {
        let Some(body) = row.get("body").and_then(Value::as_str) else {
            continue;
        };
        let cost: CostRecord = serde_json::from_str(body).map_err(StorageError::from)?;
        summary.processed += 1;

        if existing.contains(&cost.vernr) {
            summary.skipped += 1;
            continue;
        }

        let id = mint_id();
        let transaction = TransactionRecord::promoted(&cost, id.clone());
        store.upsert(TRANSACTION_COLLECTION, &id, &transaction).await?;
        // also dedupe within this run when several costs share a voucher
        existing.insert(cost.vernr);
        summary.created += 1;
    }

    tracing::info!(
        processed = summary.processed,
        skipped = summary.skipped,
        created = summary.created,
        "promotion pass finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn cost(vernr: &str, account_number: i64) -> CostRecord {
        CostRecord {
            id: None,
            vernr: vernr.to_string(),
            account_number,
            posting_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            registration_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            account_name: "Test".to_string(),
            ks: None,
            project_number: None,
            verification_text: Some(format!("memo {vernr}")),
            transaction_info: None,
            debit: Decimal::from(100),
            credit: Decimal::ZERO,
        }
    }

    async fn seed_cost(store: &DocStore, mut record: CostRecord) {
        let id = mint_id();
        record.id = Some(id.clone());
        store.upsert(COST_COLLECTION, &id, &record).await.unwrap();
    }

    #[tokio::test]
    async fn promotes_only_accounts_4000_and_up() {
        let store = DocStore::open_in_memory().await.unwrap();
        seed_cost(&store, cost("V1", 399)).await;
        seed_cost(&store, cost("V2", 400)).await;
        seed_cost(&store, cost("V3", 599)).await;

        let summary = promote(&store).await.unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.skipped, 0);

        let promoted = store.list(TRANSACTION_COLLECTION, 10, 0, None).await.unwrap();
        let vernrs: Vec<&str> =
            promoted.iter().filter_map(|d| d["vernr"].as_str()).collect();
        assert_eq!(vernrs, vec!["V2", "V3"]);
    }

    #[tokio::test]
    async fn second_run_writes_nothing() {
        let store = DocStore::open_in_memory().await.unwrap();
        seed_cost(&store, cost("V1", 4010)).await;

        let first = promote(&store).await.unwrap();
        assert_eq!(first.created, 1);

        let second = promote(&store).await.unwrap();
        assert_eq!(second.processed, 1);
        assert_eq!(second.skipped, 1);
        assert_eq!(second.created, 0);
        assert_eq!(store.count(TRANSACTION_COLLECTION).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn promoted_transaction_gets_fresh_identity_and_fields() {
        let store = DocStore::open_in_memory().await.unwrap();
        seed_cost(&store, cost("V9", 7010)).await;

        promote(&store).await.unwrap();

        let source = &store.list(COST_COLLECTION, 10, 0, None).await.unwrap()[0];
        let promoted = &store.list(TRANSACTION_COLLECTION, 10, 0, None).await.unwrap()[0];
        assert_ne!(promoted["id"], source["id"]);
        assert_eq!(promoted["vernr"], source["vernr"]);
        assert_eq!(promoted["account_number"], source["account_number"]);
        assert_eq!(promoted["verification_text"], source["verification_text"]);
        assert!(promoted.get("supplier_name").map_or(true, Value::is_null));
    }

    #[tokio::test]
    async fn shared_voucher_is_promoted_once_per_run() {
        let store = DocStore::open_in_memory().await.unwrap();
        seed_cost(&store, cost("V1", 4010)).await;
        seed_cost(&store, cost("V1", 5010)).await;

        let summary = promote(&store).await.unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn five_digit_accounts_match_on_leading_digit() {
        let store = DocStore::open_in_memory().await.unwrap();
        seed_cost(&store, cost("V1", 39990)).await;
        seed_cost(&store, cost("V2", 40100)).await;

        let summary = promote(&store).await.unwrap();
        assert_eq!(summary.created, 1);
        let promoted = store.list(TRANSACTION_COLLECTION, 10, 0, None).await.unwrap();
        assert_eq!(promoted[0]["vernr"], "V2");
    }
}
