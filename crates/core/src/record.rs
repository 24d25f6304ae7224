use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Collection name for raw ledger cost lines.
pub const COST_COLLECTION: &str = "cost";
/// Collection name for promoted transactions.
pub const TRANSACTION_COLLECTION: &str = "transaction";

/// Mint a fresh storage identity. Identities are opaque and distinct from
/// the business key (`vernr`): replacing a record reuses its identity,
/// creating one mints a new identity here.
pub fn mint_id() -> String {
    Uuid::new_v4().to_string()
}

/// One ledger line as exported from the accounting system.
///
/// `vernr` is the voucher number, the natural de-duplication key; it is
/// non-empty for every record the parser accepts. `id` is set once the
/// record has been persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub vernr: String,
    pub account_number: i64,
    pub posting_date: NaiveDate,
    pub registration_date: NaiveDate,
    pub account_name: String,
    #[serde(default)]
    pub ks: Option<String>,
    #[serde(default)]
    pub project_number: Option<String>,
    #[serde(default)]
    pub verification_text: Option<String>,
    #[serde(default)]
    pub transaction_info: Option<String>,
    #[serde(default)]
    pub debit: Decimal,
    #[serde(default)]
    pub credit: Decimal,
}

/// A cost line promoted into the transaction collection.
///
/// Structurally a `CostRecord` plus `supplier_name`, which only the
/// enrichment pass populates. Lives in its own collection; promotion
/// copies the fields but never the identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub vernr: String,
    pub account_number: i64,
    pub posting_date: NaiveDate,
    pub registration_date: NaiveDate,
    pub account_name: String,
    #[serde(default)]
    pub ks: Option<String>,
    #[serde(default)]
    pub project_number: Option<String>,
    #[serde(default)]
    pub verification_text: Option<String>,
    #[serde(default)]
    pub transaction_info: Option<String>,
    #[serde(default)]
    pub debit: Decimal,
    #[serde(default)]
    pub credit: Decimal,
    #[serde(default)]
    pub supplier_name: Option<String>,
}

impl TransactionRecord {
    /// Synthesize a transaction from a cost line under a fresh identity.
    pub fn promoted(cost: &CostRecord, id: String) -> Self {
        TransactionRecord {
            id: Some(id),
            vernr: cost.vernr.clone(),
            account_number: cost.account_number,
            posting_date: cost.posting_date,
            registration_date: cost.registration_date,
            account_name: cost.account_name.clone(),
            ks: cost.ks.clone(),
            project_number: cost.project_number.clone(),
            verification_text: cost.verification_text.clone(),
            transaction_info: cost.transaction_info.clone(),
            debit: cost.debit,
            credit: cost.credit,
            supplier_name: None,
        }
    }
}
