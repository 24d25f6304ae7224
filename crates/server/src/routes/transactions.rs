use super::ApiError;
use crate::AppState;
use axum::extract::{Query, State};
use axum::Json;
use kontera_core::TRANSACTION_COLLECTION;
use kontera_storage::OrderBy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

// Sort fields are allowlisted; anything else falls back to posting_date.
const ALLOWED_SORT_FIELDS: &[&str] = &[
    "posting_date",
    "account_number",
    "account_name",
    "verification_text",
    "debit",
    "credit",
    "supplier_name",
];

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default = "default_order")]
    pub order: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_sort_by() -> String {
    "posting_date".to_string()
}

fn default_order() -> String {
    "desc".to_string()
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct PaginatedTransactions {
    pub items: Vec<Value>,
    pub total: i64,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedTransactions>, ApiError> {
    let order_by = sanitize_order(&params);
    let total = state.store.count(TRANSACTION_COLLECTION).await?;
    let items = state
        .store
        .list(TRANSACTION_COLLECTION, params.limit, params.offset, Some(&order_by))
        .await?;
    Ok(Json(PaginatedTransactions { items, total }))
}

fn sanitize_order(params: &ListParams) -> OrderBy {
    let field = if ALLOWED_SORT_FIELDS.contains(&params.sort_by.as_str()) {
        params.sort_by.as_str()
    } else {
        "posting_date"
    };
    OrderBy {
        field: field.to_string(),
        descending: !params.order.eq_ignore_ascii_case("asc"),
    }
}
