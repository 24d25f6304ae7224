use super::ApiError;
use crate::AppState;
use axum::extract::{Multipart, Query, State};
use axum::Json;
use kontera_core::{DuplicateStrategy, StrategyParseError, SystemClock, COST_COLLECTION};
use kontera_import::{ingest, IngestSummary};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    1000
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let docs = state.store.list(COST_COLLECTION, params.limit, 0, None).await?;
    Ok(Json(docs))
}

/// Multipart upload: a `file` part with the CSV bytes, plus an optional
/// `duplicate_strategy` part (`keep`, `skip` or `replace`; default keep).
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<IngestSummary>, ApiError> {
    let mut file = None;
    let mut strategy = DuplicateStrategy::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                file = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(e.to_string()))?,
                );
            }
            Some("duplicate_strategy") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?;
                strategy = raw
                    .parse()
                    .map_err(|e: StrategyParseError| ApiError::bad_request(e.to_string()))?;
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::bad_request("missing 'file' part"))?;
    let summary = ingest(&state.store, &file, strategy, &SystemClock, state.index_cap).await?;
    Ok(Json(summary))
}
