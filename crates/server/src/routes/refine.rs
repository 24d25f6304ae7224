use super::ApiError;
use crate::AppState;
use axum::extract::State;
use axum::Json;
use kontera_refine::{EnrichmentSummary, PromotionSummary};
use std::sync::Arc;

pub async fn run_promote(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PromotionSummary>, ApiError> {
    Ok(Json(kontera_refine::promote(&state.store).await?))
}

pub async fn run_enrich(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EnrichmentSummary>, ApiError> {
    Ok(Json(kontera_refine::enrich(&state.store, &state.llm).await?))
}
