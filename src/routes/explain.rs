use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{ExplanationResult, ItemId, UserId},
    routes::AppState,
};

/// Handler for the explanation endpoint
pub async fn explain(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path((user_id, item_id)): Path<(UserId, u64)>,
) -> AppResult<Json<ExplanationResult>> {
    tracing::info!(
        request_id = %request_id,
        user_id,
        item_id,
        "Processing explanation request"
    );

    let explanation = state.engine.explain(user_id, ItemId(item_id)).await?;

    Ok(Json(explanation))
}
