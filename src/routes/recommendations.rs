use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    config::RecommendConfig,
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{RecommendationResult, UserId, Weights},
    routes::AppState,
};

pub const MAX_LIMIT: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    pub limit: Option<usize>,
    pub w_social: Option<f64>,
    pub w_content: Option<f64>,
    pub w_personal: Option<f64>,
    pub lambda: Option<f64>,
}

/// Validated request parameters with configured defaults filled in
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationParams {
    pub limit: usize,
    pub weights: Weights,
    pub lambda: f64,
}

impl RecommendationQuery {
    pub fn resolve(&self, config: &RecommendConfig) -> AppResult<RecommendationParams> {
        let limit = self.limit.unwrap_or(config.default_limit);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(AppError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }

        let weight = |name: &str, value: Option<f64>, default: f64| -> AppResult<f64> {
            match value {
                None => Ok(default),
                Some(w) if w.is_finite() && w >= 0.0 => Ok(w),
                Some(_) => Err(AppError::InvalidInput(format!(
                    "{} must be a non-negative number",
                    name
                ))),
            }
        };

        let weights = Weights {
            social: weight("w_social", self.w_social, config.weights.social)?,
            content: weight("w_content", self.w_content, config.weights.content)?,
            personal: weight("w_personal", self.w_personal, config.weights.personal)?,
        };

        let lambda = match self.lambda {
            Some(l) if l.is_finite() => l.clamp(0.0, 1.0),
            Some(_) => return Err(AppError::InvalidInput("lambda must be a number".to_string())),
            None => config.mmr_lambda,
        };

        Ok(RecommendationParams {
            limit,
            weights,
            lambda,
        })
    }
}

/// Handler for the recommendations endpoint
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<UserId>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResult>> {
    let params = query.resolve(state.config())?;

    tracing::info!(
        request_id = %request_id,
        user_id,
        limit = params.limit,
        lambda = params.lambda,
        "Processing recommendation request"
    );

    let result = state
        .engine
        .recommend(user_id, params.limit, params.weights, params.lambda)
        .await?;

    tracing::info!(
        request_id = %request_id,
        user_id,
        items = result.items.len(),
        reason = ?result.reason,
        "Recommendations returned"
    );

    Ok(Json(result))
}
