use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};

use crate::domains::discovery::{start_search, SearchSummary, StartSearchRequest};
use crate::server::app::AppState;
use crate::server::error::ApiError;

/// Run one discovery job to completion and report what it recorded.
pub async fn start_search_handler(
    Extension(state): Extension<AppState>,
    body: Result<Json<StartSearchRequest>, JsonRejection>,
) -> Result<Json<SearchSummary>, ApiError> {
    let Json(request) = body?;
    if request.category.trim().is_empty() || request.location.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "category and location are required".to_string(),
        ));
    }

    let summary = start_search(request, &state.deps).await?;
    Ok(Json(summary))
}
