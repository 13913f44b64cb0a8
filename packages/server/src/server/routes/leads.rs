//! Thin lead surface: bulk save, listing and single-field patches.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::domains::leads::{save_leads, Lead, NewLead, SaveLeadsSummary};
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct UpdateLeadField {
    pub id: Uuid,
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Serialize)]
pub struct UpdateLeadFieldResponse {
    pub id: Uuid,
    pub field: String,
    pub updated: bool,
}

pub async fn save_leads_handler(
    Extension(state): Extension<AppState>,
    body: Result<Json<Vec<NewLead>>, JsonRejection>,
) -> Result<Json<SaveLeadsSummary>, ApiError> {
    let Json(candidates) = body?;
    let summary = save_leads(
        candidates,
        state.deps.lead_store.as_ref(),
        state.deps.bus.as_ref(),
    )
    .await?;
    Ok(Json(summary))
}

pub async fn list_leads_handler(
    Extension(state): Extension<AppState>,
) -> Result<Json<Vec<Lead>>, ApiError> {
    let leads = state.deps.lead_store.list().await?;
    Ok(Json(leads))
}

pub async fn update_lead_field_handler(
    Extension(state): Extension<AppState>,
    body: Result<Json<UpdateLeadField>, JsonRejection>,
) -> Result<Json<UpdateLeadFieldResponse>, ApiError> {
    let Json(update) = body?;
    state
        .deps
        .lead_store
        .patch_field(update.id, &update.field, &update.value)
        .await?;

    info!(lead_id = %update.id, field = %update.field, "lead field updated");
    Ok(Json(UpdateLeadFieldResponse {
        id: update.id,
        field: update.field,
        updated: true,
    }))
}
