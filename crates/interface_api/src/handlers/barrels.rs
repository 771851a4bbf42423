//! Barrel handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{BarrelId, ProviderId};
use domain_billing::{BarrelFilter, BarrelStatus, BarrelBillingState, LedgerStore};

use crate::dto::barrel::*;
use crate::{error::ApiError, AppState};

/// Registers a delivered barrel
pub async fn create_barrel<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<CreateBarrelRequest>,
) -> Result<(StatusCode, Json<BarrelResponse>), ApiError> {
    request.validate()?;
    let barrel = state.service.create_barrel(request.into()).await?;
    let status = BarrelStatus {
        state: BarrelBillingState::new(&barrel, 0),
        barrel,
    };
    Ok((StatusCode::CREATED, Json(status.into())))
}

/// Lists barrels, optionally of one provider
pub async fn list_barrels<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<BarrelListQuery>,
) -> Result<Json<Vec<BarrelResponse>>, ApiError> {
    let filter = BarrelFilter {
        provider_id: query.provider.map(ProviderId::from),
        billed: None,
    };
    let barrels = state.service.list_barrels(filter).await?;
    Ok(Json(barrels.into_iter().map(BarrelResponse::from).collect()))
}

/// Gets a barrel by ID
pub async fn get_barrel<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BarrelResponse>, ApiError> {
    let status = state.service.get_barrel(BarrelId::from(id)).await?;
    Ok(Json(status.into()))
}

/// Updates number or oil type
pub async fn update_barrel<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateBarrelRequest>,
) -> Result<Json<BarrelResponse>, ApiError> {
    request.validate()?;
    let id = BarrelId::from(id);
    state.service.update_barrel(id, request.into()).await?;
    let status = state.service.get_barrel(id).await?;
    Ok(Json(status.into()))
}

/// Deletes a barrel that is not on any invoice
pub async fn delete_barrel<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_barrel(BarrelId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
