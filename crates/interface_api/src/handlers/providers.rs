//! Provider handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::ProviderId;
use domain_billing::{LedgerStore, ProviderSummary};

use crate::dto::provider::*;
use crate::{error::ApiError, AppState};

/// Creates a provider
pub async fn create_provider<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<CreateProviderRequest>,
) -> Result<(StatusCode, Json<ProviderResponse>), ApiError> {
    request.validate()?;
    let provider = state.service.create_provider(request.into()).await?;
    let summary = ProviderSummary::from_states(provider, &[]);
    Ok((StatusCode::CREATED, Json(summary.into())))
}

/// Lists providers with their billing overview
pub async fn list_providers<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<ProviderListQuery>,
) -> Result<Json<Vec<ProviderResponse>>, ApiError> {
    let summaries = state
        .service
        .list_provider_summaries(query.has_barrels_to_bill)
        .await?;
    Ok(Json(summaries.into_iter().map(ProviderResponse::from).collect()))
}

/// Gets a provider by ID
pub async fn get_provider<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProviderResponse>, ApiError> {
    let summary = state.service.provider_summary(ProviderId::from(id)).await?;
    Ok(Json(summary.into()))
}

/// Updates name, address or tax id
pub async fn update_provider<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProviderRequest>,
) -> Result<Json<ProviderResponse>, ApiError> {
    request.validate()?;
    let id = ProviderId::from(id);
    state.service.update_provider(id, request.into()).await?;
    let summary = state.service.provider_summary(id).await?;
    Ok(Json(summary.into()))
}

/// Deletes a provider without invoices or billed barrels
pub async fn delete_provider<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_provider(ProviderId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
