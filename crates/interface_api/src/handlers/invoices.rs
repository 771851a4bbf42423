//! Invoice handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{InvoiceId, Money};
use domain_billing::{InvoiceSummary, LedgerStore};

use crate::dto::invoice::*;
use crate::{error::ApiError, AppState};

/// Issues an invoice to a provider
pub async fn create_invoice<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), ApiError> {
    request.validate()?;
    let invoice = state.service.create_invoice(request.into()).await?;
    let summary = InvoiceSummary {
        invoice,
        total_amount: Money::zero(),
    };
    Ok((StatusCode::CREATED, Json(summary.into())))
}

/// Lists invoices with their totals, newest first
pub async fn list_invoices<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<InvoiceListQuery>,
) -> Result<Json<Vec<InvoiceResponse>>, ApiError> {
    let invoices = state.service.find_invoices(&query.into()).await?;
    Ok(Json(invoices.into_iter().map(InvoiceResponse::from).collect()))
}

/// Gets an invoice with its total
pub async fn get_invoice<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let summary = state.service.get_invoice(InvoiceId::from(id)).await?;
    Ok(Json(summary.into()))
}

/// Deletes an invoice and its lines
pub async fn delete_invoice<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_invoice(InvoiceId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lists the lines of an invoice
pub async fn list_lines<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<InvoiceLineResponse>>, ApiError> {
    let lines = state.service.invoice_lines(InvoiceId::from(id)).await?;
    Ok(Json(lines.into_iter().map(InvoiceLineResponse::from).collect()))
}

/// Bills one full barrel on the invoice
pub async fn add_line<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(body): Json<AddLineBody>,
) -> Result<(StatusCode, Json<InvoiceLineResponse>), ApiError> {
    let line = state.service.add_line(body.into_request(id)).await?;
    Ok((StatusCode::CREATED, Json(line.into())))
}
