//! Invoice and invoice line DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{BarrelId, InvoiceId, ProviderId};
use domain_billing::{AddLineRequest, InvoiceLine, InvoiceQuery, InvoiceSummary, NewInvoice};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    #[validate(length(min = 1, max = 64))]
    pub invoice_no: String,
    pub provider: Uuid,
    pub issued_on: NaiveDate,
}

impl From<CreateInvoiceRequest> for NewInvoice {
    fn from(request: CreateInvoiceRequest) -> Self {
        NewInvoice {
            invoice_no: request.invoice_no,
            provider_id: ProviderId::from(request.provider),
            issued_on: request.issued_on,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceListQuery {
    pub invoice_no: Option<String>,
    pub issued_on_after: Option<NaiveDate>,
    pub issued_on_before: Option<NaiveDate>,
    pub provider: Option<Uuid>,
}

impl From<InvoiceListQuery> for InvoiceQuery {
    fn from(query: InvoiceListQuery) -> Self {
        InvoiceQuery {
            invoice_no: query.invoice_no.filter(|fragment| !fragment.is_empty()),
            issued_on_after: query.issued_on_after,
            issued_on_before: query.issued_on_before,
            provider_id: query.provider.map(ProviderId::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub invoice_no: String,
    pub provider: Uuid,
    pub issued_on: NaiveDate,
    pub total_amount: Decimal,
}

impl From<InvoiceSummary> for InvoiceResponse {
    fn from(summary: InvoiceSummary) -> Self {
        Self {
            id: summary.invoice.id.into(),
            invoice_no: summary.invoice.invoice_no,
            provider: summary.invoice.provider_id.into(),
            issued_on: summary.invoice.issued_on,
            total_amount: summary.total_amount.amount(),
        }
    }
}

/// Body of `POST /invoices/:id/add-line`
///
/// Not checked with `validator`; the line factory checks the fields in rule
/// order and reports the first one broken.
#[derive(Debug, Deserialize)]
pub struct AddLineBody {
    pub barrel: Uuid,
    pub liters: i64,
    pub unit_price: Decimal,
    pub description: String,
}

impl AddLineBody {
    pub fn into_request(self, invoice_id: Uuid) -> AddLineRequest {
        AddLineRequest {
            invoice_id: InvoiceId::from(invoice_id),
            barrel_id: BarrelId::from(self.barrel),
            liters: self.liters,
            unit_price: self.unit_price,
            description: self.description,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceLineResponse {
    pub id: Uuid,
    pub barrel_id: Uuid,
    pub liters: i64,
    pub description: String,
    pub unit_price: Decimal,
}

impl From<InvoiceLine> for InvoiceLineResponse {
    fn from(line: InvoiceLine) -> Self {
        Self {
            id: line.id.into(),
            barrel_id: line.barrel_id.into(),
            liters: line.liters,
            description: line.description,
            unit_price: line.unit_price.amount(),
        }
    }
}
