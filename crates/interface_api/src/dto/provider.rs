//! Provider DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_billing::{NewProvider, ProviderSummary, ProviderUpdate};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProviderRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(min = 1, max = 64))]
    pub tax_id: String,
}

impl From<CreateProviderRequest> for NewProvider {
    fn from(request: CreateProviderRequest) -> Self {
        NewProvider {
            name: request.name,
            address: request.address,
            tax_id: request.tax_id,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProviderRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub address: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub tax_id: Option<String>,
}

impl From<UpdateProviderRequest> for ProviderUpdate {
    fn from(request: UpdateProviderRequest) -> Self {
        ProviderUpdate {
            name: request.name,
            address: request.address,
            tax_id: request.tax_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProviderListQuery {
    pub has_barrels_to_bill: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ProviderResponse {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub tax_id: String,
    pub has_barrels_to_bill: bool,
    pub liters_to_bill: i64,
    pub billed_barrels: Vec<Uuid>,
    pub barrels_to_bill: Vec<Uuid>,
}

impl From<ProviderSummary> for ProviderResponse {
    fn from(summary: ProviderSummary) -> Self {
        Self {
            id: summary.provider.id.into(),
            name: summary.provider.name,
            address: summary.provider.address,
            tax_id: summary.provider.tax_id,
            has_barrels_to_bill: summary.has_barrels_to_bill,
            liters_to_bill: summary.liters_to_bill,
            billed_barrels: summary.billed_barrels.into_iter().map(Uuid::from).collect(),
            barrels_to_bill: summary.barrels_to_bill.into_iter().map(Uuid::from).collect(),
        }
    }
}
