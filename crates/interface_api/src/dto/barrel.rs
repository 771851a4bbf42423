//! Barrel DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::ProviderId;
use domain_billing::{BarrelStatus, BarrelUpdate, NewBarrel, OilType};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBarrelRequest {
    pub provider: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub number: String,
    #[serde(default)]
    pub oil_type: OilType,
    #[validate(range(min = 1, max = 1000000))]
    pub liters: i64,
}

impl From<CreateBarrelRequest> for NewBarrel {
    fn from(request: CreateBarrelRequest) -> Self {
        NewBarrel {
            provider_id: ProviderId::from(request.provider),
            number: request.number,
            oil_type: request.oil_type,
            liters: request.liters,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBarrelRequest {
    #[validate(length(min = 1, max = 64))]
    pub number: Option<String>,
    pub oil_type: Option<OilType>,
}

impl From<UpdateBarrelRequest> for BarrelUpdate {
    fn from(request: UpdateBarrelRequest) -> Self {
        BarrelUpdate {
            number: request.number,
            oil_type: request.oil_type,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BarrelListQuery {
    pub provider: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct BarrelResponse {
    pub id: Uuid,
    pub provider: Uuid,
    pub number: String,
    pub oil_type: OilType,
    pub liters: i64,
    pub billed: bool,
}

impl From<BarrelStatus> for BarrelResponse {
    fn from(status: BarrelStatus) -> Self {
        let billed = status.billed();
        let barrel = status.barrel;
        Self {
            id: barrel.id.into(),
            provider: barrel.provider_id.into(),
            number: barrel.number,
            oil_type: barrel.oil_type,
            liters: barrel.liters,
            billed,
        }
    }
}
