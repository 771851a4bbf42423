//! Oil providers

use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{CoreError, ProviderId};

use crate::error::BillingError;

/// Maximum length of a provider name
pub const PROVIDER_NAME_MAX_CHARS: usize = 255;

/// Maximum length of a tax identifier
pub const TAX_ID_MAX_CHARS: usize = 64;

/// A supplier that delivers barrels and is billed for them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    pub address: String,
    pub tax_id: String,
}

impl Provider {
    /// Creates a validated provider with a fresh identifier
    pub fn new(request: NewProvider) -> Result<Self, BillingError> {
        let provider = Self {
            id: ProviderId::new_v7(),
            name: request.name,
            address: request.address,
            tax_id: request.tax_id,
        };
        provider.validate()?;
        Ok(provider)
    }

    /// Applies a partial update, leaving the provider untouched if it is invalid
    pub fn apply(&mut self, update: ProviderUpdate) -> Result<(), BillingError> {
        let mut updated = self.clone();
        if let Some(name) = update.name {
            updated.name = name;
        }
        if let Some(address) = update.address {
            updated.address = address;
        }
        if let Some(tax_id) = update.tax_id {
            updated.tax_id = tax_id;
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    fn validate(&self) -> Result<(), BillingError> {
        CoreError::check_text("name", &self.name, PROVIDER_NAME_MAX_CHARS)?;
        CoreError::check_text("tax_id", &self.tax_id, TAX_ID_MAX_CHARS)?;
        Ok(())
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.tax_id)
    }
}

/// Data for creating a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProvider {
    pub name: String,
    pub address: String,
    pub tax_id: String,
}

/// Partial update of a provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
}
