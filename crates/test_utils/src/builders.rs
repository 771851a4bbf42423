//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible defaults.
//! These builders allow tests to specify only the relevant fields while using
//! defaults for everything else.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use core_kernel::{BarrelId, InvoiceId, ProviderId};
use domain_billing::{
    AddLineRequest, Barrel, BillingError, BillingService, Invoice, LedgerStore, NewBarrel,
    NewInvoice, NewProvider, OilType, Provider,
};

use crate::fixtures::{PriceFixtures, ProviderFixtures, TemporalFixtures};

/// Short random suffix for numbers that must be unique
fn unique_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// Builder for provider registration requests
pub struct ProviderBuilder {
    name: String,
    address: String,
    tax_id: String,
}

impl Default for ProviderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderBuilder {
    /// Creates a new builder with fake values
    pub fn new() -> Self {
        Self {
            name: ProviderFixtures::name(),
            address: ProviderFixtures::address(),
            tax_id: ProviderFixtures::tax_id(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_tax_id(mut self, tax_id: impl Into<String>) -> Self {
        self.tax_id = tax_id.into();
        self
    }

    pub fn build(self) -> NewProvider {
        NewProvider {
            name: self.name,
            address: self.address,
            tax_id: self.tax_id,
        }
    }
}

/// Builder for barrel registration requests
pub struct BarrelBuilder {
    provider_id: ProviderId,
    number: String,
    oil_type: OilType,
    liters: i64,
}

impl BarrelBuilder {
    /// Creates a standard extra virgin barrel for the provider
    pub fn new(provider_id: ProviderId) -> Self {
        Self {
            provider_id,
            number: format!("B-{}", unique_suffix()),
            oil_type: OilType::ExtraVirgin,
            liters: PriceFixtures::barrel_liters(),
        }
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = number.into();
        self
    }

    pub fn with_oil_type(mut self, oil_type: OilType) -> Self {
        self.oil_type = oil_type;
        self
    }

    pub fn with_liters(mut self, liters: i64) -> Self {
        self.liters = liters;
        self
    }

    pub fn build(self) -> NewBarrel {
        NewBarrel {
            provider_id: self.provider_id,
            number: self.number,
            oil_type: self.oil_type,
            liters: self.liters,
        }
    }
}

/// Builder for invoice requests
pub struct InvoiceBuilder {
    invoice_no: String,
    provider_id: ProviderId,
    issued_on: NaiveDate,
}

impl InvoiceBuilder {
    /// Creates an invoice for the provider with a unique number
    pub fn new(provider_id: ProviderId) -> Self {
        Self {
            invoice_no: format!("INV-{}", unique_suffix()),
            provider_id,
            issued_on: TemporalFixtures::issue_date(),
        }
    }

    pub fn with_invoice_no(mut self, invoice_no: impl Into<String>) -> Self {
        self.invoice_no = invoice_no.into();
        self
    }

    pub fn issued_on(mut self, date: NaiveDate) -> Self {
        self.issued_on = date;
        self
    }

    pub fn build(self) -> NewInvoice {
        NewInvoice {
            invoice_no: self.invoice_no,
            provider_id: self.provider_id,
            issued_on: self.issued_on,
        }
    }
}

/// Builder for `add_line` requests
///
/// Defaults to billing the whole barrel at the standard unit price.
pub struct LineRequestBuilder {
    invoice_id: InvoiceId,
    barrel_id: BarrelId,
    liters: i64,
    unit_price: Decimal,
    description: String,
}

impl LineRequestBuilder {
    pub fn new(invoice: &Invoice, barrel: &Barrel) -> Self {
        Self {
            invoice_id: invoice.id,
            barrel_id: barrel.id,
            liters: barrel.liters,
            unit_price: PriceFixtures::unit_price(),
            description: format!("Barrel {} {}", barrel.number, barrel.oil_type.code()),
        }
    }

    pub fn with_liters(mut self, liters: i64) -> Self {
        self.liters = liters;
        self
    }

    pub fn with_unit_price(mut self, unit_price: Decimal) -> Self {
        self.unit_price = unit_price;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn build(self) -> AddLineRequest {
        AddLineRequest {
            invoice_id: self.invoice_id,
            barrel_id: self.barrel_id,
            liters: self.liters,
            unit_price: self.unit_price,
            description: self.description,
        }
    }
}

/// A provider with barrels and one open invoice, already stored
pub struct SeededProvider {
    pub provider: Provider,
    pub barrels: Vec<Barrel>,
    pub invoice: Invoice,
}

impl SeededProvider {
    /// Creates a provider, one barrel per capacity and an empty invoice
    pub async fn create<S: LedgerStore>(
        service: &BillingService<S>,
        capacities: &[i64],
    ) -> Result<Self, BillingError> {
        let provider = service.create_provider(ProviderBuilder::new().build()).await?;

        let mut barrels = Vec::with_capacity(capacities.len());
        for liters in capacities {
            let barrel = service
                .create_barrel(BarrelBuilder::new(provider.id).with_liters(*liters).build())
                .await?;
            barrels.push(barrel);
        }

        let invoice = service
            .create_invoice(InvoiceBuilder::new(provider.id).build())
            .await?;

        Ok(Self {
            provider,
            barrels,
            invoice,
        })
    }

    /// Request billing the whole of the n-th barrel on the seeded invoice
    pub fn full_line(&self, index: usize) -> LineRequestBuilder {
        LineRequestBuilder::new(&self.invoice, &self.barrels[index])
    }
}
