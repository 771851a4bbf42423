//! Billing service
//!
//! Application-facing operations over a [`LedgerStore`]: provider, barrel
//! and invoice administration, the aggregation views, and invoice line
//! creation through the [`InvoiceLineFactory`].

use std::collections::HashMap;
use tracing::{info, instrument};

use core_kernel::{BarrelId, HealthCheckResult, HealthCheckable, InvoiceId, ProviderId};

use crate::aggregation::ProviderSummary;
use crate::barrel::{Barrel, BarrelUpdate, NewBarrel};
use crate::billing_state::{BarrelBillingState, BarrelStatus};
use crate::error::BillingError;
use crate::invoice::{Invoice, InvoiceLine, InvoiceSummary, NewInvoice};
use crate::line_factory::{AddLineRequest, InvoiceLineFactory};
use crate::ports::{InvoiceQuery, LedgerStore};
use crate::provider::{NewProvider, Provider, ProviderUpdate};

/// Filters for listing barrels
#[derive(Debug, Clone, Copy, Default)]
pub struct BarrelFilter {
    pub provider_id: Option<ProviderId>,
    pub billed: Option<bool>,
}

/// Billing operations backed by a ledger store
#[derive(Debug, Clone)]
pub struct BillingService<S> {
    store: S,
    lines: InvoiceLineFactory<S>,
}

impl<S: LedgerStore> BillingService<S> {
    pub fn new(store: S) -> Self {
        Self {
            lines: InvoiceLineFactory::new(store.clone()),
            store,
        }
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn health_check(&self) -> HealthCheckResult {
        self.store.health_check().await
    }

    // ------------------------------------------------------------------
    // Providers
    // ------------------------------------------------------------------

    #[instrument(skip(self, request))]
    pub async fn create_provider(&self, request: NewProvider) -> Result<Provider, BillingError> {
        let provider = Provider::new(request)?;
        self.store.insert_provider(&provider).await?;
        info!(provider_id = %provider.id, "Provider created");
        Ok(provider)
    }

    #[instrument(skip(self, update))]
    pub async fn update_provider(
        &self,
        id: ProviderId,
        update: ProviderUpdate,
    ) -> Result<Provider, BillingError> {
        let mut provider = self.get_provider(id).await?;
        provider.apply(update)?;
        self.store.update_provider(&provider).await?;
        Ok(provider)
    }

    pub async fn get_provider(&self, id: ProviderId) -> Result<Provider, BillingError> {
        self.store
            .get_provider(id)
            .await?
            .ok_or(BillingError::ProviderNotFound(id))
    }

    pub async fn list_providers(&self) -> Result<Vec<Provider>, BillingError> {
        Ok(self.store.list_providers().await?)
    }

    /// Deletes a provider and its unbilled barrels
    ///
    /// Refused with `Conflict` while the provider has invoices or billed barrels.
    #[instrument(skip(self))]
    pub async fn delete_provider(&self, id: ProviderId) -> Result<(), BillingError> {
        if !self.store.delete_provider(id).await? {
            return Err(BillingError::ProviderNotFound(id));
        }
        info!("Provider deleted");
        Ok(())
    }

    /// Billing overview of one provider
    pub async fn provider_summary(&self, id: ProviderId) -> Result<ProviderSummary, BillingError> {
        let provider = self.get_provider(id).await?;
        let states = self.store.barrel_states(Some(id)).await?;
        Ok(ProviderSummary::from_states(provider, &states))
    }

    /// Billing overview of every provider
    ///
    /// With `has_barrels_to_bill` set, only providers whose derived flag
    /// equals the given value are returned.
    pub async fn list_provider_summaries(
        &self,
        has_barrels_to_bill: Option<bool>,
    ) -> Result<Vec<ProviderSummary>, BillingError> {
        let providers = self.store.list_providers().await?;
        let states = self.store.barrel_states(None).await?;

        let mut by_provider: HashMap<ProviderId, Vec<BarrelBillingState>> = HashMap::new();
        for state in states {
            by_provider.entry(state.provider_id).or_default().push(state);
        }

        Ok(providers
            .into_iter()
            .map(|provider| {
                let own = by_provider.remove(&provider.id).unwrap_or_default();
                ProviderSummary::from_states(provider, &own)
            })
            .filter(|summary| {
                has_barrels_to_bill.map_or(true, |wanted| summary.has_barrels_to_bill == wanted)
            })
            .collect())
    }

    // ------------------------------------------------------------------
    // Barrels
    // ------------------------------------------------------------------

    #[instrument(skip(self, request), fields(provider_id = %request.provider_id))]
    pub async fn create_barrel(&self, request: NewBarrel) -> Result<Barrel, BillingError> {
        self.get_provider(request.provider_id).await?;
        let barrel = Barrel::new(request)?;
        self.store.insert_barrel(&barrel).await?;
        info!(barrel_id = %barrel.id, liters = barrel.liters, "Barrel registered");
        Ok(barrel)
    }

    /// Changes number or oil type; capacity and provider are fixed
    #[instrument(skip(self, update))]
    pub async fn update_barrel(
        &self,
        id: BarrelId,
        update: BarrelUpdate,
    ) -> Result<Barrel, BillingError> {
        let mut barrel = self
            .store
            .get_barrel(id)
            .await?
            .ok_or(BillingError::BarrelNotFound(id))?;
        barrel.apply(update)?;
        self.store.update_barrel(&barrel).await?;
        Ok(barrel)
    }

    /// A barrel with its derived billing state
    pub async fn get_barrel(&self, id: BarrelId) -> Result<BarrelStatus, BillingError> {
        let barrel = self
            .store
            .get_barrel(id)
            .await?
            .ok_or(BillingError::BarrelNotFound(id))?;
        let state = self
            .store
            .barrel_states(Some(barrel.provider_id))
            .await?
            .into_iter()
            .find(|state| state.barrel_id == id)
            .unwrap_or_else(|| BarrelBillingState::new(&barrel, 0));
        Ok(BarrelStatus { barrel, state })
    }

    /// Barrels with their billing state, ordered by id
    pub async fn list_barrels(&self, filter: BarrelFilter) -> Result<Vec<BarrelStatus>, BillingError> {
        let barrels = self.store.list_barrels().await?;
        let states: HashMap<BarrelId, BarrelBillingState> = self
            .store
            .barrel_states(filter.provider_id)
            .await?
            .into_iter()
            .map(|state| (state.barrel_id, state))
            .collect();

        Ok(barrels
            .into_iter()
            .filter(|barrel| filter.provider_id.map_or(true, |p| barrel.provider_id == p))
            .map(|barrel| {
                let state = states
                    .get(&barrel.id)
                    .copied()
                    .unwrap_or_else(|| BarrelBillingState::new(&barrel, 0));
                BarrelStatus { barrel, state }
            })
            .filter(|status| filter.billed.map_or(true, |wanted| status.billed() == wanted))
            .collect())
    }

    /// Deletes a barrel; refused with `Conflict` once it is on an invoice
    #[instrument(skip(self))]
    pub async fn delete_barrel(&self, id: BarrelId) -> Result<(), BillingError> {
        if !self.store.delete_barrel(id).await? {
            return Err(BillingError::BarrelNotFound(id));
        }
        info!("Barrel deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Invoices
    // ------------------------------------------------------------------

    #[instrument(skip(self, request), fields(invoice_no = %request.invoice_no))]
    pub async fn create_invoice(&self, request: NewInvoice) -> Result<Invoice, BillingError> {
        self.get_provider(request.provider_id).await?;
        let invoice = Invoice::new(request)?;
        self.store.insert_invoice(&invoice).await?;
        info!(invoice_id = %invoice.id, "Invoice created");
        Ok(invoice)
    }

    /// An invoice with its total amount
    pub async fn get_invoice(&self, id: InvoiceId) -> Result<InvoiceSummary, BillingError> {
        let invoice = self
            .store
            .get_invoice(id)
            .await?
            .ok_or(BillingError::InvoiceNotFound(id))?;
        let lines = self.store.invoice_lines(id).await?;
        InvoiceSummary::from_lines(invoice, &lines)
    }

    /// Matching invoices with their totals, newest first
    pub async fn find_invoices(
        &self,
        query: &InvoiceQuery,
    ) -> Result<Vec<InvoiceSummary>, BillingError> {
        let invoices = self.store.find_invoices(query).await?;
        let mut summaries = Vec::with_capacity(invoices.len());
        for invoice in invoices {
            let lines = self.store.invoice_lines(invoice.id).await?;
            summaries.push(InvoiceSummary::from_lines(invoice, &lines)?);
        }
        Ok(summaries)
    }

    /// Deletes an invoice and its lines, which releases the billed barrels
    #[instrument(skip(self))]
    pub async fn delete_invoice(&self, id: InvoiceId) -> Result<(), BillingError> {
        if !self.store.delete_invoice(id).await? {
            return Err(BillingError::InvoiceNotFound(id));
        }
        info!("Invoice deleted");
        Ok(())
    }

    pub async fn invoice_lines(&self, id: InvoiceId) -> Result<Vec<InvoiceLine>, BillingError> {
        if self.store.get_invoice(id).await?.is_none() {
            return Err(BillingError::InvoiceNotFound(id));
        }
        Ok(self.store.invoice_lines(id).await?)
    }

    /// Bills one barrel on an invoice
    pub async fn add_line(&self, request: AddLineRequest) -> Result<InvoiceLine, BillingError> {
        self.lines.add_line(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrel::OilType;
    use crate::memory::InMemoryLedgerStore;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn service() -> BillingService<InMemoryLedgerStore> {
        BillingService::new(InMemoryLedgerStore::new())
    }

    async fn provider(service: &BillingService<InMemoryLedgerStore>, tax_id: &str) -> Provider {
        service
            .create_provider(NewProvider {
                name: format!("Provider {}", tax_id),
                address: "Calle Real 3".to_string(),
                tax_id: tax_id.to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_barrel_for_unknown_provider() {
        let result = service()
            .create_barrel(NewBarrel {
                provider_id: ProviderId::new(),
                number: "1".to_string(),
                oil_type: OilType::default(),
                liters: 10,
            })
            .await;
        assert!(matches!(result, Err(BillingError::ProviderNotFound(_))));
    }

    #[tokio::test]
    async fn test_summary_filter_is_symmetric() {
        let service = service();
        let with_barrel = provider(&service, "A1").await;
        let without = provider(&service, "B2").await;
        service
            .create_barrel(NewBarrel {
                provider_id: with_barrel.id,
                number: "1".to_string(),
                oil_type: OilType::default(),
                liters: 10,
            })
            .await
            .unwrap();

        let pending = service.list_provider_summaries(Some(true)).await.unwrap();
        let done = service.list_provider_summaries(Some(false)).await.unwrap();
        let all = service.list_provider_summaries(None).await.unwrap();

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].provider.id, with_barrel.id);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].provider.id, without.id);
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_invoice_total_follows_lines() {
        let service = service();
        let p = provider(&service, "C3").await;
        let barrel = service
            .create_barrel(NewBarrel {
                provider_id: p.id,
                number: "7".to_string(),
                oil_type: OilType::Virgin,
                liters: 80,
            })
            .await
            .unwrap();
        let invoice = service
            .create_invoice(NewInvoice {
                invoice_no: "F-7".to_string(),
                provider_id: p.id,
                issued_on: NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
            })
            .await
            .unwrap();

        service
            .add_line(AddLineRequest {
                invoice_id: invoice.id,
                barrel_id: barrel.id,
                liters: 80,
                unit_price: dec!(3.25),
                description: "Virgen".to_string(),
            })
            .await
            .unwrap();

        let summary = service.get_invoice(invoice.id).await.unwrap();
        assert_eq!(summary.total_amount.amount(), dec!(260.00));
        assert!(service.get_barrel(barrel.id).await.unwrap().billed());
    }

    #[tokio::test]
    async fn test_delete_missing_entities() {
        let service = service();
        assert!(matches!(
            service.delete_provider(ProviderId::new()).await,
            Err(BillingError::ProviderNotFound(_))
        ));
        assert!(matches!(
            service.delete_invoice(InvoiceId::new()).await,
            Err(BillingError::InvoiceNotFound(_))
        ));
        assert!(matches!(
            service.invoice_lines(InvoiceId::new()).await,
            Err(BillingError::InvoiceNotFound(_))
        ));
    }
}
