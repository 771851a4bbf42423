//! Ledger Store Ports
//!
//! The billing core needs two things from persistence: ordinary reads and
//! writes of providers, barrels and invoices, and a transaction that can lock
//! one barrel row while an invoice line is validated and inserted.
//!
//! # Adapters
//!
//! - **PostgreSQL** (`infra_db::PostgresLedgerStore`): `SELECT ... FOR UPDATE`
//!   on the barrel row plus a unique index on `invoice_lines(barrel_id)`
//! - **In-memory** ([`crate::memory::InMemoryLedgerStore`]): a per-barrel
//!   mutex held for the life of the transaction
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut tx = store.begin().await?;
//! let barrel = tx.lock_barrel(barrel_id).await?;
//! let billed = tx.billed_liters(barrel_id).await?;
//! tx.insert_line(&line).await?;
//! tx.commit().await?;
//! ```
//!
//! Dropping a transaction without calling `commit` discards everything it
//! staged and releases its locks.

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{
    BarrelId, DomainPort, HealthCheckable, InvoiceId, PortError, ProviderId,
};

use crate::barrel::Barrel;
use crate::billing_state::BarrelBillingState;
use crate::invoice::{Invoice, InvoiceLine};
use crate::provider::Provider;

/// Filters for listing invoices
///
/// All set filters must match. Results are ordered by issue date, newest
/// first, then by id descending.
#[derive(Debug, Clone, Default)]
pub struct InvoiceQuery {
    /// Case-insensitive substring of the invoice number
    pub invoice_no: Option<String>,
    /// Issued on or after this date
    pub issued_on_after: Option<NaiveDate>,
    /// Issued on or before this date
    pub issued_on_before: Option<NaiveDate>,
    /// Owning provider
    pub provider_id: Option<ProviderId>,
}

impl InvoiceQuery {
    /// Creates a query for one provider's invoices
    pub fn by_provider(provider_id: ProviderId) -> Self {
        Self {
            provider_id: Some(provider_id),
            ..Default::default()
        }
    }

    /// Restricts to an inclusive issue date range
    pub fn issued_between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.issued_on_after = from;
        self.issued_on_before = to;
        self
    }

    /// Restricts to invoice numbers containing `fragment`
    pub fn invoice_no_contains(mut self, fragment: impl Into<String>) -> Self {
        self.invoice_no = Some(fragment.into());
        self
    }

    /// Evaluates the filters against one invoice
    pub fn matches(&self, invoice: &Invoice) -> bool {
        if let Some(ref fragment) = self.invoice_no {
            if !invoice
                .invoice_no
                .to_lowercase()
                .contains(&fragment.to_lowercase())
            {
                return false;
            }
        }
        if let Some(after) = self.issued_on_after {
            if invoice.issued_on < after {
                return false;
            }
        }
        if let Some(before) = self.issued_on_before {
            if invoice.issued_on > before {
                return false;
            }
        }
        if let Some(provider_id) = self.provider_id {
            if invoice.provider_id != provider_id {
                return false;
            }
        }
        true
    }
}

/// Persistence port for the olive oil ledger
///
/// Uniqueness violations (barrel number per provider, invoice number) and
/// deletes blocked by existing references are reported as
/// `PortError::Conflict`. Deletes return `false` when nothing was found.
#[async_trait]
pub trait LedgerStore: DomainPort + HealthCheckable + Clone {
    /// Transaction type used by the invoice line factory
    type Transaction: LedgerTransaction;

    /// Starts a transaction
    async fn begin(&self) -> Result<Self::Transaction, PortError>;

    // ------------------------------------------------------------------
    // Providers
    // ------------------------------------------------------------------

    async fn insert_provider(&self, provider: &Provider) -> Result<(), PortError>;

    async fn update_provider(&self, provider: &Provider) -> Result<(), PortError>;

    async fn get_provider(&self, id: ProviderId) -> Result<Option<Provider>, PortError>;

    /// All providers ordered by id
    async fn list_providers(&self) -> Result<Vec<Provider>, PortError>;

    /// Deletes a provider and its barrels; refused if it has invoices or billed barrels
    async fn delete_provider(&self, id: ProviderId) -> Result<bool, PortError>;

    // ------------------------------------------------------------------
    // Barrels
    // ------------------------------------------------------------------

    async fn insert_barrel(&self, barrel: &Barrel) -> Result<(), PortError>;

    /// Persists number and oil type changes
    async fn update_barrel(&self, barrel: &Barrel) -> Result<(), PortError>;

    async fn get_barrel(&self, id: BarrelId) -> Result<Option<Barrel>, PortError>;

    /// All barrels ordered by id
    async fn list_barrels(&self) -> Result<Vec<Barrel>, PortError>;

    /// Deletes a barrel; refused if it has invoice lines
    async fn delete_barrel(&self, id: BarrelId) -> Result<bool, PortError>;

    /// Billing state of every barrel, or of one provider's barrels, ordered by barrel id
    async fn barrel_states(
        &self,
        provider_id: Option<ProviderId>,
    ) -> Result<Vec<BarrelBillingState>, PortError>;

    // ------------------------------------------------------------------
    // Invoices
    // ------------------------------------------------------------------

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), PortError>;

    async fn get_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, PortError>;

    async fn find_invoices(&self, query: &InvoiceQuery) -> Result<Vec<Invoice>, PortError>;

    /// Deletes an invoice together with its lines
    async fn delete_invoice(&self, id: InvoiceId) -> Result<bool, PortError>;

    /// Lines of one invoice ordered by id
    async fn invoice_lines(&self, invoice_id: InvoiceId) -> Result<Vec<InvoiceLine>, PortError>;
}

/// An open unit of work against the ledger store
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Reads an invoice inside the transaction
    async fn get_invoice(&mut self, id: InvoiceId) -> Result<Option<Invoice>, PortError>;

    /// Takes the exclusive lock on a barrel row and returns it
    ///
    /// The lock is held until the transaction commits or is dropped. Other
    /// barrels are not affected.
    async fn lock_barrel(&mut self, id: BarrelId) -> Result<Option<Barrel>, PortError>;

    /// Sum of liters over the barrel's lines, including lines staged in this transaction
    async fn billed_liters(&mut self, id: BarrelId) -> Result<i64, PortError>;

    /// Stages a new line; a second line for the same barrel is a `PortError::Conflict`
    async fn insert_line(&mut self, line: &InvoiceLine) -> Result<(), PortError>;

    /// Makes every staged write visible atomically
    async fn commit(self) -> Result<(), PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice(no: &str, y: i32, m: u32, d: u32) -> Invoice {
        Invoice {
            id: InvoiceId::new_v7(),
            invoice_no: no.to_string(),
            provider_id: ProviderId::new(),
            issued_on: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
        }
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(InvoiceQuery::default().matches(&invoice("INV-1", 2024, 1, 1)));
    }

    #[test]
    fn test_invoice_no_is_case_insensitive_substring() {
        let query = InvoiceQuery::default().invoice_no_contains("inv-2024");
        assert!(query.matches(&invoice("INV-2024-0007", 2024, 3, 1)));
        assert!(!query.matches(&invoice("INV-2023-0001", 2023, 3, 1)));
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let from = NaiveDate::from_ymd_opt(2024, 1, 1);
        let to = NaiveDate::from_ymd_opt(2024, 1, 31);
        let query = InvoiceQuery::default().issued_between(from, to);

        assert!(query.matches(&invoice("A", 2024, 1, 1)));
        assert!(query.matches(&invoice("B", 2024, 1, 31)));
        assert!(!query.matches(&invoice("C", 2024, 2, 1)));
    }

    #[test]
    fn test_provider_filter() {
        let inv = invoice("A", 2024, 1, 1);
        assert!(InvoiceQuery::by_provider(inv.provider_id).matches(&inv));
        assert!(!InvoiceQuery::by_provider(ProviderId::new()).matches(&inv));
    }
}
