//! PostgreSQL Ledger Adapter
//!
//! Implements the billing domain's `LedgerStore` and `LedgerTransaction`
//! ports with the provider, barrel and invoice repositories.
//!
//! # Error Handling
//!
//! Database errors are translated to `PortError` variants:
//! - unique and foreign key violations -> `PortError::Conflict`, except a
//!   line insert whose invoice is gone -> `PortError::NotFound`
//! - check violations -> `PortError::Validation`
//! - pool exhaustion and lock waits -> `PortError::Timeout`
//! - everything else -> `PortError::Internal`
//!
//! A health check slower than [`SLOW_HEALTH_CHECK_MS`] reports the store as degraded.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, BarrelId, DomainPort, HealthCheckResult, HealthCheckable, InvoiceId,
    PortError, ProviderId,
};
use domain_billing::{
    Barrel, BarrelBillingState, Invoice, InvoiceLine, InvoiceQuery, LedgerStore,
    LedgerTransaction, Provider,
};

use crate::error::DatabaseError;
use crate::repositories::{BarrelRepository, InvoiceRepository, ProviderRepository};

/// Health check latency above which the store reports itself degraded
pub const SLOW_HEALTH_CHECK_MS: u64 = 500;

fn health_status(latency_ms: u64) -> AdapterHealth {
    if latency_ms > SLOW_HEALTH_CHECK_MS {
        AdapterHealth::Degraded
    } else {
        AdapterHealth::Healthy
    }
}

/// PostgreSQL-backed ledger store
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    providers: ProviderRepository,
    barrels: BarrelRepository,
    invoices: InvoiceRepository,
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            providers: ProviderRepository::new(pool.clone()),
            barrels: BarrelRepository::new(pool.clone()),
            invoices: InvoiceRepository::new(pool.clone()),
            pool,
        }
    }

    /// The underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DomainPort for PostgresLedgerStore {}

#[async_trait]
impl HealthCheckable for PostgresLedgerStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => {
                let status = health_status(latency_ms);
                HealthCheckResult {
                    adapter_id: "postgres-ledger".to_string(),
                    status,
                    latency_ms,
                    message: (status == AdapterHealth::Degraded)
                        .then(|| format!("SELECT 1 took {}ms", latency_ms)),
                    checked_at: Utc::now(),
                }
            }
            Err(e) => HealthCheckResult {
                adapter_id: "postgres-ledger".to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

fn rows_into<R, T>(rows: Vec<R>) -> Result<Vec<T>, PortError>
where
    T: TryFrom<R, Error = DatabaseError>,
{
    rows.into_iter()
        .map(|row| T::try_from(row).map_err(PortError::from))
        .collect()
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    type Transaction = PgLedgerTransaction;

    async fn begin(&self) -> Result<Self::Transaction, PortError> {
        let tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        Ok(PgLedgerTransaction { tx })
    }

    #[instrument(skip(self, provider), fields(provider_id = %provider.id))]
    async fn insert_provider(&self, provider: &Provider) -> Result<(), PortError> {
        debug!("Inserting provider");
        Ok(self.providers.insert(provider).await?)
    }

    #[instrument(skip(self, provider), fields(provider_id = %provider.id))]
    async fn update_provider(&self, provider: &Provider) -> Result<(), PortError> {
        Ok(self.providers.update(provider).await?)
    }

    async fn get_provider(&self, id: ProviderId) -> Result<Option<Provider>, PortError> {
        Ok(self.providers.get(id.into()).await?.map(Provider::from))
    }

    async fn list_providers(&self) -> Result<Vec<Provider>, PortError> {
        let rows = self.providers.list().await?;
        Ok(rows.into_iter().map(Provider::from).collect())
    }

    #[instrument(skip(self), fields(provider_id = %id))]
    async fn delete_provider(&self, id: ProviderId) -> Result<bool, PortError> {
        Ok(self.providers.delete(id.into()).await?)
    }

    #[instrument(skip(self, barrel), fields(barrel_id = %barrel.id))]
    async fn insert_barrel(&self, barrel: &Barrel) -> Result<(), PortError> {
        debug!("Inserting barrel");
        Ok(self.barrels.insert(barrel).await?)
    }

    #[instrument(skip(self, barrel), fields(barrel_id = %barrel.id))]
    async fn update_barrel(&self, barrel: &Barrel) -> Result<(), PortError> {
        Ok(self.barrels.update(barrel).await?)
    }

    async fn get_barrel(&self, id: BarrelId) -> Result<Option<Barrel>, PortError> {
        match self.barrels.get(id.into()).await? {
            Some(row) => Ok(Some(Barrel::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn list_barrels(&self) -> Result<Vec<Barrel>, PortError> {
        rows_into(self.barrels.list().await?)
    }

    #[instrument(skip(self), fields(barrel_id = %id))]
    async fn delete_barrel(&self, id: BarrelId) -> Result<bool, PortError> {
        Ok(self.barrels.delete(id.into()).await?)
    }

    async fn barrel_states(
        &self,
        provider_id: Option<ProviderId>,
    ) -> Result<Vec<BarrelBillingState>, PortError> {
        let rows = self.barrels.states(provider_id.map(Into::into)).await?;
        Ok(rows.into_iter().map(BarrelBillingState::from).collect())
    }

    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.id))]
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), PortError> {
        debug!("Inserting invoice");
        Ok(self.invoices.insert(invoice).await?)
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, PortError> {
        Ok(self.invoices.get(id.into()).await?.map(Invoice::from))
    }

    #[instrument(skip(self))]
    async fn find_invoices(&self, query: &InvoiceQuery) -> Result<Vec<Invoice>, PortError> {
        let rows = self.invoices.find(query).await?;
        Ok(rows.into_iter().map(Invoice::from).collect())
    }

    #[instrument(skip(self), fields(invoice_id = %id))]
    async fn delete_invoice(&self, id: InvoiceId) -> Result<bool, PortError> {
        Ok(self.invoices.delete(id.into()).await?)
    }

    async fn invoice_lines(&self, invoice_id: InvoiceId) -> Result<Vec<InvoiceLine>, PortError> {
        rows_into(self.invoices.lines(invoice_id.into()).await?)
    }
}

/// An open PostgreSQL transaction
///
/// Dropping it without `commit` rolls back and releases the row locks.
pub struct PgLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTransaction for PgLedgerTransaction {
    async fn get_invoice(&mut self, id: InvoiceId) -> Result<Option<Invoice>, PortError> {
        let row = InvoiceRepository::fetch_for_key_share(&mut *self.tx, id.into()).await?;
        Ok(row.map(Invoice::from))
    }

    #[instrument(skip(self), fields(barrel_id = %id))]
    async fn lock_barrel(&mut self, id: BarrelId) -> Result<Option<Barrel>, PortError> {
        match BarrelRepository::lock(&mut *self.tx, id.into()).await? {
            Some(row) => Ok(Some(Barrel::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn billed_liters(&mut self, id: BarrelId) -> Result<i64, PortError> {
        Ok(BarrelRepository::billed_liters(&mut *self.tx, id.into()).await?)
    }

    async fn insert_line(&mut self, line: &InvoiceLine) -> Result<(), PortError> {
        InvoiceRepository::insert_line(&mut *self.tx, line)
            .await
            .map_err(|e| line_insert_error(e, line))
    }

    async fn commit(self) -> Result<(), PortError> {
        self.tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }
}

/// The barrel is row-locked, so a foreign key failure on a line insert is the invoice
fn line_insert_error(error: DatabaseError, line: &InvoiceLine) -> PortError {
    match error {
        DatabaseError::ForeignKeyViolation(_) => PortError::not_found("Invoice", line.invoice_id),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{InvoiceLineId, UnitPrice};
    use rust_decimal_macros::dec;

    fn line() -> InvoiceLine {
        InvoiceLine {
            id: InvoiceLineId::new_v7(),
            invoice_id: InvoiceId::new_v7(),
            barrel_id: BarrelId::new_v7(),
            liters: 100,
            description: "Cosecha temprana".to_string(),
            unit_price: UnitPrice::new(dec!(2.50)).unwrap(),
        }
    }

    #[test]
    fn test_missing_invoice_on_line_insert_is_not_found() {
        let line = line();
        let error = line_insert_error(
            DatabaseError::ForeignKeyViolation("invoice_lines_invoice_id_fkey".into()),
            &line,
        );
        assert!(error.is_not_found());
        assert!(error.to_string().contains(&line.invoice_id.to_string()));
    }

    #[test]
    fn test_duplicate_line_stays_a_conflict() {
        let error = line_insert_error(
            DatabaseError::DuplicateEntry("idx_invoice_lines_barrel".into()),
            &line(),
        );
        assert!(error.is_conflict());
    }

    #[test]
    fn test_slow_health_check_is_degraded() {
        assert_eq!(health_status(3), AdapterHealth::Healthy);
        assert_eq!(health_status(SLOW_HEALTH_CHECK_MS), AdapterHealth::Healthy);
        assert_eq!(health_status(SLOW_HEALTH_CHECK_MS + 1), AdapterHealth::Degraded);
    }
}
