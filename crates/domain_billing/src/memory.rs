//! In-memory ledger store
//!
//! Used by the test suites and the HTTP tests. Barrel row locks are
//! emulated with one async mutex per barrel; a transaction keeps the owned
//! guard until it commits or is dropped, so the billing rules see the same
//! serialization they get from `SELECT ... FOR UPDATE` in Postgres.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use core_kernel::{
    AdapterHealth, BarrelId, DomainPort, HealthCheckResult, HealthCheckable, InvoiceId,
    InvoiceLineId, PortError, ProviderId,
};

use crate::barrel::Barrel;
use crate::billing_state::BarrelBillingState;
use crate::invoice::{Invoice, InvoiceLine};
use crate::ports::{InvoiceQuery, LedgerStore, LedgerTransaction};
use crate::provider::Provider;

#[derive(Debug, Default)]
struct LedgerState {
    providers: BTreeMap<ProviderId, Provider>,
    barrels: BTreeMap<BarrelId, Barrel>,
    invoices: BTreeMap<InvoiceId, Invoice>,
    lines: BTreeMap<InvoiceLineId, InvoiceLine>,
}

impl LedgerState {
    fn billed_liters(&self, barrel_id: BarrelId) -> i64 {
        self.lines
            .values()
            .filter(|line| line.barrel_id == barrel_id)
            .fold(0i64, |total, line| total.saturating_add(line.liters))
    }

    fn has_line_for(&self, barrel_id: BarrelId) -> bool {
        self.lines.values().any(|line| line.barrel_id == barrel_id)
    }

    fn number_taken(&self, barrel: &Barrel) -> bool {
        self.barrels.values().any(|other| {
            other.id != barrel.id
                && other.provider_id == barrel.provider_id
                && other.number == barrel.number
        })
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: RwLock<LedgerState>,
    barrel_locks: Mutex<HashMap<BarrelId, Arc<Mutex<()>>>>,
}

impl Inner {
    async fn barrel_lock(&self, id: BarrelId) -> Arc<Mutex<()>> {
        let mut locks = self.barrel_locks.lock().await;
        locks.entry(id).or_default().clone()
    }

    /// Drops the lock entries nobody holds or waits on
    async fn release_locks(&self, ids: impl IntoIterator<Item = BarrelId>) {
        let mut locks = self.barrel_locks.lock().await;
        for id in ids {
            if locks.get(&id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                locks.remove(&id);
            }
        }
    }
}

/// Ledger store kept entirely in process memory
///
/// Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    inner: Arc<Inner>,
}

impl InMemoryLedgerStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl DomainPort for InMemoryLedgerStore {}

#[async_trait]
impl HealthCheckable for InMemoryLedgerStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "in-memory-ledger".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: None,
            checked_at: chrono::Utc::now(),
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Transaction, PortError> {
        Ok(InMemoryTransaction {
            inner: Arc::clone(&self.inner),
            guards: HashMap::new(),
            staged: Vec::new(),
        })
    }

    async fn insert_provider(&self, provider: &Provider) -> Result<(), PortError> {
        let mut state = self.inner.state.write().await;
        if state.providers.contains_key(&provider.id) {
            return Err(PortError::conflict(format!("provider {} already exists", provider.id)));
        }
        state.providers.insert(provider.id, provider.clone());
        Ok(())
    }

    async fn update_provider(&self, provider: &Provider) -> Result<(), PortError> {
        let mut state = self.inner.state.write().await;
        match state.providers.get_mut(&provider.id) {
            Some(stored) => {
                *stored = provider.clone();
                Ok(())
            }
            None => Err(PortError::not_found("Provider", provider.id)),
        }
    }

    async fn get_provider(&self, id: ProviderId) -> Result<Option<Provider>, PortError> {
        Ok(self.inner.state.read().await.providers.get(&id).cloned())
    }

    async fn list_providers(&self) -> Result<Vec<Provider>, PortError> {
        Ok(self.inner.state.read().await.providers.values().cloned().collect())
    }

    async fn delete_provider(&self, id: ProviderId) -> Result<bool, PortError> {
        let mut state = self.inner.state.write().await;
        if !state.providers.contains_key(&id) {
            return Ok(false);
        }
        if state.invoices.values().any(|invoice| invoice.provider_id == id) {
            return Err(PortError::conflict(format!("provider {} has invoices", id)));
        }

        let barrel_ids: Vec<BarrelId> = state
            .barrels
            .values()
            .filter(|barrel| barrel.provider_id == id)
            .map(|barrel| barrel.id)
            .collect();
        if barrel_ids.iter().any(|barrel_id| state.has_line_for(*barrel_id)) {
            return Err(PortError::conflict(format!("provider {} has billed barrels", id)));
        }

        for barrel_id in &barrel_ids {
            state.barrels.remove(barrel_id);
        }
        state.providers.remove(&id);
        drop(state);

        self.inner.release_locks(barrel_ids).await;
        Ok(true)
    }

    async fn insert_barrel(&self, barrel: &Barrel) -> Result<(), PortError> {
        let mut state = self.inner.state.write().await;
        if !state.providers.contains_key(&barrel.provider_id) {
            return Err(PortError::not_found("Provider", barrel.provider_id));
        }
        if state.barrels.contains_key(&barrel.id) || state.number_taken(barrel) {
            return Err(PortError::conflict(format!(
                "barrel number {} already exists for provider {}",
                barrel.number, barrel.provider_id
            )));
        }
        state.barrels.insert(barrel.id, barrel.clone());
        Ok(())
    }

    async fn update_barrel(&self, barrel: &Barrel) -> Result<(), PortError> {
        let mut state = self.inner.state.write().await;
        if !state.barrels.contains_key(&barrel.id) {
            return Err(PortError::not_found("Barrel", barrel.id));
        }
        if state.number_taken(barrel) {
            return Err(PortError::conflict(format!(
                "barrel number {} already exists for provider {}",
                barrel.number, barrel.provider_id
            )));
        }
        if let Some(stored) = state.barrels.get_mut(&barrel.id) {
            stored.number = barrel.number.clone();
            stored.oil_type = barrel.oil_type;
        }
        Ok(())
    }

    async fn get_barrel(&self, id: BarrelId) -> Result<Option<Barrel>, PortError> {
        Ok(self.inner.state.read().await.barrels.get(&id).cloned())
    }

    async fn list_barrels(&self) -> Result<Vec<Barrel>, PortError> {
        Ok(self.inner.state.read().await.barrels.values().cloned().collect())
    }

    async fn delete_barrel(&self, id: BarrelId) -> Result<bool, PortError> {
        // Wait for any transaction billing this barrel to finish
        let lock = self.inner.barrel_lock(id).await;
        let guard = lock.lock().await;

        let mut state = self.inner.state.write().await;
        let result = if !state.barrels.contains_key(&id) {
            Ok(false)
        } else if state.has_line_for(id) {
            Err(PortError::conflict(format!("barrel {} has invoice lines", id)))
        } else {
            state.barrels.remove(&id);
            Ok(true)
        };
        drop(state);
        drop(guard);
        drop(lock);

        self.inner.release_locks([id]).await;
        result
    }

    async fn barrel_states(
        &self,
        provider_id: Option<ProviderId>,
    ) -> Result<Vec<BarrelBillingState>, PortError> {
        let state = self.inner.state.read().await;

        let mut billed: HashMap<BarrelId, i64> = HashMap::new();
        for line in state.lines.values() {
            let total = billed.entry(line.barrel_id).or_insert(0);
            *total = total.saturating_add(line.liters);
        }

        Ok(state
            .barrels
            .values()
            .filter(|barrel| provider_id.map_or(true, |p| barrel.provider_id == p))
            .map(|barrel| {
                BarrelBillingState::new(barrel, billed.get(&barrel.id).copied().unwrap_or(0))
            })
            .collect())
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), PortError> {
        let mut state = self.inner.state.write().await;
        if !state.providers.contains_key(&invoice.provider_id) {
            return Err(PortError::not_found("Provider", invoice.provider_id));
        }
        if state
            .invoices
            .values()
            .any(|other| other.id == invoice.id || other.invoice_no == invoice.invoice_no)
        {
            return Err(PortError::conflict(format!(
                "invoice number {} already exists",
                invoice.invoice_no
            )));
        }
        state.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, PortError> {
        Ok(self.inner.state.read().await.invoices.get(&id).cloned())
    }

    async fn find_invoices(&self, query: &InvoiceQuery) -> Result<Vec<Invoice>, PortError> {
        let state = self.inner.state.read().await;
        let mut invoices: Vec<Invoice> = state
            .invoices
            .values()
            .filter(|invoice| query.matches(invoice))
            .cloned()
            .collect();
        invoices.sort_by(|a, b| b.issued_on.cmp(&a.issued_on).then_with(|| b.id.cmp(&a.id)));
        Ok(invoices)
    }

    async fn delete_invoice(&self, id: InvoiceId) -> Result<bool, PortError> {
        let mut state = self.inner.state.write().await;
        if state.invoices.remove(&id).is_none() {
            return Ok(false);
        }
        state.lines.retain(|_, line| line.invoice_id != id);
        Ok(true)
    }

    async fn invoice_lines(&self, invoice_id: InvoiceId) -> Result<Vec<InvoiceLine>, PortError> {
        Ok(self
            .inner
            .state
            .read()
            .await
            .lines
            .values()
            .filter(|line| line.invoice_id == invoice_id)
            .cloned()
            .collect())
    }
}

/// Transaction over an [`InMemoryLedgerStore`]
///
/// Lines are staged locally and applied under the state write lock on
/// commit. Barrel locks are released when the transaction is dropped.
#[derive(Debug)]
pub struct InMemoryTransaction {
    inner: Arc<Inner>,
    guards: HashMap<BarrelId, OwnedMutexGuard<()>>,
    staged: Vec<InvoiceLine>,
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    async fn get_invoice(&mut self, id: InvoiceId) -> Result<Option<Invoice>, PortError> {
        Ok(self.inner.state.read().await.invoices.get(&id).cloned())
    }

    async fn lock_barrel(&mut self, id: BarrelId) -> Result<Option<Barrel>, PortError> {
        if !self.guards.contains_key(&id) {
            let lock = self.inner.barrel_lock(id).await;
            let guard = lock.lock_owned().await;
            self.guards.insert(id, guard);
        }

        let barrel = self.inner.state.read().await.barrels.get(&id).cloned();
        if barrel.is_none() {
            drop(self.guards.remove(&id));
            self.inner.release_locks([id]).await;
        }
        Ok(barrel)
    }

    async fn billed_liters(&mut self, id: BarrelId) -> Result<i64, PortError> {
        let stored = self.inner.state.read().await.billed_liters(id);
        let staged: i64 = self
            .staged
            .iter()
            .filter(|line| line.barrel_id == id)
            .fold(0i64, |total, line| total.saturating_add(line.liters));
        Ok(stored.saturating_add(staged))
    }

    async fn insert_line(&mut self, line: &InvoiceLine) -> Result<(), PortError> {
        let exists = self.staged.iter().any(|staged| staged.barrel_id == line.barrel_id)
            || self.inner.state.read().await.has_line_for(line.barrel_id);
        if exists {
            return Err(PortError::conflict(format!(
                "barrel {} already has an invoice line",
                line.barrel_id
            )));
        }
        self.staged.push(line.clone());
        Ok(())
    }

    async fn commit(self) -> Result<(), PortError> {
        let mut state = self.inner.state.write().await;

        for line in &self.staged {
            if !state.invoices.contains_key(&line.invoice_id) {
                return Err(PortError::not_found("Invoice", line.invoice_id));
            }
            if !state.barrels.contains_key(&line.barrel_id) {
                return Err(PortError::not_found("Barrel", line.barrel_id));
            }
            if state.has_line_for(line.barrel_id) {
                return Err(PortError::conflict(format!(
                    "barrel {} already has an invoice line",
                    line.barrel_id
                )));
            }
        }

        for line in self.staged {
            state.lines.insert(line.id, line);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrel::{NewBarrel, OilType};
    use crate::invoice::NewInvoice;
    use crate::provider::NewProvider;
    use chrono::NaiveDate;
    use core_kernel::UnitPrice;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    async fn seeded() -> (InMemoryLedgerStore, Invoice, Barrel) {
        let store = InMemoryLedgerStore::new();
        let provider = Provider::new(NewProvider {
            name: "Olivar de la Vega".to_string(),
            address: "Carretera N-4 km 12".to_string(),
            tax_id: "B41000000".to_string(),
        })
        .unwrap();
        store.insert_provider(&provider).await.unwrap();

        let barrel = Barrel::new(NewBarrel {
            provider_id: provider.id,
            number: "1".to_string(),
            oil_type: OilType::ExtraVirgin,
            liters: 100,
        })
        .unwrap();
        store.insert_barrel(&barrel).await.unwrap();

        let invoice = Invoice::new(NewInvoice {
            invoice_no: "F-2024-001".to_string(),
            provider_id: provider.id,
            issued_on: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
        })
        .unwrap();
        store.insert_invoice(&invoice).await.unwrap();

        (store, invoice, barrel)
    }

    fn line(invoice: &Invoice, barrel: &Barrel) -> InvoiceLine {
        InvoiceLine::new(
            invoice.id,
            barrel.id,
            barrel.liters,
            UnitPrice::new(dec!(4.20)).unwrap(),
            "Cosecha temprana".to_string(),
        )
    }

    #[tokio::test]
    async fn test_dropped_transaction_writes_nothing() {
        let (store, invoice, barrel) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        tx.lock_barrel(barrel.id).await.unwrap();
        tx.insert_line(&line(&invoice, &barrel)).await.unwrap();
        assert_eq!(tx.billed_liters(barrel.id).await.unwrap(), 100);
        drop(tx);

        assert!(store.invoice_lines(invoice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_line_for_barrel_conflicts() {
        let (store, invoice, barrel) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        tx.insert_line(&line(&invoice, &barrel)).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = tx.insert_line(&line(&invoice, &barrel)).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_barrel_lock_blocks_until_drop() {
        let (store, _, barrel) = seeded().await;

        let mut first = store.begin().await.unwrap();
        first.lock_barrel(barrel.id).await.unwrap();

        let mut second = store.begin().await.unwrap();
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), second.lock_barrel(barrel.id)).await;
        assert!(blocked.is_err());

        drop(first);
        let locked = tokio::time::timeout(Duration::from_secs(1), second.lock_barrel(barrel.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(locked.unwrap().id, barrel.id);
    }

    #[tokio::test]
    async fn test_lock_on_missing_barrel_returns_none() {
        let store = InMemoryLedgerStore::new();
        let mut tx = store.begin().await.unwrap();
        assert!(tx.lock_barrel(BarrelId::new()).await.unwrap().is_none());
    }

    async fn lock_entries(store: &InMemoryLedgerStore) -> usize {
        store.inner.barrel_locks.lock().await.len()
    }

    #[tokio::test]
    async fn test_unknown_barrels_leave_no_lock_entries() {
        let store = InMemoryLedgerStore::new();
        let mut tx = store.begin().await.unwrap();

        for _ in 0..100 {
            assert!(tx.lock_barrel(BarrelId::new()).await.unwrap().is_none());
            assert!(!store.delete_barrel(BarrelId::new()).await.unwrap());
        }

        assert_eq!(lock_entries(&store).await, 0);
    }

    #[tokio::test]
    async fn test_deleted_barrels_leave_no_lock_entries() {
        let (store, invoice, barrel) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        tx.lock_barrel(barrel.id).await.unwrap();
        drop(tx);
        assert!(store.delete_barrel(barrel.id).await.unwrap());
        assert_eq!(lock_entries(&store).await, 0);

        let other = Barrel::new(NewBarrel {
            provider_id: invoice.provider_id,
            number: "2".to_string(),
            oil_type: OilType::Virgin,
            liters: 50,
        })
        .unwrap();
        store.insert_barrel(&other).await.unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.lock_barrel(other.id).await.unwrap();
        drop(tx);

        assert!(store.delete_invoice(invoice.id).await.unwrap());
        assert!(store.delete_provider(invoice.provider_id).await.unwrap());
        assert_eq!(lock_entries(&store).await, 0);
    }

    #[tokio::test]
    async fn test_held_lock_survives_pruning() {
        let (store, _, barrel) = seeded().await;

        let mut holder = store.begin().await.unwrap();
        holder.lock_barrel(barrel.id).await.unwrap();

        let mut other = store.begin().await.unwrap();
        assert!(other.lock_barrel(BarrelId::new()).await.unwrap().is_none());
        assert_eq!(lock_entries(&store).await, 1);

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), store.delete_barrel(barrel.id)).await;
        assert!(blocked.is_err());
    }

    #[tokio::test]
    async fn test_commit_after_invoice_deleted_is_not_found() {
        let (store, invoice, barrel) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        assert!(tx.get_invoice(invoice.id).await.unwrap().is_some());
        tx.lock_barrel(barrel.id).await.unwrap();
        tx.insert_line(&line(&invoice, &barrel)).await.unwrap();

        assert!(store.delete_invoice(invoice.id).await.unwrap());

        let err = tx.commit().await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
        assert!(store.invoice_lines(invoice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_billed_liters_saturates() {
        let (store, invoice, barrel) = seeded().await;
        let mut huge = line(&invoice, &barrel);
        huge.liters = i64::MAX;
        store.inner.state.write().await.lines.insert(huge.id, huge);

        let mut tx = store.begin().await.unwrap();
        tx.staged.push(line(&invoice, &barrel));
        assert_eq!(tx.billed_liters(barrel.id).await.unwrap(), i64::MAX);

        let states = store.barrel_states(None).await.unwrap();
        assert_eq!(states[0].billed_liters, i64::MAX);
    }

    #[tokio::test]
    async fn test_duplicate_invoice_number_conflicts() {
        let (store, invoice, _) = seeded().await;
        let mut copy = invoice.clone();
        copy.id = InvoiceId::new_v7();

        let err = store.insert_invoice(&copy).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_billed_barrel_cannot_be_deleted() {
        let (store, invoice, barrel) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        tx.insert_line(&line(&invoice, &barrel)).await.unwrap();
        tx.commit().await.unwrap();

        assert!(store.delete_barrel(barrel.id).await.unwrap_err().is_conflict());
        assert!(store.delete_provider(barrel.provider_id).await.unwrap_err().is_conflict());

        assert!(store.delete_invoice(invoice.id).await.unwrap());
        assert!(store.delete_barrel(barrel.id).await.unwrap());
        assert!(!store.delete_barrel(barrel.id).await.unwrap());
    }
}
