//! Invoice line factory
//!
//! The only way to create an [`InvoiceLine`]. A request is checked in a
//! fixed order and the first failing rule decides the rejection:
//!
//! 1. liters > 0
//! 2. unit price > 0, at most two decimals
//! 3. description non-blank, at most 255 characters
//! 4. (inside the transaction, with the barrel row locked) the barrel is
//!    not already fully billed
//! 5. the barrel belongs to the invoice's provider
//! 6. liters equal the barrel's capacity
//!
//! Steps 4 to 6 and the insert run in one transaction, so two concurrent
//! requests for the same barrel cannot both observe it as unbilled.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use core_kernel::{BarrelId, InvoiceId, PortError, UnitPrice};

use crate::barrel::Barrel;
use crate::billing_state::BarrelBillingState;
use crate::error::BillingError;
use crate::invoice::{Invoice, InvoiceLine, DESCRIPTION_MAX_CHARS};
use crate::ports::{LedgerStore, LedgerTransaction};

/// Request to bill one barrel on one invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddLineRequest {
    pub invoice_id: InvoiceId,
    pub barrel_id: BarrelId,
    pub liters: i64,
    pub unit_price: Decimal,
    pub description: String,
}

/// Input checks that need no stored state (rules 1 to 3)
pub fn validate_input(
    liters: i64,
    unit_price: Decimal,
    description: &str,
) -> Result<UnitPrice, BillingError> {
    if liters <= 0 {
        return Err(BillingError::InvalidQuantity { liters });
    }

    let unit_price = UnitPrice::new(unit_price).map_err(BillingError::InvalidPrice)?;

    if description.trim().is_empty() {
        return Err(BillingError::InvalidDescription(
            "description must not be blank".to_string(),
        ));
    }
    let chars = description.chars().count();
    if chars > DESCRIPTION_MAX_CHARS {
        return Err(BillingError::InvalidDescription(format!(
            "description must be at most {} characters, got {}",
            DESCRIPTION_MAX_CHARS, chars
        )));
    }

    Ok(unit_price)
}

/// Checks against the locked barrel (rules 4 to 6)
pub fn check_barrel(
    invoice: &Invoice,
    barrel: &Barrel,
    state: &BarrelBillingState,
    liters: i64,
) -> Result<(), BillingError> {
    if state.is_fully_billed() {
        return Err(BillingError::BarrelAlreadyBilled { barrel_id: barrel.id });
    }

    if barrel.provider_id != invoice.provider_id {
        return Err(BillingError::ProviderMismatch {
            barrel_id: barrel.id,
            barrel_provider: barrel.provider_id,
            invoice_provider: invoice.provider_id,
        });
    }

    if liters != barrel.liters {
        return Err(BillingError::PartialQuantityRejected {
            barrel_id: barrel.id,
            requested: liters,
            capacity: barrel.liters,
        });
    }

    Ok(())
}

/// Maps a failed line insert or commit to the caller-facing error
///
/// A conflict means another writer billed the barrel without taking its lock.
/// A missing entity means the invoice was deleted under the transaction.
pub fn line_write_error(line: &InvoiceLine, error: PortError) -> BillingError {
    if error.is_conflict() {
        BillingError::BarrelAlreadyBilled { barrel_id: line.barrel_id }
    } else if error.is_not_found() {
        BillingError::InvoiceNotFound(line.invoice_id)
    } else {
        BillingError::Store(error)
    }
}

/// Creates invoice lines atomically against a ledger store
#[derive(Debug, Clone)]
pub struct InvoiceLineFactory<S> {
    store: S,
}

impl<S: LedgerStore> InvoiceLineFactory<S> {
    /// Creates a factory over the given store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validates the request and persists the line in one transaction
    ///
    /// # Errors
    ///
    /// - A business rejection (see [`BillingError::rejection_kind`]), in rule order
    /// - `InvoiceNotFound` / `BarrelNotFound` for unknown ids
    /// - `Store` if the backend fails; nothing is written in that case
    #[instrument(
        skip(self, request),
        fields(invoice_id = %request.invoice_id, barrel_id = %request.barrel_id, liters = request.liters)
    )]
    pub async fn add_line(&self, request: AddLineRequest) -> Result<InvoiceLine, BillingError> {
        let result = self.create_line(request).await;

        match &result {
            Ok(line) => info!(line_id = %line.id, unit_price = %line.unit_price, "Invoice line created"),
            Err(e) => match e.rejection_kind() {
                Some(kind) => warn!(rejection = kind.code(), "Invoice line rejected: {}", e),
                None if e.is_not_found() => warn!("Invoice line rejected: {}", e),
                None => error!("Invoice line failed: {}", e),
            },
        }

        result
    }

    async fn create_line(&self, request: AddLineRequest) -> Result<InvoiceLine, BillingError> {
        let unit_price = validate_input(request.liters, request.unit_price, &request.description)?;

        let mut tx = self.store.begin().await?;

        let invoice = tx
            .get_invoice(request.invoice_id)
            .await?
            .ok_or(BillingError::InvoiceNotFound(request.invoice_id))?;

        let barrel = tx
            .lock_barrel(request.barrel_id)
            .await?
            .ok_or(BillingError::BarrelNotFound(request.barrel_id))?;
        debug!("Barrel row locked");

        let billed = tx.billed_liters(barrel.id).await?;
        let state = BarrelBillingState::new(&barrel, billed);
        check_barrel(&invoice, &barrel, &state, request.liters)?;

        let line = InvoiceLine::new(
            invoice.id,
            barrel.id,
            request.liters,
            unit_price,
            request.description,
        );

        tx.insert_line(&line)
            .await
            .map_err(|e| line_write_error(&line, e))?;
        tx.commit().await.map_err(|e| line_write_error(&line, e))?;

        Ok(line)
    }
}
