//! Billing domain errors

use serde::Serialize;
use thiserror::Error;

use core_kernel::{BarrelId, CoreError, InvoiceId, MoneyError, PortError, ProviderId};

/// The business rules an `add_line` request can violate
///
/// Each kind maps to a stable code that callers can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    InvalidQuantity,
    InvalidPrice,
    InvalidDescription,
    BarrelAlreadyBilled,
    ProviderMismatch,
    PartialQuantityRejected,
}

impl RejectionKind {
    /// Returns the snake_case code of this rejection
    pub fn code(&self) -> &'static str {
        match self {
            RejectionKind::InvalidQuantity => "invalid_quantity",
            RejectionKind::InvalidPrice => "invalid_price",
            RejectionKind::InvalidDescription => "invalid_description",
            RejectionKind::BarrelAlreadyBilled => "barrel_already_billed",
            RejectionKind::ProviderMismatch => "provider_mismatch",
            RejectionKind::PartialQuantityRejected => "partial_quantity_rejected",
        }
    }
}

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// Requested liters are zero or negative
    #[error("liters must be > 0, got {liters}")]
    InvalidQuantity { liters: i64 },

    /// Unit price is not a positive amount with at most two decimals
    #[error("invalid unit price: {0}")]
    InvalidPrice(MoneyError),

    /// Line description is blank or too long
    #[error("invalid description: {0}")]
    InvalidDescription(String),

    /// The barrel already has its full capacity invoiced
    #[error("barrel {barrel_id} is already fully billed")]
    BarrelAlreadyBilled { barrel_id: BarrelId },

    /// The barrel belongs to a different provider than the invoice
    #[error("barrel {barrel_id} belongs to {barrel_provider}, not to the invoice provider {invoice_provider}")]
    ProviderMismatch {
        barrel_id: BarrelId,
        barrel_provider: ProviderId,
        invoice_provider: ProviderId,
    },

    /// Liters differ from the barrel capacity
    #[error("liters must equal the barrel capacity of {capacity} to bill the full barrel, got {requested}")]
    PartialQuantityRejected {
        barrel_id: BarrelId,
        requested: i64,
        capacity: i64,
    },

    /// Provider not found
    #[error("Provider not found: {0}")]
    ProviderNotFound(ProviderId),

    /// Barrel not found
    #[error("Barrel not found: {0}")]
    BarrelNotFound(BarrelId),

    /// Invoice not found
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    /// Administrative input is invalid
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uniqueness or protected-reference violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Amount arithmetic failed
    #[error("Calculation error: {0}")]
    Calculation(MoneyError),

    /// The ledger store failed
    #[error("Storage error: {0}")]
    Store(#[source] PortError),
}

impl BillingError {
    /// Returns the business rule this error rejects, if it is an `add_line` rejection
    pub fn rejection_kind(&self) -> Option<RejectionKind> {
        match self {
            BillingError::InvalidQuantity { .. } => Some(RejectionKind::InvalidQuantity),
            BillingError::InvalidPrice(_) => Some(RejectionKind::InvalidPrice),
            BillingError::InvalidDescription(_) => Some(RejectionKind::InvalidDescription),
            BillingError::BarrelAlreadyBilled { .. } => Some(RejectionKind::BarrelAlreadyBilled),
            BillingError::ProviderMismatch { .. } => Some(RejectionKind::ProviderMismatch),
            BillingError::PartialQuantityRejected { .. } => {
                Some(RejectionKind::PartialQuantityRejected)
            }
            _ => None,
        }
    }

    /// Checks if this error indicates a record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BillingError::ProviderNotFound(_)
                | BillingError::BarrelNotFound(_)
                | BillingError::InvoiceNotFound(_)
        )
    }

    /// Checks if the underlying store failure may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, BillingError::Store(e) if e.is_transient())
    }
}

impl From<CoreError> for BillingError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Validation(message) => BillingError::Validation(message),
            CoreError::Money(e) => BillingError::Calculation(e),
        }
    }
}

impl From<PortError> for BillingError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::Conflict { message } => BillingError::Conflict(message),
            PortError::Validation { message, .. } => BillingError::Validation(message),
            other => BillingError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_kind_only_for_business_rules() {
        let rejected = BillingError::InvalidQuantity { liters: 0 };
        assert_eq!(rejected.rejection_kind(), Some(RejectionKind::InvalidQuantity));

        let missing = BillingError::BarrelNotFound(BarrelId::new());
        assert_eq!(missing.rejection_kind(), None);
        assert!(missing.is_not_found());
    }

    #[test]
    fn test_port_conflict_becomes_domain_conflict() {
        let error: BillingError = PortError::conflict("invoice_no already exists").into();
        assert!(matches!(error, BillingError::Conflict(msg) if msg.contains("invoice_no")));
    }

    #[test]
    fn test_transient_store_error() {
        let error: BillingError = PortError::connection("pool closed").into();
        assert!(error.is_transient());
    }
}
