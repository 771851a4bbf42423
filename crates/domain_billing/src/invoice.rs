//! Invoices and invoice lines
//!
//! An invoice belongs to one provider and bills whole barrels of that
//! provider, one line per barrel. Lines are only ever created by the
//! [`crate::InvoiceLineFactory`] and are never edited afterwards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{
    BarrelId, CoreError, InvoiceId, InvoiceLineId, Money, MoneyError, ProviderId, UnitPrice,
};

use crate::error::BillingError;

/// Maximum length of an invoice number
pub const INVOICE_NO_MAX_CHARS: usize = 64;

/// Maximum length of a line description
pub const DESCRIPTION_MAX_CHARS: usize = 255;

/// An invoice issued to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: InvoiceId,
    /// Invoice number, unique across all invoices
    pub invoice_no: String,
    /// Provider being billed
    pub provider_id: ProviderId,
    /// Issue date
    pub issued_on: NaiveDate,
}

impl Invoice {
    /// Creates a validated invoice with a fresh identifier
    pub fn new(request: NewInvoice) -> Result<Self, BillingError> {
        CoreError::check_text("invoice_no", &request.invoice_no, INVOICE_NO_MAX_CHARS)?;

        Ok(Self {
            id: InvoiceId::new_v7(),
            invoice_no: request.invoice_no,
            provider_id: request.provider_id,
            issued_on: request.issued_on,
        })
    }
}

impl fmt::Display for Invoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.invoice_no)
    }
}

/// Data for issuing an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoice {
    pub invoice_no: String,
    pub provider_id: ProviderId,
    pub issued_on: NaiveDate,
}

/// One barrel's full contents billed on an invoice at one unit price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    /// Line identifier
    pub id: InvoiceLineId,
    /// Owning invoice
    pub invoice_id: InvoiceId,
    /// Billed barrel, referenced by id only
    pub barrel_id: BarrelId,
    /// Liters billed
    pub liters: i64,
    /// Free-text description
    pub description: String,
    /// Price per liter
    pub unit_price: UnitPrice,
}

impl InvoiceLine {
    pub(crate) fn new(
        invoice_id: InvoiceId,
        barrel_id: BarrelId,
        liters: i64,
        unit_price: UnitPrice,
        description: String,
    ) -> Self {
        Self {
            id: InvoiceLineId::new_v7(),
            invoice_id,
            barrel_id,
            liters,
            description,
            unit_price,
        }
    }

    /// Line amount: liters times unit price
    pub fn amount(&self) -> Result<Money, MoneyError> {
        self.unit_price.times_liters(self.liters)
    }
}

impl fmt::Display for InvoiceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {} ({} L @ {})", self.id, self.liters, self.unit_price)
    }
}

/// Sum of `liters * unit_price` over the given lines
pub fn invoice_total(lines: &[InvoiceLine]) -> Result<Money, MoneyError> {
    lines.iter().try_fold(Money::zero(), |total, line| {
        total.checked_add(&line.amount()?)
    })
}

/// An invoice together with its computed total
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceSummary {
    pub invoice: Invoice,
    pub total_amount: Money,
}

impl InvoiceSummary {
    /// Builds the summary from the invoice's lines
    pub fn from_lines(invoice: Invoice, lines: &[InvoiceLine]) -> Result<Self, BillingError> {
        let total_amount = invoice_total(lines).map_err(BillingError::Calculation)?;
        Ok(Self { invoice, total_amount })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(liters: i64, price: rust_decimal::Decimal) -> InvoiceLine {
        InvoiceLine::new(
            InvoiceId::new(),
            BarrelId::new(),
            liters,
            UnitPrice::new(price).unwrap(),
            "batch".to_string(),
        )
    }

    #[test]
    fn test_blank_invoice_no_rejected() {
        let result = Invoice::new(NewInvoice {
            invoice_no: String::new(),
            provider_id: ProviderId::new(),
            issued_on: NaiveDate::from_ymd_opt(2024, 11, 5).unwrap(),
        });
        assert!(matches!(result, Err(BillingError::Validation(_))));
    }

    #[test]
    fn test_total_of_no_lines_is_zero() {
        assert!(invoice_total(&[]).unwrap().is_zero());
    }

    #[test]
    fn test_total_multiplies_liters_by_price() {
        let lines = vec![line(100, dec!(2.50)), line(50, dec!(3.00))];
        assert_eq!(invoice_total(&lines).unwrap().amount(), dec!(400.00));
    }

    #[test]
    fn test_line_display() {
        let l = line(100, dec!(2.5));
        assert!(l.to_string().ends_with("(100 L @ 2.50)"));
    }
}
