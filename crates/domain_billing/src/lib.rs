//! Billing Domain - Olive Oil Provider Invoicing
//!
//! Providers deliver numbered barrels of olive oil; invoices bill those
//! barrels back to the provider that delivered them. This crate holds the
//! billing rules and the views derived from them.
//!
//! # Billing Rules
//!
//! An invoice line always bills one whole barrel:
//! - Liters must be positive and equal to the barrel's capacity
//! - The unit price is positive with at most two decimals
//! - The barrel must belong to the invoice's provider
//! - A barrel that is already fully billed cannot be billed again
//!
//! Whether a barrel is billed is never stored. It is derived from the sum
//! of the liters on its invoice lines, so it cannot disagree with them.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{AddLineRequest, BillingService, InMemoryLedgerStore};
//!
//! let service = BillingService::new(InMemoryLedgerStore::new());
//!
//! let line = service.add_line(AddLineRequest {
//!     invoice_id,
//!     barrel_id,
//!     liters: 100,
//!     unit_price: dec!(4.20),
//!     description: "Early harvest EVOO".to_string(),
//! }).await?;
//! ```

pub mod error;
pub mod provider;
pub mod barrel;
pub mod invoice;
pub mod billing_state;
pub mod aggregation;
pub mod ports;
pub mod line_factory;
pub mod service;
pub mod memory;

pub use error::{BillingError, RejectionKind};
pub use provider::{Provider, NewProvider, ProviderUpdate};
pub use barrel::{Barrel, NewBarrel, BarrelUpdate, OilType, BARREL_MAX_LITERS};
pub use invoice::{Invoice, NewInvoice, InvoiceLine, InvoiceSummary, invoice_total};
pub use billing_state::{BarrelBillingState, BarrelStatus};
pub use aggregation::ProviderSummary;
pub use ports::{InvoiceQuery, LedgerStore, LedgerTransaction};
pub use line_factory::{AddLineRequest, InvoiceLineFactory};
pub use service::{BarrelFilter, BillingService};
pub use memory::{InMemoryLedgerStore, InMemoryTransaction};
