//! Repository implementations for the ledger tables
//!
//! Repositories hold the SQL and the row types; mapping rows into domain
//! values happens through `From`/`TryFrom` impls next to each row type.
//!
//! Queries are built at runtime with `sqlx::query_as` and `FromRow` rows,
//! so the crate compiles without a live database.

pub mod provider;
pub mod barrel;
pub mod invoice;

pub use provider::{ProviderRepository, ProviderRow};
pub use barrel::{BarrelRepository, BarrelRow, BarrelStateRow};
pub use invoice::{InvoiceRepository, InvoiceRow, InvoiceLineRow};
