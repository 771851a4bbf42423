//! Domain Adapters
//!
//! Implementations of the billing domain's ports on top of the PostgreSQL
//! repositories.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresLedgerStore;
//! use domain_billing::BillingService;
//!
//! let store = PostgresLedgerStore::new(pool);
//! let service = BillingService::new(store);
//! ```

pub mod ledger;

pub use ledger::{PostgresLedgerStore, PgLedgerTransaction};
