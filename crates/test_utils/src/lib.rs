//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! olive oil ledger test suite.
//!
//! # Modules
//!
//! - `fixtures`: Ready-made ids, dates and fake provider data
//! - `builders`: Builder patterns for providers, barrels, invoices and line requests
//! - `database`: PostgreSQL test container management
//! - `assertions`: Assertion helpers for billing results

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
