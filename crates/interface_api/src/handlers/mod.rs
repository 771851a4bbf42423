//! Request handlers
//!
//! Handlers are generic over the ledger store so the same router serves
//! PostgreSQL in production and the in-memory store in tests.

pub mod health;
pub mod providers;
pub mod barrels;
pub mod invoices;
