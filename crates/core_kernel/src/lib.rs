//! Core Kernel - Foundational types shared by the olive oil ledger crates
//!
//! This crate provides the building blocks used across the workspace:
//! - Strongly-typed identifiers for providers, barrels, invoices and lines
//! - Unit prices and amounts with exact decimal arithmetic
//! - The port error type and marker traits implemented by storage adapters

pub mod money;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, UnitPrice, MoneyError, PRICE_DECIMAL_PLACES, PRICE_MAX_DIGITS};
pub use identifiers::{ProviderId, BarrelId, InvoiceId, InvoiceLineId};
pub use error::CoreError;
pub use ports::{
    PortError, DomainPort, AdapterHealth, HealthCheckResult, HealthCheckable,
};
