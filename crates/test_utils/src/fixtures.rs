//! Pre-built Test Fixtures
//!
//! Deterministic ids and dates for assertions, and fake provider data for
//! tests that only need something plausible.

use chrono::NaiveDate;
use fake::faker::address::en::{CityName, StreetName};
use fake::faker::company::en::CompanyName;
use fake::Fake;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use core_kernel::{BarrelId, InvoiceId, ProviderId};

/// Issue date shared by the standard invoices
pub static ISSUE_DATE: Lazy<NaiveDate> =
    Lazy::new(|| NaiveDate::from_ymd_opt(2024, 11, 15).expect("valid date"));

/// Fixture for provider data
pub struct ProviderFixtures;

impl ProviderFixtures {
    /// A random company name
    pub fn name() -> String {
        CompanyName().fake()
    }

    /// A random street address
    pub fn address() -> String {
        let street: String = StreetName().fake();
        let city: String = CityName().fake();
        format!("{} {}, {}", (1..200u32).fake::<u32>(), street, city)
    }

    /// A random Spanish-style tax id (letter followed by eight digits)
    pub fn tax_id() -> String {
        format!("B{:08}", (0..100_000_000u32).fake::<u32>())
    }
}

/// Fixture for prices and quantities
pub struct PriceFixtures;

impl PriceFixtures {
    /// Standard unit price per liter
    pub fn unit_price() -> Decimal {
        dec!(2.50)
    }

    /// Capacity of a standard barrel
    pub fn barrel_liters() -> i64 {
        100
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Standard issue date (Nov 15, 2024)
    pub fn issue_date() -> NaiveDate {
        *ISSUE_DATE
    }

    /// Start of the 2024 harvest billing window
    pub fn season_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()
    }

    /// End of the 2024 harvest billing window
    pub fn season_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    /// Creates a deterministic provider ID for testing
    pub fn provider_id() -> ProviderId {
        ProviderId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap())
    }

    /// Creates a deterministic barrel ID for testing
    pub fn barrel_id() -> BarrelId {
        BarrelId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440002").unwrap())
    }

    /// Creates a deterministic invoice ID for testing
    pub fn invoice_id() -> InvoiceId {
        InvoiceId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440003").unwrap())
    }
}
