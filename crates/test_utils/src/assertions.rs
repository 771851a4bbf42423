//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for billing results that give
//! more meaningful error messages than standard assertions.

use std::fmt::Debug;

use rust_decimal::Decimal;

use core_kernel::Money;
use domain_billing::{BillingError, ProviderSummary, RejectionKind};

/// Asserts that an `add_line` result is the given business rejection
///
/// # Panics
///
/// Panics if the result succeeded or failed for another reason
pub fn assert_rejected<T: Debug>(result: Result<T, BillingError>, expected: RejectionKind) {
    match result {
        Ok(value) => panic!("Expected rejection {}, got success: {:?}", expected.code(), value),
        Err(error) => assert_eq!(
            error.rejection_kind(),
            Some(expected),
            "Expected rejection {}, got error: {}",
            expected.code(),
            error
        ),
    }
}

/// Asserts that a money amount equals the expected decimal, ignoring scale
pub fn assert_amount_eq(actual: &Money, expected: Decimal) {
    assert_eq!(
        actual.amount().normalize(),
        expected.normalize(),
        "Amount mismatch: actual={}, expected={}",
        actual.amount(),
        expected
    );
}

/// Asserts the derived billing figures of a provider
pub fn assert_provider_open(summary: &ProviderSummary, liters_to_bill: i64) {
    assert_eq!(
        summary.liters_to_bill, liters_to_bill,
        "Provider {} liters to bill",
        summary.provider.id
    );
    assert_eq!(
        summary.has_barrels_to_bill,
        liters_to_bill > 0,
        "Provider {} has_barrels_to_bill disagrees with liters_to_bill={}",
        summary.provider.id,
        liters_to_bill
    );
}
