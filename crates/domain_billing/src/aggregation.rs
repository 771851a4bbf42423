//! Provider-level projections over barrel billing states
//!
//! These are read-only views recomputed on every call from
//! [`BarrelBillingState`] values, so they cannot drift from the lines.

use serde::Serialize;

use core_kernel::BarrelId;

use crate::billing_state::BarrelBillingState;
use crate::provider::Provider;

/// True if any of the barrels still has liters to bill
pub fn has_barrels_to_bill(states: &[BarrelBillingState]) -> bool {
    states.iter().any(|s| !s.is_fully_billed())
}

/// Total capacity minus total invoiced liters, clamped to the `i64` range
pub fn liters_to_bill(states: &[BarrelBillingState]) -> i64 {
    let remaining: i128 = states
        .iter()
        .map(|s| i128::from(s.capacity) - i128::from(s.billed_liters))
        .sum();
    i64::try_from(remaining).unwrap_or(if remaining > 0 { i64::MAX } else { i64::MIN })
}

/// Ids of the fully billed barrels, in input order
pub fn billed_barrel_ids(states: &[BarrelBillingState]) -> Vec<BarrelId> {
    states
        .iter()
        .filter(|s| s.is_fully_billed())
        .map(|s| s.barrel_id)
        .collect()
}

/// Ids of the barrels that still need billing, in input order
pub fn unbilled_barrel_ids(states: &[BarrelBillingState]) -> Vec<BarrelId> {
    states
        .iter()
        .filter(|s| !s.is_fully_billed())
        .map(|s| s.barrel_id)
        .collect()
}

/// Billing overview of one provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSummary {
    pub provider: Provider,
    pub has_barrels_to_bill: bool,
    pub liters_to_bill: i64,
    pub billed_barrels: Vec<BarrelId>,
    pub barrels_to_bill: Vec<BarrelId>,
}

impl ProviderSummary {
    /// Builds the summary; states of other providers' barrels are ignored
    pub fn from_states(provider: Provider, states: &[BarrelBillingState]) -> Self {
        let own: Vec<BarrelBillingState> = states
            .iter()
            .filter(|s| s.provider_id == provider.id)
            .copied()
            .collect();

        Self {
            has_barrels_to_bill: has_barrels_to_bill(&own),
            liters_to_bill: liters_to_bill(&own),
            billed_barrels: billed_barrel_ids(&own),
            barrels_to_bill: unbilled_barrel_ids(&own),
            provider,
        }
    }
}
