//! Derived billing state of a barrel
//!
//! A barrel is fully billed when the liters on its invoice lines add up to
//! its capacity. The state is always recomputed from line data; nothing
//! stores it.

use serde::{Deserialize, Serialize};

use core_kernel::{BarrelId, ProviderId};

use crate::barrel::Barrel;
use crate::invoice::InvoiceLine;

/// Billed liters of one barrel against its capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrelBillingState {
    pub barrel_id: BarrelId,
    pub provider_id: ProviderId,
    pub capacity: i64,
    pub billed_liters: i64,
}

impl BarrelBillingState {
    /// State of `barrel` given the sum of liters already invoiced for it
    pub fn new(barrel: &Barrel, billed_liters: i64) -> Self {
        Self {
            barrel_id: barrel.id,
            provider_id: barrel.provider_id,
            capacity: barrel.liters,
            billed_liters,
        }
    }

    /// State of `barrel` computed from a set of lines; lines of other barrels are ignored
    pub fn from_lines<'a>(barrel: &Barrel, lines: impl IntoIterator<Item = &'a InvoiceLine>) -> Self {
        let billed = lines
            .into_iter()
            .filter(|line| line.barrel_id == barrel.id)
            .map(|line| line.liters)
            .sum();
        Self::new(barrel, billed)
    }

    /// True once the invoiced liters reach the capacity
    pub fn is_fully_billed(&self) -> bool {
        self.billed_liters >= self.capacity
    }

    /// Liters not yet invoiced, never negative
    pub fn remaining_liters(&self) -> i64 {
        (self.capacity - self.billed_liters).max(0)
    }
}

/// A barrel together with its derived billing state
#[derive(Debug, Clone, Serialize)]
pub struct BarrelStatus {
    pub barrel: Barrel,
    pub state: BarrelBillingState,
}

impl BarrelStatus {
    pub fn billed(&self) -> bool {
        self.state.is_fully_billed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrel::{NewBarrel, OilType};
    use core_kernel::{InvoiceId, UnitPrice};
    use rust_decimal_macros::dec;

    fn barrel(liters: i64) -> Barrel {
        Barrel::new(NewBarrel {
            provider_id: ProviderId::new(),
            number: "7".to_string(),
            oil_type: OilType::ExtraVirgin,
            liters,
        })
        .unwrap()
    }

    #[test]
    fn test_no_lines_is_unbilled() {
        let b = barrel(100);
        let state = BarrelBillingState::from_lines(&b, &[]);
        assert!(!state.is_fully_billed());
        assert_eq!(state.remaining_liters(), 100);
    }

    #[test]
    fn test_full_line_bills_barrel() {
        let b = barrel(100);
        let other = barrel(30);
        let lines = vec![
            InvoiceLine::new(InvoiceId::new(), b.id, 100, UnitPrice::new(dec!(1)).unwrap(), "a".into()),
            InvoiceLine::new(InvoiceId::new(), other.id, 30, UnitPrice::new(dec!(1)).unwrap(), "b".into()),
        ];

        let state = BarrelBillingState::from_lines(&b, &lines);
        assert_eq!(state.billed_liters, 100);
        assert!(state.is_fully_billed());
        assert_eq!(state.remaining_liters(), 0);
    }

    #[test]
    fn test_remaining_is_floored_at_zero() {
        let b = barrel(10);
        let state = BarrelBillingState::new(&b, 15);
        assert!(state.is_fully_billed());
        assert_eq!(state.remaining_liters(), 0);
    }
}
