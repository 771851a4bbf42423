//! Barrels delivered by providers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{BarrelId, CoreError, ProviderId};

use crate::error::BillingError;

/// Maximum length of a barrel number
pub const BARREL_NUMBER_MAX_CHARS: usize = 64;

/// Largest capacity a barrel may be registered with
pub const BARREL_MAX_LITERS: i64 = 1_000_000;

/// Grade of the oil held in a barrel
///
/// Serialized with the short codes used on delivery notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OilType {
    #[default]
    #[serde(rename = "EVOO")]
    ExtraVirgin,
    #[serde(rename = "EVO")]
    Virgin,
    #[serde(rename = "ROO")]
    Refined,
    #[serde(rename = "OPO")]
    Pomace,
}

impl OilType {
    /// All oil types, in display order
    pub const ALL: [OilType; 4] = [
        OilType::ExtraVirgin,
        OilType::Virgin,
        OilType::Refined,
        OilType::Pomace,
    ];

    /// Short code stored with the barrel
    pub fn code(&self) -> &'static str {
        match self {
            OilType::ExtraVirgin => "EVOO",
            OilType::Virgin => "EVO",
            OilType::Refined => "ROO",
            OilType::Pomace => "OPO",
        }
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            OilType::ExtraVirgin => "Extra Virgin Olive Oil",
            OilType::Virgin => "Virgin Olive Oil",
            OilType::Refined => "Refined Olive Oil",
            OilType::Pomace => "Olive Pomace Oil",
        }
    }
}

impl fmt::Display for OilType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for OilType {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OilType::ALL
            .into_iter()
            .find(|t| t.code() == s)
            .ok_or_else(|| BillingError::Validation(format!("unknown oil type '{}'", s)))
    }
}

/// A fixed-capacity unit of oil owned by one provider
///
/// `liters` is the capacity and never changes after creation. Whether the
/// barrel is billed is not stored here; see [`crate::BarrelBillingState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barrel {
    pub id: BarrelId,
    pub provider_id: ProviderId,
    pub number: String,
    pub oil_type: OilType,
    pub liters: i64,
}

impl Barrel {
    /// Creates a validated barrel with a fresh identifier
    pub fn new(request: NewBarrel) -> Result<Self, BillingError> {
        if !(1..=BARREL_MAX_LITERS).contains(&request.liters) {
            return Err(BillingError::Validation(format!(
                "barrel liters must be between 1 and {}, got {}",
                BARREL_MAX_LITERS, request.liters
            )));
        }

        let barrel = Self {
            id: BarrelId::new_v7(),
            provider_id: request.provider_id,
            number: request.number,
            oil_type: request.oil_type,
            liters: request.liters,
        };
        barrel.validate()?;
        Ok(barrel)
    }

    /// Applies a partial update; capacity and owner are not updatable
    pub fn apply(&mut self, update: BarrelUpdate) -> Result<(), BillingError> {
        let mut updated = self.clone();
        if let Some(number) = update.number {
            updated.number = number;
        }
        if let Some(oil_type) = update.oil_type {
            updated.oil_type = oil_type;
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    fn validate(&self) -> Result<(), BillingError> {
        CoreError::check_text("number", &self.number, BARREL_NUMBER_MAX_CHARS)?;
        Ok(())
    }
}

impl fmt::Display for Barrel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Barrel {} ({})", self.number, self.oil_type)
    }
}

/// Data for registering a delivered barrel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBarrel {
    pub provider_id: ProviderId,
    pub number: String,
    #[serde(default)]
    pub oil_type: OilType,
    pub liters: i64,
}

/// Partial update of a barrel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BarrelUpdate {
    pub number: Option<String>,
    pub oil_type: Option<OilType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_barrel(liters: i64) -> NewBarrel {
        NewBarrel {
            provider_id: ProviderId::new(),
            number: "B-001".to_string(),
            oil_type: OilType::Virgin,
            liters,
        }
    }

    #[test]
    fn test_oil_type_codes_round_trip() {
        for oil_type in OilType::ALL {
            assert_eq!(oil_type.code().parse::<OilType>().unwrap(), oil_type);
        }
        assert!("XYZ".parse::<OilType>().is_err());
    }

    #[test]
    fn test_oil_type_serializes_as_code() {
        let json = serde_json::to_string(&OilType::Virgin).unwrap();
        assert_eq!(json, "\"EVO\"");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(Barrel::new(new_barrel(0)), Err(BillingError::Validation(_))));
    }

    #[test]
    fn test_capacity_upper_bound() {
        assert!(Barrel::new(new_barrel(BARREL_MAX_LITERS)).is_ok());
        assert!(matches!(
            Barrel::new(new_barrel(BARREL_MAX_LITERS + 1)),
            Err(BillingError::Validation(_))
        ));
        assert!(matches!(Barrel::new(new_barrel(i64::MAX)), Err(BillingError::Validation(_))));
    }

    #[test]
    fn test_display() {
        let barrel = Barrel::new(new_barrel(100)).unwrap();
        assert_eq!(barrel.to_string(), "Barrel B-001 (EVO)");
    }

    #[test]
    fn test_update_keeps_capacity() {
        let mut barrel = Barrel::new(new_barrel(100)).unwrap();
        barrel
            .apply(BarrelUpdate {
                number: Some("B-002".to_string()),
                oil_type: Some(OilType::Pomace),
            })
            .unwrap();

        assert_eq!(barrel.number, "B-002");
        assert_eq!(barrel.oil_type, OilType::Pomace);
        assert_eq!(barrel.liters, 100);
    }
}
