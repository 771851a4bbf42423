//! Unit tests for unit prices and amounts

use core_kernel::{Money, MoneyError, UnitPrice};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod unit_price {
    use super::*;

    #[test]
    fn test_accepts_one_cent() {
        let price = UnitPrice::new(dec!(0.01)).unwrap();
        assert_eq!(price.amount(), dec!(0.01));
    }

    #[test]
    fn test_rejects_negative() {
        let result = UnitPrice::new(dec!(-1.00));
        assert_eq!(result, Err(MoneyError::NonPositive(dec!(-1.00))));
    }

    #[test]
    fn test_rejects_sub_cent_precision() {
        let result = UnitPrice::new(dec!(2.505));
        assert!(matches!(result, Err(MoneyError::TooManyDecimals { max: 2, .. })));
    }

    #[test]
    fn test_rejects_more_than_ten_integer_digits() {
        let result = UnitPrice::new(dec!(10000000000.00));
        assert!(matches!(result, Err(MoneyError::TooManyDigits { max: 12, .. })));
    }

    #[test]
    fn test_accepts_largest_price() {
        assert!(UnitPrice::new(dec!(9999999999.99)).is_ok());
    }

    #[test]
    fn test_display_has_two_decimals() {
        assert_eq!(UnitPrice::new(dec!(3)).unwrap().to_string(), "3.00");
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: UnitPrice = serde_json::from_str("\"2.50\"").unwrap();
        assert_eq!(ok.amount(), dec!(2.50));

        let err: Result<UnitPrice, _> = serde_json::from_str("\"0\"");
        assert!(err.is_err());
    }

    #[test]
    fn test_times_liters() {
        let price = UnitPrice::new(dec!(3.00)).unwrap();
        assert_eq!(price.times_liters(50).unwrap(), Money::new(dec!(150)));
    }
}

mod amounts {
    use super::*;

    #[test]
    fn test_zero() {
        assert!(Money::zero().is_zero());
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_new_rounds_to_cents() {
        assert_eq!(Money::new(dec!(1.005)).amount(), dec!(1.00));
        assert_eq!(Money::new(dec!(1.015)).amount(), dec!(1.02));
    }

    #[test]
    fn test_sum_of_invoice_lines() {
        let a = UnitPrice::new(dec!(2.50)).unwrap().times_liters(100).unwrap();
        let b = UnitPrice::new(dec!(3.00)).unwrap().times_liters(50).unwrap();
        let total: Money = [a, b].into_iter().sum();
        assert_eq!(total.amount(), dec!(400.00));
    }

    #[test]
    fn test_checked_add_overflow() {
        let max = Money::new(Decimal::MAX.trunc());
        assert_eq!(max.checked_add(&max), Err(MoneyError::Overflow));
    }
}
