use bes_core::{convert, convert_value, ParamValue, Quantity, RSI_TO_RIP_FACTOR};
use proptest::prelude::*;

proptest! {
    #[test]
    fn reciprocal_factor_restores_value(value in -1.0e6f64..1.0e6, factor in 1.0e-3f64..1.0e3) {
        let forward = convert(value, factor);
        let back = convert(forward, 1.0 / factor);
        let tolerance = 1e-6 * value.abs().max(1.0);
        prop_assert!((back - value).abs() <= tolerance, "{} -> {} -> {}", value, forward, back);
    }

    #[test]
    fn param_values_convert_like_raw_numbers(value in 0.0f64..50.0) {
        let converted = convert_value(&ParamValue::Number(value), RSI_TO_RIP_FACTOR).unwrap();
        prop_assert_eq!(converted, convert(value, RSI_TO_RIP_FACTOR));
    }
}

#[test]
fn si_quantities_pass_through() {
    let infil = ParamValue::Number(0.0003);
    assert_eq!(Quantity::AirflowPerArea.to_engine(&infil).unwrap(), 0.0003);
    assert_eq!(Quantity::Dimensionless.to_engine(&ParamValue::Number(1.5)).unwrap(), 1.5);
}
