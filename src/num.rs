//! Conversions between integer subunits and display decimals.
//!
//! Amounts arrive either as decimal digit strings (explorer API) or as
//! `0x`-prefixed hex quantities (JSON-RPC). Both are parsed into [`U256`]
//! and divided by `10^exponent` exactly with [`fastnum`]; rounding to `f64`
//! happens only as the very last step, for display. Any sum or product
//! computed from the returned `f64` values inherits that rounding.

use alloy::primitives::U256;
use fastnum::{
    UD256, bint,
    decimal::{Context, RoundingMode, UnsignedDecimal},
};

/// Decimals of the native unit (1 QUAI = 10^18 wei).
pub const NATIVE_DECIMALS: u8 = 18;

/// Decimals of a gwei relative to wei.
pub const GWEI_DECIMALS: u8 = 9;

/// Fixed-point to decimal converter.
#[derive(Clone, Copy, Debug, Default)]
pub struct Converter {
    decimals: i32,
}

impl Converter {
    pub fn new(decimals: u8) -> Self {
        Self {
            decimals: decimals as i32,
        }
    }

    pub fn decimals(&self) -> u8 {
        self.decimals as u8
    }

    /// Exact decimal value of `value / 10^decimals`.
    pub fn from_unsigned(&self, value: U256) -> UD256 {
        let unscaled = bint::UInt::<4>::from_le_slice(value.as_le_slice())
            .expect("Converter: U256 -> UInt::<4>");
        UnsignedDecimal::<4>::from_parts(
            unscaled,
            -self.decimals,
            Context::default().with_rounding_mode(RoundingMode::Floor),
        )
    }

    /// Display value of `value / 10^decimals`, rounded to the nearest `f64`.
    pub fn to_f64(&self, value: U256) -> f64 {
        self.from_unsigned(value)
            .to_string()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or_default()
    }
}

/// Parses a subunit amount given as decimal digits or as a `0x` hex quantity.
///
/// Returns `None` for empty, signed, fractional or out-of-range input.
pub fn parse_subunits(raw: &str) -> Option<U256> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some("") => None,
        Some(hex) => U256::from_str_radix(hex, 16).ok(),
        None => U256::from_str_radix(raw, 10).ok(),
    }
}

/// Converts a raw subunit amount into a display decimal.
///
/// Missing, empty or non-numeric input yields `0.0`; this never panics.
/// The division is exact, the final value is rounded to `f64`.
pub fn subunit_to_decimal(raw: Option<&str>, exponent: u8) -> f64 {
    raw.and_then(parse_subunits)
        .map(|value| Converter::new(exponent).to_f64(value))
        .unwrap_or_default()
}

/// Native display units of a wei amount.
pub fn wei_to_native(value: U256) -> f64 {
    Converter::new(NATIVE_DECIMALS).to_f64(value)
}

/// Gwei display units of a wei amount.
pub fn wei_to_gwei(value: U256) -> f64 {
    Converter::new(GWEI_DECIMALS).to_f64(value)
}

/// Parses a hex (or decimal) quantity that must fit in `u64`, e.g. a block number.
pub fn hex_to_u64(raw: &str) -> Option<u64> {
    parse_subunits(raw).and_then(|v| u64::try_from(v).ok())
}

/// Parses a fiat amount reported by the explorer, `0.0` when absent or malformed.
pub fn parse_fiat(raw: Option<&str>) -> f64 {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use fastnum::udec256;

    use super::*;

    #[test]
    fn test_numeric_converter_from_unsigned() {
        assert_eq!(
            Converter::new(0).from_unsigned(U256::from(1234567890)),
            udec256!(1234567890)
        );
        assert_eq!(
            Converter::new(6).from_unsigned(U256::from(1234567890)),
            udec256!(1234.56789)
        );
        assert_eq!(
            Converter::new(12).from_unsigned(U256::from(1234567890)),
            udec256!(0.00123456789)
        );
    }

    #[test]
    fn test_numeric_converter_to_f64() {
        assert_eq!(Converter::new(6).to_f64(U256::from(1234567890)), 1234.56789);
        assert_eq!(Converter::new(18).to_f64(U256::ZERO), 0.0);
        assert_eq!(
            Converter::new(18).to_f64(U256::from(1_500_000_000_000_000_000u128)),
            1.5
        );
    }

    #[test]
    fn test_parse_subunits() {
        assert_eq!(parse_subunits("1000"), Some(U256::from(1000)));
        assert_eq!(parse_subunits("0xde0b6b3a7640000"), Some(U256::from(10u64.pow(18))));
        assert_eq!(parse_subunits(" 42 "), Some(U256::from(42)));
        assert_eq!(parse_subunits(""), None);
        assert_eq!(parse_subunits("0x"), None);
        assert_eq!(parse_subunits("-5"), None);
        assert_eq!(parse_subunits("1.5"), None);
        assert_eq!(parse_subunits("not-a-number"), None);
        // 2^256 does not fit
        assert_eq!(
            parse_subunits(
                "115792089237316195423570985008687907853269984665640564039457584007913129639936"
            ),
            None
        );
    }

    #[test]
    fn test_subunit_to_decimal_empty_inputs() {
        assert_eq!(subunit_to_decimal(Some("0"), 18), 0.0);
        assert_eq!(subunit_to_decimal(Some(""), 18), 0.0);
        assert_eq!(subunit_to_decimal(None, 18), 0.0);
        assert_eq!(subunit_to_decimal(Some("abc"), 18), 0.0);
    }

    #[test]
    fn test_subunit_to_decimal_values() {
        assert_eq!(subunit_to_decimal(Some("1000000000000000000"), 18), 1.0);
        assert_eq!(subunit_to_decimal(Some("0xde0b6b3a7640000"), 18), 1.0);
        assert_eq!(subunit_to_decimal(Some("5"), 0), 5.0);
        assert_eq!(subunit_to_decimal(Some("2500000"), 6), 2.5);
        // Whole part far beyond 2^53 still converts to the nearest double
        let huge = subunit_to_decimal(Some("123456789012345678901234567890000000000000000000"), 18);
        assert!((huge - 1.2345678901234568e29).abs() / huge < 1e-15);
    }

    #[test]
    fn test_subunit_to_decimal_scales_back() {
        let cases = [
            ("1", 18u8),
            ("987654321", 9),
            ("31415926535897932384626", 18),
            ("7000000000000000000000000", 24),
            ("12", 2),
        ];
        for (raw, exp) in cases {
            let restored = subunit_to_decimal(Some(raw), exp) * 10f64.powi(exp as i32);
            let expected = raw.parse::<f64>().unwrap();
            assert!(
                (restored - expected).abs() <= expected * 1e-12,
                "{raw} at 10^{exp}: {restored} != {expected}"
            );
        }
    }

    #[test]
    fn test_gwei_and_block_numbers() {
        assert_eq!(wei_to_gwei(U256::from(2_000_000_000u64)), 2.0);
        assert_eq!(wei_to_native(U256::from(10u64.pow(17))), 0.1);
        assert_eq!(hex_to_u64("0x10"), Some(16));
        assert_eq!(hex_to_u64("0xffffffffffffffffff"), None);
    }

    #[test]
    fn test_parse_fiat() {
        assert_eq!(parse_fiat(Some("12.5")), 12.5);
        assert_eq!(parse_fiat(Some("not-a-number")), 0.0);
        assert_eq!(parse_fiat(Some("NaN")), 0.0);
        assert_eq!(parse_fiat(Some("inf")), 0.0);
        assert_eq!(parse_fiat(None), 0.0);
    }
}
