//! Conversion between on-chain base units (wei) and the display unit (ether).
//!
//! Every monetary value crosses the provider boundary in base units. Values are
//! converted exactly once, when rendered or when parsed from user input.

use alloy::primitives::U256;
use thiserror::Error;

pub const ETHER_DECIMALS: usize = 18;
const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid amount `{0}`")]
    Invalid(String),
    #[error("amount `{0}` has more than {ETHER_DECIMALS} decimal places")]
    TooPrecise(String),
    #[error("amount `{0}` does not fit in 256 bits")]
    Overflow(String),
}

pub fn wei_per_ether() -> U256 {
    U256::from(WEI_PER_ETHER)
}

/// Renders a base-unit amount in display units, e.g. `1500000000000000000` as
/// `1.5`. Trailing fractional zeros are dropped; the result is exact.
pub fn format_ether(wei: U256) -> String {
    let unit = wei_per_ether();
    let whole = wei / unit;
    let fractional = wei % unit;
    if fractional.is_zero() {
        return whole.to_string();
    }
    let digits = fractional.to_string();
    let padded = format!("{}{}", "0".repeat(ETHER_DECIMALS - digits.len()), digits);
    format!("{}.{}", whole, padded.trim_end_matches('0'))
}

/// Parses a display-unit amount typed by the user into base units.
pub fn parse_ether(input: &str) -> Result<U256, UnitsError> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(UnitsError::Empty);
    }
    let (whole, fractional) = match raw.split_once('.') {
        Some((whole, fractional)) => (whole, fractional),
        None => (raw, ""),
    };
    let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fractional.is_empty())
        || !is_digits(whole)
        || !is_digits(fractional)
    {
        return Err(UnitsError::Invalid(raw.to_owned()));
    }
    if fractional.len() > ETHER_DECIMALS {
        return Err(UnitsError::TooPrecise(raw.to_owned()));
    }

    let mut digits = String::with_capacity(whole.len() + ETHER_DECIMALS);
    digits.push_str(whole);
    digits.push_str(fractional);
    digits.push_str(&"0".repeat(ETHER_DECIMALS - fractional.len()));
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    digits
        .parse::<U256>()
        .map_err(|_| UnitsError::Overflow(raw.to_owned()))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn format_ether__renders_whole_and_fractional_amounts() {
        assert_eq!(format_ether(U256::ZERO), "0");
        assert_eq!(format_ether(wei_per_ether()), "1");
        assert_eq!(
            format_ether(U256::from(1_500_000_000_000_000_000u64)),
            "1.5"
        );
        assert_eq!(format_ether(U256::from(1u64)), "0.000000000000000001");
    }

    #[test]
    fn parse_ether__converts_display_amount_to_base_units() {
        // given
        let input = "1.5";

        // when
        let wei = parse_ether(input).unwrap();

        // then
        assert_eq!(wei, U256::from(1_500_000_000_000_000_000u64));
    }

    #[test]
    fn parse_ether__accepts_bare_fraction_and_whole_numbers() {
        assert_eq!(parse_ether(".5").unwrap(), U256::from(500_000_000_000_000_000u64));
        assert_eq!(parse_ether("2").unwrap(), U256::from(2_000_000_000_000_000_000u64));
        assert_eq!(parse_ether("0").unwrap(), U256::ZERO);
        assert_eq!(parse_ether(" 3. ").unwrap(), U256::from(3_000_000_000_000_000_000u64));
    }

    #[test]
    fn parse_ether__rejects_malformed_input() {
        assert_eq!(parse_ether(""), Err(UnitsError::Empty));
        assert_eq!(parse_ether("."), Err(UnitsError::Invalid(".".into())));
        assert_eq!(parse_ether("-1"), Err(UnitsError::Invalid("-1".into())));
        assert_eq!(parse_ether("1.2.3"), Err(UnitsError::Invalid("1.2.3".into())));
        assert_eq!(parse_ether("abc"), Err(UnitsError::Invalid("abc".into())));
        assert_eq!(
            parse_ether("0.0000000000000000001"),
            Err(UnitsError::TooPrecise("0.0000000000000000001".into()))
        );
    }

    proptest! {
        #[test]
        fn format_ether__is_exact_division_by_ten_pow_eighteen(
            hi in any::<u128>(),
            lo in any::<u128>(),
        ) {
            let wei = (U256::from(hi) << 128usize) | U256::from(lo);
            let rendered = format_ether(wei);

            let (whole, fractional) = rendered
                .split_once('.')
                .unwrap_or((rendered.as_str(), ""));
            prop_assert_eq!(whole.parse::<U256>().unwrap(), wei / wei_per_ether());
            prop_assert!(!fractional.ends_with('0'));

            let padded = format!("{:0<18}", fractional);
            let expected_fraction = wei % wei_per_ether();
            let actual_fraction = if padded.trim_start_matches('0').is_empty() {
                U256::ZERO
            } else {
                padded.trim_start_matches('0').parse::<U256>().unwrap()
            };
            prop_assert_eq!(actual_fraction, expected_fraction);
        }

        #[test]
        fn parse_ether__inverts_format_ether(raw in any::<u128>()) {
            let wei = U256::from(raw);
            prop_assert_eq!(parse_ether(&format_ether(wei)).unwrap(), wei);
        }
    }
}
