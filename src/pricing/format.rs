use rust_decimal::{Decimal, RoundingStrategy};

/// Digits after the decimal point on every displayed price.
pub const PRICE_DECIMALS: u32 = 3;

/// Render a price the way the board shows it: three fractional digits and
/// `,` thousands grouping, e.g. `1234.5` -> `"1,234.500"`. Halves round away
/// from zero (`27.5625` -> `"27.563"`) and negative zero keeps its sign.
pub fn format_price(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞".to_string() } else { "-∞".to_string() };
    }

    let fixed = fixed_decimals(value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut out = String::with_capacity(fixed.len() + fixed.len() / 3 + 1);
    if value.is_sign_negative() {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    out.push('.');
    out.push_str(frac_part);
    out
}

/// Price plus the currency label, as written to a display field.
pub fn format_with_currency(value: f64, currency: &str) -> String {
    if currency.is_empty() {
        format_price(value)
    } else {
        format!("{} {}", format_price(value), currency)
    }
}

/// Rounds on the exact binary value of `magnitude`, so `1.0005` (stored just
/// below the half) stays `1.000` while a true half such as `0.0625` goes up.
fn fixed_decimals(magnitude: f64) -> String {
    match Decimal::from_f64_retain(magnitude) {
        Some(exact) => {
            let mut rounded =
                exact.round_dp_with_strategy(PRICE_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
            rounded.rescale(PRICE_DECIMALS);
            rounded.to_string()
        }
        // Beyond Decimal's range every f64 is an integer, no rounding to do.
        None => format!("{:.*}", PRICE_DECIMALS as usize, magnitude),
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_grouping_and_padding() {
        assert_eq!(format_price(1234.5), "1,234.500");
        assert_eq!(format_price(36.0), "36.000");
        assert_eq!(format_price(0.0), "0.000");
        assert_eq!(format_price(999.9994), "999.999");
        assert_eq!(format_price(999.9996), "1,000.000");
        assert_eq!(format_price(1_234_567.891), "1,234,567.891");
        assert_eq!(format_price(100_000.0), "100,000.000");
    }

    #[test]
    fn test_negative_values() {
        assert_eq!(format_price(-1234.5), "-1,234.500");
        assert_eq!(format_price(-0.25), "-0.250");
        assert_eq!(format_price(-0.0), "-0.000");
        assert_eq!(format_price(-0.0001), "-0.000");
        assert_eq!(format_price(-27.5625), "-27.563");
    }

    #[test]
    fn test_rounds_to_three_places() {
        assert_eq!(format_price(37.0 * 22.0 / 24.0), "33.917");
        assert_eq!(format_price(31.5), "31.500");
        assert_eq!(format_price(0.0625), "0.063");
        assert_eq!(format_price(1.0625), "1.063");
        assert_eq!(format_price(1234.5625), "1,234.563");
        assert_eq!(format_price(1.0005), "1.000");
    }

    #[test]
    fn test_derived_eighteen_karat_half_rounds_up() {
        use crate::pricing::{compute::gold_prices, AdjustmentSet};

        let prices = gold_prices(36.75, &AdjustmentSet::default());
        assert_eq!(prices.gold18, 27.5625);
        assert_eq!(format_price(prices.gold18), "27.563");
    }

    #[test]
    fn test_beyond_decimal_range() {
        assert_eq!(format_price(1.0e30), "1,000,000,000,000,000,019,884,624,838,656.000");
    }

    #[test]
    fn test_non_finite() {
        assert_eq!(format_price(f64::NAN), "NaN");
        assert_eq!(format_price(f64::INFINITY), "∞");
        assert_eq!(format_price(f64::NEG_INFINITY), "-∞");
    }

    #[test]
    fn test_currency_suffix() {
        assert_eq!(format_with_currency(36.0, "KWD"), "36.000 KWD");
        assert_eq!(format_with_currency(36.0, ""), "36.000");
    }

    proptest! {
        #[test]
        fn prop_always_three_decimals_and_grouped(value in -1.0e9f64..1.0e9f64) {
            let text = format_price(value);
            let unsigned = text.strip_prefix('-').unwrap_or(&text);
            let (int_part, frac_part) = unsigned.split_once('.').unwrap();
            prop_assert_eq!(frac_part.len(), 3);
            prop_assert!(frac_part.chars().all(|c| c.is_ascii_digit()));

            let groups: Vec<&str> = int_part.split(',').collect();
            prop_assert!(!groups[0].is_empty() && groups[0].len() <= 3);
            for group in &groups[1..] {
                prop_assert_eq!(group.len(), 3);
            }

            let parsed: f64 = text.replace(',', "").parse().unwrap();
            prop_assert!((parsed - value).abs() <= 0.0005 + value.abs() * 1e-12);
        }

        #[test]
        fn prop_sixteenths_round_half_away_from_zero(sixteenths in -16_000_000i64..16_000_000i64) {
            // n/16 is exact in binary and has four decimals, the last one 0 or 5.
            let value = sixteenths as f64 / 16.0;
            let ten_thousandths = sixteenths.abs() * 625;
            let mut thousandths = ten_thousandths / 10;
            if ten_thousandths % 10 >= 5 {
                thousandths += 1;
            }
            let sign = if value.is_sign_negative() { "-" } else { "" };
            let expected = format!(
                "{}{}.{:03}",
                sign,
                group_thousands(&(thousandths / 1000).to_string()),
                thousandths % 1000
            );
            prop_assert_eq!(format_price(value), expected);
        }
    }
}
