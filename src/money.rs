use crate::error::{BudgetEngineError, Result};
use crate::schema::Cadence;

/// Largest amount a user may enter: 999,999,999.99.
pub const MAX_AMOUNT_CENTS: i64 = 99_999_999_999;

/// Integer division rounding half away from zero. `denominator` must be positive.
pub fn div_round_half_away(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator {
        quotient + numerator.signum()
    } else {
        quotient
    }
}

/// Rounds to whole cents, half away from zero, saturating at the `i64` range.
pub fn round_cents(value: f64) -> i64 {
    let rounded = value.round();
    if rounded >= i64::MAX as f64 {
        i64::MAX
    } else if rounded <= i64::MIN as f64 {
        i64::MIN
    } else {
        rounded as i64
    }
}

/// (multiplier, divisor) that maps one occurrence of `cadence` onto a month.
fn monthly_ratio(cadence: Cadence) -> (i128, i128) {
    match cadence {
        Cadence::Weekly => (52, 12),
        Cadence::Fortnightly => (26, 12),
        Cadence::Monthly => (1, 1),
        Cadence::Quarterly => (1, 3),
        Cadence::Yearly => (1, 12),
    }
}

fn saturate(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Monthly equivalent of one occurrence, using fixed annualized divisors (52 weeks,
/// 26 fortnights, 4 quarters) so a quarterly or yearly item shows as a constant monthly
/// figure instead of a lump in a single month.
pub fn to_monthly_cents(amount_cents: i64, cadence: Cadence) -> i64 {
    let (multiplier, divisor) = monthly_ratio(cadence);
    saturate(div_round_half_away(amount_cents as i128 * multiplier, divisor))
}

/// Inverse of [`to_monthly_cents`] using the reciprocal ratio.
pub fn from_monthly_cents(monthly_cents: i64, cadence: Cadence) -> i64 {
    let (multiplier, divisor) = monthly_ratio(cadence);
    saturate(div_round_half_away(monthly_cents as i128 * divisor, multiplier))
}

/// Removes `,` separators from the whole part, requiring groups of three digits
/// after the first group.
fn strip_thousands_separators(whole: &str) -> Option<String> {
    if !whole.contains(',') {
        return Some(whole.to_string());
    }

    let mut groups = whole.split(',');
    let first = groups.next()?;
    if first.is_empty() || first.len() > 3 {
        return None;
    }

    let mut digits = first.to_string();
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        digits.push_str(group);
    }
    Some(digits)
}

/// Parses a user-entered amount into cents.
///
/// Accepts an optional sign, a leading `$`, thousands separators and parenthesized
/// negatives. Digits past the second decimal place round half away from zero.
/// Anything whose magnitude exceeds `max_cents` is rejected rather than truncated.
pub fn parse_amount_to_cents(text: &str, max_cents: i64) -> Result<i64> {
    let invalid = || BudgetEngineError::InvalidAmount(text.to_string());

    let mut s = text.trim();
    let mut negative = false;

    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        // Parentheses already carry the sign.
        negative = true;
        s = inner.trim();
    } else if let Some(rest) = s.strip_prefix('-') {
        negative = true;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }
    let s = s.strip_prefix('$').unwrap_or(s);

    let (grouped_whole, fraction) = s.split_once('.').unwrap_or((s, ""));
    let whole = strip_thousands_separators(grouped_whole).ok_or_else(invalid)?;
    let whole = whole.as_str();

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    // Anything longer than this cannot fit an i128 and is over any ceiling anyway.
    if whole.len() > 30 {
        return Err(BudgetEngineError::AmountExceedsMaximum {
            cents: i128::MAX,
            max: max_cents,
        });
    }

    let whole_value: i128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };

    let digits: Vec<i128> = fraction
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(i128::from)
        .collect();
    let mut cents = whole_value * 100
        + digits.first().copied().unwrap_or(0) * 10
        + digits.get(1).copied().unwrap_or(0);
    if digits.get(2).copied().unwrap_or(0) >= 5 {
        cents += 1;
    }

    if cents > max_cents as i128 {
        return Err(BudgetEngineError::AmountExceedsMaximum {
            cents: if negative { -cents } else { cents },
            max: max_cents,
        });
    }

    let cents = cents as i64;
    Ok(if negative { -cents } else { cents })
}

/// Renders cents as a plain decimal string, e.g. `-1234.56`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let magnitude = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, magnitude / 100, magnitude % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_monthly_uses_fixed_divisors() {
        assert_eq!(to_monthly_cents(10_000, Cadence::Weekly), 43_333);
        assert_eq!(to_monthly_cents(10_000, Cadence::Fortnightly), 21_667);
        assert_eq!(to_monthly_cents(10_000, Cadence::Monthly), 10_000);
        assert_eq!(to_monthly_cents(10_000, Cadence::Quarterly), 3_333);
        assert_eq!(to_monthly_cents(120_000, Cadence::Yearly), 10_000);
    }

    #[test]
    fn test_rounding_is_half_away_from_zero() {
        // 3 * 52 / 12 = 13.0; 9 * 26 / 12 = 19.5 -> 20
        assert_eq!(to_monthly_cents(9, Cadence::Fortnightly), 20);
        assert_eq!(to_monthly_cents(-9, Cadence::Fortnightly), -20);
        // 6 / 12 = 0.5 -> 1
        assert_eq!(to_monthly_cents(6, Cadence::Yearly), 1);
        assert_eq!(to_monthly_cents(-6, Cadence::Yearly), -1);
        assert_eq!(div_round_half_away(7, 3), 2);
        assert_eq!(div_round_half_away(-7, 3), -2);
    }

    #[test]
    fn test_monthly_round_trip() {
        for amount in [0, 1, 99, 12_345, 987_654_321] {
            let monthly = to_monthly_cents(amount, Cadence::Monthly);
            assert_eq!(from_monthly_cents(monthly, Cadence::Monthly), amount);
        }
    }

    #[test]
    fn test_other_cadences_round_trip_within_tolerance() {
        for cadence in Cadence::ALL {
            for amount in [1, 7, 1_000, 4_999, 123_457, 10_000_001] {
                let back = from_monthly_cents(to_monthly_cents(amount, cadence), cadence);
                assert!(
                    (back - amount).abs() <= 12,
                    "{:?} {} came back as {}",
                    cadence,
                    amount,
                    back
                );
            }
        }
    }

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount_to_cents("12.34", MAX_AMOUNT_CENTS).unwrap(), 1234);
        assert_eq!(parse_amount_to_cents("$1,234.5", MAX_AMOUNT_CENTS).unwrap(), 123_450);
        assert_eq!(parse_amount_to_cents("-4.50", MAX_AMOUNT_CENTS).unwrap(), -450);
        assert_eq!(parse_amount_to_cents("(20.00)", MAX_AMOUNT_CENTS).unwrap(), -2000);
        assert_eq!(parse_amount_to_cents("+7", MAX_AMOUNT_CENTS).unwrap(), 700);
        assert_eq!(parse_amount_to_cents(".99", MAX_AMOUNT_CENTS).unwrap(), 99);
        assert_eq!(parse_amount_to_cents("0.125", MAX_AMOUNT_CENTS).unwrap(), 13);
        assert_eq!(parse_amount_to_cents("-0.125", MAX_AMOUNT_CENTS).unwrap(), -13);
        assert_eq!(
            parse_amount_to_cents("(1,234,567.89)", MAX_AMOUNT_CENTS).unwrap(),
            -123_456_789
        );
        assert_eq!(parse_amount_to_cents("-$12,000", MAX_AMOUNT_CENTS).unwrap(), -1_200_000);
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        let bad_inputs = [
            "", "abc", "1.2.3", "12a", "$", "-", "1 000", "(-5)", "(+5)", "--5", "1,,0",
            "12,34", ",123", "1,2345", "1234,567", "1.2,3",
        ];
        for bad in bad_inputs {
            assert!(
                matches!(
                    parse_amount_to_cents(bad, MAX_AMOUNT_CENTS),
                    Err(BudgetEngineError::InvalidAmount(_))
                ),
                "{:?} should be invalid",
                bad
            );
        }
    }

    #[test]
    fn test_parse_amount_ceiling_fails_loudly() {
        assert_eq!(
            parse_amount_to_cents("999999999.99", MAX_AMOUNT_CENTS).unwrap(),
            MAX_AMOUNT_CENTS
        );
        assert!(matches!(
            parse_amount_to_cents("1000000000.00", MAX_AMOUNT_CENTS),
            Err(BudgetEngineError::AmountExceedsMaximum { .. })
        ));
        assert!(matches!(
            parse_amount_to_cents("-1000000000", MAX_AMOUNT_CENTS),
            Err(BudgetEngineError::AmountExceedsMaximum { .. })
        ));
        assert!(matches!(
            parse_amount_to_cents(&"9".repeat(40), MAX_AMOUNT_CENTS),
            Err(BudgetEngineError::AmountExceedsMaximum { .. })
        ));
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(123_456), "1234.56");
        assert_eq!(format_cents(-5), "-0.05");
        assert_eq!(format_cents(0), "0.00");
    }
}
