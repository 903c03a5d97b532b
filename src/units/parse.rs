// Lenient numeric parsing for unit form fields
//
// Form values arrive as text. A value that does not start with a number is
// stored as NULL instead of rejecting the request.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::warn;

/// Parse the leading integer of `value` (`"3"`, `" 12th"`, `"-1"`).
pub fn parse_int_lenient(value: &str) -> Option<i32> {
    let value = value.trim_start();
    let sign_len = usize::from(value.starts_with(['+', '-']));
    let digits = value[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    value[..sign_len + digits].parse().ok()
}

/// Parse the leading decimal number of `value` (`"1500000"`, `"12.50 PHP"`).
pub fn parse_decimal_lenient(value: &str) -> Option<Decimal> {
    let value = value.trim_start();
    let bytes = value.as_bytes();

    let mut end = usize::from(value.starts_with(['+', '-']));
    let int_digits = bytes[end..].iter().take_while(|b| b.is_ascii_digit()).count();
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = bytes[end + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
        if frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    let number = value[..end].strip_prefix('+').unwrap_or(&value[..end]);
    Decimal::from_str(number).ok()
}

/// Parse the `deletedImages` form field: a JSON array of picture ids.
///
/// Numeric strings inside the array are accepted. Anything else is logged and
/// treated as an empty list.
pub fn parse_id_list(raw: Option<&str>) -> Vec<i32> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Vec::new();
    };

    let values = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(values)) => values,
        Ok(other) => {
            warn!("deletedImages is not an array, ignoring: {}", other);
            return Vec::new();
        }
        Err(err) => {
            warn!("deletedImages is not valid JSON, ignoring: {}", err);
            return Vec::new();
        }
    };

    let mut ids = Vec::with_capacity(values.len());
    for value in values {
        let id = match &value {
            Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        match id {
            Some(id) if !ids.contains(&id) => ids.push(id),
            Some(_) => {}
            None => warn!("Skipping non-integer picture id in deletedImages: {}", value),
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_int_examples() {
        assert_eq!(parse_int_lenient("3"), Some(3));
        assert_eq!(parse_int_lenient("  12th"), Some(12));
        assert_eq!(parse_int_lenient("-1"), Some(-1));
        assert_eq!(parse_int_lenient("+4"), Some(4));
        assert_eq!(parse_int_lenient("3.9"), Some(3));
        assert_eq!(parse_int_lenient(""), None);
        assert_eq!(parse_int_lenient("ground"), None);
        assert_eq!(parse_int_lenient("-"), None);
        assert_eq!(parse_int_lenient("99999999999"), None);
    }

    #[test]
    fn test_decimal_examples() {
        assert_eq!(parse_decimal_lenient("1500000"), Some(dec!(1500000)));
        assert_eq!(parse_decimal_lenient("12.50 PHP"), Some(dec!(12.50)));
        assert_eq!(parse_decimal_lenient(".5"), Some(dec!(0.5)));
        assert_eq!(parse_decimal_lenient("7."), Some(dec!(7)));
        assert_eq!(parse_decimal_lenient("-2.25"), Some(dec!(-2.25)));
        assert_eq!(parse_decimal_lenient("+8"), Some(dec!(8)));
        assert_eq!(parse_decimal_lenient(""), None);
        assert_eq!(parse_decimal_lenient("."), None);
        assert_eq!(parse_decimal_lenient("n/a"), None);
    }

    #[test]
    fn test_id_list() {
        assert_eq!(parse_id_list(Some("[5,6]")), vec![5, 6]);
        assert_eq!(parse_id_list(Some(" [\"7\", 8, 7] ")), vec![7, 8]);
        assert_eq!(parse_id_list(Some("[1.5, null, 2]")), vec![2]);
        assert!(parse_id_list(None).is_empty());
        assert!(parse_id_list(Some("")).is_empty());
        assert!(parse_id_list(Some("5,6")).is_empty());
        assert!(parse_id_list(Some("{\"id\": 5}")).is_empty());
    }

    proptest! {
        #[test]
        fn prop_int_matches_display(n in any::<i32>()) {
            prop_assert_eq!(parse_int_lenient(&n.to_string()), Some(n));
        }

        #[test]
        fn prop_int_ignores_trailing_text(n in 0i32..100_000, tail in "[a-z ]{0,8}") {
            prop_assert_eq!(parse_int_lenient(&format!("{}{}", n, tail)), Some(n));
        }

        #[test]
        fn prop_decimal_matches_cents(cents in 0i64..10_000_000_000) {
            let expected = Decimal::new(cents, 2);
            prop_assert_eq!(parse_decimal_lenient(&expected.to_string()), Some(expected));
        }

        #[test]
        fn prop_never_panics(input in "\\PC{0,20}") {
            let _ = parse_int_lenient(&input);
            let _ = parse_decimal_lenient(&input);
        }
    }
}
