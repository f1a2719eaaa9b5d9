//! Parse-with-default helpers for numeric fields carried as text.
//!
//! Source tables store Quantity, Discount, Unit_Price and Cost_Price as
//! strings. None of these helpers fail: text that does not parse becomes 0.

/// Parse the leading integer of `text`, or 0.
///
/// Accepts an optional sign followed by a run of ASCII digits after trimming,
/// ignoring whatever follows the digits (`"4.0"` is 4, `"5abc"` is 5).
pub fn parse_int_or_zero(text: &str) -> i64 {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return 0;
    }

    match digits[..end].parse::<i64>() {
        Ok(value) if negative => -value,
        Ok(value) => value,
        Err(_) => 0,
    }
}

/// Parse the leading decimal number of `text` as a finite float, or 0.
///
/// After trimming, reads an optional sign, digits with an optional fraction
/// and an optional exponent, ignoring whatever follows (`"100₪"` is 100,
/// `"12,5"` is 12).
pub fn parse_f64_or_zero(text: &str) -> f64 {
    let trimmed = text.trim();
    let end = float_prefix_len(trimmed.as_bytes());

    match trimmed[..end].parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Length of the longest `[sign] digits [. digits] [e [sign] digits]` prefix,
/// or 0 when the mantissa has no digit.
fn float_prefix_len(bytes: &[u8]) -> usize {
    let digits_end = |start: usize| {
        start + bytes[start..].iter().take_while(|b| b.is_ascii_digit()).count()
    };

    let mut end = match bytes.first() {
        Some(b'+' | b'-') => 1,
        _ => 0,
    };
    let int_end = digits_end(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_end(end + 1);
        mantissa_digits += frac_end - end - 1;
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_end(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    end
}

/// Discount as a fraction. Absent or blank means no discount.
///
/// The value is not clamped to [0, 1].
pub fn parse_discount(text: Option<&str>) -> f64 {
    match text {
        Some(raw) if !raw.trim().is_empty() => parse_f64_or_zero(raw),
        _ => 0.0,
    }
}

/// Round half up to the nearest integer (`2.5` -> 3, `-2.5` -> -2).
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
