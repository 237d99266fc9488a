//! Rate string parsing for bandwidth configuration.
//!
//! Accepts `"700"`, `"512K"`, `"8M"`, `"1.5G"` and returns bytes per second.
//! Suffixes are binary (K = 1024) and case-insensitive.

use thiserror::Error;

/// Errors produced when parsing a rate string.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum RateParseError {
    /// The input was empty or contained no digits.
    #[error("empty rate value")]
    Empty,
    /// The input contained characters that do not form a number.
    #[error("invalid rate value")]
    Invalid,
    /// The parsed value does not fit in 64 bits of bytes per second.
    #[error("rate value too large")]
    TooLarge,
    /// The unit suffix is not one of K, M, G or T.
    #[error("unknown rate suffix {0:?}")]
    UnknownSuffix(char),
}

/// Parses a human-readable rate into bytes per second.
///
/// # Errors
///
/// See [`RateParseError`]; fractional digits are honoured exactly (no float
/// rounding), and the result must fit in a `u64`.
pub fn parse_rate(text: &str) -> Result<u64, RateParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(RateParseError::Empty);
    }

    let (number_text, unit) = match trimmed.char_indices().last() {
        Some((position, last)) if last.is_ascii_alphabetic() => {
            (&trimmed[..position], unit_multiplier(last)?)
        }
        _ => (trimmed, 1u128),
    };

    if number_text.is_empty() {
        return Err(RateParseError::Empty);
    }

    let (integer, fraction, denominator) = parse_decimal(number_text)?;

    let scaled = integer
        .checked_mul(unit)
        .and_then(|whole| {
            let fractional = fraction.checked_mul(unit)? / denominator;
            whole.checked_add(fractional)
        })
        .ok_or(RateParseError::TooLarge)?;

    u64::try_from(scaled).map_err(|_| RateParseError::TooLarge)
}

fn unit_multiplier(suffix: char) -> Result<u128, RateParseError> {
    match suffix.to_ascii_uppercase() {
        'K' => Ok(1 << 10),
        'M' => Ok(1 << 20),
        'G' => Ok(1 << 30),
        'T' => Ok(1 << 40),
        other => Err(RateParseError::UnknownSuffix(other)),
    }
}

fn parse_decimal(text: &str) -> Result<(u128, u128, u128), RateParseError> {
    let mut parts = text.splitn(2, '.');
    let integer_text = parts.next().ok_or(RateParseError::Empty)?;
    let fraction_text = parts.next();

    if integer_text.is_empty() && fraction_text.map_or(true, str::is_empty) {
        return Err(RateParseError::Empty);
    }

    let integer = parse_digits(integer_text)?;
    let mut fraction = 0u128;
    let mut denominator = 1u128;
    if let Some(fraction_text) = fraction_text {
        if fraction_text.contains('.') {
            return Err(RateParseError::Invalid);
        }
        for byte in fraction_text.bytes() {
            if !byte.is_ascii_digit() {
                return Err(RateParseError::Invalid);
            }
            denominator = denominator
                .checked_mul(10)
                .ok_or(RateParseError::TooLarge)?;
            fraction = fraction
                .checked_mul(10)
                .and_then(|value| value.checked_add(u128::from(byte - b'0')))
                .ok_or(RateParseError::TooLarge)?;
        }
    }

    Ok((integer, fraction, denominator))
}

fn parse_digits(text: &str) -> Result<u128, RateParseError> {
    let mut value = 0u128;
    for byte in text.bytes() {
        if !byte.is_ascii_digit() {
            return Err(RateParseError::Invalid);
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u128::from(byte - b'0')))
            .ok_or(RateParseError::TooLarge)?;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_numbers_are_bytes_per_second() {
        assert_eq!(parse_rate("700"), Ok(700));
        assert_eq!(parse_rate("0"), Ok(0));
    }

    #[test]
    fn binary_suffixes_scale() {
        assert_eq!(parse_rate("512K"), Ok(512 * 1024));
        assert_eq!(parse_rate("8M"), Ok(8 * 1024 * 1024));
        assert_eq!(parse_rate("2g"), Ok(2 * 1024 * 1024 * 1024));
        assert_eq!(parse_rate("1T"), Ok(1 << 40));
    }

    #[test]
    fn fractions_are_exact() {
        assert_eq!(parse_rate("1.5M"), Ok(1_572_864));
        assert_eq!(parse_rate("0.25K"), Ok(256));
        assert_eq!(parse_rate(".5K"), Ok(512));
    }

    #[test]
    fn whitespace_is_tolerated() {
        assert_eq!(parse_rate(" 8M "), Ok(8 * 1024 * 1024));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_rate(""), Err(RateParseError::Empty));
        assert_eq!(parse_rate("M"), Err(RateParseError::Empty));
        assert_eq!(parse_rate("fast"), Err(RateParseError::Invalid));
        assert_eq!(parse_rate("1..5M"), Err(RateParseError::Invalid));
        assert_eq!(parse_rate("5X"), Err(RateParseError::UnknownSuffix('X')));
    }

    #[test]
    fn rejects_overflow() {
        assert_eq!(
            parse_rate("99999999999999999999T"),
            Err(RateParseError::TooLarge)
        );
    }
}
