//! Fixed-point decimals with 18 fractional digits, as used for rates.

use crate::errors::{AppError, AppResult};

pub const PRECISION: u32 = 18;
pub const ONE: u128 = 1_000_000_000_000_000_000;

/// Parse `"0.05"`, `"1"` or `"1.000000000000000000"` into a scaled integer.
pub fn parse_dec(input: &str) -> AppResult<u128> {
    let invalid = || AppError::InvalidRequest(format!("invalid decimal '{}'", input));
    let s = input.trim();
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty()
        || !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
        || frac_part.len() > PRECISION as usize
    {
        return Err(invalid());
    }
    let int: u128 = int_part.parse().map_err(|_| invalid())?;
    let mut frac: u128 = 0;
    if !frac_part.is_empty() {
        frac = frac_part.parse().map_err(|_| invalid())?;
        frac *= 10u128.pow(PRECISION - frac_part.len() as u32);
    }
    int.checked_mul(ONE)
        .and_then(|v| v.checked_add(frac))
        .ok_or_else(invalid)
}

/// Parse a decimal that must lie within `[0, 1]`.
pub fn parse_fraction(input: &str, what: &str) -> AppResult<u128> {
    let value = parse_dec(input)?;
    if value > ONE {
        return Err(AppError::InvalidRequest(format!(
            "{} must be between 0 and 1, got {}",
            what, input
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dec() {
        assert_eq!(parse_dec("1").unwrap(), ONE);
        assert_eq!(parse_dec("0.05").unwrap(), ONE / 20);
        assert_eq!(parse_dec("1.000000000000000000").unwrap(), ONE);
        assert!(parse_dec("").is_err());
        assert!(parse_dec(".5").is_err());
        assert!(parse_dec("-1").is_err());
        assert!(parse_dec("0.0000000000000000001").is_err());
    }

    #[test]
    fn test_parse_fraction_bounds() {
        assert!(parse_fraction("0.5", "rate").is_ok());
        let err = parse_fraction("1.5", "rate").unwrap_err();
        assert!(err.to_string().contains("rate must be between 0 and 1"));
    }
}
