//! Coin amount parsing, validation and arithmetic.
//!
//! Amounts are carried as decimal strings on the wire and as `u128` while
//! doing arithmetic. A coin list is "normalized" when it is sorted by denom,
//! has no duplicate denoms and no zero amounts.

use std::collections::BTreeMap;
use std::fmt;

use crate::proto::Coin;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoinError {
    InvalidDenom(String),
    InvalidAmount { denom: String, amount: String },
    Overflow { denom: String },
    Json(String),
}

impl fmt::Display for CoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinError::InvalidDenom(denom) => write!(f, "invalid denom: {}", denom),
            CoinError::InvalidAmount { denom, amount } => {
                write!(f, "invalid amount '{}' for denom {}", amount, denom)
            }
            CoinError::Overflow { denom } => write!(f, "amount overflow for denom {}", denom),
            CoinError::Json(msg) => write!(f, "invalid coins JSON: {}", msg),
        }
    }
}

impl std::error::Error for CoinError {}

/// `[a-zA-Z][a-zA-Z0-9/:._-]{2,127}`
pub fn validate_denom(denom: &str) -> Result<(), CoinError> {
    let mut chars = denom.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || "/:._-".contains(c));
    if first_ok && rest_ok && (3..=128).contains(&denom.len()) {
        Ok(())
    } else {
        Err(CoinError::InvalidDenom(denom.to_string()))
    }
}

/// Parse and validate a single coin's amount.
pub fn amount_of(coin: &Coin) -> Result<u128, CoinError> {
    validate_denom(&coin.denom)?;
    coin.amount
        .trim()
        .parse::<u128>()
        .map_err(|_| CoinError::InvalidAmount {
            denom: coin.denom.clone(),
            amount: coin.amount.clone(),
        })
}

/// Sort by denom, merge duplicates and drop zero amounts.
pub fn normalize(coins: &[Coin]) -> Result<Vec<Coin>, CoinError> {
    let mut merged: BTreeMap<String, u128> = BTreeMap::new();
    for coin in coins {
        let amount = amount_of(coin)?;
        let entry = merged.entry(coin.denom.clone()).or_default();
        *entry = entry.checked_add(amount).ok_or_else(|| CoinError::Overflow {
            denom: coin.denom.clone(),
        })?;
    }
    Ok(merged
        .into_iter()
        .filter(|(_, amount)| *amount > 0)
        .map(|(denom, amount)| Coin::new(amount, denom))
        .collect())
}

/// Parse a coins JSON document.
///
/// Accepts either an array (`[{"denom":"core","amount":"1000"}]`) or a single
/// coin object (`{"denom":"core","amount":"1000"}`).
pub fn parse_coins_json(json: &str) -> Result<Vec<Coin>, CoinError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| CoinError::Json(e.to_string()))?;
    let coins: Vec<Coin> = if value.is_array() {
        serde_json::from_value(value)
    } else if value.is_object() {
        serde_json::from_value::<Coin>(value).map(|c| vec![c])
    } else {
        return Err(CoinError::Json(format!(
            "expected array or object, got {}",
            value
        )));
    }
    .map_err(|e| CoinError::Json(e.to_string()))?;
    normalize(&coins)
}

/// Human-readable `1000core,5ucore` form used in events and logs.
pub fn coins_to_string(coins: &[Coin]) -> String {
    coins
        .iter()
        .map(|c| format!("{}{}", c.amount, c.denom))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coins_json_array_and_object() {
        let arr = parse_coins_json(r#"[{"denom":"ucore","amount":"5"},{"denom":"core","amount":"1000"}]"#)
            .unwrap();
        assert_eq!(arr, vec![Coin::new(1000, "core"), Coin::new(5, "ucore")]);

        let single = parse_coins_json(r#"{"denom":"core","amount":"1000"}"#).unwrap();
        assert_eq!(single, vec![Coin::new(1000, "core")]);
    }

    #[test]
    fn test_normalize_merges_and_drops_zero() {
        let coins = vec![
            Coin::new(1, "core"),
            Coin::new(0, "zero"),
            Coin::new(2, "core"),
        ];
        assert_eq!(normalize(&coins).unwrap(), vec![Coin::new(3, "core")]);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            parse_coins_json(r#"[{"denom":"core","amount":"-1"}]"#),
            Err(CoinError::InvalidAmount { .. })
        ));
        assert!(matches!(
            parse_coins_json(r#"[{"denom":"1x","amount":"1"}]"#),
            Err(CoinError::InvalidDenom(_))
        ));
        assert!(matches!(parse_coins_json("42"), Err(CoinError::Json(_))));
        assert!(matches!(parse_coins_json("{"), Err(CoinError::Json(_))));
    }

    #[test]
    fn test_coins_to_string() {
        let coins = vec![Coin::new(1000, "core"), Coin::new(5, "ucore")];
        assert_eq!(coins_to_string(&coins), "1000core,5ucore");
    }
}
