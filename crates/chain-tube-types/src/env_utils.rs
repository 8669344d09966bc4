//! Environment variable parsing utilities.
//!
//! ```
//! use chain_tube_types::env_utils::{env_string, env_var};
//!
//! let genesis_time: Option<i64> = env_var("CHAIN_TUBE_GENESIS_TIME");
//! let chain_id = env_string("CHAIN_TUBE_CHAIN_ID").unwrap_or_else(|| "coreum-mainnet-1".to_string());
//! # let _ = (genesis_time, chain_id);
//! ```

use std::str::FromStr;

/// Parse a variable; `None` if it is unset or does not parse.
pub fn env_var<T: FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

/// Read a non-empty, trimmed string variable.
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_parsing() {
        std::env::set_var("CHAIN_TUBE_TEST_U64", " 42 ");
        assert_eq!(env_var::<u64>("CHAIN_TUBE_TEST_U64"), Some(42));

        std::env::set_var("CHAIN_TUBE_TEST_INVALID", "not_a_number");
        assert_eq!(env_var::<u64>("CHAIN_TUBE_TEST_INVALID"), None);
        assert_eq!(env_var::<u64>("CHAIN_TUBE_TEST_UNSET"), None);

        std::env::remove_var("CHAIN_TUBE_TEST_U64");
        std::env::remove_var("CHAIN_TUBE_TEST_INVALID");
    }

    #[test]
    fn test_env_string_trims_and_filters_empty() {
        std::env::set_var("CHAIN_TUBE_TEST_STR", "  ucore ");
        assert_eq!(env_string("CHAIN_TUBE_TEST_STR").as_deref(), Some("ucore"));

        std::env::set_var("CHAIN_TUBE_TEST_STR", "   ");
        assert_eq!(env_string("CHAIN_TUBE_TEST_STR"), None);

        std::env::remove_var("CHAIN_TUBE_TEST_STR");
    }
}
