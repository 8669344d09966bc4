//! Network configuration and genesis synthesis.
//!
//! [`NetworkConfig`] describes the chain every environment boots: address
//! prefix, chain id, base denomination, governance and custom-parameter
//! overrides. It produces the module sections of the genesis document;
//! [`genesis_state_with_val_set`] then registers the validator and the
//! funded account the same way the upstream simulation helpers do, using
//! their stock `stake` bond denomination. [`replace_denom`] rewrites those
//! to the network denomination afterwards.

use chrono::{DateTime, Utc};
use serde_json::Value;

use chain_tube_app::genesis::{
    GenesisAccount, GenesisBalance, GenesisDelegation, GenesisState, GenesisValidator,
};
use chain_tube_app::modules::auth::{AuthKeeper, BONDED_POOL};
use chain_tube_types::encoding::base64_encode;
use chain_tube_types::{Address, Bech32Prefixes, Coin, Ed25519Key};

/// Bond denomination used by the stock validator-set injection.
pub const DEFAULT_BOND_DENOM: &str = "stake";

/// Tokens bonded to the genesis validator (one unit of consensus power).
pub const GENESIS_BONDED_AMOUNT: u128 = 1_000_000;

/// Balance of the funded genesis account.
pub const GENESIS_ACCOUNT_BALANCE: u128 = 100_000_000_000_000;

pub const DEFAULT_ADDRESS_PREFIX: &str = "core";
pub const DEFAULT_CHAIN_ID: &str = "coreum-mainnet-1";
pub const DEFAULT_DENOM: &str = "ucore";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub address_prefix: String,
    pub chain_id: String,
    pub genesis_time: DateTime<Utc>,
    pub denom: String,
    pub gov_min_deposit: u128,
    pub gov_voting_period_seconds: u64,
    pub min_self_delegation: u128,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address_prefix: DEFAULT_ADDRESS_PREFIX.to_string(),
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            genesis_time: Utc::now(),
            denom: DEFAULT_DENOM.to_string(),
            gov_min_deposit: 1_000,
            gov_voting_period_seconds: 10,
            // 10 core
            min_self_delegation: 10_000_000,
        }
    }
}

impl NetworkConfig {
    pub fn prefixes(&self) -> Bech32Prefixes {
        Bech32Prefixes::from_base(&self.address_prefix)
    }

    /// Module parameters for this network; no accounts or validators yet.
    pub fn app_state(&self) -> GenesisState {
        let mut genesis = GenesisState::with_default_params(&self.denom);
        genesis.gov.params.min_deposit = vec![Coin::new(self.gov_min_deposit, self.denom.as_str())];
        genesis.gov.params.voting_period_seconds = self.gov_voting_period_seconds;
        genesis.customparams.staking_params.min_self_delegation =
            self.min_self_delegation.to_string();
        genesis
    }
}

/// The genesis validator as seen by the chain.
#[derive(Debug, Clone)]
pub struct GenesisValidatorSpec {
    pub operator: Address,
    pub consensus_key: Ed25519Key,
}

/// Register one bonded validator and one funded account in `genesis`.
///
/// The account delegates [`GENESIS_BONDED_AMOUNT`] to the validator and
/// holds [`GENESIS_ACCOUNT_BALANCE`]; both are denominated in
/// [`DEFAULT_BOND_DENOM`].
pub fn genesis_state_with_val_set(
    mut genesis: GenesisState,
    prefixes: &Bech32Prefixes,
    validator: &GenesisValidatorSpec,
    account: &Address,
) -> GenesisState {
    let bonded = GENESIS_BONDED_AMOUNT.to_string();
    let valoper = validator.operator.to_bech32(&prefixes.validator);
    let account_bech32 = account.to_bech32(&prefixes.account);

    genesis.staking.validators.push(GenesisValidator {
        operator_address: valoper.clone(),
        consensus_pubkey: base64_encode(&validator.consensus_key.public_key_bytes()),
        jailed: false,
        status: "BOND_STATUS_BONDED".to_string(),
        tokens: bonded.clone(),
        delegator_shares: bonded.clone(),
        moniker: String::new(),
        commission_rate: "0".to_string(),
        commission_max_rate: "0".to_string(),
        commission_max_change_rate: "0".to_string(),
        min_self_delegation: "1".to_string(),
    });
    genesis.staking.delegations.push(GenesisDelegation {
        delegator_address: account_bech32.clone(),
        validator_address: valoper,
        shares: bonded,
    });

    genesis.auth.accounts.push(GenesisAccount {
        address: account_bech32.clone(),
        account_number: 0,
        sequence: 0,
    });
    genesis.bank.balances.push(GenesisBalance {
        address: account_bech32,
        coins: vec![Coin::new(GENESIS_ACCOUNT_BALANCE, DEFAULT_BOND_DENOM)],
    });
    genesis.bank.balances.push(GenesisBalance {
        address: AuthKeeper::module_address(BONDED_POOL).to_bech32(&prefixes.account),
        coins: vec![Coin::new(GENESIS_BONDED_AMOUNT, DEFAULT_BOND_DENOM)],
    });
    genesis
}

/// Replace every JSON string exactly equal to `from` with `to`.
///
/// Returns the number of values rewritten. Strings that merely contain
/// `from` are left alone.
pub fn replace_denom(value: &mut Value, from: &str, to: &str) -> usize {
    match value {
        Value::String(s) if s == from => {
            *s = to.to_string();
            1
        }
        Value::Array(items) => items.iter_mut().map(|v| replace_denom(v, from, to)).sum(),
        Value::Object(map) => map.values_mut().map(|v| replace_denom(v, from, to)).sum(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_replace_denom_exact_matches_only() {
        let mut doc = json!({
            "denom": "stake",
            "nested": [{"denom": "stake", "amount": "1"}, "stakeholder", "ustake"],
            "stake": "key names are not values",
        });
        assert_eq!(replace_denom(&mut doc, "stake", "ucore"), 2);
        assert_eq!(doc["denom"], "ucore");
        assert_eq!(doc["nested"][0]["denom"], "ucore");
        assert_eq!(doc["nested"][1], "stakeholder");
        assert_eq!(doc["nested"][2], "ustake");
        assert!(doc.get("stake").is_some());
    }

    #[test]
    fn test_app_state_applies_network_overrides() {
        let config = NetworkConfig::default();
        let genesis = config.app_state();
        assert_eq!(genesis.staking.params.bond_denom, "ucore");
        assert_eq!(genesis.gov.params.voting_period_seconds, 10);
        assert_eq!(genesis.gov.params.min_deposit, vec![Coin::new(1_000, "ucore")]);
        assert_eq!(
            genesis.customparams.staking_params.min_self_delegation,
            "10000000"
        );
    }

    #[test]
    fn test_val_set_injection_uses_stock_denom() {
        let config = NetworkConfig::default();
        let prefixes = config.prefixes();
        let validator = GenesisValidatorSpec {
            operator: Address::new([1; 20]),
            consensus_key: Ed25519Key::generate(),
        };
        let account = Address::new([2; 20]);
        let genesis =
            genesis_state_with_val_set(config.app_state(), &prefixes, &validator, &account);

        assert_eq!(genesis.staking.validators.len(), 1);
        assert_eq!(genesis.staking.delegations[0].shares, "1000000");
        assert_eq!(genesis.auth.accounts[0].address, account.to_bech32("core"));
        assert!(genesis
            .bank
            .balances
            .iter()
            .all(|b| b.coins[0].denom == DEFAULT_BOND_DENOM));

        let mut doc = serde_json::to_value(&genesis).unwrap();
        assert!(replace_denom(&mut doc, DEFAULT_BOND_DENOM, &config.denom) >= 2);
        let rewritten: GenesisState = serde_json::from_value(doc).unwrap();
        assert!(rewritten
            .bank
            .balances
            .iter()
            .all(|b| b.coins[0].denom == "ucore"));
    }
}
