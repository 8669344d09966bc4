//! JSON genesis document.
//!
//! Each module owns one top-level section. Parameter messages embed
//! directly; validators carry their consensus key as base64 ed25519 bytes
//! and their bond status by protobuf enum name.

use serde::{Deserialize, Serialize};

use chain_tube_types::encoding::base64_decode;
use chain_tube_types::proto::bank::BankParams;
use chain_tube_types::proto::crypto::Ed25519PubKey;
use chain_tube_types::proto::gov::GovParams;
use chain_tube_types::proto::params::{AssetFtParams, AssetNftParams, StakingCustomParams};
use chain_tube_types::proto::slashing::SlashingParams;
use chain_tube_types::proto::staking::{
    BondStatus, CommissionRates, Delegation, Description, StakingParams, Validator,
};
use chain_tube_types::proto::wasm::{AccessConfig, AccessType, WasmParams};
use chain_tube_types::{Any, Coin};

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisState {
    pub auth: AuthGenesis,
    pub bank: BankGenesis,
    pub staking: StakingGenesis,
    pub slashing: SlashingGenesis,
    pub gov: GovGenesis,
    pub wasm: WasmGenesis,
    pub assetft: AssetFtGenesis,
    pub assetnft: AssetNftGenesis,
    pub customparams: CustomParamsGenesis,
}

impl GenesisState {
    /// Every module's default parameters with `bond_denom` as the staking
    /// and fee denomination; no accounts, balances or validators.
    pub fn with_default_params(bond_denom: &str) -> Self {
        let everybody = AccessConfig {
            permission: AccessType::Everybody as i32,
            addresses: vec![],
        };
        Self {
            bank: BankGenesis {
                params: BankParams {
                    default_send_enabled: true,
                },
                ..Default::default()
            },
            staking: StakingGenesis {
                params: StakingParams {
                    unbonding_time_seconds: 1_814_400,
                    max_validators: 100,
                    max_entries: 7,
                    historical_entries: 10_000,
                    bond_denom: bond_denom.to_string(),
                    min_commission_rate: "0".to_string(),
                },
                ..Default::default()
            },
            slashing: SlashingGenesis {
                params: SlashingParams {
                    signed_blocks_window: 100,
                    min_signed_per_window: "0.5".to_string(),
                    downtime_jail_duration_seconds: 600,
                    slash_fraction_double_sign: "0.05".to_string(),
                    slash_fraction_downtime: "0.01".to_string(),
                },
                ..Default::default()
            },
            gov: GovGenesis {
                params: GovParams {
                    min_deposit: vec![Coin::new(10_000_000, bond_denom)],
                    max_deposit_period_seconds: 172_800,
                    voting_period_seconds: 172_800,
                    quorum: "0.334".to_string(),
                    threshold: "0.5".to_string(),
                },
            },
            wasm: WasmGenesis {
                params: WasmParams {
                    code_upload_access: Some(everybody),
                    instantiate_default_permission: AccessType::Everybody as i32,
                },
            },
            assetft: AssetFtGenesis {
                params: AssetFtParams {
                    issue_fee: Some(Coin::new(10_000_000, bond_denom)),
                    token_upgrade_decision_timeout: 0,
                    token_upgrade_grace_period_seconds: 604_800,
                },
            },
            assetnft: AssetNftGenesis {
                params: AssetNftParams {
                    mint_fee: Some(Coin::new(0, bond_denom)),
                },
            },
            customparams: CustomParamsGenesis {
                staking_params: StakingCustomParams {
                    min_self_delegation: "1".to_string(),
                },
            },
            ..Default::default()
        }
    }

    pub fn from_json(bytes: &[u8]) -> AppResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| AppError::InvalidGenesis(e.to_string()))
    }

    pub fn to_json(&self) -> AppResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| AppError::InvalidGenesis(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisAccount {
    pub address: String,
    pub account_number: u64,
    pub sequence: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthGenesis {
    pub accounts: Vec<GenesisAccount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisBalance {
    pub address: String,
    pub coins: Vec<Coin>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankGenesis {
    pub params: BankParams,
    pub balances: Vec<GenesisBalance>,
    /// Empty means "derive from balances".
    pub supply: Vec<Coin>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisValidator {
    pub operator_address: String,
    /// Base64 of the raw 32-byte ed25519 key.
    pub consensus_pubkey: String,
    pub jailed: bool,
    /// `BOND_STATUS_*` name.
    pub status: String,
    pub tokens: String,
    pub delegator_shares: String,
    pub moniker: String,
    pub commission_rate: String,
    pub commission_max_rate: String,
    pub commission_max_change_rate: String,
    pub min_self_delegation: String,
}

impl GenesisValidator {
    pub fn to_validator(&self) -> AppResult<Validator> {
        let key = base64_decode(&self.consensus_pubkey, "validator consensus pubkey")
            .map_err(|e| AppError::InvalidGenesis(e.to_string()))?;
        let status = BondStatus::from_str_name(&self.status).ok_or_else(|| {
            AppError::InvalidGenesis(format!("unknown bond status '{}'", self.status))
        })?;
        Ok(Validator {
            operator_address: self.operator_address.clone(),
            consensus_pubkey: Some(Any::pack(&Ed25519PubKey { key })),
            jailed: self.jailed,
            status: status as i32,
            tokens: self.tokens.clone(),
            delegator_shares: self.delegator_shares.clone(),
            description: Some(Description {
                moniker: self.moniker.clone(),
                ..Default::default()
            }),
            unbonding_height: 0,
            commission: Some(CommissionRates {
                rate: self.commission_rate.clone(),
                max_rate: self.commission_max_rate.clone(),
                max_change_rate: self.commission_max_change_rate.clone(),
            }),
            min_self_delegation: self.min_self_delegation.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisDelegation {
    pub delegator_address: String,
    pub validator_address: String,
    pub shares: String,
}

impl GenesisDelegation {
    pub fn to_delegation(&self) -> Delegation {
        Delegation {
            delegator_address: self.delegator_address.clone(),
            validator_address: self.validator_address.clone(),
            shares: self.shares.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingGenesis {
    pub params: StakingParams,
    pub validators: Vec<GenesisValidator>,
    pub delegations: Vec<GenesisDelegation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisSigningInfo {
    /// Consensus (`valcons`) address.
    pub address: String,
    pub start_height: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlashingGenesis {
    pub params: SlashingParams,
    pub signing_infos: Vec<GenesisSigningInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovGenesis {
    pub params: GovParams,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WasmGenesis {
    pub params: WasmParams,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetFtGenesis {
    pub params: AssetFtParams,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetNftGenesis {
    pub params: AssetNftParams,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomParamsGenesis {
    pub staking_params: StakingCustomParams,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_tube_types::encoding::base64_encode;

    #[test]
    fn test_missing_sections_default() {
        let genesis = GenesisState::from_json(br#"{"gov":{"params":{"voting_period_seconds":10}}}"#)
            .unwrap();
        assert_eq!(genesis.gov.params.voting_period_seconds, 10);
        assert!(genesis.staking.validators.is_empty());
    }

    #[test]
    fn test_validator_conversion() {
        let gv = GenesisValidator {
            operator_address: "corevaloper1xyz".to_string(),
            consensus_pubkey: base64_encode(&[7u8; 32]),
            status: "BOND_STATUS_BONDED".to_string(),
            tokens: "1000000".to_string(),
            ..Default::default()
        };
        let v = gv.to_validator().unwrap();
        assert_eq!(v.status, BondStatus::Bonded as i32);
        assert_eq!(v.consensus_pubkey.unwrap().type_url, "/cosmos.crypto.ed25519.PubKey");

        let bad = GenesisValidator {
            status: "BONDED".to_string(),
            ..gv
        };
        assert!(bad.to_validator().is_err());
    }

    #[test]
    fn test_default_params_share_denom() {
        let genesis = GenesisState::with_default_params("stake");
        assert_eq!(genesis.staking.params.bond_denom, "stake");
        assert_eq!(genesis.gov.params.min_deposit[0].denom, "stake");
        let json = genesis.to_json().unwrap();
        assert_eq!(GenesisState::from_json(&json).unwrap(), genesis);
    }

    #[test]
    fn test_invalid_json_is_genesis_error() {
        assert!(matches!(
            GenesisState::from_json(b"not json"),
            Err(AppError::InvalidGenesis(_))
        ));
    }
}
