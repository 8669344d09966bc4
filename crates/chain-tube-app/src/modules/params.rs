//! Parameter subspaces.
//!
//! Each module keeps its parameters in a named subspace. A subspace declares
//! the protobuf type it stores, so a write carrying a different parameter
//! type is rejected instead of silently reinterpreted. Stored values are the
//! canonical protobuf encoding of the parameter message.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use prost::Message;

use chain_tube_types::coin::{amount_of, normalize};
use chain_tube_types::proto::bank::BankParams;
use chain_tube_types::proto::gov::GovParams;
use chain_tube_types::proto::params::{AssetFtParams, AssetNftParams, StakingCustomParams};
use chain_tube_types::proto::slashing::SlashingParams;
use chain_tube_types::proto::staking::StakingParams;
use chain_tube_types::proto::wasm::{AccessType, WasmParams};
use chain_tube_types::{Coin, TypeUrl};

use crate::decimal::parse_fraction;
use crate::errors::{AppError, AppResult};
use crate::store::{self, KvStore};

use super::prefix;

pub const SUBSPACE_BANK: &str = "bank";
pub const SUBSPACE_STAKING: &str = "staking";
pub const SUBSPACE_SLASHING: &str = "slashing";
pub const SUBSPACE_GOV: &str = "gov";
pub const SUBSPACE_WASM: &str = "wasm";
pub const SUBSPACE_ASSET_FT: &str = "assetft";
pub const SUBSPACE_ASSET_NFT: &str = "assetnft";
pub const SUBSPACE_CUSTOM: &str = "customparams";

/// Type-erased parameter set.
pub trait ParamSet: fmt::Debug + Send + Sync {
    fn type_url(&self) -> &'static str;

    fn validate(&self) -> AppResult<()>;

    fn encode_value(&self) -> Vec<u8>;

    /// Replace the contents with the decoded `bytes`.
    fn decode_value(&mut self, bytes: &[u8]) -> AppResult<()>;

    /// Fresh zero-valued instance of the same concrete type.
    fn boxed_default(&self) -> Box<dyn ParamSet>;
}

/// A concrete parameter message.
pub trait Params: Message + Default + TypeUrl + Clone + 'static {
    fn validate_params(&self) -> AppResult<()>;
}

impl<P: Params> ParamSet for P {
    fn type_url(&self) -> &'static str {
        P::TYPE_URL
    }

    fn validate(&self) -> AppResult<()> {
        self.validate_params()
    }

    fn encode_value(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    fn decode_value(&mut self, bytes: &[u8]) -> AppResult<()> {
        *self = P::decode(bytes)?;
        Ok(())
    }

    fn boxed_default(&self) -> Box<dyn ParamSet> {
        Box::new(P::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subspace {
    pub name: &'static str,
    pub type_url: &'static str,
}

#[derive(Debug, Clone)]
pub struct ParamsKeeper {
    subspaces: Arc<BTreeMap<&'static str, Subspace>>,
}

impl Default for ParamsKeeper {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamsKeeper {
    pub fn new() -> Self {
        let declared = [
            (SUBSPACE_BANK, BankParams::TYPE_URL),
            (SUBSPACE_STAKING, StakingParams::TYPE_URL),
            (SUBSPACE_SLASHING, SlashingParams::TYPE_URL),
            (SUBSPACE_GOV, GovParams::TYPE_URL),
            (SUBSPACE_WASM, WasmParams::TYPE_URL),
            (SUBSPACE_ASSET_FT, AssetFtParams::TYPE_URL),
            (SUBSPACE_ASSET_NFT, AssetNftParams::TYPE_URL),
            (SUBSPACE_CUSTOM, StakingCustomParams::TYPE_URL),
        ];
        let subspaces = declared
            .into_iter()
            .map(|(name, type_url)| (name, Subspace { name, type_url }))
            .collect();
        Self {
            subspaces: Arc::new(subspaces),
        }
    }

    pub fn subspace(&self, name: &str) -> Option<&Subspace> {
        self.subspaces.get(name)
    }

    pub fn subspace_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.subspaces.keys().copied()
    }

    fn require(&self, name: &str) -> AppResult<&Subspace> {
        self.subspace(name)
            .ok_or_else(|| AppError::NotFound(format!("subspace {}", name)))
    }

    fn check_type(subspace: &Subspace, type_url: &str) -> AppResult<()> {
        if subspace.type_url != type_url {
            return Err(AppError::ParamsTypeMismatch {
                subspace: subspace.name.to_string(),
                expected: subspace.type_url.to_string(),
                got: type_url.to_string(),
            });
        }
        Ok(())
    }

    /// Validate and store a parameter set in the named subspace.
    pub fn set_param_set(
        &self,
        store: &mut dyn KvStore,
        name: &str,
        params: &dyn ParamSet,
    ) -> AppResult<()> {
        let subspace = self.require(name)?;
        Self::check_type(subspace, params.type_url())?;
        params.validate()?;
        store.set(&store::key(prefix::PARAMS, &[name.as_bytes()]), params.encode_value());
        tracing::trace!(subspace = name, type_url = params.type_url(), "param set stored");
        Ok(())
    }

    /// Fill `params` from the named subspace; a never-written subspace leaves it zero-valued.
    pub fn get_param_set(
        &self,
        store: &dyn KvStore,
        name: &str,
        params: &mut dyn ParamSet,
    ) -> AppResult<()> {
        let subspace = self.require(name)?;
        Self::check_type(subspace, params.type_url())?;
        if let Some(bytes) = store.get(&store::key(prefix::PARAMS, &[name.as_bytes()])) {
            params.decode_value(&bytes)?;
        }
        Ok(())
    }

    pub fn get<P: Params>(&self, store: &dyn KvStore, name: &str) -> AppResult<P> {
        let mut params = P::default();
        self.get_param_set(store, name, &mut params)?;
        Ok(params)
    }

    pub fn set<P: Params>(&self, store: &mut dyn KvStore, name: &str, params: &P) -> AppResult<()> {
        self.set_param_set(store, name, params)
    }
}

fn validate_fee(coin: &Option<Coin>, what: &str) -> AppResult<()> {
    if let Some(coin) = coin {
        amount_of(coin).map_err(|e| AppError::InvalidParams(format!("{}: {}", what, e)))?;
    }
    Ok(())
}

fn positive(value: u64, what: &str) -> AppResult<()> {
    if value == 0 {
        return Err(AppError::InvalidParams(format!("{} must be positive", what)));
    }
    Ok(())
}

fn fraction(value: &str, what: &str) -> AppResult<()> {
    parse_fraction(value, what)
        .map(|_| ())
        .map_err(|e| AppError::InvalidParams(e.to_string()))
}

impl Params for BankParams {
    fn validate_params(&self) -> AppResult<()> {
        Ok(())
    }
}

impl Params for StakingParams {
    fn validate_params(&self) -> AppResult<()> {
        chain_tube_types::coin::validate_denom(&self.bond_denom)
            .map_err(|e| AppError::InvalidParams(format!("bond denom: {}", e)))?;
        positive(self.unbonding_time_seconds, "unbonding time")?;
        positive(u64::from(self.max_validators), "max validators")?;
        positive(u64::from(self.max_entries), "max entries")?;
        if !self.min_commission_rate.is_empty() {
            fraction(&self.min_commission_rate, "minimum commission rate")?;
        }
        Ok(())
    }
}

impl Params for SlashingParams {
    fn validate_params(&self) -> AppResult<()> {
        if self.signed_blocks_window <= 0 {
            return Err(AppError::InvalidParams(format!(
                "signed blocks window must be positive: {}",
                self.signed_blocks_window
            )));
        }
        fraction(&self.min_signed_per_window, "min signed per window")?;
        positive(self.downtime_jail_duration_seconds, "downtime jail duration")?;
        fraction(&self.slash_fraction_double_sign, "double sign slash fraction")?;
        fraction(&self.slash_fraction_downtime, "downtime slash fraction")
    }
}

impl Params for GovParams {
    fn validate_params(&self) -> AppResult<()> {
        let deposit = normalize(&self.min_deposit)
            .map_err(|e| AppError::InvalidParams(format!("min deposit: {}", e)))?;
        if deposit.is_empty() {
            return Err(AppError::InvalidParams("min deposit cannot be empty".to_string()));
        }
        positive(self.max_deposit_period_seconds, "max deposit period")?;
        positive(self.voting_period_seconds, "voting period")?;
        fraction(&self.quorum, "quorum")?;
        fraction(&self.threshold, "threshold")
    }
}

impl Params for WasmParams {
    fn validate_params(&self) -> AppResult<()> {
        let access = self.code_upload_access.clone().unwrap_or_default();
        let permission = AccessType::try_from(access.permission).map_err(|_| {
            AppError::InvalidParams(format!("unknown access type {}", access.permission))
        })?;
        match permission {
            AccessType::Unspecified => Err(AppError::InvalidParams(
                "code upload access: type must not be unspecified".to_string(),
            )),
            AccessType::AnyOfAddresses if access.addresses.is_empty() => Err(
                AppError::InvalidParams("code upload access: addresses must not be empty".to_string()),
            ),
            AccessType::Nobody | AccessType::Everybody if !access.addresses.is_empty() => {
                Err(AppError::InvalidParams(
                    "code upload access: addresses must be empty".to_string(),
                ))
            }
            _ => match AccessType::try_from(self.instantiate_default_permission) {
                Ok(AccessType::Unspecified) | Err(_) => Err(AppError::InvalidParams(
                    "instantiate default permission: invalid access type".to_string(),
                )),
                Ok(_) => Ok(()),
            },
        }
    }
}

impl Params for AssetFtParams {
    fn validate_params(&self) -> AppResult<()> {
        validate_fee(&self.issue_fee, "issue fee")
    }
}

impl Params for AssetNftParams {
    fn validate_params(&self) -> AppResult<()> {
        validate_fee(&self.mint_fee, "mint fee")
    }
}

impl Params for StakingCustomParams {
    fn validate_params(&self) -> AppResult<()> {
        match self.min_self_delegation.parse::<u128>() {
            Ok(v) if v > 0 => Ok(()),
            _ => Err(AppError::InvalidParams(format!(
                "min self delegation must be a positive integer, got '{}'",
                self.min_self_delegation
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use chain_tube_types::proto::wasm::AccessConfig;

    #[test]
    fn test_roundtrip_through_subspace() {
        let keeper = ParamsKeeper::new();
        let mut store = MemStore::new();
        let params = StakingCustomParams {
            min_self_delegation: "10000000".to_string(),
        };
        keeper.set(&mut store, SUBSPACE_CUSTOM, &params).unwrap();
        let back: StakingCustomParams = keeper.get(&store, SUBSPACE_CUSTOM).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let keeper = ParamsKeeper::new();
        let mut store = MemStore::new();
        let err = keeper
            .set_param_set(&mut store, SUBSPACE_BANK, &AssetNftParams::default())
            .unwrap_err();
        assert!(matches!(err, AppError::ParamsTypeMismatch { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_invalid_params_not_stored() {
        let keeper = ParamsKeeper::new();
        let mut store = MemStore::new();
        let bad = StakingCustomParams {
            min_self_delegation: "0".to_string(),
        };
        assert!(matches!(
            keeper.set(&mut store, SUBSPACE_CUSTOM, &bad),
            Err(AppError::InvalidParams(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_unwritten_subspace_reads_default() {
        let keeper = ParamsKeeper::new();
        let store = MemStore::new();
        let params: BankParams = keeper.get(&store, SUBSPACE_BANK).unwrap();
        assert_eq!(params, BankParams::default());
        assert!(keeper.get::<BankParams>(&store, "nope").is_err());
    }

    #[test]
    fn test_wasm_access_validation() {
        let nobody = WasmParams {
            code_upload_access: Some(AccessConfig {
                permission: AccessType::Nobody as i32,
                addresses: vec![],
            }),
            instantiate_default_permission: AccessType::Everybody as i32,
        };
        assert!(nobody.validate().is_ok());

        let mut listed = nobody.clone();
        listed.code_upload_access = Some(AccessConfig {
            permission: AccessType::AnyOfAddresses as i32,
            addresses: vec![],
        });
        assert!(listed.validate().is_err());
    }
}
