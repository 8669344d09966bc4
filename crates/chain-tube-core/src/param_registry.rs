//! Parameter-set type registry.
//!
//! Maps a protobuf type URL to a zero-valued prototype of the parameter set,
//! so `Any`-wrapped parameter blobs coming over the boundary can be decoded
//! into their concrete type and reads know which empty value to fill.

use std::collections::HashMap;

use chain_tube_app::{AppError, ParamSet, Params};
use chain_tube_types::proto::bank::BankParams;
use chain_tube_types::proto::gov::GovParams;
use chain_tube_types::proto::params::{AssetFtParams, AssetNftParams, StakingCustomParams};
use chain_tube_types::proto::slashing::SlashingParams;
use chain_tube_types::proto::staking::StakingParams;
use chain_tube_types::proto::wasm::WasmParams;
use chain_tube_types::Any;

/// Lookup failures of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamRegistryError {
    /// No prototype registered under the type URL.
    NotRegistered(String),
    /// The `Any` value did not decode as the registered type.
    Decode { type_url: String, reason: String },
}

impl std::fmt::Display for ParamRegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamRegistryError::NotRegistered(url) => {
                write!(f, "No param set found for `{}`", url)
            }
            ParamRegistryError::Decode { type_url, reason } => {
                write!(f, "failed to unpack `{}`: {}", type_url, reason)
            }
        }
    }
}

impl std::error::Error for ParamRegistryError {}

#[derive(Debug)]
pub struct ParamTypeRegistry {
    prototypes: HashMap<&'static str, Box<dyn ParamSet>>,
}

impl ParamTypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            prototypes: HashMap::new(),
        }
    }

    /// A registry holding every parameter set the application declares.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register::<AssetFtParams>();
        registry.register::<AssetNftParams>();
        registry.register::<BankParams>();
        registry.register::<StakingParams>();
        registry.register::<SlashingParams>();
        registry.register::<GovParams>();
        registry.register::<WasmParams>();
        registry.register::<StakingCustomParams>();
        registry
    }

    pub fn register<P: Params>(&mut self) {
        self.prototypes.insert(P::TYPE_URL, Box::new(P::default()));
    }

    pub fn is_registered(&self, type_url: &str) -> bool {
        self.prototypes.contains_key(type_url)
    }

    pub fn type_urls(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.prototypes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.prototypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }

    /// Fresh zero-valued instance of the registered type.
    pub fn empty_param_set(&self, type_url: &str) -> Result<Box<dyn ParamSet>, ParamRegistryError> {
        self.prototypes
            .get(type_url)
            .map(|proto| proto.boxed_default())
            .ok_or_else(|| ParamRegistryError::NotRegistered(type_url.to_string()))
    }

    /// Decode an `Any`-wrapped parameter set into its registered type.
    pub fn unpack_any(&self, any: &Any) -> Result<Box<dyn ParamSet>, ParamRegistryError> {
        let mut params = self.empty_param_set(&any.type_url)?;
        params
            .decode_value(&any.value)
            .map_err(|e: AppError| ParamRegistryError::Decode {
                type_url: any.type_url.clone(),
                reason: e.to_string(),
            })?;
        Ok(params)
    }
}

impl Default for ParamTypeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_tube_app::ParamsKeeper;
    use chain_tube_types::{Coin, TypeUrl};

    #[test]
    fn test_defaults_cover_every_subspace_type() {
        let registry = ParamTypeRegistry::with_defaults();
        assert_eq!(registry.len(), 8);
        assert!(registry.is_registered(AssetFtParams::TYPE_URL));
        assert!(registry.is_registered(AssetNftParams::TYPE_URL));
        assert!(registry.is_registered(StakingCustomParams::TYPE_URL));
        assert!(ParamTypeRegistry::new().is_empty());
    }

    #[test]
    fn test_registered_types_match_app_subspaces() {
        let registry = ParamTypeRegistry::with_defaults();
        let keeper = ParamsKeeper::new();
        let mut declared: Vec<&str> = keeper
            .subspace_names()
            .filter_map(|name| keeper.subspace(name))
            .map(|subspace| subspace.type_url)
            .collect();
        let mut registered: Vec<&str> = registry.type_urls().collect();
        declared.sort_unstable();
        registered.sort_unstable();
        assert_eq!(declared, registered);
    }

    #[test]
    fn test_empty_param_set_is_zero_valued() {
        let registry = ParamTypeRegistry::with_defaults();
        let params = registry.empty_param_set(AssetNftParams::TYPE_URL).unwrap();
        assert_eq!(params.type_url(), AssetNftParams::TYPE_URL);
        assert!(params.encode_value().is_empty());
    }

    #[test]
    fn test_unpack_any_decodes_registered_type() {
        let registry = ParamTypeRegistry::with_defaults();
        let value = AssetNftParams {
            mint_fee: Some(Coin::new(5, "ucore")),
        };
        let params = registry.unpack_any(&Any::pack(&value)).unwrap();
        assert_eq!(params.encode_value(), prost::Message::encode_to_vec(&value));
    }

    #[test]
    fn test_unregistered_type_is_an_error() {
        let registry = ParamTypeRegistry::with_defaults();
        let err = registry.empty_param_set("/not.a.Param").unwrap_err();
        assert_eq!(err.to_string(), "No param set found for `/not.a.Param`");

        let any = Any {
            type_url: "/not.a.Param".to_string(),
            value: vec![],
        };
        assert!(matches!(
            registry.unpack_any(&any),
            Err(ParamRegistryError::NotRegistered(_))
        ));
    }

    #[test]
    fn test_garbage_value_fails_to_unpack() {
        let registry = ParamTypeRegistry::with_defaults();
        let any = Any {
            type_url: AssetNftParams::TYPE_URL.to_string(),
            value: vec![0xff, 0xff, 0xff],
        };
        assert!(matches!(
            registry.unpack_any(&any),
            Err(ParamRegistryError::Decode { .. })
        ));
    }
}
