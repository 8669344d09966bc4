//! Parameter sets of the chain-specific modules.

use prost::Message;
use serde::{Deserialize, Serialize};

use super::Coin;

/// `coreum.asset.ft.v1.Params`.
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetFtParams {
    #[prost(message, optional, tag = "1")]
    pub issue_fee: Option<Coin>,
    /// Unix seconds.
    #[prost(int64, tag = "2")]
    pub token_upgrade_decision_timeout: i64,
    #[prost(uint64, tag = "3")]
    pub token_upgrade_grace_period_seconds: u64,
}

/// `coreum.asset.nft.v1.Params`.
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetNftParams {
    #[prost(message, optional, tag = "1")]
    pub mint_fee: Option<Coin>,
}

/// `coreum.customparams.v1.StakingParams`.
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingCustomParams {
    #[prost(string, tag = "1")]
    pub min_self_delegation: String,
}

crate::impl_type_url! {
    AssetFtParams => "/coreum.asset.ft.v1.Params",
    AssetNftParams => "/coreum.asset.nft.v1.Params",
    StakingCustomParams => "/coreum.customparams.v1.StakingParams",
}
