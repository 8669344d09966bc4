use prost::Message;
use serde::{Deserialize, Serialize};

use super::Coin;

/// `cosmos.gov.v1.Params` (deposit and voting windows only).
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct GovParams {
    #[prost(message, repeated, tag = "1")]
    pub min_deposit: Vec<Coin>,
    #[prost(uint64, tag = "2")]
    pub max_deposit_period_seconds: u64,
    #[prost(uint64, tag = "3")]
    pub voting_period_seconds: u64,
    #[prost(string, tag = "4")]
    pub quorum: String,
    #[prost(string, tag = "5")]
    pub threshold: String,
}

crate::impl_type_url! {
    GovParams => "/cosmos.gov.v1.Params",
}
