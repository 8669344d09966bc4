use prost::Message;
use serde::{Deserialize, Serialize};

/// Per-validator liveness bookkeeping kept by the slashing module.
#[derive(Clone, PartialEq, Eq, Message)]
pub struct ValidatorSigningInfo {
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(int64, tag = "2")]
    pub start_height: i64,
    #[prost(int64, tag = "3")]
    pub index_offset: i64,
    /// Unix seconds.
    #[prost(int64, tag = "4")]
    pub jailed_until: i64,
    #[prost(bool, tag = "5")]
    pub tombstoned: bool,
    #[prost(int64, tag = "6")]
    pub missed_blocks_counter: i64,
}

/// `cosmos.slashing.v1beta1.Params`.
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct SlashingParams {
    #[prost(int64, tag = "1")]
    pub signed_blocks_window: i64,
    #[prost(string, tag = "2")]
    pub min_signed_per_window: String,
    #[prost(uint64, tag = "3")]
    pub downtime_jail_duration_seconds: u64,
    #[prost(string, tag = "4")]
    pub slash_fraction_double_sign: String,
    #[prost(string, tag = "5")]
    pub slash_fraction_downtime: String,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QuerySigningInfoRequest {
    #[prost(string, tag = "1")]
    pub cons_address: String,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QuerySigningInfoResponse {
    #[prost(message, optional, tag = "1")]
    pub val_signing_info: Option<ValidatorSigningInfo>,
}

crate::impl_type_url! {
    SlashingParams => "/cosmos.slashing.v1beta1.Params",
}
