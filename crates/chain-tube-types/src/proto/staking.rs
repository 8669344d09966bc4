use prost::Message;
use serde::{Deserialize, Serialize};

use super::{Any, Coin};

/// Bonding state of a validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum BondStatus {
    Unspecified = 0,
    Unbonded = 1,
    Unbonding = 2,
    Bonded = 3,
}

impl BondStatus {
    /// Protobuf enum value name, as used by status filters in queries.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            BondStatus::Unspecified => "BOND_STATUS_UNSPECIFIED",
            BondStatus::Unbonded => "BOND_STATUS_UNBONDED",
            BondStatus::Unbonding => "BOND_STATUS_UNBONDING",
            BondStatus::Bonded => "BOND_STATUS_BONDED",
        }
    }

    pub fn from_str_name(value: &str) -> Option<Self> {
        match value {
            "BOND_STATUS_UNSPECIFIED" => Some(BondStatus::Unspecified),
            "BOND_STATUS_UNBONDED" => Some(BondStatus::Unbonded),
            "BOND_STATUS_UNBONDING" => Some(BondStatus::Unbonding),
            "BOND_STATUS_BONDED" => Some(BondStatus::Bonded),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct Description {
    #[prost(string, tag = "1")]
    pub moniker: String,
    #[prost(string, tag = "2")]
    pub identity: String,
    #[prost(string, tag = "3")]
    pub website: String,
    #[prost(string, tag = "4")]
    pub security_contact: String,
    #[prost(string, tag = "5")]
    pub details: String,
}

/// Commission rates as decimal strings.
#[derive(Clone, PartialEq, Eq, Message)]
pub struct CommissionRates {
    #[prost(string, tag = "1")]
    pub rate: String,
    #[prost(string, tag = "2")]
    pub max_rate: String,
    #[prost(string, tag = "3")]
    pub max_change_rate: String,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct Validator {
    #[prost(string, tag = "1")]
    pub operator_address: String,
    #[prost(message, optional, tag = "2")]
    pub consensus_pubkey: Option<Any>,
    #[prost(bool, tag = "3")]
    pub jailed: bool,
    #[prost(enumeration = "BondStatus", tag = "4")]
    pub status: i32,
    #[prost(string, tag = "5")]
    pub tokens: String,
    #[prost(string, tag = "6")]
    pub delegator_shares: String,
    #[prost(message, optional, tag = "7")]
    pub description: Option<Description>,
    #[prost(int64, tag = "8")]
    pub unbonding_height: i64,
    #[prost(message, optional, tag = "10")]
    pub commission: Option<CommissionRates>,
    #[prost(string, tag = "11")]
    pub min_self_delegation: String,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct Delegation {
    #[prost(string, tag = "1")]
    pub delegator_address: String,
    #[prost(string, tag = "2")]
    pub validator_address: String,
    #[prost(string, tag = "3")]
    pub shares: String,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct DelegationResponse {
    #[prost(message, optional, tag = "1")]
    pub delegation: Option<Delegation>,
    #[prost(message, optional, tag = "2")]
    pub balance: Option<Coin>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct MsgCreateValidator {
    #[prost(message, optional, tag = "1")]
    pub description: Option<Description>,
    #[prost(message, optional, tag = "2")]
    pub commission: Option<CommissionRates>,
    #[prost(string, tag = "3")]
    pub min_self_delegation: String,
    #[prost(string, tag = "4")]
    pub delegator_address: String,
    #[prost(string, tag = "5")]
    pub validator_address: String,
    #[prost(message, optional, tag = "6")]
    pub pubkey: Option<Any>,
    #[prost(message, optional, tag = "7")]
    pub value: Option<Coin>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct MsgCreateValidatorResponse {}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct MsgDelegate {
    #[prost(string, tag = "1")]
    pub delegator_address: String,
    #[prost(string, tag = "2")]
    pub validator_address: String,
    #[prost(message, optional, tag = "3")]
    pub amount: Option<Coin>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct MsgDelegateResponse {}

/// `cosmos.staking.v1beta1.Params`.
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingParams {
    #[prost(uint64, tag = "1")]
    pub unbonding_time_seconds: u64,
    #[prost(uint32, tag = "2")]
    pub max_validators: u32,
    #[prost(uint32, tag = "3")]
    pub max_entries: u32,
    #[prost(uint32, tag = "4")]
    pub historical_entries: u32,
    #[prost(string, tag = "5")]
    pub bond_denom: String,
    #[prost(string, tag = "6")]
    pub min_commission_rate: String,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QueryValidatorsRequest {
    #[prost(string, tag = "1")]
    pub status: String,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QueryValidatorsResponse {
    #[prost(message, repeated, tag = "1")]
    pub validators: Vec<Validator>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QueryValidatorRequest {
    #[prost(string, tag = "1")]
    pub validator_addr: String,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QueryValidatorResponse {
    #[prost(message, optional, tag = "1")]
    pub validator: Option<Validator>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QueryDelegationRequest {
    #[prost(string, tag = "1")]
    pub delegator_addr: String,
    #[prost(string, tag = "2")]
    pub validator_addr: String,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QueryDelegationResponse {
    #[prost(message, optional, tag = "1")]
    pub delegation_response: Option<DelegationResponse>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QueryStakingParamsRequest {}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QueryStakingParamsResponse {
    #[prost(message, optional, tag = "1")]
    pub params: Option<StakingParams>,
}

crate::impl_type_url! {
    MsgCreateValidator => "/cosmos.staking.v1beta1.MsgCreateValidator",
    MsgCreateValidatorResponse => "/cosmos.staking.v1beta1.MsgCreateValidatorResponse",
    MsgDelegate => "/cosmos.staking.v1beta1.MsgDelegate",
    MsgDelegateResponse => "/cosmos.staking.v1beta1.MsgDelegateResponse",
    StakingParams => "/cosmos.staking.v1beta1.Params",
}
