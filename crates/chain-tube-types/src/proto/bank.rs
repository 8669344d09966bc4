use prost::Message;
use serde::{Deserialize, Serialize};

use super::Coin;

#[derive(Clone, PartialEq, Eq, Message)]
pub struct MsgSend {
    #[prost(string, tag = "1")]
    pub from_address: String,
    #[prost(string, tag = "2")]
    pub to_address: String,
    #[prost(message, repeated, tag = "3")]
    pub amount: Vec<Coin>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct MsgSendResponse {}

/// `cosmos.bank.v1beta1.Params`.
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct BankParams {
    #[prost(bool, tag = "2")]
    pub default_send_enabled: bool,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QueryBalanceRequest {
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(string, tag = "2")]
    pub denom: String,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QueryBalanceResponse {
    #[prost(message, optional, tag = "1")]
    pub balance: Option<Coin>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QueryAllBalancesRequest {
    #[prost(string, tag = "1")]
    pub address: String,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QueryAllBalancesResponse {
    #[prost(message, repeated, tag = "1")]
    pub balances: Vec<Coin>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QuerySupplyOfRequest {
    #[prost(string, tag = "1")]
    pub denom: String,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QuerySupplyOfResponse {
    #[prost(message, optional, tag = "1")]
    pub amount: Option<Coin>,
}

crate::impl_type_url! {
    MsgSend => "/cosmos.bank.v1beta1.MsgSend",
    MsgSendResponse => "/cosmos.bank.v1beta1.MsgSendResponse",
    BankParams => "/cosmos.bank.v1beta1.Params",
}
