use prost::Message;

use super::Any;

#[derive(Clone, PartialEq, Eq, Message)]
pub struct BaseAccount {
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(message, optional, tag = "2")]
    pub pub_key: Option<Any>,
    #[prost(uint64, tag = "3")]
    pub account_number: u64,
    #[prost(uint64, tag = "4")]
    pub sequence: u64,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct ModuleAccount {
    #[prost(message, optional, tag = "1")]
    pub base_account: Option<BaseAccount>,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, repeated, tag = "3")]
    pub permissions: Vec<String>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QueryAccountRequest {
    #[prost(string, tag = "1")]
    pub address: String,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QueryAccountResponse {
    #[prost(message, optional, tag = "1")]
    pub account: Option<Any>,
}

crate::impl_type_url! {
    BaseAccount => "/cosmos.auth.v1beta1.BaseAccount",
    ModuleAccount => "/cosmos.auth.v1beta1.ModuleAccount",
}
