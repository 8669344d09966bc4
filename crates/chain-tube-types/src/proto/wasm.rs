use prost::Message;
use serde::{Deserialize, Serialize};

/// Who may upload or instantiate code.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration, Serialize, Deserialize,
)]
#[repr(i32)]
pub enum AccessType {
    Unspecified = 0,
    Nobody = 1,
    Everybody = 3,
    AnyOfAddresses = 4,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    #[prost(enumeration = "AccessType", tag = "1")]
    pub permission: i32,
    #[prost(string, repeated, tag = "3")]
    pub addresses: Vec<String>,
}

/// `cosmwasm.wasm.v1.Params`.
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct WasmParams {
    #[prost(message, optional, tag = "1")]
    pub code_upload_access: Option<AccessConfig>,
    #[prost(enumeration = "AccessType", tag = "2")]
    pub instantiate_default_permission: i32,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct MsgStoreCode {
    #[prost(string, tag = "1")]
    pub sender: String,
    #[prost(bytes = "vec", tag = "2")]
    pub wasm_byte_code: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct MsgStoreCodeResponse {
    #[prost(uint64, tag = "1")]
    pub code_id: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub checksum: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct CodeInfo {
    #[prost(bytes = "vec", tag = "1")]
    pub code_hash: Vec<u8>,
    #[prost(string, tag = "2")]
    pub creator: String,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct CodeInfoResponse {
    #[prost(uint64, tag = "1")]
    pub code_id: u64,
    #[prost(string, tag = "2")]
    pub creator: String,
    #[prost(bytes = "vec", tag = "3")]
    pub data_hash: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QueryCodeRequest {
    #[prost(uint64, tag = "1")]
    pub code_id: u64,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct QueryCodeResponse {
    #[prost(message, optional, tag = "1")]
    pub code_info: Option<CodeInfoResponse>,
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
}

crate::impl_type_url! {
    MsgStoreCode => "/cosmwasm.wasm.v1.MsgStoreCode",
    MsgStoreCodeResponse => "/cosmwasm.wasm.v1.MsgStoreCodeResponse",
    WasmParams => "/cosmwasm.wasm.v1.Params",
}
