//! Execution results returned across the boundary.

use prost::Message;

use super::Any;

#[derive(Clone, Copy, PartialEq, Eq, Message)]
pub struct GasInfo {
    #[prost(uint64, tag = "1")]
    pub gas_wanted: u64,
    #[prost(uint64, tag = "2")]
    pub gas_used: u64,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct EventAttribute {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub value: String,
    #[prost(bool, tag = "3")]
    pub index: bool,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct Event {
    #[prost(string, tag = "1")]
    pub r#type: String,
    #[prost(message, repeated, tag = "2")]
    pub attributes: Vec<EventAttribute>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            r#type: kind.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(EventAttribute {
            key: key.into(),
            value: value.into(),
            index: true,
        });
        self
    }
}

/// `cosmos.base.abci.v1beta1.Result` - outcome of a delivered transaction.
#[derive(Clone, PartialEq, Eq, Message)]
pub struct TxResult {
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
    #[prost(string, tag = "2")]
    pub log: String,
    #[prost(message, repeated, tag = "3")]
    pub events: Vec<Event>,
    #[prost(message, repeated, tag = "4")]
    pub msg_responses: Vec<Any>,
}

/// Payload of a successful `Execute` envelope.
#[derive(Clone, PartialEq, Eq, Message)]
pub struct SimulationResponse {
    #[prost(message, optional, tag = "1")]
    pub gas_info: Option<GasInfo>,
    #[prost(message, optional, tag = "2")]
    pub result: Option<TxResult>,
}
