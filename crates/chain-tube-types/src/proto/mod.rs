//! Protobuf wire messages.
//!
//! Transactions, queries and parameter sets cross the C boundary as
//! protobuf-encoded bytes. The message shapes follow the familiar
//! `cosmos.*` / `cosmwasm.*` / `coreum.*` packages so callers can reuse
//! their existing encoders; field tags are stable.
//!
//! Parameter-set messages also derive serde so they can live inside the
//! JSON genesis document.

use prost::Message;
use serde::{Deserialize, Serialize};

pub mod abci;
pub mod auth;
pub mod bank;
pub mod crypto;
pub mod gov;
pub mod params;
pub mod slashing;
pub mod staking;
pub mod tx;
pub mod wasm;

/// Static protobuf type URL of a message.
pub trait TypeUrl {
    const TYPE_URL: &'static str;
}

/// Implement [`TypeUrl`] for a list of messages.
#[macro_export]
macro_rules! impl_type_url {
    ($($ty:ty => $url:expr),* $(,)?) => {
        $(
            impl $crate::proto::TypeUrl for $ty {
                const TYPE_URL: &'static str = $url;
            }
        )*
    };
}

/// `google.protobuf.Any`.
#[derive(Clone, PartialEq, Eq, Message)]
pub struct Any {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

impl Any {
    /// Pack a typed message.
    pub fn pack<M: Message + TypeUrl>(msg: &M) -> Self {
        Self {
            type_url: M::TYPE_URL.to_string(),
            value: msg.encode_to_vec(),
        }
    }

    /// Decode into `M` if the type URL matches, `Ok(None)` otherwise.
    pub fn unpack<M: Message + Default + TypeUrl>(&self) -> Result<Option<M>, prost::DecodeError> {
        if self.type_url != M::TYPE_URL {
            return Ok(None);
        }
        M::decode(self.value.as_slice()).map(Some)
    }
}

/// `cosmos.base.v1beta1.Coin`; amounts are decimal strings.
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
pub struct Coin {
    #[prost(string, tag = "1")]
    pub denom: String,
    #[prost(string, tag = "2")]
    pub amount: String,
}

impl Coin {
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.to_string(),
        }
    }
}

impl_type_url! {
    Coin => "/cosmos.base.v1beta1.Coin",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_unpack_checks_type_url() {
        let coin = Coin::new(5, "ucore");
        let any = Any::pack(&coin);
        assert_eq!(any.type_url, "/cosmos.base.v1beta1.Coin");
        assert_eq!(any.unpack::<Coin>().unwrap(), Some(coin));

        let other = Any {
            type_url: "/something.Else".to_string(),
            value: vec![],
        };
        assert_eq!(other.unpack::<Coin>().unwrap(), None);
    }

    #[test]
    fn test_coin_json_shape() {
        let coin: Coin = serde_json::from_str(r#"{"denom":"core","amount":"1000"}"#).unwrap();
        assert_eq!(coin, Coin::new(1000, "core"));
    }
}
