use prost::Message;

#[derive(Clone, PartialEq, Eq, Message)]
pub struct Secp256k1PubKey {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct Ed25519PubKey {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
}

crate::impl_type_url! {
    Secp256k1PubKey => "/cosmos.crypto.secp256k1.PubKey",
    Ed25519PubKey => "/cosmos.crypto.ed25519.PubKey",
}
